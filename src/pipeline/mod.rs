// ETL pipeline: extract, transform, load and query, run once per invocation

pub mod extract;
pub mod load;
pub mod rates;
pub mod transform;

use crate::app::ports::{DocumentFetcher, ProgressLog, QueryResult, StoreConnector, TableStore};
use crate::config::Config;
use crate::error::EtlError;
use crate::types::EnrichedBankRecord;
use extract::TableExtractor;
use rates::ExchangeRateTable;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    Extracted,
    Transformed,
    Persisted,
    QueriesRun,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Init => "init",
            PipelineStage::Extracted => "extracted",
            PipelineStage::Transformed => "transformed",
            PipelineStage::Persisted => "persisted",
            PipelineStage::QueriesRun => "queries_run",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A stage-fatal error together with the last stage the run completed.
#[derive(Error, Debug)]
#[error("pipeline failed after stage '{reached}': {error}")]
pub struct PipelineFailure {
    pub reached: PipelineStage,
    #[source]
    pub error: EtlError,
}

#[derive(Debug)]
pub struct QueryOutput {
    pub query: String,
    pub result: QueryResult,
}

#[derive(Debug)]
pub struct QueryFailure {
    pub query: String,
    pub error: EtlError,
}

/// Result of a completed run
#[derive(Debug)]
pub struct RunReport {
    pub stage: PipelineStage,
    pub records: Vec<EnrichedBankRecord>,
    pub csv_path: PathBuf,
    pub table_name: String,
    pub query_outputs: Vec<QueryOutput>,
    pub query_failures: Vec<QueryFailure>,
}

/// Sequences extractor, transformer and sinks exactly once.
pub struct Pipeline<'a> {
    fetcher: &'a dyn DocumentFetcher,
    connector: &'a dyn StoreConnector,
    log: &'a dyn ProgressLog,
    extractor: TableExtractor,
    url: String,
    rates_path: PathBuf,
    csv_path: PathBuf,
    table_name: String,
    queries: Vec<String>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &Config,
        fetcher: &'a dyn DocumentFetcher,
        connector: &'a dyn StoreConnector,
        log: &'a dyn ProgressLog,
    ) -> Self {
        Self {
            fetcher,
            connector,
            log,
            extractor: TableExtractor::from_config(&config.source),
            url: config.source.url.clone(),
            rates_path: config.rates.path.clone(),
            csv_path: config.output.csv_path.clone(),
            table_name: config.output.table_name.clone(),
            queries: config.resolved_queries(),
        }
    }

    /// Replaces the configured query set.
    pub fn with_queries(mut self, queries: Vec<String>) -> Self {
        self.queries = queries;
        self
    }

    #[instrument(skip(self), fields(url = %self.url, table = %self.table_name))]
    pub fn run(&self) -> Result<RunReport, PipelineFailure> {
        let mut stage = PipelineStage::Init;
        self.log.log("Preliminaries complete. Initiating ETL process");

        // Init -> Extracted
        println!("📡 Extracting bank table from {}...", self.url);
        let records = self
            .extractor
            .extract(self.fetcher, &self.url, self.log)
            .map_err(|e| self.fail(&mut stage, e))?;
        self.advance(&mut stage, PipelineStage::Extracted);
        println!("✅ Extracted {} banks", records.len());
        self.log.log("Data extraction complete. Initiating Transformation process");

        // Extracted -> Transformed
        println!("🔧 Converting market caps...");
        let enriched = ExchangeRateTable::load(&self.rates_path)
            .and_then(|rates| transform::transform(&records, &rates))
            .map_err(|e| self.fail(&mut stage, e))?;
        self.advance(&mut stage, PipelineStage::Transformed);
        println!("✅ Transformed {} records", enriched.len());
        self.log.log("Data transformation complete. Initiating loading process");

        // Transformed -> Persisted
        load::write_csv(&enriched, &self.csv_path).map_err(|e| self.fail(&mut stage, e))?;
        println!("💾 Saved CSV to {}", self.csv_path.display());
        self.log.log("Data saved to CSV file");

        let mut store = self.connector.connect().map_err(|e| self.fail(&mut stage, e))?;
        self.log.log("SQL Connection initiated.");

        let outcome = self.load_and_query(store.as_mut(), &enriched, &mut stage);

        // The connection is released on every path once acquired
        match store.close() {
            Ok(()) => self.log.log("Server Connection closed"),
            Err(e) => {
                warn!("Failed to close store connection: {}", e);
                self.log.log(&format!("Connection close failed: {}: {}", e.kind(), e));
            }
        }

        let (query_outputs, query_failures) = outcome?;

        // QueriesRun -> Done
        self.advance(&mut stage, PipelineStage::Done);
        self.log.log("Process Complete.");

        Ok(RunReport {
            stage,
            records: enriched,
            csv_path: self.csv_path.clone(),
            table_name: self.table_name.clone(),
            query_outputs,
            query_failures,
        })
    }

    fn load_and_query(
        &self,
        store: &mut dyn TableStore,
        enriched: &[EnrichedBankRecord],
        stage: &mut PipelineStage,
    ) -> Result<(Vec<QueryOutput>, Vec<QueryFailure>), PipelineFailure> {
        load::write_table(enriched, store, &self.table_name).map_err(|e| self.fail(stage, e))?;
        self.advance(stage, PipelineStage::Persisted);
        println!("💾 Loaded table {}", self.table_name);
        self.log.log("Data loaded to Database as table. Running the queries");

        // Persisted -> QueriesRun: query failures never unwind persisted data
        let mut outputs = Vec::new();
        let mut failures = Vec::new();
        for query in &self.queries {
            match load::run_query(query, store) {
                Ok(result) => {
                    debug!("Query returned {} rows", result.len());
                    outputs.push(QueryOutput {
                        query: query.clone(),
                        result,
                    });
                }
                Err(e) => {
                    warn!("Query failed: {}: {}", query, e);
                    self.log
                        .log(&format!("Query failed: {}: {}: {}", e.kind(), query, e));
                    failures.push(QueryFailure {
                        query: query.clone(),
                        error: e,
                    });
                }
            }
        }
        self.advance(stage, PipelineStage::QueriesRun);
        self.log.log(&format!(
            "Queries complete: {} succeeded, {} failed",
            outputs.len(),
            failures.len()
        ));
        Ok((outputs, failures))
    }

    fn advance(&self, stage: &mut PipelineStage, next: PipelineStage) {
        debug!("Stage transition {} -> {}", stage, next);
        *stage = next;
    }

    fn fail(&self, stage: &mut PipelineStage, error: EtlError) -> PipelineFailure {
        let reached = *stage;
        error!("Pipeline failed after stage '{}': {}", reached, error);
        self.log.log(&format!(
            "Pipeline failed after stage '{}': {}: {}",
            reached,
            error.kind(),
            error
        ));
        self.advance(stage, PipelineStage::Failed);
        info!("Run halted");
        PipelineFailure { reached, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::FetchedDocument;
    use crate::error::FailureKind;
    use crate::infra::sqlite_store::SqliteStore;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const PAGE: &str = r#"<html><body>
        <span id="By_market_capitalization">By market capitalization</span>
        <table>
          <tr><th>Name</th><th></th><th>Cap</th></tr>
          <tr><td>Acme Bank</td><td></td><td>432.1B</td></tr>
          <tr><td>Beta Bank</td><td></td><td>218.1B</td></tr>
        </table></body></html>"#;

    #[derive(Default)]
    struct MemoryLog {
        lines: RefCell<Vec<String>>,
    }

    impl ProgressLog for MemoryLog {
        fn log(&self, message: &str) {
            self.lines.borrow_mut().push(message.to_string());
        }
    }

    struct StaticFetcher {
        status: u16,
        body: &'static str,
    }

    impl DocumentFetcher for StaticFetcher {
        fn fetch(&self, _url: &str) -> std::result::Result<FetchedDocument, String> {
            Ok(FetchedDocument {
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }

    /// Hands out in-memory stores and counts how many were closed.
    #[derive(Default)]
    struct CountingConnector {
        opened: Cell<usize>,
        closed: std::rc::Rc<Cell<usize>>,
    }

    struct TrackedStore {
        inner: SqliteStore,
        closed: std::rc::Rc<Cell<usize>>,
    }

    impl TableStore for TrackedStore {
        fn replace_table(&mut self, table: &str, records: &[EnrichedBankRecord]) -> crate::error::Result<()> {
            self.inner.replace_table(table, records)
        }

        fn query(&self, sql: &str) -> crate::error::Result<QueryResult> {
            self.inner.query(sql)
        }

        fn close(self: Box<Self>) -> crate::error::Result<()> {
            self.closed.set(self.closed.get() + 1);
            Box::new(self.inner).close()
        }
    }

    impl StoreConnector for CountingConnector {
        fn connect(&self) -> crate::error::Result<Box<dyn TableStore>> {
            self.opened.set(self.opened.get() + 1);
            Ok(Box::new(TrackedStore {
                inner: SqliteStore::open_in_memory()?,
                closed: self.closed.clone(),
            }))
        }
    }

    fn config_in(dir: &TempDir, rates: &str) -> Config {
        let rates_path = dir.path().join("exchange_rate.csv");
        fs::write(&rates_path, rates).unwrap();
        let mut config = Config::default();
        config.rates.path = rates_path;
        config.output.csv_path = dir.path().join("Largest_banks_data.csv");
        config
    }

    #[test]
    fn test_full_run_reaches_done() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, "GBP,EUR,INR\n0.8,0.93,83.0\n");
        let fetcher = StaticFetcher { status: 200, body: PAGE };
        let connector = CountingConnector::default();
        let log = MemoryLog::default();

        let report = Pipeline::new(&config, &fetcher, &connector, &log).run().unwrap();

        assert_eq!(report.stage, PipelineStage::Done);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].market_cap_gbp_million, 345680.0);
        assert_eq!(report.query_outputs.len(), 3);
        assert!(report.query_failures.is_empty());
        assert_eq!(report.query_outputs[0].result.len(), 2);
        assert_eq!(connector.opened.get(), 1);
        assert_eq!(connector.closed.get(), 1);

        let lines = log.lines.borrow();
        assert_eq!(lines.first().unwrap(), "Preliminaries complete. Initiating ETL process");
        assert_eq!(lines.last().unwrap(), "Process Complete.");
        assert!(lines.iter().any(|l| l == "Server Connection closed"));
    }

    #[test]
    fn test_fetch_error_halts_before_transform() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, "GBP,EUR,INR\n0.8,0.93,83.0\n");
        let fetcher = StaticFetcher { status: 503, body: "" };
        let connector = CountingConnector::default();
        let log = MemoryLog::default();

        let failure = Pipeline::new(&config, &fetcher, &connector, &log).run().unwrap_err();

        assert_eq!(failure.reached, PipelineStage::Init);
        assert_eq!(failure.error.kind(), FailureKind::FetchError);
        assert!(!config.output.csv_path.exists());
        assert_eq!(connector.opened.get(), 0);
        assert!(log.lines.borrow().iter().any(|l| l.contains("FetchError")));
    }

    #[test]
    fn test_missing_rate_halts_after_extraction() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, "GBP,INR\n0.8,83.0\n");
        let fetcher = StaticFetcher { status: 200, body: PAGE };
        let connector = CountingConnector::default();
        let log = MemoryLog::default();

        let failure = Pipeline::new(&config, &fetcher, &connector, &log).run().unwrap_err();

        assert_eq!(failure.reached, PipelineStage::Extracted);
        assert_eq!(failure.error.kind(), FailureKind::MissingRate);
        assert!(!config.output.csv_path.exists());
        assert_eq!(connector.opened.get(), 0);
    }

    #[test]
    fn test_query_failure_is_reported_not_fatal() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, "GBP,EUR,INR\n0.8,0.93,83.0\n");
        let fetcher = StaticFetcher { status: 200, body: PAGE };
        let connector = CountingConnector::default();
        let log = MemoryLog::default();

        let report = Pipeline::new(&config, &fetcher, &connector, &log)
            .with_queries(vec![
                "SELECT MC_GBP_Billion FROM Largest_banks".to_string(),
                "SELECT Name FROM Largest_banks LIMIT 1".to_string(),
            ])
            .run()
            .unwrap();

        assert_eq!(report.stage, PipelineStage::Done);
        assert_eq!(report.query_failures.len(), 1);
        assert_eq!(report.query_failures[0].error.kind(), FailureKind::QueryError);
        assert_eq!(report.query_outputs.len(), 1);
        assert_eq!(connector.closed.get(), 1);
    }

    #[test]
    fn test_store_failure_still_closes_connection() {
        let dir = tempdir().unwrap();
        let mut config = config_in(&dir, "GBP,EUR,INR\n0.8,0.93,83.0\n");
        // Passes through the driver unchecked; the store rejects it
        config.output.table_name = "bad name".to_string();
        let fetcher = StaticFetcher { status: 200, body: PAGE };
        let connector = CountingConnector::default();
        let log = MemoryLog::default();

        let failure = Pipeline::new(&config, &fetcher, &connector, &log).run().unwrap_err();

        assert_eq!(failure.reached, PipelineStage::Transformed);
        assert_eq!(failure.error.kind(), FailureKind::StoreError);
        // CSV sink is not rolled back
        assert!(config.output.csv_path.exists());
        assert_eq!(connector.closed.get(), 1);
    }
}
