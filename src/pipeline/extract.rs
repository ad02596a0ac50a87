use crate::app::ports::{DocumentFetcher, ProgressLog};
use crate::config::SourceConfig;
use crate::constants::{DEFAULT_MARKET_CAP_COLUMN, DEFAULT_NAME_COLUMN};
use crate::error::{EtlError, Result};
use crate::types::BankRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("static row selector"));
static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("static cell selector"));
static PLAIN_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9][0-9,]*(?:\.[0-9]+)?$").expect("static decimal pattern"));

/// Rows with fewer cells than this are header or separator rows.
const MIN_DATA_CELLS: usize = 3;

/// Pulls the market-capitalization table out of the source page.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    anchor_id: String,
    name_column: usize,
    market_cap_column: usize,
}

impl TableExtractor {
    pub fn new(anchor_id: impl Into<String>) -> Self {
        Self {
            anchor_id: anchor_id.into(),
            name_column: DEFAULT_NAME_COLUMN,
            market_cap_column: DEFAULT_MARKET_CAP_COLUMN,
        }
    }

    pub fn from_config(source: &SourceConfig) -> Self {
        Self::new(source.anchor_id.clone()).with_columns(source.name_column, source.market_cap_column)
    }

    pub fn with_columns(mut self, name_column: usize, market_cap_column: usize) -> Self {
        self.name_column = name_column;
        self.market_cap_column = market_cap_column;
        self
    }

    /// Fetches `url` and parses the table under the anchor heading.
    #[instrument(skip(self, fetcher, log), fields(anchor = %self.anchor_id))]
    pub fn extract(
        &self,
        fetcher: &dyn DocumentFetcher,
        url: &str,
        log: &dyn ProgressLog,
    ) -> Result<Vec<BankRecord>> {
        let result = self.fetch(fetcher, url).and_then(|body| self.parse_document(&body));
        match &result {
            Ok(records) => {
                log.log(&format!("Extraction completed successfully: {} rows", records.len()));
            }
            Err(EtlError::TableNotFound(_)) => log.log("Extraction failed: Table not found"),
            Err(e) => log.log(&format!("Extraction failed: {}: {}", e.kind(), e)),
        }
        result
    }

    fn fetch(&self, fetcher: &dyn DocumentFetcher, url: &str) -> Result<String> {
        info!("Fetching {}", url);
        let document = fetcher.fetch(url).map_err(|message| EtlError::Fetch {
            url: url.to_string(),
            message,
        })?;
        if !document.is_success() {
            return Err(EtlError::Fetch {
                url: url.to_string(),
                message: format!("request failed with status: {}", document.status),
            });
        }
        debug!("Fetched {} bytes", document.body.len());
        Ok(document.body)
    }

    /// Parses an HTML document. Never returns a partial table: a missing
    /// anchor or table is an error, bad rows are dropped one by one.
    pub fn parse_document(&self, html: &str) -> Result<Vec<BankRecord>> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let anchor = root
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().id() == Some(self.anchor_id.as_str()))
            .ok_or_else(|| {
                EtlError::TableNotFound(format!("no element with id '{}'", self.anchor_id))
            })?;

        // First table after the anchor in document order
        let table = root
            .descendants()
            .skip_while(|node| node.id() != anchor.id())
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "table")
            .ok_or_else(|| {
                EtlError::TableNotFound(format!("no table follows '{}'", self.anchor_id))
            })?;

        let mut records = Vec::new();
        for (i, row) in table.select(&ROW_SELECTOR).enumerate() {
            let cells: Vec<String> = row
                .select(&CELL_SELECTOR)
                .map(|cell| cell.text().collect::<String>())
                .collect();
            match self.parse_row(i + 1, &cells) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!("Skipping row: {}", e),
            }
        }

        if records.is_empty() {
            return Err(EtlError::TableNotFound(format!(
                "table under '{}' has no data rows",
                self.anchor_id
            )));
        }

        info!("Extracted {} bank records", records.len());
        Ok(records)
    }

    /// `Ok(None)` for header/separator rows, `Err(Parse)` for malformed data rows.
    pub fn parse_row(&self, row: usize, cells: &[String]) -> Result<Option<BankRecord>> {
        let needed = MIN_DATA_CELLS.max(self.name_column.max(self.market_cap_column) + 1);
        if cells.len() < needed {
            return Ok(None);
        }

        let name = cells[self.name_column].trim();
        if name.is_empty() {
            return Err(EtlError::Parse {
                row,
                message: "empty bank name".to_string(),
            });
        }

        let market_cap = parse_market_cap(&cells[self.market_cap_column])
            .map_err(|message| EtlError::Parse { row, message })?;

        Ok(Some(BankRecord {
            name: name.to_string(),
            market_cap_usd_billion: market_cap,
        }))
    }
}

/// Parses a market-cap cell such as `"432.1B"` or `"1,024.5\n"`.
pub fn parse_market_cap(cell: &str) -> std::result::Result<f64, String> {
    let mut text = cell.trim();
    if let Some(last) = text.chars().last() {
        if !last.is_ascii_digit() {
            text = text[..text.len() - last.len_utf8()].trim_end();
        }
    }
    if !PLAIN_DECIMAL.is_match(text) {
        return Err(format!("unparseable market cap '{}'", cell.trim()));
    }
    text.replace(',', "")
        .parse::<f64>()
        .map_err(|e| format!("unparseable market cap '{}': {}", cell.trim(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    const PAGE: &str = r#"
        <html><body>
          <h2><span class="mw-headline" id="By_total_assets">By total assets</span></h2>
          <table><tr><td>Wrong Bank</td><td>1</td><td>9.9</td></tr></table>
          <h2><span class="mw-headline" id="By_market_capitalization">By market capitalization</span></h2>
          <p>Intro text</p>
          <table class="wikitable">
            <tr><th>Bank name</th><th>Rank</th><th>Market cap (US$ billion)</th></tr>
            <tr><td> JPMorgan Chase </td><td>1</td><td>432.92
</td></tr>
            <tr><td>Bank of America</td><td>2</td><td>231.52</td></tr>
            <tr><td>Broken Bank</td><td>3</td><td>n/a</td></tr>
            <tr><td>Industrial and Commercial Bank of China</td><td>4</td><td>1,194.56B</td></tr>
            <tr><td colspan="3">Source: archive</td></tr>
          </table>
          <table><tr><td>Later</td><td>9</td><td>1.0</td></tr></table>
        </body></html>
    "#;

    #[test]
    fn test_parse_document_in_row_order() {
        let extractor = TableExtractor::new("By_market_capitalization");
        let records = extractor.parse_document(PAGE).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "JPMorgan Chase",
                "Bank of America",
                "Industrial and Commercial Bank of China"
            ]
        );
        assert_eq!(records[0].market_cap_usd_billion, 432.92);
        assert_eq!(records[1].market_cap_usd_billion, 231.52);
        assert_eq!(records[2].market_cap_usd_billion, 1194.56);
    }

    #[test]
    fn test_missing_anchor_is_table_not_found() {
        let extractor = TableExtractor::new("By_market_capitalization");
        let html = "<html><body><table><tr><td>A</td><td>1</td><td>2.0</td></tr></table></body></html>";
        let err = extractor.parse_document(html).unwrap_err();
        assert!(matches!(err, EtlError::TableNotFound(_)));
    }

    #[test]
    fn test_anchor_without_following_table() {
        let extractor = TableExtractor::new("By_market_capitalization");
        let html = r#"<table><tr><td>A</td><td>1</td><td>2.0</td></tr></table>
            <span id="By_market_capitalization">x</span><p>nothing here</p>"#;
        let err = extractor.parse_document(html).unwrap_err();
        assert!(matches!(err, EtlError::TableNotFound(_)));
    }

    #[test]
    fn test_concrete_row() {
        let extractor = TableExtractor::new("anchor");
        let record = extractor
            .parse_row(1, &cells(&["Acme Bank", "", "432.1B"]))
            .unwrap()
            .unwrap();
        assert_eq!(
            record,
            BankRecord {
                name: "Acme Bank".to_string(),
                market_cap_usd_billion: 432.1,
            }
        );
    }

    #[test]
    fn test_short_rows_are_skipped_silently() {
        let extractor = TableExtractor::new("anchor");
        assert!(extractor.parse_row(1, &cells(&["Name", "Cap"])).unwrap().is_none());
        assert!(extractor.parse_row(1, &[]).unwrap().is_none());
    }

    #[test]
    fn test_custom_columns() {
        let extractor = TableExtractor::new("anchor").with_columns(1, 3);
        let record = extractor
            .parse_row(1, &cells(&["1", "Acme Bank", "x", "12.5"]))
            .unwrap()
            .unwrap();
        assert_eq!(record.name, "Acme Bank");
        assert_eq!(record.market_cap_usd_billion, 12.5);
        // Column 3 missing: treated as a non-data row
        assert!(extractor.parse_row(2, &cells(&["1", "A", "x"])).unwrap().is_none());
    }

    #[test]
    fn test_bad_rows_are_parse_errors() {
        let extractor = TableExtractor::new("anchor");
        let err = extractor.parse_row(4, &cells(&["  ", "", "1.0"])).unwrap_err();
        assert!(matches!(err, EtlError::Parse { row: 4, .. }));
        let err = extractor.parse_row(5, &cells(&["A", "", "-3.0"])).unwrap_err();
        assert!(matches!(err, EtlError::Parse { row: 5, .. }));
    }

    #[test]
    fn test_parse_market_cap() {
        assert_eq!(parse_market_cap("432.1B").unwrap(), 432.1);
        assert_eq!(parse_market_cap(" 1,024.5 \n").unwrap(), 1024.5);
        assert_eq!(parse_market_cap("77").unwrap(), 77.0);
        assert!(parse_market_cap("").is_err());
        assert!(parse_market_cap("inf").is_err());
        assert!(parse_market_cap("1e5").is_err());
        assert!(parse_market_cap("12.5BB").is_err());
    }
}
