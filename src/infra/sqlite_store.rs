use crate::app::ports::{QueryResult, SqlValue, StoreConnector, TableStore};
use crate::config::is_plain_identifier;
use crate::constants::*;
use crate::error::{EtlError, Result};
use crate::types::EnrichedBankRecord;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| store_error("create directory", e))?;
            }
        }
        let conn = Connection::open(path).map_err(|e| store_error("open database", e))?;
        info!("Opened SQLite database at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| store_error("open database", e))?;
        Ok(Self { conn })
    }
}

impl TableStore for SqliteStore {
    fn replace_table(&mut self, table: &str, records: &[EnrichedBankRecord]) -> Result<()> {
        if !is_plain_identifier(table) {
            return Err(EtlError::Store(format!("invalid table name '{table}'")));
        }

        let tx = self
            .conn
            .transaction()
            .map_err(|e| store_error("begin transaction", e))?;
        tx.execute_batch(&format!(
            r#"
            DROP TABLE IF EXISTS "{table}";
            CREATE TABLE "{table}" (
                {COL_NAME}        TEXT NOT NULL,
                {COL_USD_BILLION} REAL NOT NULL,
                {COL_USD_MILLION} REAL NOT NULL,
                {COL_GBP_MILLION} REAL NOT NULL,
                {COL_EUR_MILLION} REAL NOT NULL,
                {COL_INR_MILLION} REAL NOT NULL
            );
            "#
        ))
        .map_err(|e| store_error("recreate table", e))?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    r#"INSERT INTO "{table}" ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                    OUTPUT_COLUMNS.join(", ")
                ))
                .map_err(|e| store_error("prepare insert", e))?;
            for r in records {
                stmt.execute(params![
                    r.name,
                    r.market_cap_usd_billion,
                    r.market_cap_usd_million,
                    r.market_cap_gbp_million,
                    r.market_cap_eur_million,
                    r.market_cap_inr_million,
                ])
                .map_err(|e| store_error("insert row", e))?;
            }
        }
        tx.commit().map_err(|e| store_error("commit", e))?;
        debug!("Replaced table {} with {} rows", table, records.len());
        Ok(())
    }

    fn query(&self, sql: &str) -> Result<QueryResult> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| EtlError::Query(e.to_string()))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(to_sql_value))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(|e| EtlError::Query(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| EtlError::Query(e.to_string()))?;

        Ok(QueryResult { columns, rows })
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| store_error("close connection", e))
    }
}

fn to_sql_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Integer(v),
        ValueRef::Real(v) => SqlValue::Real(v),
        ValueRef::Text(v) => SqlValue::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => SqlValue::Blob(v.to_vec()),
    }
}

fn store_error(action: &str, err: impl std::fmt::Display) -> EtlError {
    EtlError::Store(format!("failed to {action}: {err}"))
}

/// Opens a file-backed SQLite store on demand.
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl StoreConnector for SqliteConnector {
    fn connect(&self) -> Result<Box<dyn TableStore>> {
        Ok(Box::new(SqliteStore::open(&self.path)?))
    }
}
