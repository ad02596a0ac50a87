use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("row {row}: {message}")]
    Parse { row: usize, message: String },

    #[error("exchange rate unavailable: {0}")]
    MissingRate(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Failure taxonomy used in progress-log entries and run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    FetchError,
    TableNotFound,
    ParseError,
    MissingRate,
    IoError,
    StoreError,
    QueryError,
    ConfigError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::FetchError => "FetchError",
            FailureKind::TableNotFound => "TableNotFound",
            FailureKind::ParseError => "ParseError",
            FailureKind::MissingRate => "MissingRate",
            FailureKind::IoError => "IOError",
            FailureKind::StoreError => "StoreError",
            FailureKind::QueryError => "QueryError",
            FailureKind::ConfigError => "ConfigError",
        };
        f.write_str(name)
    }
}

impl EtlError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EtlError::Fetch { .. } => FailureKind::FetchError,
            EtlError::TableNotFound(_) => FailureKind::TableNotFound,
            EtlError::Parse { .. } => FailureKind::ParseError,
            EtlError::MissingRate(_) => FailureKind::MissingRate,
            EtlError::Io(_) => FailureKind::IoError,
            EtlError::Store(_) => FailureKind::StoreError,
            EtlError::Query(_) => FailureKind::QueryError,
            EtlError::Config(_) => FailureKind::ConfigError,
        }
    }

    /// Row-level parse errors and query errors never halt a run.
    pub fn is_stage_fatal(&self) -> bool {
        !matches!(self, EtlError::Parse { .. } | EtlError::Query(_))
    }
}

impl From<toml::de::Error> for EtlError {
    fn from(err: toml::de::Error) -> Self {
        EtlError::Config(err.to_string())
    }
}

impl From<std::env::VarError> for EtlError {
    fn from(err: std::env::VarError) -> Self {
        EtlError::Config(format!("environment variable error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
