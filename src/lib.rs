//! Largest-banks ETL: extracts the market-capitalization table from an
//! archived page, converts it into several currencies and loads it into a
//! CSV file and a SQLite table.

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod infra;
pub mod logging;
pub mod pipeline;
pub mod types;

pub use error::{EtlError, FailureKind, Result};
pub use pipeline::{Pipeline, PipelineFailure, PipelineStage, RunReport};
pub use types::{BankRecord, Currency, EnrichedBankRecord};
