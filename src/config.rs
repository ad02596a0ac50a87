use crate::constants::*;
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::env::{self, VarError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub rates: RatesConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub anchor_id: String,
    pub name_column: usize,
    pub market_cap_column: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub progress_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            rates: RatesConfig::default(),
            output: OutputConfig::default(),
            log: LogConfig::default(),
            queries: DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            anchor_id: DEFAULT_ANCHOR_ID.to_string(),
            name_column: DEFAULT_NAME_COLUMN,
            market_cap_column: DEFAULT_MARKET_CAP_COLUMN,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_RATES_PATH),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            progress_path: PathBuf::from(DEFAULT_PROGRESS_LOG_PATH),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from `banks_etl.toml` when present,
    /// then applies environment overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(url) = env_override(ENV_URL)? {
            self.source.url = url;
        }
        if let Some(path) = env_override(ENV_RATES_PATH)? {
            self.rates.path = PathBuf::from(path);
        }
        if let Some(path) = env_override(ENV_CSV_PATH)? {
            self.output.csv_path = PathBuf::from(path);
        }
        if let Some(path) = env_override(ENV_DB_PATH)? {
            self.output.db_path = PathBuf::from(path);
        }
        if let Some(table) = env_override(ENV_TABLE)? {
            self.output.table_name = table;
        }
        if let Some(path) = env_override(ENV_LOG_PATH)? {
            self.log.progress_path = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(EtlError::Config("source.url must not be empty".to_string()));
        }
        if self.source.anchor_id.trim().is_empty() {
            return Err(EtlError::Config("source.anchor_id must not be empty".to_string()));
        }
        if self.source.name_column == self.source.market_cap_column {
            return Err(EtlError::Config(
                "source.name_column and source.market_cap_column must differ".to_string(),
            ));
        }
        if !is_plain_identifier(&self.output.table_name) {
            return Err(EtlError::Config(format!(
                "output.table_name '{}' is not a plain SQL identifier",
                self.output.table_name
            )));
        }
        Ok(())
    }

    /// Configured queries with the table placeholder filled in.
    pub fn resolved_queries(&self) -> Vec<String> {
        self.queries
            .iter()
            .map(|q| q.replace(TABLE_PLACEHOLDER, &self.output.table_name))
            .collect()
    }
}

fn env_override(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
        Ok(_) | Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
