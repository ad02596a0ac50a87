/// Default run values. Every one of these can be overridden through `Config`.

// Archived snapshot of the largest-banks page
pub const DEFAULT_SOURCE_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";
pub const DEFAULT_ANCHOR_ID: &str = "By_market_capitalization";
pub const DEFAULT_NAME_COLUMN: usize = 0;
pub const DEFAULT_MARKET_CAP_COLUMN: usize = 2;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub const DEFAULT_RATES_PATH: &str = "./exchange_rate.csv";
pub const DEFAULT_CSV_PATH: &str = "./Largest_banks_data.csv";
pub const DEFAULT_DB_PATH: &str = "./Banks.db";
pub const DEFAULT_TABLE_NAME: &str = "Largest_banks";
pub const DEFAULT_PROGRESS_LOG_PATH: &str = "./code_log.txt";
pub const DEFAULT_CONFIG_FILE: &str = "banks_etl.toml";

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Placeholder in configured queries that is replaced by the table name.
pub const TABLE_PLACEHOLDER: &str = "{table}";

pub const DEFAULT_QUERIES: [&str; 3] = [
    "SELECT * FROM {table}",
    "SELECT AVG(MC_GBP_Million) FROM {table}",
    "SELECT Name FROM {table} LIMIT 5",
];

// Persisted column names, in output order
pub const COL_NAME: &str = "Name";
pub const COL_USD_BILLION: &str = "MC_USD_Billion";
pub const COL_USD_MILLION: &str = "MC_USD_Million";
pub const COL_GBP_MILLION: &str = "MC_GBP_Million";
pub const COL_EUR_MILLION: &str = "MC_EUR_Million";
pub const COL_INR_MILLION: &str = "MC_INR_Million";

pub const OUTPUT_COLUMNS: [&str; 6] = [
    COL_NAME,
    COL_USD_BILLION,
    COL_USD_MILLION,
    COL_GBP_MILLION,
    COL_EUR_MILLION,
    COL_INR_MILLION,
];

// Environment overrides, applied after the config file
pub const ENV_URL: &str = "BANKS_ETL_URL";
pub const ENV_RATES_PATH: &str = "BANKS_ETL_RATES_PATH";
pub const ENV_CSV_PATH: &str = "BANKS_ETL_CSV_PATH";
pub const ENV_DB_PATH: &str = "BANKS_ETL_DB_PATH";
pub const ENV_TABLE: &str = "BANKS_ETL_TABLE";
pub const ENV_LOG_PATH: &str = "BANKS_ETL_LOG_PATH";
