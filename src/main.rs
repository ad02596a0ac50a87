use anyhow::Context;
use banks_etl::config::Config;
use banks_etl::infra::{ReqwestFetcher, SqliteConnector};
use banks_etl::logging::{self, FileProgressLog};
use banks_etl::Pipeline;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "banks_etl")]
#[command(about = "Largest banks by market capitalization: page table to CSV and SQLite")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML config file (defaults to ./banks_etl.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read query to run after loading; repeat for several. Replaces the configured queries
    #[arg(long = "query")]
    queries: Vec<String>,
}

fn main() -> ExitCode {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();

    println!("🚀 Running largest banks ETL...");
    match run(cli) {
        Ok(()) => {
            println!("✅ ETL run completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("ETL run failed: {:#}", e);
            println!("❌ ETL run failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    info!("Using table {} in {}", config.output.table_name, config.output.db_path.display());

    let fetcher = ReqwestFetcher::new(Duration::from_secs(config.source.timeout_seconds))?;
    let connector = SqliteConnector::new(&config.output.db_path);
    let progress = FileProgressLog::new(&config.log.progress_path);

    let mut pipeline = Pipeline::new(&config, &fetcher, &connector, &progress);
    if !cli.queries.is_empty() {
        pipeline = pipeline.with_queries(cli.queries);
    }
    let report = pipeline.run()?;

    for output in &report.query_outputs {
        println!("\n{}", output.query);
        print!("{}", output.result);
    }

    if !report.query_failures.is_empty() {
        warn!("{} queries failed", report.query_failures.len());
        println!("\n⚠️  Queries failed:");
        for failure in &report.query_failures {
            println!("   - {}: {}", failure.query, failure.error);
        }
    }

    println!("\n📊 Run summary:");
    println!("   Banks: {}", report.records.len());
    println!("   CSV file: {}", report.csv_path.display());
    println!("   Table: {}", report.table_name);
    println!("   Queries run: {}", report.query_outputs.len());
    Ok(())
}
