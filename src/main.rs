use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use showads_connector::config::{DEFAULT_API_URL, DEFAULT_PROJECT_KEY};
use showads_connector::{Config, DataConnector, DEFAULT_CHUNK_SIZE, VERSION};

/// Validate a customer CSV and submit banner requests to the ShowAds API
#[derive(Parser, Debug)]
#[command(name = "showads-connector")]
#[command(version)]
struct Cli {
    /// CSV file with Name, Age, Cookie and Banner_id columns
    csv_file: PathBuf,

    /// Base URL of the ShowAds API
    #[arg(long, env = "SHOWADS_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Project key exchanged for an access token
    #[arg(long, env = "PROJECT_KEY", default_value = DEFAULT_PROJECT_KEY)]
    project_key: String,

    /// Youngest accepted customer age
    #[arg(long, env = "MIN_AGE", default_value_t = 18, allow_hyphen_values = true)]
    min_age: i64,

    /// Oldest accepted customer age
    #[arg(long, env = "MAX_AGE", default_value_t = 120, allow_hyphen_values = true)]
    max_age: i64,

    /// Banner requests per bulk call (1-1000)
    #[arg(long, env = "BATCH_SIZE", default_value_t = 1000)]
    batch_size: usize,

    /// Retries after a failed attempt
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Base delay in seconds for exponential backoff
    #[arg(long, env = "RETRY_DELAY", default_value_t = 1)]
    retry_delay: u64,

    /// Rows read from the CSV file at a time
    #[arg(long, env = "CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            api_url: self.api_url.clone(),
            project_key: self.project_key.clone(),
            min_age: self.min_age,
            max_age: self.max_age,
            batch_size: self.batch_size,
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay),
            chunk_size: self.chunk_size,
        }
    }
}

fn setup_logging(log_level: &str) {
    let level = log_level.to_lowercase();
    let filter = EnvFilter::try_new(format!("{},reqwest=warn,hyper=warn", level))
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn main() -> ExitCode {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    info!("ShowAds data connector v{}", VERSION);

    let config = cli.config();
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return ExitCode::from(2);
    }

    match run(&config, &cli.csv_file) {
        Ok(true) => {
            info!("Data connector process completed successfully");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            error!("Data connector process finished with failed submissions");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Data connector process failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, csv_file: &Path) -> Result<bool> {
    let connector = DataConnector::new(config)?;
    let report = connector.process_file(csv_file)?;

    info!(
        "Records: {} | Sent: {} | Failed: {}",
        report.statistics.summary(),
        report.sent,
        report.failed
    );

    Ok(report.success())
}
