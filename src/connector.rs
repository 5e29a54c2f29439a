// 🔌 Data Connector - one CSV file → ShowAds API
// Wires processor, client and dispatcher together for a single run

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::client::ShowAdsClient;
use crate::config::Config;
use crate::dispatcher::{BatchDispatcher, Sleeper, ThreadSleeper};
use crate::processor::{customers_to_banner_requests, CsvProcessor, ProcessingStatistics};
use crate::transport::{HttpTransport, Transport};

// ============================================================================
// RUN REPORT
// ============================================================================

#[derive(Debug, Clone)]
pub struct RunReport {
    pub statistics: ProcessingStatistics,
    /// Banner requests in chunks that were fully accepted
    pub sent: u64,
    /// Banner requests in chunks that failed to send
    pub failed: u64,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

// ============================================================================
// DATA CONNECTOR
// ============================================================================

pub struct DataConnector<T: Transport, S: Sleeper> {
    processor: CsvProcessor,
    client: ShowAdsClient<T>,
    dispatcher: BatchDispatcher<S>,
}

impl DataConnector<HttpTransport, ThreadSleeper> {
    /// Production stack: HTTP transport and real sleeps
    pub fn new(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.max_retries, config.retry_delay)
            .context("Failed to build HTTP client")?;

        Self::with_parts(config, transport, ThreadSleeper)
    }
}

impl<T: Transport, S: Sleeper> DataConnector<T, S> {
    pub fn with_parts(config: &Config, transport: T, sleeper: S) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        info!("Configuration validation successful");

        Ok(DataConnector {
            processor: CsvProcessor::new(config),
            client: ShowAdsClient::new(config, transport),
            dispatcher: BatchDispatcher::with_sleeper(config, sleeper),
        })
    }

    /// Process one file end to end
    ///
    /// A chunk that fails to send is counted in `failed` and processing moves
    /// on to the next chunk. File-level errors are returned as `Err`. The API
    /// client is closed before this returns, whatever the outcome.
    pub fn process_file(self, csv_path: &Path) -> Result<RunReport> {
        let DataConnector {
            mut processor,
            mut client,
            dispatcher,
        } = self;

        info!("Starting data connector process for file: {}", csv_path.display());
        let start = Instant::now();

        let outcome = send_file(&mut processor, &mut client, &dispatcher, csv_path);
        client.close();

        let (sent, failed) = outcome.map_err(|e| {
            error!("Error in data connector process: {:#}", e);
            e
        })?;

        let report = RunReport {
            statistics: *processor.statistics(),
            sent,
            failed,
            elapsed: start.elapsed(),
        };

        info!(
            "Data connector process completed in {:.2} seconds",
            report.elapsed.as_secs_f64()
        );
        match serde_json::to_string(&report.statistics.report()) {
            Ok(json) => info!("Processing statistics: {}", json),
            Err(_) => info!("Processing statistics: {}", report.statistics.summary()),
        }
        info!("API submission: Sent: {}, Failed: {}", report.sent, report.failed);

        Ok(report)
    }
}

fn send_file<T: Transport, S: Sleeper>(
    processor: &mut CsvProcessor,
    client: &mut ShowAdsClient<T>,
    dispatcher: &BatchDispatcher<S>,
    csv_path: &Path,
) -> Result<(u64, u64)> {
    let mut sent = 0u64;
    let mut failed = 0u64;

    let chunks = processor
        .process_file(csv_path)
        .with_context(|| format!("Failed to process CSV file {}", csv_path.display()))?;

    for chunk in chunks {
        let customers =
            chunk.with_context(|| format!("Failed to read CSV file {}", csv_path.display()))?;
        let requests = customers_to_banner_requests(&customers);
        let count = requests.len() as u64;

        if dispatcher.dispatch(client, &requests) {
            sent += count;
            info!("Successfully sent {} banner requests", count);
        } else {
            failed += count;
            error!("Failed to send {} banner requests", count);
        }
    }

    Ok((sent, failed))
}

// ============================================================================
// TESTS
// ============================================================================
