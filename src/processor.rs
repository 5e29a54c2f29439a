// 🔄 CSV Processing Pipeline
// Drives the chunk reader, validates every row and keeps pass/fail counters

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{BannerRequest, Customer};
use crate::reader::{ChunkReader, ReadError};
use crate::validator::{RawRecord, RecordValidator};

// ============================================================================
// PROCESSING STATISTICS
// ============================================================================

/// Counters for one pass over a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingStatistics {
    pub total_count: u64,
    pub invalid_count: u64,
}

impl ProcessingStatistics {
    pub fn valid_count(&self) -> u64 {
        self.total_count - self.invalid_count
    }

    /// Percentage of valid rows; 0 when nothing was read
    pub fn success_rate(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.valid_count() as f64 / self.total_count as f64 * 100.0
        }
    }

    pub fn report(&self) -> StatisticsReport {
        StatisticsReport {
            total_records: self.total_count,
            valid_records: self.valid_count(),
            invalid_records: self.invalid_count,
            validation_success_rate: self.success_rate(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Valid: {}, Invalid: {} ({:.1}% valid)",
            self.total_count,
            self.valid_count(),
            self.invalid_count,
            self.success_rate()
        )
    }

    fn record(&mut self, valid: bool) {
        self.total_count += 1;
        if !valid {
            self.invalid_count += 1;
        }
    }
}

/// Serializable view of [`ProcessingStatistics`] for structured logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub total_records: u64,
    pub valid_records: u64,
    pub invalid_records: u64,
    pub validation_success_rate: f64,
}

// ============================================================================
// CSV PROCESSOR
// ============================================================================

pub struct CsvProcessor {
    validator: RecordValidator,
    chunk_size: usize,
    statistics: ProcessingStatistics,
}

impl CsvProcessor {
    pub fn new(config: &Config) -> Self {
        CsvProcessor {
            validator: RecordValidator::new(config.min_age, config.max_age),
            chunk_size: config.chunk_size,
            statistics: ProcessingStatistics::default(),
        }
    }

    /// Start a single forward pass over `path`
    ///
    /// Statistics are reset here and are complete once the returned iterator
    /// is exhausted. Only chunks with at least one valid customer are yielded.
    pub fn process_file(&mut self, path: &Path) -> Result<CustomerChunks<'_>, ReadError> {
        info!("Starting CSV processing for file: {}", path.display());

        self.statistics = ProcessingStatistics::default();
        let reader = ChunkReader::open(path, self.chunk_size)?;

        Ok(CustomerChunks {
            reader,
            validator: &self.validator,
            statistics: &mut self.statistics,
            finished: false,
        })
    }

    /// Validate one chunk of rows, updating the counters
    pub fn process_chunk(&mut self, rows: &[RawRecord]) -> Vec<Customer> {
        validate_rows(&self.validator, &mut self.statistics, rows)
    }

    pub fn statistics(&self) -> &ProcessingStatistics {
        &self.statistics
    }
}

/// 1:1 projection of customers into banner requests, order preserved
pub fn customers_to_banner_requests(customers: &[Customer]) -> Vec<BannerRequest> {
    customers.iter().map(BannerRequest::from).collect()
}

fn validate_rows(
    validator: &RecordValidator,
    statistics: &mut ProcessingStatistics,
    rows: &[RawRecord],
) -> Vec<Customer> {
    let mut valid = Vec::with_capacity(rows.len());

    for row in rows {
        match validator.validate(row) {
            Ok(customer) => {
                statistics.record(true);
                valid.push(customer);
            }
            Err(rejection) => {
                statistics.record(false);
                warn!(
                    "Invalid customer data at line {} - {} - Error: {}",
                    row.line,
                    row.describe(),
                    rejection
                );
            }
        }
    }

    valid
}

// ============================================================================
// CUSTOMER CHUNKS
// ============================================================================

/// Iterator over validated customer chunks of one file
pub struct CustomerChunks<'a> {
    reader: ChunkReader,
    validator: &'a RecordValidator,
    statistics: &'a mut ProcessingStatistics,
    finished: bool,
}

impl CustomerChunks<'_> {
    pub fn statistics(&self) -> &ProcessingStatistics {
        &*self.statistics
    }

    fn log_completion(&self) {
        info!("CSV processing completed. {}", self.statistics.summary());

        if self.statistics.invalid_count > 0 {
            warn!(
                "Skipped {} invalid records. Check logs for validation errors.",
                self.statistics.invalid_count
            );
        }
    }
}

impl Iterator for CustomerChunks<'_> {
    type Item = Result<Vec<Customer>, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.reader.next() {
                None => {
                    self.finished = true;
                    self.log_completion();
                    return None;
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                Some(Ok(rows)) => {
                    let valid = validate_rows(self.validator, self.statistics, &rows);
                    if valid.is_empty() {
                        debug!("Chunk of {} rows had no valid customers, skipping", rows.len());
                        continue;
                    }

                    debug!("Processed chunk: {} valid customers", valid.len());
                    return Some(Ok(valid));
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const COOKIE: &str = "26555324-53df-4eb1-8835-e6c0078bb2c0";

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn processor(chunk_size: usize) -> CsvProcessor {
        let config = Config {
            chunk_size,
            ..Config::default()
        };
        CsvProcessor::new(&config)
    }

    fn raw(name: &str, age: &str, banner_id: &str) -> RawRecord {
        RawRecord {
            line: 1,
            name: Some(name.to_string()),
            age: Some(age.to_string()),
            cookie: Some(COOKIE.to_string()),
            banner_id: Some(banner_id.to_string()),
        }
    }

    #[test]
    fn test_chunk_with_one_invalid_name() {
        let mut processor = processor(100);
        let rows = vec![
            raw("John Doe", "25", "1"),
            raw("Jane123", "30", "2"),
            raw("Bob Smith", "40", "3"),
        ];

        let customers = processor.process_chunk(&rows);

        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].name, "John Doe");
        assert_eq!(customers[1].name, "Bob Smith");
        assert_eq!(processor.statistics().total_count, 3);
        assert_eq!(processor.statistics().invalid_count, 1);
    }

    #[test]
    fn test_each_single_rule_violation_counts_once() {
        let cases = vec![
            raw("B4d", "25", "1"),
            raw("Good Name", "17", "1"),
            raw("Good Name", "25", "100"),
            RawRecord {
                cookie: Some("xyz".to_string()),
                ..raw("Good Name", "25", "1")
            },
        ];

        for case in cases {
            let mut processor = processor(100);
            let customers = processor.process_chunk(std::slice::from_ref(&case));

            assert!(customers.is_empty());
            assert_eq!(processor.statistics().total_count, 1);
            assert_eq!(processor.statistics().invalid_count, 1);
        }
    }

    #[test]
    fn test_process_file_skips_chunks_without_valid_rows() {
        let file = csv_file(&format!(
            "Name,Age,Cookie,Banner_id\n\
             Bad1,25,{c},1\n\
             Bad2,25,{c},1\n\
             Alice,25,{c},1\n\
             Bob,26,{c},2\n\
             Carol,27,{c},3\n",
            c = COOKIE
        ));
        let mut processor = processor(2);

        let chunks: Vec<Vec<Customer>> = processor
            .process_file(file.path())
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect();

        // First chunk holds only invalid rows and is not yielded
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
        assert_eq!(chunks[0][0].name, "Alice");

        let stats = processor.statistics();
        assert_eq!(stats.total_count, 5);
        assert_eq!(stats.invalid_count, 2);
        assert_eq!(stats.valid_count() + stats.invalid_count, stats.total_count);
    }

    #[test]
    fn test_running_statistics_while_iterating() {
        let file = csv_file(&format!(
            "Name,Age,Cookie,Banner_id\n\
             Alice,25,{c},1\n\
             Bad1,25,{c},1\n\
             Bob,26,{c},2\n",
            c = COOKIE
        ));
        let mut processor = processor(2);
        let mut chunks = processor.process_file(file.path()).unwrap();

        let first = chunks.next().unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(chunks.statistics().total_count, 2);
        assert_eq!(chunks.statistics().invalid_count, 1);

        assert_eq!(chunks.next().unwrap().unwrap().len(), 1);
        assert!(chunks.next().is_none());
        assert_eq!(chunks.statistics().total_count, 3);
    }

    #[test]
    fn test_statistics_reset_between_files() {
        let file = csv_file(&format!("Name,Age,Cookie,Banner_id\nAlice,25,{},1\n", COOKIE));
        let mut processor = processor(10);

        for _ in 0..2 {
            let count = processor.process_file(file.path()).unwrap().count();
            assert_eq!(count, 1);
        }

        assert_eq!(processor.statistics().total_count, 1);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let mut processor = processor(10);
        let result = processor.process_file(Path::new("/no/such/customers.csv"));

        assert!(matches!(result, Err(ReadError::NotFound(_))));
    }

    #[test]
    fn test_customers_to_banner_requests_preserves_order() {
        let customers = vec![
            Customer::new("Ann", 30, COOKIE, 5).unwrap(),
            Customer::new("Ben", 31, "2655532453df4eb18835e6c0078bb2c0", 9).unwrap(),
        ];

        let requests = customers_to_banner_requests(&customers);

        assert_eq!(requests.len(), 2);
        for (customer, request) in customers.iter().zip(&requests) {
            assert_eq!(request.visitor_cookie, customer.cookie);
            assert_eq!(request.banner_id, customer.banner_id);
        }
    }

    #[test]
    fn test_statistics_report() {
        let stats = ProcessingStatistics {
            total_count: 4,
            invalid_count: 1,
        };
        let report = stats.report();

        assert_eq!(report.total_records, 4);
        assert_eq!(report.valid_records, 3);
        assert_eq!(report.invalid_records, 1);
        assert_eq!(report.validation_success_rate, 75.0);
        assert!(stats.summary().contains("Valid: 3"));
    }

    #[test]
    fn test_success_rate_without_rows() {
        let stats = ProcessingStatistics::default();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.report().validation_success_rate, 0.0);
    }
}
