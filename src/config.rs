// ⚙️ Configuration
// One immutable value per run, validated before any processing starts

use std::time::Duration;

use thiserror::Error;

use crate::models::API_BATCH_LIMIT;
use crate::reader::DEFAULT_CHUNK_SIZE;

pub const DEFAULT_API_URL: &str = "https://golang-assignment-968918017632.europe-west3.run.app";
pub const DEFAULT_PROJECT_KEY: &str = "meiro-data-connector-project";

/// Upper bound accepted for either age limit
pub const MAX_SENSIBLE_AGE: i64 = 150;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid MIN_AGE: {0} (must be between 0 and {limit})", limit = MAX_SENSIBLE_AGE)]
    MinAge(i64),

    #[error("Invalid MAX_AGE: {max} (must be between MIN_AGE {min} and {limit})", limit = MAX_SENSIBLE_AGE)]
    MaxAge { min: i64, max: i64 },

    #[error("Invalid BATCH_SIZE: {0} (must be between 1 and {limit})", limit = API_BATCH_LIMIT)]
    BatchSize(usize),

    #[error("Invalid CHUNK_SIZE: {0} (must be at least 1)")]
    ChunkSize(usize),

    #[error("SHOWADS_API_URL is required")]
    MissingApiUrl,

    #[error("PROJECT_KEY is required")]
    MissingProjectKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the ShowAds API
    pub api_url: String,
    pub project_key: String,
    pub min_age: i64,
    pub max_age: i64,
    /// Requests per bulk submission, capped by [`API_BATCH_LIMIT`]
    pub batch_size: usize,
    /// Retries after the first attempt, for both batch and connection retries
    pub max_retries: u32,
    /// Base delay of the exponential backoff
    pub retry_delay: Duration,
    /// Rows read from the CSV file at a time
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            project_key: DEFAULT_PROJECT_KEY.to_string(),
            min_age: 18,
            max_age: 120,
            batch_size: API_BATCH_LIMIT,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Reject settings that make no sense, naming the first offending one
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_SENSIBLE_AGE).contains(&self.min_age) {
            return Err(ConfigError::MinAge(self.min_age));
        }

        if self.max_age < self.min_age || self.max_age > MAX_SENSIBLE_AGE {
            return Err(ConfigError::MaxAge {
                min: self.min_age,
                max: self.max_age,
            });
        }

        if self.batch_size == 0 || self.batch_size > API_BATCH_LIMIT {
            return Err(ConfigError::BatchSize(self.batch_size));
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::ChunkSize(self.chunk_size));
        }

        if self.api_url.trim().is_empty() {
            return Err(ConfigError::MissingApiUrl);
        }

        if self.project_key.trim().is_empty() {
            return Err(ConfigError::MissingProjectKey);
        }

        Ok(())
    }

    /// Base URL without trailing slashes, ready for path joining
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}
