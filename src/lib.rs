// ShowAds Data Connector - Core Library
// Exposes all modules for use in the CLI and tests

pub mod config;
pub mod models;
pub mod validator;   // Record Validator - raw row → Customer
pub mod reader;      // Streaming Chunk Reader
pub mod processor;   // CSV Processing Pipeline + statistics
pub mod transport;   // HTTP seam with connection-level retry
pub mod client;      // Authenticated ShowAds API client
pub mod dispatcher;  // Batch Orchestrator
pub mod connector;   // One run end to end

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use models::{
    AuthRequest, AuthResponse, BannerRequest, BulkBannerRequest, Customer,
    API_BATCH_LIMIT,
};
pub use validator::{RawRecord, RecordValidator, Rejection};
pub use reader::{ChunkReader, ReadError, DEFAULT_CHUNK_SIZE};
pub use processor::{
    customers_to_banner_requests, CsvProcessor, CustomerChunks,
    ProcessingStatistics, StatisticsReport,
};
pub use transport::{HttpResponse, HttpTransport, Transport, TransportError};
pub use client::{AuthToken, ShowAdsClient};
pub use dispatcher::{
    batches, effective_batch_size, BatchDispatcher, BulkSink, Sleeper, ThreadSleeper,
};
pub use connector::{DataConnector, RunReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
