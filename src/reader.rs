// 📂 Streaming Chunk Reader
// Reads a customer CSV incrementally, a bounded number of rows at a time

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::validator::RawRecord;

/// Rows per chunk when the caller does not choose
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

// ============================================================================
// ERRORS
// ============================================================================

/// File-level failures; any of these aborts processing of the file
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("CSV file not found: {0}")]
    NotFound(PathBuf),

    #[error("CSV file is empty: {0}")]
    Empty(PathBuf),

    #[error("Malformed CSV file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Error reading CSV file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

/// Header positions of the columns we care about
#[derive(Debug, Clone, Copy, Default)]
struct ColumnLayout {
    name: Option<usize>,
    age: Option<usize>,
    cookie: Option<usize>,
    banner_id: Option<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &ByteRecord) -> Self {
        let position = |wanted: &str| {
            headers
                .iter()
                .position(|h| String::from_utf8_lossy(h).trim() == wanted)
        };

        ColumnLayout {
            name: position("Name"),
            age: position("Age"),
            cookie: position("Cookie"),
            banner_id: position("Banner_id"),
        }
    }

    fn extract(&self, record: &ByteRecord, line: u64) -> RawRecord {
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .filter(|value| !value.is_empty())
        };

        RawRecord {
            line,
            name: cell(self.name),
            age: cell(self.age),
            cookie: cell(self.cookie),
            banner_id: cell(self.banner_id),
        }
    }
}

// ============================================================================
// CHUNK READER
// ============================================================================

/// ChunkReader - lazy, single-pass iterator over row chunks
///
/// Each item holds at most `chunk_size` rows in file order. After an error
/// is yielded the iterator is exhausted.
pub struct ChunkReader {
    path: PathBuf,
    reader: csv::Reader<File>,
    layout: ColumnLayout,
    chunk_size: usize,
    lines_read: u64,
    chunks_read: usize,
    done: bool,
}

impl ChunkReader {
    /// Open a CSV file and read its header row
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, ReadError> {
        info!("Starting to read CSV file: {}", path.display());

        let file = File::open(path).map_err(|e| {
            let err = if e.kind() == io::ErrorKind::NotFound {
                ReadError::NotFound(path.to_path_buf())
            } else {
                ReadError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            };
            error!("{}", err);
            err
        })?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers = reader
            .byte_headers()
            .map_err(|e| {
                let err = ReadError::Malformed {
                    path: path.to_path_buf(),
                    source: e,
                };
                error!("{}", err);
                err
            })?
            .clone();

        if headers.is_empty() {
            let err = ReadError::Empty(path.to_path_buf());
            error!("{}", err);
            return Err(err);
        }

        Ok(ChunkReader {
            path: path.to_path_buf(),
            reader,
            layout: ColumnLayout::from_headers(&headers),
            chunk_size: chunk_size.max(1),
            lines_read: 0,
            chunks_read: 0,
            done: false,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn read_chunk(&mut self) -> Result<Vec<RawRecord>, ReadError> {
        let mut rows = Vec::with_capacity(self.chunk_size.min(DEFAULT_CHUNK_SIZE));
        let mut record = ByteRecord::new();

        while rows.len() < self.chunk_size {
            let more = self
                .reader
                .read_byte_record(&mut record)
                .map_err(|e| ReadError::Malformed {
                    path: self.path.clone(),
                    source: e,
                })?;

            if !more {
                break;
            }

            // Blank lines are skipped by the csv crate; a lone empty field is not a row either
            if record.len() == 1 && record.get(0).map_or(true, |f| f.is_empty()) {
                continue;
            }

            self.lines_read += 1;
            rows.push(self.layout.extract(&record, self.lines_read));
        }

        Ok(rows)
    }
}

impl Iterator for ChunkReader {
    type Item = Result<Vec<RawRecord>, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_chunk() {
            Ok(rows) if rows.is_empty() => {
                self.done = true;
                None
            }
            Ok(rows) => {
                self.chunks_read += 1;
                debug!(
                    "Processing chunk {} with {} rows",
                    self.chunks_read,
                    rows.len()
                );
                Some(Ok(rows))
            }
            Err(e) => {
                error!("{}", e);
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
