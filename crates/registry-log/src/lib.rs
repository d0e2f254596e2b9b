//! Append-only record log backing the stream registry.
//!
//! # Purpose
//! Defines the durability contract the registry's entity store replays on startup:
//! keyed records are appended in order, deletes are written as tombstones, and the
//! whole log can be read back sequentially from the earliest retained offset.
//!
//! # Implementations
//! - [`MemoryLog`]: process-local, used by tests and ephemeral deployments.
//! - [`FileLog`]: a single framed, checksummed file for durable single-node use.
//!
//! # Key invariants
//! - Offsets are dense, start at zero, and increase by one per record.
//! - Records are never rewritten; a tombstone is an ordinary record with no value.
//!
//! # Examples
//! ```
//! use bytes::Bytes;
//! use registry_log::{AppendOnlyLog, MemoryLog, ReadRange};
//!
//! let log = MemoryLog::new();
//! let rt = tokio::runtime::Runtime::new().expect("rt");
//! rt.block_on(async {
//!     let offset = log
//!         .append(Bytes::from_static(b"k"), Some(Bytes::from_static(b"v")))
//!         .await
//!         .expect("append");
//!     assert_eq!(offset, 0);
//!     let records = log.read_range(ReadRange::from_start(16)).await.expect("read");
//!     assert_eq!(records.len(), 1);
//! });
//! ```
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

mod file;
mod frame;
mod memory;

pub use file::{FileLog, FsyncMode};
pub use frame::{FLAG_TOMBSTONE, MAGIC, RecordHeader, VERSION};
pub use memory::MemoryLog;

pub type Offset = u64;
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type Result<T> = std::result::Result<T, LogError>;

#[derive(thiserror::Error, Debug)]
pub enum LogError {
    #[error("log is closed")]
    Closed,
    #[error("invalid record magic")]
    InvalidMagic,
    #[error("unsupported record version {0}")]
    UnsupportedVersion(u16),
    #[error("incomplete record")]
    Incomplete,
    #[error("record checksum mismatch")]
    ChecksumMismatch,
    #[error("record header checksum mismatch")]
    HeaderChecksumMismatch,
    #[error("record too large")]
    RecordTooLarge,
    #[error("corrupt record at offset {offset}: {reason}")]
    Corruption { offset: Offset, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single keyed record as stored in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub offset: Offset,
    pub key: Bytes,
    /// `None` marks a tombstone.
    pub value: Option<Bytes>,
}

impl LogRecord {
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRange {
    pub start: Offset,
    pub max_records: usize,
}

impl ReadRange {
    pub fn from_start(max_records: usize) -> Self {
        Self {
            start: 0,
            max_records,
        }
    }
}

pub trait AppendOnlyLog: Send + Sync {
    /// Append a record and return the offset it was assigned.
    fn append(&self, key: Bytes, value: Option<Bytes>) -> BoxFuture<'_, Result<Offset>>;
    /// Read up to `max_records` records starting at `start`, in offset order.
    fn read_range(&self, range: ReadRange) -> BoxFuture<'_, Result<Vec<LogRecord>>>;
    /// Offset of the oldest retained record.
    fn earliest_offset(&self) -> BoxFuture<'_, Result<Offset>>;
    /// Offset the next append will be assigned.
    fn tail_offset(&self) -> BoxFuture<'_, Result<Offset>>;
    fn backend_name(&self) -> &'static str;
}
