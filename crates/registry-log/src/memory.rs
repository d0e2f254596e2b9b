// Process-local log used by tests and ephemeral deployments.
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::{AppendOnlyLog, BoxFuture, LogError, LogRecord, Offset, ReadRange, Result};

/// In-memory append-only log.
///
/// Not durable: records live as long as the value. `close()` makes every later call
/// fail with [`LogError::Closed`], which lets callers exercise unavailable-log paths.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: RwLock<Vec<LogRecord>>,
    closed: AtomicBool,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LogError::Closed);
        }
        Ok(())
    }
}

impl AppendOnlyLog for MemoryLog {
    fn append(&self, key: Bytes, value: Option<Bytes>) -> BoxFuture<'_, Result<Offset>> {
        Box::pin(async move {
            self.ensure_open()?;
            let mut records = self.records.write().await;
            let offset = records.len() as Offset;
            records.push(LogRecord { offset, key, value });
            Ok(offset)
        })
    }

    fn read_range(&self, range: ReadRange) -> BoxFuture<'_, Result<Vec<LogRecord>>> {
        Box::pin(async move {
            self.ensure_open()?;
            let records = self.records.read().await;
            Ok(records
                .iter()
                .skip(range.start as usize)
                .take(range.max_records)
                .cloned()
                .collect())
        })
    }

    fn earliest_offset(&self) -> BoxFuture<'_, Result<Offset>> {
        Box::pin(async move {
            self.ensure_open()?;
            Ok(0)
        })
    }

    fn tail_offset(&self) -> BoxFuture<'_, Result<Offset>> {
        Box::pin(async move {
            self.ensure_open()?;
            Ok(self.records.read().await.len() as Offset)
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
