//! Entity store module.
//!
//! # Purpose
//! Shared types for the log-backed entity store: configuration, the readiness state exposed
//! to health checks, change-feed payloads, and the store error type.
use registry_log::{LogError, Offset};
use serde::Serialize;
use thiserror::Error;

use crate::model::{AnyEntity, TaggedKey};

mod entity_store;

pub use entity_store::EntityStore;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Max number of changes returned per `changes()` call.
    pub changes_limit: u64,
    /// Number of changes retained in memory for incremental consumers.
    pub change_retention: Option<u64>,
    /// Records read per page while replaying the log.
    pub replay_batch: usize,
}

impl StoreConfig {
    pub fn change_window(&self) -> usize {
        self.change_retention
            .unwrap_or(self.changes_limit)
            .max(self.changes_limit) as usize
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            changes_limit: 500,
            change_retention: Some(10_000),
            replay_batch: 1024,
        }
    }
}

/// Replay progress of the store, published through the readiness gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Readiness {
    Replaying,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ChangeSet<T> {
    pub items: Vec<T>,
    pub next_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityChangeOp {
    Upserted,
    Deleted,
}

/// One applied log record. `seq` is the record's log offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityChange {
    pub seq: Offset,
    pub op: EntityChangeOp,
    pub key: TaggedKey,
    pub entity: Option<AnyEntity>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is not ready: {0}")]
    NotReady(String),
    #[error("log error: {0}")]
    Log(#[from] LogError),
    #[error("encode error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("corrupt record at offset {offset}: {reason}")]
    Corrupt { offset: Offset, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
