//! Log-backed entity store with an in-memory materialized view.
//!
//! # Purpose
//! Every entity kind shares one append-only log. Keys are JSON-encoded [`TaggedKey`]s and
//! values are JSON-encoded [`AnyEntity`]s; a delete is a tombstone. On startup the whole log
//! is replayed from its earliest retained record into a view partitioned by kind.
//!
//! # Readiness
//! All reads and writes wait on a readiness gate until replay completes. If replay fails
//! the gate stays failed and every waiting and future operation returns
//! [`StoreError::NotReady`].
//!
//! # Consistency
//! - Appends are serialized by a mutex so the view is applied in log order (last writer in
//!   log order wins).
//! - The view is only mutated after the log accepted the record; a failed append leaves it
//!   untouched.
//! - Readers take a read lock on the view and receive owned snapshots.
//!
//! # Change feed
//! Each applied record is also pushed into a bounded change log keyed by its offset.
//! Consumers that fall behind the retention window must re-read the view.
use bytes::Bytes;
use registry_log::{AppendOnlyLog, LogRecord, Offset, ReadRange};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, watch};

use super::{
    ChangeSet, EntityChange, EntityChangeOp, Readiness, StoreConfig, StoreError, StoreResult,
};
use crate::model::{AnyEntity, EntityKind, TaggedKey};

/// Bounded, in-memory log of applied changes.
///
/// `seq` is the log offset of the record that produced the change, so a consumer's `since`
/// checkpoint survives restarts of the store.
#[derive(Debug)]
struct ChangeLog<T> {
    next_seq: u64,
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> ChangeLog<T> {
    fn new(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    fn record(&mut self, seq: u64, item: impl FnOnce(u64) -> T) {
        self.next_seq = seq + 1;
        self.items.push_back(item(seq));
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }
}

type Partition = HashMap<TaggedKey, AnyEntity>;

pub struct EntityStore {
    config: StoreConfig,
    log: Arc<dyn AppendOnlyLog>,
    /// Materialized view, one partition per entity kind.
    view: RwLock<HashMap<EntityKind, Partition>>,
    changes: RwLock<ChangeLog<EntityChange>>,
    /// Serializes append + apply so the view follows log order.
    append: Mutex<()>,
    readiness: watch::Sender<Readiness>,
}

impl EntityStore {
    /// Build a store whose readiness gate is closed until [`EntityStore::replay`] runs.
    pub fn new(log: Arc<dyn AppendOnlyLog>, config: StoreConfig) -> Self {
        let capacity = config.change_window();
        let (readiness, _) = watch::channel(Readiness::Replaying);
        Self {
            config,
            log,
            view: RwLock::new(HashMap::new()),
            changes: RwLock::new(ChangeLog::new(capacity)),
            append: Mutex::new(()),
            readiness,
        }
    }

    /// Build a store and replay the log before returning it.
    pub async fn open(log: Arc<dyn AppendOnlyLog>, config: StoreConfig) -> StoreResult<Arc<Self>> {
        let store = Arc::new(Self::new(log, config));
        store.replay().await?;
        Ok(store)
    }

    /// Replay on a background task; operations issued meanwhile wait on the readiness gate.
    pub fn spawn_replay(self: &Arc<Self>) -> tokio::task::JoinHandle<StoreResult<u64>> {
        let store = Arc::clone(self);
        tokio::spawn(async move { store.replay().await })
    }

    /// Rebuild the view from the earliest retained record and open the readiness gate.
    ///
    /// Returns the number of records applied.
    pub async fn replay(&self) -> StoreResult<u64> {
        let _guard = self.append.lock().await;
        match self.replay_locked().await {
            Ok(applied) => {
                self.readiness.send_replace(Readiness::Ready);
                tracing::info!(
                    backend = self.log.backend_name(),
                    records = applied,
                    "entity store replay complete"
                );
                Ok(applied)
            }
            Err(err) => {
                self.readiness
                    .send_replace(Readiness::Failed(err.to_string()));
                tracing::error!(error = %err, "entity store replay failed");
                Err(err)
            }
        }
    }

    async fn replay_locked(&self) -> StoreResult<u64> {
        let mut start = self.log.earliest_offset().await?;
        let mut applied = 0u64;
        loop {
            let records = self
                .log
                .read_range(ReadRange {
                    start,
                    max_records: self.config.replay_batch.max(1),
                })
                .await?;
            let Some(last) = records.last() else {
                break;
            };
            start = last.offset + 1;
            let page = records.len() as u64;
            for record in records {
                let (key, entity) = decode_record(&record)?;
                self.apply(record.offset, key, entity).await;
            }
            applied += page;
            metrics::counter!("registry_replay_records_total").increment(page);
        }
        Ok(applied)
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.borrow().clone()
    }

    pub fn backend_name(&self) -> &'static str {
        self.log.backend_name()
    }

    /// Wait until replay has finished; fails if replay failed.
    pub async fn wait_ready(&self) -> StoreResult<()> {
        let mut rx = self.readiness.subscribe();
        let state = rx
            .wait_for(|state| *state != Readiness::Replaying)
            .await
            .map_err(|_| StoreError::NotReady("readiness gate closed".to_string()))?;
        match &*state {
            Readiness::Failed(reason) => Err(StoreError::NotReady(reason.clone())),
            _ => Ok(()),
        }
    }

    /// Append an entity and apply it to the view. Returns the record's offset.
    pub async fn put(&self, entity: AnyEntity) -> StoreResult<Offset> {
        self.wait_ready().await?;
        let key = entity.tagged_key();
        let encoded_key = Bytes::from(serde_json::to_vec(&key)?);
        let encoded_value = Bytes::from(serde_json::to_vec(&entity)?);

        let _guard = self.append.lock().await;
        let offset = self.log.append(encoded_key, Some(encoded_value)).await?;
        self.apply(offset, key, Some(entity)).await;
        Ok(offset)
    }

    pub async fn get(&self, key: &TaggedKey) -> StoreResult<Option<AnyEntity>> {
        self.wait_ready().await?;
        Ok(self
            .view
            .read()
            .await
            .get(&key.kind)
            .and_then(|partition| partition.get(key))
            .cloned())
    }

    pub async fn contains(&self, key: &TaggedKey) -> StoreResult<bool> {
        self.wait_ready().await?;
        Ok(self
            .view
            .read()
            .await
            .get(&key.kind)
            .is_some_and(|partition| partition.contains_key(key)))
    }

    /// Snapshot of every entity of `kind` accepted by `predicate`, in no particular order.
    pub async fn find_all<P>(&self, kind: EntityKind, predicate: P) -> StoreResult<Vec<AnyEntity>>
    where
        P: Fn(&AnyEntity) -> bool,
    {
        self.wait_ready().await?;
        Ok(self
            .view
            .read()
            .await
            .get(&kind)
            .map(|partition| {
                partition
                    .values()
                    .filter(|entity| predicate(entity))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Tombstone `key`. Deleting an absent key is a no-op and returns `false`.
    pub async fn delete(&self, key: &TaggedKey) -> StoreResult<bool> {
        self.wait_ready().await?;
        let _guard = self.append.lock().await;
        let present = self
            .view
            .read()
            .await
            .get(&key.kind)
            .is_some_and(|partition| partition.contains_key(key));
        if !present {
            tracing::debug!(%key, "delete of absent key ignored");
            return Ok(false);
        }
        let encoded_key = Bytes::from(serde_json::to_vec(key)?);
        let offset = self.log.append(encoded_key, None).await?;
        self.apply(offset, key.clone(), None).await;
        Ok(true)
    }

    pub async fn changes(&self, since: u64) -> StoreResult<ChangeSet<EntityChange>> {
        self.wait_ready().await?;
        let guard = self.changes.read().await;
        let items = guard
            .items
            .iter()
            .filter(|item| item.seq >= since)
            .take(self.config.changes_limit as usize)
            .cloned()
            .collect();
        Ok(ChangeSet {
            items,
            next_seq: guard.next_seq,
        })
    }

    /// Entity count per kind. Does not wait for readiness.
    pub async fn counts(&self) -> HashMap<EntityKind, usize> {
        let view = self.view.read().await;
        EntityKind::ALL
            .into_iter()
            .map(|kind| (kind, view.get(&kind).map_or(0, HashMap::len)))
            .collect()
    }

    async fn apply(&self, offset: Offset, key: TaggedKey, entity: Option<AnyEntity>) {
        let kind = key.kind;
        let len = {
            let mut view = self.view.write().await;
            let partition = view.entry(kind).or_default();
            match &entity {
                Some(entity) => {
                    partition.insert(key.clone(), entity.clone());
                }
                None => {
                    partition.remove(&key);
                }
            }
            partition.len()
        };
        metrics::gauge!("registry_entities", "kind" => kind.as_str()).set(len as f64);

        let op = if entity.is_some() {
            EntityChangeOp::Upserted
        } else {
            EntityChangeOp::Deleted
        };
        self.changes
            .write()
            .await
            .record(offset, |seq| EntityChange {
                seq,
                op,
                key,
                entity,
            });
    }
}

fn decode_record(record: &LogRecord) -> StoreResult<(TaggedKey, Option<AnyEntity>)> {
    let corrupt = |reason: String| StoreError::Corrupt {
        offset: record.offset,
        reason,
    };
    let key: TaggedKey = serde_json::from_slice(&record.key)
        .map_err(|err| corrupt(format!("undecodable key: {err}")))?;
    let Some(value) = &record.value else {
        return Ok((key, None));
    };
    let entity: AnyEntity = serde_json::from_slice(value)
        .map_err(|err| corrupt(format!("undecodable entity: {err}")))?;
    if entity.tagged_key() != key {
        return Err(corrupt(format!(
            "entity key {} does not match record key {key}",
            entity.tagged_key()
        )));
    }
    Ok((key, Some(entity)))
}
