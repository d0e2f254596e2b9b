mod common;

use common::*;
use registry::Registry;
use registry::model::{EntityKind, Status};
use registry::store::{EntityStore, Readiness, StoreConfig};
use registry_log::{FileLog, MemoryLog};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

async fn file_registry(path: &Path) -> Registry {
    let log = FileLog::open(path).await.expect("open file log");
    Registry::open(
        Arc::new(log),
        StoreConfig {
            replay_batch: 3,
            ..StoreConfig::default()
        },
    )
    .await
    .expect("open registry")
}

#[tokio::test]
async fn restart_rebuilds_identical_view() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("registry.log");

    let (streams_before, consumers_before) = {
        let registry = file_registry(&path).await;
        seed_streams(&registry, &["orders", "refunds"]).await;
        registry
            .consumer_bindings
            .create(consumer("orders", "billing"))
            .await
            .expect("consumer");
        registry
            .streams
            .update_status(stream("orders"), Status::default().with("partitions", 12))
            .await
            .expect("status");
        registry
            .stream_bindings
            .delete(&stream_binding("refunds"))
            .await
            .expect("delete binding");
        (
            registry.streams.find_all(|_| true).await.expect("streams"),
            registry
                .consumer_bindings
                .find_all(|_| true)
                .await
                .expect("consumers"),
        )
    };

    let registry = file_registry(&path).await;
    let mut streams_after = registry.streams.find_all(|_| true).await.expect("streams");
    let mut streams_before = streams_before;
    streams_before.sort_by(|a, b| a.key.cmp(&b.key));
    streams_after.sort_by(|a, b| a.key.cmp(&b.key));
    assert_eq!(streams_after, streams_before);
    assert_eq!(
        registry
            .consumer_bindings
            .find_all(|_| true)
            .await
            .expect("consumers"),
        consumers_before
    );
    assert_eq!(
        registry.store().counts().await[&EntityKind::StreamBinding],
        1
    );

    let orders = registry
        .streams
        .get(&stream_key("orders"))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(orders.status.get("partitions"), Some(&serde_json::json!(12)));

    // The change feed is rebuilt with log offsets as sequence numbers.
    let changes = registry.store().changes(0).await.expect("changes");
    assert_eq!(changes.items.first().map(|change| change.seq), Some(0));
    assert_eq!(
        changes.next_seq,
        changes.items.last().map(|change| change.seq + 1).unwrap_or(0)
    );
}

#[tokio::test]
async fn torn_trailing_record_is_dropped_on_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("registry.log");
    {
        let registry = file_registry(&path).await;
        registry
            .domains
            .create(domain(DOMAIN))
            .await
            .expect("create");
    }
    {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .expect("open for append");
        // Header prefix of a record that never finished writing.
        file.write_all(b"REG1\x00\x01").expect("write torn bytes");
    }

    let registry = file_registry(&path).await;
    assert!(
        registry
            .domains
            .get(&domain(DOMAIN).key)
            .await
            .expect("get")
            .is_some()
    );
    registry
        .infrastructure
        .create(infrastructure(INFRA))
        .await
        .expect("append after truncation");
    drop(registry);

    let registry = file_registry(&path).await;
    let counts = registry.store().counts().await;
    assert_eq!(counts[&EntityKind::Domain], 1);
    assert_eq!(counts[&EntityKind::Infrastructure], 1);
}

#[tokio::test]
async fn operations_wait_for_replay_to_finish() {
    let log = Arc::new(MemoryLog::new());
    {
        let registry = Registry::open(log.clone(), StoreConfig::default())
            .await
            .expect("open");
        registry
            .domains
            .create(domain(DOMAIN))
            .await
            .expect("create");
    }

    let store = Arc::new(EntityStore::new(log, StoreConfig::default()));
    let registry = Arc::new(Registry::new(store.clone()));
    let pending = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.domains.create(domain(DOMAIN)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());
    assert_eq!(store.readiness(), Readiness::Replaying);

    store.spawn_replay().await.expect("join").expect("replay");
    let result = pending.await.expect("join");
    // The replayed domain is visible to the waiting create.
    assert!(result.is_err(), "{result:?}");
    assert_eq!(store.readiness(), Readiness::Ready);
}
