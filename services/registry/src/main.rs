//! Stream registry service entry point.
//!
//! # Purpose
//! Loads configuration, initializes tracing and metrics, opens the configured log, replays
//! it into the entity store, and serves `/metrics` and `/health` until shutdown.
use anyhow::Context;
use registry::app::{self, AppState};
use registry::config::{LogBackend, RegistryConfig};
use registry::observability;
use registry::store::EntityStore;
use registry::Registry;
use registry_log::{AppendOnlyLog, FileLog, MemoryLog};
use std::future::Future;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RegistryConfig::from_env_or_yaml().context("registry config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: RegistryConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics = observability::init_observability("stream-registry")?;
    let log = open_log(&config).await?;

    let store = Arc::new(EntityStore::new(log, config.store_config()));
    let replay = store.spawn_replay();
    let registry = Arc::new(Registry::new(store));

    let listener = tokio::net::TcpListener::bind(config.metrics_bind)
        .await
        .with_context(|| format!("bind {}", config.metrics_bind))?;
    tracing::info!(addr = %config.metrics_bind, "registry listening");
    let server = tokio::spawn(app::serve_with_listener(
        AppState { registry, metrics },
        listener,
        shutdown,
    ));

    replay
        .await
        .context("replay task")?
        .context("replay entity log")?;
    server.await.context("http task")??;
    Ok(())
}

async fn open_log(config: &RegistryConfig) -> anyhow::Result<Arc<dyn AppendOnlyLog>> {
    match config.log_backend {
        LogBackend::Memory => Ok(Arc::new(MemoryLog::new())),
        LogBackend::File => {
            let log = FileLog::open(&config.log_path)
                .await
                .with_context(|| format!("open log {}", config.log_path.display()))?;
            Ok(Arc::new(log))
        }
    }
}
