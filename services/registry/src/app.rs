//! HTTP surface of the registry service.
//!
//! # Purpose
//! Serves `GET /metrics` (Prometheus text) and `GET /health` (store readiness and entity
//! counts per kind).
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use crate::registry::Registry;
use crate::store::Readiness;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub metrics: PrometheusHandle,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: Readiness,
    pub backend: &'static str,
    pub entities: BTreeMap<&'static str, usize>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", axum::routing::get(render_metrics))
        .route("/health", axum::routing::get(health))
        .with_state(state)
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let store = state.registry.store();
    let status = store.readiness();
    let code = match status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Replaying | Readiness::Failed(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let entities = store
        .counts()
        .await
        .into_iter()
        .map(|(kind, count)| (kind.as_str(), count))
        .collect();
    (
        code,
        Json(HealthStatus {
            status,
            backend: store.backend_name(),
            entities,
        }),
    )
}

pub async fn serve_with_listener<F>(
    state: AppState,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Domain, DomainKey, Entity, Specification, Status};
    use crate::observability::init_observability;
    use crate::store::{EntityStore, StoreConfig};
    use registry_log::MemoryLog;
    use serial_test::serial;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn get(addr: std::net::SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.expect("write");
        let mut response = String::new();
        stream.read_to_string(&mut response).await.expect("read");
        response
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn health_and_metrics_respond() {
        let metrics = init_observability("registry-app-test").expect("init");
        let store = EntityStore::open(Arc::new(MemoryLog::new()), StoreConfig::default())
            .await
            .expect("open");
        store
            .put(
                Domain {
                    key: DomainKey::new("payments"),
                    specification: Specification::default(),
                    status: Status::default(),
                }
                .into_any(),
            )
            .await
            .expect("put");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_with_listener(
            AppState {
                registry: Arc::new(Registry::new(store)),
                metrics,
            },
            listener,
            async move {
                let _ = shutdown_rx.await;
            },
        ));

        let health = get(addr, "/health").await;
        assert!(health.starts_with("HTTP/1.1 200"), "{health}");
        assert!(health.contains("\"state\":\"ready\""), "{health}");
        assert!(health.contains("\"domain\":1"), "{health}");

        let metrics = get(addr, "/metrics").await;
        assert!(metrics.starts_with("HTTP/1.1 200"), "{metrics}");
        assert!(metrics.contains("registry_entities"), "{metrics}");

        let _ = shutdown_tx.send(());
        let _ = server.await;
    }

    #[tokio::test]
    async fn health_reports_replaying_store() {
        let store = Arc::new(EntityStore::new(
            Arc::new(MemoryLog::new()),
            StoreConfig::default(),
        ));
        let metrics = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let registry = Arc::new(Registry::new(store));
        let (code, Json(body)) = health(State(AppState { registry, metrics })).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, Readiness::Replaying);
        assert_eq!(body.entities["stream"], 0);
    }
}
