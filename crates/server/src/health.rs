use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use encore_store::MappingService;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    mapping: Arc<MappingService>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub storage: HealthCheck,
    pub checked_at: String,
}

pub fn router(mapping: Arc<MappingService>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { mapping })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    mapping: Arc<MappingService>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(mapping)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = storage_check(&state.mapping).await;
    let ready = storage.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "encore-server runtime initialized".to_string(),
        },
        storage,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn storage_check(mapping: &MappingService) -> HealthCheck {
    match mapping.probe_store().await {
        Ok(()) => {
            HealthCheck { status: "ready", detail: "mapping store read succeeded".to_string() }
        }
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("mapping store read failed: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use encore_store::{InMemoryMappingStore, MappingService, MappingStore};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_store_is_reachable() {
        let store = Arc::new(InMemoryMappingStore::new());
        let mapping = Arc::new(MappingService::load(store).await.expect("load"));

        let (status, Json(payload)) = health(State(HealthState { mapping })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.storage.status, "ready");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_payload_serializes_expected_json_shape() {
        let store = Arc::new(InMemoryMappingStore::new());
        let mapping = Arc::new(MappingService::load(store).await.expect("load"));

        let (_, Json(payload)) = health(State(HealthState { mapping })).await;
        let value = serde_json::to_value(&payload).expect("serialize");

        assert_eq!(value["status"], "ready");
        assert_eq!(value["service"]["status"], "ready");
        assert_eq!(value["storage"]["status"], "ready");
        assert!(value["storage"]["detail"].is_string());
        assert!(value["checked_at"].is_string());
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_store_fails() {
        let store = Arc::new(InMemoryMappingStore::new());
        let mapping = Arc::new(MappingService::load(Arc::clone(&store) as Arc<dyn MappingStore>).await.expect("load"));
        store.fail_next_loads(true);

        let (status, Json(payload)) = health(State(HealthState { mapping })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.storage.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
