use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use orderbot_core::config::StorageBackend;
use orderbot_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    classifier: &'static str,
    catalog_size: usize,
    storage: StorageBackend,
    db_pool: Option<DbPool>,
}

impl HealthState {
    pub fn new(
        classifier: &'static str,
        catalog_size: usize,
        storage: StorageBackend,
        db_pool: Option<DbPool>,
    ) -> Self {
        Self { classifier, catalog_size, storage, db_pool }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub classifier: &'static str,
    pub catalog_items: usize,
    pub storage: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = storage_check(state.storage, state.db_pool.as_ref()).await;
    let ready = storage.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        classifier: state.classifier,
        catalog_items: state.catalog_size,
        storage,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn storage_check(backend: StorageBackend, pool: Option<&DbPool>) -> HealthCheck {
    let Some(pool) = pool else {
        return HealthCheck { status: "ready", detail: format!("{backend:?} store in process") };
    };

    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use orderbot_core::config::StorageBackend;
    use orderbot_db::connect_with_settings;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn memory_store_is_always_ready() {
        let (status, Json(payload)) =
            health(State(HealthState::new("keyword", 4, StorageBackend::Memory, None))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.classifier, "keyword");
        assert_eq!(payload.catalog_items, 4);
    }

    #[tokio::test]
    async fn health_returns_ready_when_database_is_reachable() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");

        let (status, Json(payload)) = health(State(HealthState::new(
            "luis",
            4,
            StorageBackend::Sqlite,
            Some(pool.clone()),
        )))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.storage.status, "ready");

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_unavailable() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) =
            health(State(HealthState::new("keyword", 4, StorageBackend::Sqlite, Some(pool)))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.storage.status, "degraded");
    }
}
