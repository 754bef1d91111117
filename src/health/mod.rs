/*!
 * # Health Check Module
 *
 * `GET /health` reports whether the service can reach its product store.
 * The endpoint answers 200 while the store responds to a ping and 503
 * otherwise, so it can back both load balancer and orchestrator probes.
 */

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::AppState;

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Health check response
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub database: HealthStatus,
}

impl HealthInfo {
    fn from_database(database: HealthStatus) -> Self {
        Self {
            status: database,
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Service health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthInfo),
        (status = 503, description = "Product store unreachable", body = HealthInfo)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthInfo>) {
    let database = match crate::db::check_connection(&state.db).await {
        Ok(()) => HealthStatus::Up,
        Err(e) => {
            warn!("Health check could not reach the database: {}", e);
            HealthStatus::Down
        }
    };

    let info = HealthInfo::from_database(database);
    (info.status_code(), Json(info))
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_database_means_unavailable() {
        let info = HealthInfo::from_database(HealthStatus::Down);
        assert_eq!(info.status, HealthStatus::Down);
        assert_eq!(info.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn health_info_serializes_lowercase() {
        let value = serde_json::to_value(HealthInfo::from_database(HealthStatus::Up)).unwrap();
        assert_eq!(value["status"], "up");
        assert_eq!(value["database"], "up");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }
}
