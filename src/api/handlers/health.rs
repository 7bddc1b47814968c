use axum::extract::State;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::JSend;
use crate::file_store::{FileStoreHealth, HealthStatus};
use crate::storage::Database;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub node_id: String,
    pub file_store: FileStoreHealth,
    pub repository: RepositoryHealth,
}

#[derive(Debug, Serialize)]
pub struct RepositoryHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// `ok` when both the file store and the repository are healthy, `degraded` otherwise.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<JSend<HealthResponse>> {
    let file_store = state.file_store.health_check();
    let repository = repository_health(&state).await;

    let status = if file_store.status == HealthStatus::Healthy
        && repository.status == HealthStatus::Healthy
    {
        "ok"
    } else {
        "degraded"
    };

    JSend::success(HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION").to_string(),
        node_id: state.config.node.id.clone(),
        file_store,
        repository,
    })
}

async fn repository_health(state: &AppState) -> RepositoryHealth {
    match &state.db {
        Some(db) => match ping(db.clone()).await {
            Ok(()) => RepositoryHealth {
                status: HealthStatus::Healthy,
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Repository health check failed");
                RepositoryHealth {
                    status: HealthStatus::Unhealthy,
                    error: Some(e),
                }
            }
        },
        // Test mode runs without a database
        None if state.config.test_mode => RepositoryHealth {
            status: HealthStatus::Healthy,
            error: None,
        },
        None => RepositoryHealth {
            status: HealthStatus::Unhealthy,
            error: Some("no database connection".to_string()),
        },
    }
}

/// Ping on the blocking pool; a redb read transaction may touch disk.
async fn ping(db: Database) -> Result<(), String> {
    match tokio::task::spawn_blocking(move || db.ping()).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}
