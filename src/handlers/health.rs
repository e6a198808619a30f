// Health check

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{app::AppState, db};

#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentHealth {
    /// healthy or unhealthy
    pub status: &'static str,
    pub max_connections: Option<u32>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    /// healthy or degraded
    pub status: &'static str,
    pub service: &'static str,
    pub environment: String,
    pub timestamp: String,
    pub postgresql: ComponentHealth,
}

/// GET /api/health
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "healthCheck",
    responses(
        (status = 200, description = "Service is healthy", body = HealthReport),
        (status = 503, description = "Database unreachable", body = HealthReport)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let postgresql = match db::check_diesel_health(&state.diesel_pool).await {
        Ok(()) => ComponentHealth {
            status: "healthy",
            max_connections: Some(state.max_connections),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Health check failed to reach PostgreSQL: {}", e);
            ComponentHealth {
                status: "unhealthy",
                max_connections: None,
                error: Some("Database connection failed".to_string()),
            }
        }
    };

    let healthy = postgresql.error.is_none();
    let report = HealthReport {
        status: if healthy { "healthy" } else { "degraded" },
        service: "campus-admin-backend",
        environment: state.config.environment.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        postgresql,
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}
