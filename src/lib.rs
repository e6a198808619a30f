// Library exports for the campus admin backend
// The binary in main.rs and the integration tests both build the router here

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

use axum::{middleware::from_fn_with_state, Router};
use tower_http::trace::TraceLayer;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use db::DieselPool;
pub use middleware::AuthenticatedUser;
pub use models::auth::AccessTokenClaims;
pub use services::{JwtConfig, JwtError, JwtService, VerificationService};
pub use utils::{ApiError, ApiResult};

/// Full application router: every API route under /api, request tracing and
/// the dynamic CORS layer
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", handlers::api_routes(&state))
        .fallback(handlers::route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::dynamic_cors_middleware,
        ))
        .with_state(state)
}
