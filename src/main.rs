use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_admin_backend::{
    app_config::config,
    build_router,
    db::{self, mask_connection_string, DieselDatabaseConfig},
    migrations, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before the config is first touched
    dotenv::dotenv().ok();
    let config = config();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting campus admin API on {} ({})",
        config.server.bind_address, config.environment
    );

    if config.is_production() {
        warn!(
            "STATIC_OTP_CODE is in effect: every OTP verification accepts the configured code"
        );
    }

    let db_config = DieselDatabaseConfig::from_app_config(config);
    info!("Database URL: {}", mask_connection_string(&db_config.url));
    let diesel_pool = db::create_diesel_pool(db_config)
        .await
        .map_err(|e| anyhow::anyhow!("Database initialization failed: {}", e))?;

    if migrations::should_run_migrations(config) {
        info!("Running embedded migrations...");
        migrations::run_all_migrations(migrations::MigrationConfig::from_app_config(config))
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    } else {
        info!("Embedded migrations disabled");
    }

    let state = AppState::new(Arc::new(config.clone()), diesel_pool);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;

    info!("Listening on {}", config.server.bind_address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
