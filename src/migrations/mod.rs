// Schema migrations, run from main before the listener binds

pub mod diesel;

use crate::app_config::AppConfig;
use std::error::Error;
use tracing::{error, info};

/// Inputs for a migration pass
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub database_url: String,
    pub environment: String,
}

impl MigrationConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            database_url: config.database.url.clone(),
            environment: config.environment.to_string(),
        }
    }
}

pub async fn run_all_migrations(config: MigrationConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("[MIGRATIONS] Checking schema ({})", config.environment);

    let report = diesel::apply_pending(config.database_url).await.map_err(|e| {
        error!("[MIGRATIONS] ✗ {}", e);
        e
    })?;

    if report.is_noop() {
        info!(
            "[MIGRATIONS] ✓ Schema up to date ({} applied)",
            report.previously_applied
        );
    } else {
        info!(
            "[MIGRATIONS] ✓ Applied {} migrations: {}",
            report.newly_applied.len(),
            report.newly_applied.join(", ")
        );
    }

    Ok(())
}

pub fn should_run_migrations(config: &AppConfig) -> bool {
    !config.database.disable_embedded_migrations
}
