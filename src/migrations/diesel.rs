// PostgreSQL schema migrations embedded from migrations/diesel

use crate::db::MIGRATIONS;
use diesel::{Connection, PgConnection};
use diesel_migrations::MigrationHarness;
use std::error::Error;
use tracing::debug;

type BoxError = Box<dyn Error + Send + Sync>;

/// What a migration pass found and did
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub previously_applied: usize,
    pub newly_applied: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.newly_applied.is_empty()
    }
}

/// Apply everything pending. The harness is synchronous so the work runs on
/// the blocking pool with its own short-lived connection.
pub async fn apply_pending(database_url: String) -> Result<MigrationReport, BoxError> {
    tokio::task::spawn_blocking(move || apply_pending_blocking(&database_url))
        .await
        .map_err(|e| format!("Migration task aborted: {}", e))?
}

fn apply_pending_blocking(database_url: &str) -> Result<MigrationReport, BoxError> {
    let mut conn = PgConnection::establish(database_url)
        .map_err(|e| format!("Cannot open migration connection: {}", e))?;

    let previously_applied = conn
        .applied_migrations()
        .map_err(|e| format!("Cannot read migration history: {}", e))?
        .len();

    let newly_applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| format!("Cannot apply migrations: {}", e))?
        .into_iter()
        .map(|version| version.to_string())
        .collect::<Vec<_>>();

    for version in &newly_applied {
        debug!("[DIESEL] applied {}", version);
    }

    Ok(MigrationReport {
        previously_applied,
        newly_applied,
    })
}
