// Application state and configuration
use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    db::DieselPool,
    services::{AccountDirectory, JwtService, PgAccountDirectory, VerificationService},
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub diesel_pool: DieselPool,
    pub jwt_service: Arc<JwtService>,
    pub verification_service: Arc<VerificationService>,
    pub accounts: Arc<dyn AccountDirectory>,
    pub max_connections: u32,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, diesel_pool: DieselPool) -> Self {
        let jwt_service = Arc::new(JwtService::from_config(&config.jwt));
        let verification_service = Arc::new(VerificationService::from_config(&config));
        let max_connections = config.database.max_connections;
        let accounts = Arc::new(PgAccountDirectory::new(diesel_pool.clone()));

        Self {
            config,
            diesel_pool,
            jwt_service,
            verification_service,
            accounts,
            max_connections,
        }
    }

    /// Swap where `protect` reads account standing from
    pub fn with_account_directory(mut self, accounts: Arc<dyn AccountDirectory>) -> Self {
        self.accounts = accounts;
        self
    }
}
