// Live account state behind every bearer token. Tokens last for weeks, so the
// role and active flag are read from here rather than trusted from the claims.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::DieselPool,
    models::user::{User, UserRole},
    utils::ApiResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStanding {
    pub role: UserRole,
    pub is_active: bool,
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// `None` when the account no longer exists
    async fn standing(&self, user_id: Uuid) -> ApiResult<Option<AccountStanding>>;
}

/// Reads account standing from the users table
pub struct PgAccountDirectory {
    pool: DieselPool,
}

impl PgAccountDirectory {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn standing(&self, user_id: Uuid) -> ApiResult<Option<AccountStanding>> {
        let mut conn = self.pool.get().await?;
        let row = User::standing(&mut conn, user_id).await?;

        Ok(row.map(|(role, is_active)| AccountStanding { role, is_active }))
    }
}
