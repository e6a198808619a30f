// Stored-value wallets and their transaction ledger

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::pagination::{paginate, Page, PageRequest};
use super::user::{User, UserSummary};
use crate::apply_sort;
use crate::db::DieselPool;
use crate::schema::{wallet_transactions, wallets};
use crate::utils::ApiResult;

text_enum! {
    WalletStatus {
        Active => "Active",
        Frozen => "Frozen",
    }
}

text_enum! {
    TransactionKind {
        Credit => "credit",
        Debit => "debit",
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = wallets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: f64,
    pub currency: String,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = wallets)]
pub struct NewWallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: f64,
    pub currency: String,
    pub status: WalletStatus,
}

impl NewWallet {
    pub fn empty(user_id: Uuid, currency: &str) -> Self {
        NewWallet {
            id: Uuid::new_v4(),
            user_id,
            balance: 0.0,
            currency: currency.to_uppercase(),
            status: WalletStatus::Active,
        }
    }
}

/// Balance is only changed through ledger transactions
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = wallets)]
pub struct WalletChanges {
    pub currency: Option<String>,
    pub status: Option<WalletStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = wallet_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    pub amount: f64,
    pub balance_after: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = wallet_transactions)]
pub struct NewWalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    pub amount: f64,
    pub balance_after: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    pub user_id: Uuid,

    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    pub status: Option<WalletStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWalletRequest {
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub status: Option<WalletStatus>,
}

impl From<UpdateWalletRequest> for WalletChanges {
    fn from(req: UpdateWalletRequest) -> Self {
        WalletChanges {
            currency: req.currency.map(|c| c.trim().to_uppercase()),
            status: req.status,
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({"kind": "credit", "amount": 250, "description": "Referral bonus"}))]
pub struct WalletTransactionRequest {
    pub kind: TransactionKind,

    #[validate(range(min = 0.01, message = "Amount must be greater than zero"))]
    pub amount: f64,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransactionReceipt {
    pub wallet: Wallet,
    pub transaction: WalletTransaction,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WalletFilter {
    /// Active or Frozen
    pub status: Option<String>,
    /// Owner user id
    pub user: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct WalletQuery {
    pub status: Option<WalletStatus>,
    pub user: Option<Uuid>,
}

/// Wallet with its owner resolved
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletView {
    #[serde(flatten)]
    pub wallet: Wallet,
    pub user: Option<UserSummary>,
}

impl Wallet {
    fn filtered(filter: &WalletQuery) -> wallets::BoxedQuery<'static, Pg> {
        let mut query = wallets::table.into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(wallets::status.eq(status));
        }
        if let Some(user) = filter.user {
            query = query.filter(wallets::user_id.eq(user));
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &WalletQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<Wallet>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, wallets::created_at, {
                    "balance" => wallets::balance,
                    "status" => wallets::status,
                    "updatedAt" => wallets::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<Wallet>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, wallet_id: Uuid) -> QueryResult<Self> {
        wallets::table.find(wallet_id).first(conn).await
    }

    /// Row-locked read for use inside a transaction
    pub async fn find_for_update(
        conn: &mut AsyncPgConnection,
        wallet_id: Uuid,
    ) -> QueryResult<Self> {
        wallets::table.find(wallet_id).for_update().first(conn).await
    }

    pub async fn find_by_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> QueryResult<Option<Self>> {
        wallets::table
            .filter(wallets::user_id.eq(owner))
            .first(conn)
            .await
            .optional()
    }

    /// Return the user's wallet, creating an empty one on first access.
    /// Concurrent first reads converge on the same row.
    pub async fn get_or_create(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        currency: &str,
    ) -> QueryResult<Self> {
        diesel::insert_into(wallets::table)
            .values(&NewWallet::empty(owner, currency))
            .on_conflict(wallets::user_id)
            .do_nothing()
            .execute(conn)
            .await?;

        wallets::table
            .filter(wallets::user_id.eq(owner))
            .first(conn)
            .await
    }

    pub async fn create(conn: &mut AsyncPgConnection, new: NewWallet) -> QueryResult<Self> {
        diesel::insert_into(wallets::table)
            .values(&new)
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        wallet_id: Uuid,
        changes: WalletChanges,
    ) -> QueryResult<Self> {
        diesel::update(wallets::table.find(wallet_id))
            .set(&changes)
            .get_result(conn)
            .await
    }

    /// Ledger rows go with the wallet through the foreign key cascade
    pub async fn delete(conn: &mut AsyncPgConnection, wallet_id: Uuid) -> QueryResult<usize> {
        diesel::delete(wallets::table.find(wallet_id))
            .execute(conn)
            .await
    }

    pub async fn set_balance(
        conn: &mut AsyncPgConnection,
        wallet_id: Uuid,
        balance: f64,
    ) -> QueryResult<Self> {
        diesel::update(wallets::table.find(wallet_id))
            .set((wallets::balance.eq(balance), wallets::updated_at.eq(Utc::now())))
            .get_result(conn)
            .await
    }

    pub async fn populate(
        conn: &mut AsyncPgConnection,
        items: Vec<Wallet>,
    ) -> QueryResult<Vec<WalletView>> {
        let ids: Vec<Uuid> = items.iter().map(|w| w.user_id).collect();
        let users = User::summaries(conn, &ids).await?;

        Ok(items
            .into_iter()
            .map(|wallet| WalletView {
                user: users.get(&wallet.user_id).cloned(),
                wallet,
            })
            .collect())
    }

    /// Balance after applying one ledger entry, or None when a debit would
    /// overdraw the wallet
    pub fn balance_after(&self, kind: TransactionKind, amount: f64) -> Option<f64> {
        let next = match kind {
            TransactionKind::Credit => self.balance + amount,
            TransactionKind::Debit => self.balance - amount,
        };
        let next = super::coupon::round_money(next);
        if next < 0.0 {
            None
        } else {
            Some(next)
        }
    }
}

impl WalletTransaction {
    pub async fn list_for_wallet(
        pool: &DieselPool,
        wallet_id: Uuid,
        request: &PageRequest,
    ) -> ApiResult<Page<WalletTransaction>> {
        paginate(
            pool,
            request,
            |mut conn| async move {
                wallet_transactions::table
                    .filter(wallet_transactions::wallet_id.eq(wallet_id))
                    .count()
                    .get_result(&mut conn)
                    .await
            },
            |mut conn| async move {
                let query = wallet_transactions::table
                    .filter(wallet_transactions::wallet_id.eq(wallet_id))
                    .into_boxed();
                apply_sort!(query, request, wallet_transactions::created_at, {
                    "amount" => wallet_transactions::amount,
                    "kind" => wallet_transactions::kind,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<WalletTransaction>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new: NewWalletTransaction,
    ) -> QueryResult<Self> {
        diesel::insert_into(wallet_transactions::table)
            .values(&new)
            .get_result(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(balance: f64) -> Wallet {
        let now = Utc::now();
        Wallet {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            balance,
            currency: "INR".to_string(),
            status: WalletStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_credit_and_debit() {
        let w = wallet(100.0);
        assert_eq!(w.balance_after(TransactionKind::Credit, 50.5), Some(150.5));
        assert_eq!(w.balance_after(TransactionKind::Debit, 100.0), Some(0.0));
    }

    #[test]
    fn test_debit_cannot_overdraw() {
        let w = wallet(10.0);
        assert_eq!(w.balance_after(TransactionKind::Debit, 10.01), None);
    }

    #[test]
    fn test_float_noise_does_not_block_exact_debit() {
        let w = wallet(0.1 + 0.2);
        assert_eq!(w.balance_after(TransactionKind::Debit, 0.3), Some(0.0));
    }

    #[test]
    fn test_transaction_amount_must_be_positive() {
        let req = WalletTransactionRequest {
            kind: TransactionKind::Debit,
            amount: 0.0,
            description: None,
        };
        assert!(req.validate().is_err());

        let ok = WalletTransactionRequest { amount: 1.0, ..req };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_new_wallet_is_empty_and_active() {
        let owner = Uuid::new_v4();
        let new = NewWallet::empty(owner, "inr");
        assert_eq!(new.balance, 0.0);
        assert_eq!(new.currency, "INR");
        assert_eq!(new.status, WalletStatus::Active);
    }
}
