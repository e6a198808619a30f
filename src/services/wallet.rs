// Wallet balance movements

use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    app::AppState,
    db::DieselPool,
    models::wallet::{
        NewWalletTransaction, TransactionKind, Wallet, WalletStatus, WalletTransaction,
        WalletTransactionReceipt, WalletTransactionRequest,
    },
    utils::{ApiError, ApiResult, AuditAction, AuditLogger, OrNotFound},
};

pub struct WalletService {
    diesel_pool: DieselPool,
}

impl WalletService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    /// Credit or debit a wallet. The row is locked for the duration of the
    /// transaction, so the balance and the ledger entry always agree and a
    /// debit never takes the balance below zero.
    #[instrument(skip(self, req), fields(kind = %req.kind, amount = req.amount))]
    pub async fn apply(
        &self,
        actor: Uuid,
        wallet_id: Uuid,
        req: WalletTransactionRequest,
    ) -> ApiResult<WalletTransactionReceipt> {
        let mut pooled = self.diesel_pool.get().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let receipt = conn
            .transaction::<_, ApiError, _>(|conn| {
                async move {
                    let wallet = Wallet::find_for_update(conn, wallet_id)
                        .await
                        .or_not_found("Wallet")?;

                    if wallet.status == WalletStatus::Frozen {
                        return Err(ApiError::BadRequest("Wallet is frozen".to_string()));
                    }

                    let balance = wallet.balance_after(req.kind, req.amount).ok_or_else(|| {
                        ApiError::BadRequest("Insufficient wallet balance".to_string())
                    })?;

                    let wallet = Wallet::set_balance(conn, wallet_id, balance).await?;
                    let transaction = WalletTransaction::create(
                        conn,
                        NewWalletTransaction {
                            id: Uuid::new_v4(),
                            wallet_id,
                            kind: req.kind,
                            amount: req.amount,
                            balance_after: balance,
                            description: req
                                .description
                                .map(|d| d.trim().to_string())
                                .filter(|d| !d.is_empty()),
                        },
                    )
                    .await?;

                    Ok(WalletTransactionReceipt {
                        wallet,
                        transaction,
                    })
                }
                .scope_boxed()
            })
            .await?;

        info!(
            "Wallet {} {} {}, balance now {}",
            wallet_id, receipt.transaction.kind, receipt.transaction.amount, receipt.wallet.balance
        );
        let action = match receipt.transaction.kind {
            TransactionKind::Credit => AuditAction::WalletCredited,
            TransactionKind::Debit => AuditAction::WalletDebited,
        };
        AuditLogger::record(
            action,
            actor,
            "wallet",
            Some(wallet_id),
            Some(format!("amount {}", receipt.transaction.amount)),
        );

        Ok(receipt)
    }
}
