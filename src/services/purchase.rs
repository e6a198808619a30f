// Purchase flow: item checks, coupon redemption, reward accrual

use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    app::AppState,
    db::DieselPool,
    models::{
        catalog::{Course, Program},
        coupon::{Coupon, MSG_USAGE_EXCEEDED},
        purchase::{
            CreatePurchaseRequest, ItemType, NewPurchase, Purchase, PurchaseReceipt, Reward,
            RewardAccrual,
        },
        RecordStatus,
    },
    services::coupon::{evaluate, find_coupon},
    utils::{ApiError, ApiResult, AuditAction, AuditLogger, OrNotFound},
};

/// Price of a purchasable item, resolved inside the purchase transaction
#[derive(Debug, Clone, Copy)]
struct PricedItem {
    price: f64,
    status: RecordStatus,
}

async fn resolve_item(
    conn: &mut AsyncPgConnection,
    item_type: ItemType,
    item_id: Uuid,
) -> ApiResult<PricedItem> {
    let item = match item_type {
        ItemType::Course => Course::find_by_id(conn, item_id)
            .await
            .map(|c| PricedItem {
                price: c.price,
                status: c.status,
            })
            .or_not_found("Course")?,
        ItemType::Program => Program::find_by_id(conn, item_id)
            .await
            .map(|p| PricedItem {
                price: p.price,
                status: p.status,
            })
            .or_not_found("Program")?,
    };
    Ok(item)
}

pub struct PurchaseService {
    diesel_pool: DieselPool,
}

impl PurchaseService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    /// Complete a purchase for `student`. Every write happens in one
    /// transaction: a failure at any step leaves the coupon counter, the
    /// reward ledger and the student counters untouched.
    #[instrument(skip(self, req), fields(item_id = %req.item_id, item_type = %req.item_type))]
    pub async fn purchase(
        &self,
        student: Uuid,
        req: CreatePurchaseRequest,
    ) -> ApiResult<PurchaseReceipt> {
        let mut pooled = self.diesel_pool.get().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let receipt = conn
            .transaction::<_, ApiError, _>(|conn| {
                async move {
                    let item = resolve_item(conn, req.item_type, req.item_id).await?;
                    if item.status != RecordStatus::Active {
                        return Err(ApiError::BadRequest(
                            "Item is not available for purchase".to_string(),
                        ));
                    }

                    if Purchase::has_completed(conn, student, req.item_type, req.item_id).await? {
                        return Err(ApiError::BadRequest("Item already purchased".to_string()));
                    }

                    let mut new = NewPurchase::for_item(student, req.item_type, req.item_id);
                    new.original_amount = item.price;
                    new.final_amount = item.price;
                    new.payment_method = req.payment_method.clone();
                    new.transaction_id = req.transaction_id.clone();

                    let code = req
                        .coupon_code
                        .as_deref()
                        .map(str::trim)
                        .filter(|c| !c.is_empty());
                    if let Some(code) = code {
                        let coupon = find_coupon(conn, code).await?;
                        let applied = evaluate(
                            &coupon,
                            item.price,
                            Some(req.item_id),
                            Some(req.item_type),
                        )
                        .map_err(ApiError::BadRequest)?;

                        if !Coupon::claim_use(conn, coupon.id).await? {
                            return Err(ApiError::BadRequest(MSG_USAGE_EXCEEDED.to_string()));
                        }

                        new.coupon_id = Some(coupon.id);
                        new.coupon_code = Some(coupon.code.clone());
                        new.discount_amount = applied.discount;
                        new.final_amount = applied.final_amount;
                    }

                    let accrual = RewardAccrual::from_final_amount(new.final_amount);
                    new.cashback_earned = accrual.cashback;
                    new.points_earned = accrual.points;

                    let purchase = Purchase::create(conn, new).await?;
                    let reward = Reward::accrue(conn, student, accrual).await?;

                    match req.item_type {
                        ItemType::Course => Course::increment_students(conn, req.item_id).await?,
                        ItemType::Program => Program::increment_students(conn, req.item_id).await?,
                    };

                    Ok(PurchaseReceipt {
                        purchase,
                        rewards: reward.into(),
                    })
                }
                .scope_boxed()
            })
            .await?;

        info!(
            "Purchase {} completed: final amount {}, {} points",
            receipt.purchase.id, receipt.purchase.final_amount, receipt.purchase.points_earned
        );
        AuditLogger::record(
            AuditAction::PurchaseCompleted,
            student,
            "purchase",
            Some(receipt.purchase.id),
            receipt
                .purchase
                .coupon_code
                .as_ref()
                .map(|code| format!("coupon {}", code)),
        );

        Ok(receipt)
    }
}
