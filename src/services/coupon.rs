// Coupon redemption rules shared by the validate endpoint and the purchase flow

use chrono::Utc;
use diesel_async::AsyncPgConnection;
use tracing::debug;
use uuid::Uuid;

use crate::{
    app::AppState,
    db::DieselPool,
    models::{
        coupon::{round_money, Coupon, CouponValidation, ValidateCouponRequest, MSG_NOT_APPLICABLE},
        purchase::ItemType,
    },
    utils::{ApiError, ApiResult},
};

/// Discount granted by a coupon for one prospective purchase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedDiscount {
    pub discount: f64,
    pub final_amount: f64,
}

/// Run the coupon rules for an amount and optional item. Rule failures come
/// back as `Err(message)`, a passing coupon yields the computed discount.
pub fn evaluate(
    coupon: &Coupon,
    amount: f64,
    item_id: Option<Uuid>,
    item_type: Option<ItemType>,
) -> Result<AppliedDiscount, String> {
    let check = coupon.is_valid(amount, item_id, Utc::now());
    if !check.valid {
        return Err(check.message);
    }

    if let Some(kind) = item_type {
        if !coupon.applies_to_kind(kind) {
            return Err(MSG_NOT_APPLICABLE.to_string());
        }
    }

    let discount = coupon.calculate_discount(amount);
    Ok(AppliedDiscount {
        discount,
        final_amount: round_money(amount - discount),
    })
}

pub async fn find_coupon(conn: &mut AsyncPgConnection, code: &str) -> ApiResult<Coupon> {
    Coupon::find_by_code(conn, code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid coupon code".to_string()))
}

pub struct CouponService {
    diesel_pool: DieselPool,
}

impl CouponService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    /// Preview a redemption without consuming a use
    pub async fn validate(&self, req: ValidateCouponRequest) -> ApiResult<CouponValidation> {
        let mut conn = self.diesel_pool.get().await?;
        let coupon = find_coupon(&mut conn, &req.code).await?;

        match evaluate(&coupon, req.amount, req.item_id, req.item_type) {
            Ok(applied) => Ok(CouponValidation {
                valid: true,
                message: "Coupon applied successfully".to_string(),
                discount: applied.discount,
                final_amount: applied.final_amount,
                coupon: Some(coupon),
            }),
            Err(message) => {
                debug!("Coupon {} rejected: {}", coupon.code, message);
                Ok(CouponValidation {
                    valid: false,
                    message,
                    discount: 0.0,
                    final_amount: round_money(req.amount),
                    coupon: None,
                })
            },
        }
    }
}
