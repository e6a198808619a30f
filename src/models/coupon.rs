// Discount coupons: validation rules and discount arithmetic

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::PgTextExpressionMethods;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::catalog::patch_optional;
use super::pagination::{paginate, Page, PageRequest};
use crate::apply_sort;
use crate::db::DieselPool;
use crate::schema::coupons;
use crate::utils::validation::{nullable, trimmed, trimmed_opt};
use crate::utils::{like_pattern, ApiResult};

text_enum! {
    DiscountType {
        Percentage => "percentage",
        Fixed => "fixed",
    }
}

text_enum! {
    /// Which item kinds a coupon may be redeemed against
    ApplicableTo {
        All => "all",
        Courses => "courses",
        Programs => "programs",
    }
}

text_enum! {
    CouponStatus {
        Active => "Active",
        Inactive => "Inactive",
        Expired => "Expired",
    }
}

/// Outcome of checking a coupon against a prospective purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CouponCheck {
    pub valid: bool,
    pub message: String,
}

impl CouponCheck {
    fn rejected(message: &str) -> Self {
        CouponCheck {
            valid: false,
            message: message.to_string(),
        }
    }

    fn accepted() -> Self {
        CouponCheck {
            valid: true,
            message: "Coupon is valid".to_string(),
        }
    }
}

pub const MSG_INACTIVE: &str = "Coupon is not active";
pub const MSG_NOT_STARTED: &str = "Coupon is not yet valid";
pub const MSG_EXPIRED: &str = "Coupon has expired";
pub const MSG_USAGE_EXCEEDED: &str = "Coupon usage limit exceeded";
pub const MSG_MIN_PURCHASE: &str = "Minimum purchase amount not met";
pub const MSG_NOT_APPLICABLE: &str = "Coupon is not applicable to this item";

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_purchase_amount: f64,
    pub max_discount_amount: Option<f64>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub applicable_to: ApplicableTo,
    pub applicable_items: Vec<Uuid>,
    pub status: CouponStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Checks in order: status, validity window, usage limit, minimum amount,
    /// item applicability. The first failure wins.
    pub fn is_valid(&self, amount: f64, item_id: Option<Uuid>, now: DateTime<Utc>) -> CouponCheck {
        if self.status != CouponStatus::Active {
            return CouponCheck::rejected(MSG_INACTIVE);
        }

        if now < self.valid_from {
            return CouponCheck::rejected(MSG_NOT_STARTED);
        }
        if let Some(valid_to) = self.valid_to {
            if now > valid_to {
                return CouponCheck::rejected(MSG_EXPIRED);
            }
        }

        if let Some(limit) = self.usage_limit {
            if self.used_count >= limit {
                return CouponCheck::rejected(MSG_USAGE_EXCEEDED);
            }
        }

        if amount < self.min_purchase_amount {
            return CouponCheck::rejected(MSG_MIN_PURCHASE);
        }

        if !self.applicable_items.is_empty() {
            let listed = item_id
                .map(|id| self.applicable_items.contains(&id))
                .unwrap_or(false);
            if !listed {
                return CouponCheck::rejected(MSG_NOT_APPLICABLE);
            }
        }

        CouponCheck::accepted()
    }

    /// Whether the coupon's scope admits this kind of item
    pub fn applies_to_kind(&self, kind: super::purchase::ItemType) -> bool {
        use super::purchase::ItemType;
        match self.applicable_to {
            ApplicableTo::All => true,
            ApplicableTo::Courses => kind == ItemType::Course,
            ApplicableTo::Programs => kind == ItemType::Program,
        }
    }

    /// Percentage discounts are capped by `max_discount_amount`; no discount
    /// ever exceeds the amount itself.
    pub fn calculate_discount(&self, amount: f64) -> f64 {
        let amount = amount.max(0.0);
        let discount = match self.discount_type {
            DiscountType::Percentage => {
                let raw = amount * self.discount_value / 100.0;
                match self.max_discount_amount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            },
            DiscountType::Fixed => self.discount_value.min(amount),
        };
        round_money(discount.clamp(0.0, amount))
    }
}

/// Round to two decimal places
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Insertable)]
#[diesel(table_name = coupons)]
pub struct NewCoupon {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_purchase_amount: f64,
    pub max_discount_amount: Option<f64>,
    pub usage_limit: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub applicable_to: ApplicableTo,
    pub applicable_items: Vec<Uuid>,
    pub status: CouponStatus,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = coupons)]
pub struct CouponChanges {
    pub code: Option<String>,
    pub description: Option<Option<String>>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
    pub min_purchase_amount: Option<f64>,
    pub max_discount_amount: Option<Option<f64>>,
    pub usage_limit: Option<Option<i32>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<Option<DateTime<Utc>>>,
    pub applicable_to: Option<ApplicableTo>,
    pub applicable_items: Option<Vec<Uuid>>,
    pub status: Option<CouponStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn validate_coupon_code(code: &str) -> Result<(), ValidationError> {
    let trimmed = code.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        let mut err = ValidationError::new("coupon_code");
        err.message = Some("Coupon code may only contain letters, digits, '-' and '_'".into());
        return Err(err);
    }
    Ok(())
}

/// Rules that span more than one field
fn check_cross_fields(
    discount_type: DiscountType,
    discount_value: f64,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
) -> Result<(), String> {
    if discount_type == DiscountType::Percentage && discount_value > 100.0 {
        return Err("Percentage discount cannot exceed 100".to_string());
    }
    if let (Some(from), Some(to)) = (valid_from, valid_to) {
        if to <= from {
            return Err("Valid to date must be after valid from date".to_string());
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "code": "SAVE10",
    "discountType": "percentage",
    "discountValue": 10,
    "maxDiscountAmount": 50,
    "usageLimit": 100
}))]
pub struct CreateCouponRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, max = 50, message = "Coupon code must be 3-50 characters"))]
    #[validate(custom = "validate_coupon_code")]
    pub code: String,

    pub description: Option<String>,

    pub discount_type: DiscountType,

    #[validate(range(min = 0.0, message = "Discount value cannot be negative"))]
    pub discount_value: f64,

    #[validate(range(min = 0.0, message = "Minimum purchase amount cannot be negative"))]
    pub min_purchase_amount: Option<f64>,

    #[validate(range(min = 0.0, message = "Maximum discount amount cannot be negative"))]
    pub max_discount_amount: Option<f64>,

    #[validate(range(min = 0, message = "Usage limit cannot be negative"))]
    pub usage_limit: Option<i32>,

    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,

    pub applicable_to: Option<ApplicableTo>,

    #[serde(default)]
    pub applicable_items: Vec<Uuid>,

    pub status: Option<CouponStatus>,
}

impl CreateCouponRequest {
    pub fn validate_rules(&self) -> Result<(), String> {
        check_cross_fields(
            self.discount_type,
            self.discount_value,
            Some(self.valid_from.unwrap_or_else(Utc::now)),
            self.valid_to,
        )
    }

    pub fn into_new(self, created_by: Uuid) -> NewCoupon {
        NewCoupon {
            id: Uuid::new_v4(),
            code: self.code.trim().to_uppercase(),
            description: patch_optional(self.description).flatten(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_purchase_amount: self.min_purchase_amount.unwrap_or(0.0),
            max_discount_amount: self.max_discount_amount,
            usage_limit: self.usage_limit,
            valid_from: self.valid_from.unwrap_or_else(Utc::now),
            valid_to: self.valid_to,
            applicable_to: self.applicable_to.unwrap_or(ApplicableTo::All),
            applicable_items: self.applicable_items,
            status: self.status.unwrap_or(CouponStatus::Active),
            created_by: Some(created_by),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 3, max = 50, message = "Coupon code must be 3-50 characters"))]
    #[validate(custom = "validate_coupon_code")]
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    #[validate(range(min = 0.0, message = "Discount value cannot be negative"))]
    pub discount_value: Option<f64>,
    #[validate(range(min = 0.0, message = "Minimum purchase amount cannot be negative"))]
    pub min_purchase_amount: Option<f64>,
    /// `null` removes the cap
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>, nullable)]
    pub max_discount_amount: Option<Option<f64>>,
    /// `null` makes the coupon unlimited
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i32>, nullable)]
    pub usage_limit: Option<Option<i32>>,
    pub valid_from: Option<DateTime<Utc>>,
    /// `null` makes the coupon open-ended
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<DateTime<Utc>>, nullable)]
    pub valid_to: Option<Option<DateTime<Utc>>>,
    pub applicable_to: Option<ApplicableTo>,
    pub applicable_items: Option<Vec<Uuid>>,
    pub status: Option<CouponStatus>,
}

impl UpdateCouponRequest {
    /// Cross-field rules evaluated against the merged result
    pub fn validate_against(&self, current: &Coupon) -> Result<(), String> {
        if matches!(self.max_discount_amount, Some(Some(cap)) if cap < 0.0) {
            return Err("Maximum discount amount cannot be negative".to_string());
        }
        if matches!(self.usage_limit, Some(Some(limit)) if limit < 0) {
            return Err("Usage limit cannot be negative".to_string());
        }
        check_cross_fields(
            self.discount_type.unwrap_or(current.discount_type),
            self.discount_value.unwrap_or(current.discount_value),
            Some(self.valid_from.unwrap_or(current.valid_from)),
            self.valid_to.unwrap_or(current.valid_to),
        )
    }
}

impl From<UpdateCouponRequest> for CouponChanges {
    fn from(req: UpdateCouponRequest) -> Self {
        CouponChanges {
            code: req.code.map(|c| c.trim().to_uppercase()),
            description: patch_optional(req.description),
            discount_type: req.discount_type,
            discount_value: req.discount_value,
            min_purchase_amount: req.min_purchase_amount,
            max_discount_amount: req.max_discount_amount,
            usage_limit: req.usage_limit,
            valid_from: req.valid_from,
            valid_to: req.valid_to,
            applicable_to: req.applicable_to,
            applicable_items: req.applicable_items,
            status: req.status,
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({"code": "SAVE10", "amount": 1000}))]
pub struct ValidateCouponRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Please provide a coupon code"))]
    pub code: String,

    #[validate(range(min = 0.0, message = "Amount cannot be negative"))]
    pub amount: f64,

    pub item_id: Option<Uuid>,

    pub item_type: Option<super::purchase::ItemType>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    pub valid: bool,
    pub message: String,
    pub discount: f64,
    pub final_amount: f64,
    pub coupon: Option<Coupon>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CouponFilter {
    /// Matches code or description
    pub search: Option<String>,
    /// Active, Inactive or Expired
    pub status: Option<String>,
    /// percentage or fixed
    pub discount_type: Option<String>,
    /// all, courses or programs
    pub applicable_to: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CouponQuery {
    pub search: Option<String>,
    pub status: Option<CouponStatus>,
    pub discount_type: Option<DiscountType>,
    pub applicable_to: Option<ApplicableTo>,
}

impl Coupon {
    fn filtered(filter: &CouponQuery) -> coupons::BoxedQuery<'static, Pg> {
        let mut query = coupons::table.into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(coupons::status.eq(status));
        }
        if let Some(discount_type) = filter.discount_type {
            query = query.filter(coupons::discount_type.eq(discount_type));
        }
        if let Some(applicable_to) = filter.applicable_to {
            query = query.filter(coupons::applicable_to.eq(applicable_to));
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            query = query.filter(
                coupons::code
                    .ilike(pattern.clone())
                    .or(coupons::description.ilike(pattern)),
            );
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &CouponQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<Coupon>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, coupons::created_at, {
                    "code" => coupons::code,
                    "discountValue" => coupons::discount_value,
                    "usedCount" => coupons::used_count,
                    "validTo" => coupons::valid_to,
                    "updatedAt" => coupons::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<Coupon>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, coupon_id: Uuid) -> QueryResult<Self> {
        coupons::table.find(coupon_id).first(conn).await
    }

    /// Codes are stored uppercase; lookups normalize the input the same way
    pub async fn find_by_code(
        conn: &mut AsyncPgConnection,
        raw_code: &str,
    ) -> QueryResult<Option<Self>> {
        coupons::table
            .filter(coupons::code.eq(raw_code.trim().to_uppercase()))
            .first(conn)
            .await
            .optional()
    }

    pub async fn create(conn: &mut AsyncPgConnection, new: NewCoupon) -> QueryResult<Self> {
        diesel::insert_into(coupons::table)
            .values(&new)
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        coupon_id: Uuid,
        changes: CouponChanges,
    ) -> QueryResult<Self> {
        diesel::update(coupons::table.find(coupon_id))
            .set(&changes)
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, coupon_id: Uuid) -> QueryResult<usize> {
        diesel::delete(coupons::table.find(coupon_id))
            .execute(conn)
            .await
    }

    /// Atomically claim one use. Returns false when the limit was reached
    /// by a concurrent redemption.
    pub async fn claim_use(conn: &mut AsyncPgConnection, coupon_id: Uuid) -> QueryResult<bool> {
        let updated = diesel::update(
            coupons::table.find(coupon_id).filter(
                coupons::usage_limit
                    .is_null()
                    .or(coupons::used_count.nullable().lt(coupons::usage_limit)),
            ),
        )
        .set((
            coupons::used_count.eq(coupons::used_count + 1),
            coupons::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .await?;

        Ok(updated == 1)
    }
}
