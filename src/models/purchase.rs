// Purchases of catalog items and the per-user reward ledger

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::catalog::{Course, CourseSummary, Program, ProgramSummary};
use super::coupon::round_money;
use super::pagination::{paginate, Page, PageRequest};
use super::user::{User, UserSummary};
use crate::apply_sort;
use crate::db::DieselPool;
use crate::schema::{purchases, rewards};
use crate::utils::validation::trimmed_opt;
use crate::utils::ApiResult;

/// Percentage of the final amount returned as cashback and as points
pub const REWARD_PERCENT: f64 = 10.0;
/// Upper bound on points earned by a single purchase
pub const MAX_POINTS_PER_PURCHASE: i32 = 500;

text_enum! {
    ItemType {
        Course => "course",
        Program => "program",
    }
}

text_enum! {
    PaymentStatus {
        Pending => "Pending",
        Completed => "Completed",
        Failed => "Failed",
        Refunded => "Refunded",
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = purchases)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Option<Uuid>,
    pub program_id: Option<Uuid>,
    pub item_type: ItemType,
    pub original_amount: f64,
    pub coupon_id: Option<Uuid>,
    pub coupon_code: Option<String>,
    pub discount_amount: f64,
    pub final_amount: f64,
    pub cashback_earned: f64,
    pub points_earned: i32,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    pub fn item_id(&self) -> Option<Uuid> {
        match self.item_type {
            ItemType::Course => self.course_id,
            ItemType::Program => self.program_id,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = purchases)]
pub struct NewPurchase {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Option<Uuid>,
    pub program_id: Option<Uuid>,
    pub item_type: ItemType,
    pub original_amount: f64,
    pub coupon_id: Option<Uuid>,
    pub coupon_code: Option<String>,
    pub discount_amount: f64,
    pub final_amount: f64,
    pub cashback_earned: f64,
    pub points_earned: i32,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
}

impl NewPurchase {
    /// Exactly one of course/program is set, chosen by `item_type`
    pub fn for_item(student_id: Uuid, item_type: ItemType, item_id: Uuid) -> Self {
        let (course_id, program_id) = match item_type {
            ItemType::Course => (Some(item_id), None),
            ItemType::Program => (None, Some(item_id)),
        };
        NewPurchase {
            id: Uuid::new_v4(),
            student_id,
            course_id,
            program_id,
            item_type,
            original_amount: 0.0,
            coupon_id: None,
            coupon_code: None,
            discount_amount: 0.0,
            final_amount: 0.0,
            cashback_earned: 0.0,
            points_earned: 0,
            payment_method: None,
            payment_status: PaymentStatus::Completed,
            transaction_id: None,
        }
    }
}

/// Cashback and points earned by one purchase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardAccrual {
    pub cashback: f64,
    pub points: i32,
}

impl RewardAccrual {
    pub fn from_final_amount(final_amount: f64) -> Self {
        let base = final_amount.max(0.0) * REWARD_PERCENT / 100.0;
        let points = (base.floor() as i64).min(MAX_POINTS_PER_PURCHASE as i64) as i32;
        RewardAccrual {
            cashback: round_money(base),
            points,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = rewards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_points: i64,
    pub available_points: i64,
    pub total_cashback: f64,
    pub available_cashback: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reward {
    pub async fn find_by_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> QueryResult<Option<Self>> {
        rewards::table
            .filter(rewards::user_id.eq(owner))
            .first(conn)
            .await
            .optional()
    }

    /// Add an accrual to the user's running totals, creating the row on the
    /// first purchase. A single statement, so concurrent purchases by the
    /// same user cannot lose an increment.
    pub async fn accrue(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        accrual: RewardAccrual,
    ) -> QueryResult<Self> {
        let points = accrual.points as i64;
        diesel::insert_into(rewards::table)
            .values((
                rewards::id.eq(Uuid::new_v4()),
                rewards::user_id.eq(owner),
                rewards::total_points.eq(points),
                rewards::available_points.eq(points),
                rewards::total_cashback.eq(accrual.cashback),
                rewards::available_cashback.eq(accrual.cashback),
            ))
            .on_conflict(rewards::user_id)
            .do_update()
            .set((
                rewards::total_points.eq(rewards::total_points + excluded(rewards::total_points)),
                rewards::available_points
                    .eq(rewards::available_points + excluded(rewards::available_points)),
                rewards::total_cashback
                    .eq(rewards::total_cashback + excluded(rewards::total_cashback)),
                rewards::available_cashback
                    .eq(rewards::available_cashback + excluded(rewards::available_cashback)),
                rewards::updated_at.eq(Utc::now()),
            ))
            .get_result(conn)
            .await
    }
}

/// Reward totals as returned to the owner; zeros before the first purchase
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardBalance {
    pub total_points: i64,
    pub available_points: i64,
    pub total_cashback: f64,
    pub available_cashback: f64,
}

impl From<Reward> for RewardBalance {
    fn from(reward: Reward) -> Self {
        RewardBalance {
            total_points: reward.total_points,
            available_points: reward.available_points,
            total_cashback: reward.total_cashback,
            available_cashback: reward.available_cashback,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "itemId": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
    "itemType": "course",
    "couponCode": "SAVE10",
    "paymentMethod": "card"
}))]
pub struct CreatePurchaseRequest {
    pub item_id: Uuid,

    pub item_type: ItemType,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 50, message = "Coupon code must be 1-50 characters"))]
    pub coupon_code: Option<String>,

    #[validate(length(max = 40, message = "Payment method must be at most 40 characters"))]
    pub payment_method: Option<String>,

    #[validate(length(max = 120, message = "Transaction id must be at most 120 characters"))]
    pub transaction_id: Option<String>,
}

/// Result of a completed purchase
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub rewards: RewardBalance,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PurchaseFilter {
    /// Pending, Completed, Failed or Refunded
    pub payment_status: Option<String>,
    /// course or program
    pub item_type: Option<String>,
    /// Student user id
    pub student: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct PurchaseQuery {
    pub payment_status: Option<PaymentStatus>,
    pub item_type: Option<ItemType>,
    pub student: Option<Uuid>,
}

/// Purchase with the bought item and the student resolved
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseView {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub course: Option<CourseSummary>,
    pub program: Option<ProgramSummary>,
    pub student: Option<UserSummary>,
}

impl Purchase {
    fn filtered(filter: &PurchaseQuery) -> purchases::BoxedQuery<'static, Pg> {
        let mut query = purchases::table.into_boxed();

        if let Some(status) = filter.payment_status {
            query = query.filter(purchases::payment_status.eq(status));
        }
        if let Some(item_type) = filter.item_type {
            query = query.filter(purchases::item_type.eq(item_type));
        }
        if let Some(student) = filter.student {
            query = query.filter(purchases::student_id.eq(student));
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &PurchaseQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<Purchase>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, purchases::created_at, {
                    "finalAmount" => purchases::final_amount,
                    "originalAmount" => purchases::original_amount,
                    "paymentStatus" => purchases::payment_status,
                    "updatedAt" => purchases::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<Purchase>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, purchase_id: Uuid) -> QueryResult<Self> {
        purchases::table.find(purchase_id).first(conn).await
    }

    /// Whether the student already holds a completed purchase of the item
    pub async fn has_completed(
        conn: &mut AsyncPgConnection,
        student: Uuid,
        item_type: ItemType,
        item_id: Uuid,
    ) -> QueryResult<bool> {
        let query = purchases::table
            .filter(purchases::student_id.eq(student))
            .filter(purchases::payment_status.eq(PaymentStatus::Completed))
            .into_boxed();
        let query = match item_type {
            ItemType::Course => query.filter(purchases::course_id.eq(item_id)),
            ItemType::Program => query.filter(purchases::program_id.eq(item_id)),
        };

        diesel::select(diesel::dsl::exists(query.select(purchases::id)))
            .get_result(conn)
            .await
    }

    pub async fn create(conn: &mut AsyncPgConnection, new: NewPurchase) -> QueryResult<Self> {
        diesel::insert_into(purchases::table)
            .values(&new)
            .get_result(conn)
            .await
    }

    pub async fn populate(
        conn: &mut AsyncPgConnection,
        items: Vec<Purchase>,
    ) -> QueryResult<Vec<PurchaseView>> {
        let course_ids: Vec<Uuid> = items.iter().filter_map(|p| p.course_id).collect();
        let program_ids: Vec<Uuid> = items.iter().filter_map(|p| p.program_id).collect();
        let student_ids: Vec<Uuid> = items.iter().map(|p| p.student_id).collect();

        let courses = Course::summaries(conn, &course_ids).await?;
        let programs = Program::summaries(conn, &program_ids).await?;
        let students = User::summaries(conn, &student_ids).await?;

        Ok(items
            .into_iter()
            .map(|purchase| PurchaseView {
                course: purchase.course_id.and_then(|id| courses.get(&id).cloned()),
                program: purchase.program_id.and_then(|id| programs.get(&id).cloned()),
                student: students.get(&purchase.student_id).cloned(),
                purchase,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_accrual() {
        let accrual = RewardAccrual::from_final_amount(950.0);
        assert_eq!(accrual.cashback, 95.0);
        assert_eq!(accrual.points, 95);

        let fractional = RewardAccrual::from_final_amount(1234.5);
        assert_eq!(fractional.cashback, 123.45);
        assert_eq!(fractional.points, 123);
    }

    #[test]
    fn test_points_are_capped() {
        let accrual = RewardAccrual::from_final_amount(1_000_000.0);
        assert_eq!(accrual.points, MAX_POINTS_PER_PURCHASE);
        assert_eq!(accrual.cashback, 100_000.0);

        let edge = RewardAccrual::from_final_amount(5_009.0);
        assert_eq!(edge.points, 500);
    }

    #[test]
    fn test_free_purchase_earns_nothing() {
        let accrual = RewardAccrual::from_final_amount(0.0);
        assert_eq!(accrual, RewardAccrual { cashback: 0.0, points: 0 });
    }

    #[test]
    fn test_new_purchase_references_one_item() {
        let item = Uuid::new_v4();
        let course = NewPurchase::for_item(Uuid::new_v4(), ItemType::Course, item);
        assert_eq!(course.course_id, Some(item));
        assert!(course.program_id.is_none());

        let program = NewPurchase::for_item(Uuid::new_v4(), ItemType::Program, item);
        assert_eq!(program.program_id, Some(item));
        assert!(program.course_id.is_none());
        assert_eq!(program.payment_status, PaymentStatus::Completed);
    }

    #[test]
    fn test_request_rejects_unknown_item_type() {
        let parsed: Result<CreatePurchaseRequest, _> = serde_json::from_value(serde_json::json!({
            "itemId": Uuid::new_v4(),
            "itemType": "bundle"
        }));
        assert!(parsed.is_err());
    }
}
