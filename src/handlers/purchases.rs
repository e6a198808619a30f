// Purchase and reward handlers

use axum::{
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        pagination::{Page, PageQuery, PageRequest},
        parse_filter,
        purchase::{
            CreatePurchaseRequest, Purchase, PurchaseFilter, PurchaseQuery, PurchaseReceipt,
            PurchaseView, Reward, RewardBalance,
        },
        response::ApiResponse,
    },
    services::PurchaseService,
    utils::{ApiError, ApiResult, OrNotFound},
};

async fn populated_page(
    state: &AppState,
    query: &PurchaseQuery,
    request: &PageRequest,
) -> ApiResult<Page<PurchaseView>> {
    let Page { items, pagination } = Purchase::list(&state.diesel_pool, query, request).await?;
    let mut conn = state.diesel_pool.get().await?;
    let items = Purchase::populate(&mut conn, items).await?;
    Ok(Page { items, pagination })
}

/// Buy a course or program, optionally with a coupon
/// POST /api/purchases
#[utoipa::path(
    post,
    path = "/purchases",
    tag = "Purchases",
    operation_id = "createPurchase",
    request_body = CreatePurchaseRequest,
    responses(
        (status = 201, description = "Purchase completed", body = PurchaseReceipt),
        (status = 400, description = "Validation failed, item unavailable, already purchased or coupon rejected"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "Item or coupon not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_purchase(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreatePurchaseRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let receipt = PurchaseService::new(&state)
        .purchase(auth_user.user_id, request)
        .await?;

    Ok(ApiResponse::created(receipt).with_message("Purchase completed successfully"))
}

/// Purchases of the current user
/// GET /api/purchases/my-purchases
#[utoipa::path(
    get,
    path = "/purchases/my-purchases",
    tag = "Purchases",
    operation_id = "listMyPurchases",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated purchases", body = [PurchaseView]),
        (status = 401, description = "Unauthorized - invalid or missing token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn my_purchases(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = PurchaseQuery {
        student: Some(auth_user.user_id),
        ..Default::default()
    };

    Ok(ApiResponse::page(populated_page(&state, &query, &request).await?))
}

/// All purchases
/// GET /api/purchases
#[utoipa::path(
    get,
    path = "/purchases",
    tag = "Purchases",
    operation_id = "listPurchases",
    params(PageQuery, PurchaseFilter),
    responses(
        (status = 200, description = "Paginated purchases", body = [PurchaseView]),
        (status = 400, description = "Invalid filter value"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<PurchaseFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = PurchaseQuery {
        payment_status: parse_filter(filter.payment_status.as_deref())?,
        item_type: parse_filter(filter.item_type.as_deref())?,
        student: filter.student,
    };

    Ok(ApiResponse::page(populated_page(&state, &query, &request).await?))
}

/// GET /api/purchases/{id}
#[utoipa::path(
    get,
    path = "/purchases/{id}",
    tag = "Purchases",
    operation_id = "getPurchase",
    params(("id" = Uuid, Path, description = "Purchase ID")),
    responses(
        (status = 200, description = "Purchase", body = PurchaseView),
        (status = 403, description = "Forbidden - not the buyer"),
        (status = 404, description = "Purchase not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_purchase(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(purchase_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let purchase = Purchase::find_by_id(&mut conn, purchase_id)
        .await
        .or_not_found("Purchase")?;

    if !auth_user.is_admin() && purchase.student_id != auth_user.user_id {
        return Err(ApiError::Forbidden(
            "Not authorized to access this purchase".to_string(),
        ));
    }

    let view = Purchase::populate(&mut conn, vec![purchase])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Purchase"))?;

    Ok(ApiResponse::ok(view))
}

/// Reward totals of the current user
/// GET /api/purchases/rewards/me
#[utoipa::path(
    get,
    path = "/purchases/rewards/me",
    tag = "Purchases",
    operation_id = "getMyRewards",
    responses(
        (status = 200, description = "Reward totals", body = RewardBalance),
        (status = 401, description = "Unauthorized - invalid or missing token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn my_rewards(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let balance = Reward::find_by_user(&mut conn, auth_user.user_id)
        .await?
        .map(RewardBalance::from)
        .unwrap_or_default();

    Ok(ApiResponse::ok(balance))
}
