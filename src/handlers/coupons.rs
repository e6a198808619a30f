// Coupon handlers: admin CRUD plus the redemption preview any signed-in
// user may call

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
        coupon::{
            Coupon, CouponChanges, CouponFilter, CouponQuery, CouponValidation,
            CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest,
        },
        pagination::{PageQuery, PageRequest},
        parse_filter,
        response::ApiResponse,
    },
    services::CouponService,
    utils::{trim_optional_field, ApiError, ApiResult, AuditAction, AuditLogger, OrNotFound},
};

/// GET /api/coupons
#[utoipa::path(
    get,
    path = "/coupons",
    tag = "Coupons",
    operation_id = "listCoupons",
    params(PageQuery, CouponFilter),
    responses(
        (status = 200, description = "Paginated coupons", body = [Coupon]),
        (status = 400, description = "Invalid filter value"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CouponFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = CouponQuery {
        search: trim_optional_field(filter.search.as_ref()),
        status: parse_filter(filter.status.as_deref())?,
        discount_type: parse_filter(filter.discount_type.as_deref())?,
        applicable_to: parse_filter(filter.applicable_to.as_deref())?,
    };

    let page = Coupon::list(&state.diesel_pool, &query, &request).await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/coupons/{id}
#[utoipa::path(
    get,
    path = "/coupons/{id}",
    tag = "Coupons",
    operation_id = "getCoupon",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    responses(
        (status = 200, description = "Coupon", body = Coupon),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Coupon not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let coupon = Coupon::find_by_id(&mut conn, coupon_id)
        .await
        .or_not_found("Coupon")?;

    Ok(ApiResponse::ok(coupon))
}

/// Create a coupon. Codes are stored uppercase.
/// POST /api/coupons
#[utoipa::path(
    post,
    path = "/coupons",
    tag = "Coupons",
    operation_id = "createCoupon",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created", body = Coupon),
        (status = 400, description = "Validation failed or duplicate code"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateCouponRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    request.validate_rules().map_err(ApiError::Validation)?;

    let mut conn = state.diesel_pool.get().await?;
    let coupon = Coupon::create(&mut conn, request.into_new(auth_user.user_id)).await?;

    AuditLogger::record(
        AuditAction::Created,
        auth_user.user_id,
        "coupon",
        Some(coupon.id),
        Some(coupon.code.clone()),
    );

    Ok(ApiResponse::created(coupon).with_message("Coupon created successfully"))
}

/// Update a coupon. Cross-field rules apply to the merged result.
/// PUT /api/coupons/{id}
#[utoipa::path(
    put,
    path = "/coupons/{id}",
    tag = "Coupons",
    operation_id = "updateCoupon",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    request_body = UpdateCouponRequest,
    responses(
        (status = 200, description = "Coupon updated", body = Coupon),
        (status = 400, description = "Validation failed or duplicate code"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Coupon not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(coupon_id): Path<Uuid>,
    Json(request): Json<UpdateCouponRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let current = Coupon::find_by_id(&mut conn, coupon_id)
        .await
        .or_not_found("Coupon")?;
    request
        .validate_against(&current)
        .map_err(ApiError::Validation)?;

    let coupon = Coupon::update(&mut conn, coupon_id, CouponChanges::from(request))
        .await
        .or_not_found("Coupon")?;

    AuditLogger::record(
        AuditAction::Updated,
        auth_user.user_id,
        "coupon",
        Some(coupon.id),
        Some(coupon.code.clone()),
    );

    Ok(ApiResponse::ok(coupon).with_message("Coupon updated successfully"))
}

/// DELETE /api/coupons/{id}
#[utoipa::path(
    delete,
    path = "/coupons/{id}",
    tag = "Coupons",
    operation_id = "deleteCoupon",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    responses(
        (status = 200, description = "Coupon deleted"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Coupon not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(coupon_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    if Coupon::delete(&mut conn, coupon_id).await? == 0 {
        return Err(ApiError::not_found("Coupon"));
    }

    AuditLogger::record(AuditAction::Deleted, auth_user.user_id, "coupon", Some(coupon_id), None);

    Ok(ApiResponse::message("Coupon deleted successfully"))
}

/// Preview a coupon against an amount without consuming a use. A failed rule
/// is reported in the body with `valid: false`.
/// POST /api/coupons/validate
#[utoipa::path(
    post,
    path = "/coupons/validate",
    tag = "Coupons",
    operation_id = "validateCoupon",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Validation outcome", body = CouponValidation),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "Invalid coupon code")
    ),
    security(("bearerAuth" = []))
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let outcome = CouponService::new(&state).validate(request).await?;
    let message = outcome.message.clone();
    Ok(ApiResponse::ok(outcome).with_message(message))
}
