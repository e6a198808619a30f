// University handlers

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
        catalog::{
            CreateUniversityRequest, University, UniversityFilter, UniversityQuery,
            UniversityView, UpdateUniversityRequest,
        },
        pagination::{Page, PageQuery, PageRequest},
        parse_filter,
        response::ApiResponse,
    },
    utils::{
        resolve_slug, trim_optional_field, ApiError, ApiResult, AuditAction, AuditLogger,
        OrNotFound,
    },
};

/// List universities with their country
/// GET /api/universities
#[utoipa::path(
    get,
    path = "/universities",
    tag = "Universities",
    operation_id = "listUniversities",
    params(PageQuery, UniversityFilter),
    responses(
        (status = 200, description = "Paginated universities", body = [UniversityView]),
        (status = 400, description = "Invalid filter value")
    )
)]
pub async fn list_universities(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<UniversityFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = UniversityQuery {
        search: trim_optional_field(filter.search.as_ref()),
        country: filter.country,
        status: parse_filter(filter.status.as_deref())?,
    };

    let Page { items, pagination } =
        University::list(&state.diesel_pool, &query, &request).await?;
    let mut conn = state.diesel_pool.get().await?;
    let items = University::populate(&mut conn, items).await?;

    Ok(ApiResponse::page(Page { items, pagination }))
}

/// GET /api/universities/{id}
#[utoipa::path(
    get,
    path = "/universities/{id}",
    tag = "Universities",
    operation_id = "getUniversity",
    params(("id" = Uuid, Path, description = "University ID")),
    responses(
        (status = 200, description = "University", body = UniversityView),
        (status = 404, description = "University not found")
    )
)]
pub async fn get_university(
    State(state): State<AppState>,
    Path(university_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let university = University::find_by_id(&mut conn, university_id)
        .await
        .or_not_found("University")?;

    let view = University::populate(&mut conn, vec![university])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("University"))?;

    Ok(ApiResponse::ok(view))
}

/// Create a university. The slug is derived from the name when omitted.
/// POST /api/universities
#[utoipa::path(
    post,
    path = "/universities",
    tag = "Universities",
    operation_id = "createUniversity",
    request_body = CreateUniversityRequest,
    responses(
        (status = 201, description = "University created", body = University),
        (status = 400, description = "Validation failed or duplicate slug"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_university(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateUniversityRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    let slug = resolve_slug(request.slug.as_ref(), &request.name).map_err(ApiError::Validation)?;

    let mut conn = state.diesel_pool.get().await?;
    let university = University::create(&mut conn, request.into_new(slug)).await?;

    AuditLogger::record(
        AuditAction::Created,
        auth_user.user_id,
        "university",
        Some(university.id),
        Some(university.slug.clone()),
    );

    Ok(ApiResponse::created(university).with_message("University created successfully"))
}

/// PUT /api/universities/{id}
#[utoipa::path(
    put,
    path = "/universities/{id}",
    tag = "Universities",
    operation_id = "updateUniversity",
    params(("id" = Uuid, Path, description = "University ID")),
    request_body = UpdateUniversityRequest,
    responses(
        (status = 200, description = "University updated", body = University),
        (status = 400, description = "Validation failed or duplicate slug"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "University not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_university(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(university_id): Path<Uuid>,
    Json(request): Json<UpdateUniversityRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    let slug = match request.slug.as_ref() {
        Some(explicit) => Some(resolve_slug(Some(explicit), "").map_err(ApiError::Validation)?),
        None => None,
    };

    let mut conn = state.diesel_pool.get().await?;
    let university = University::update(&mut conn, university_id, request.into_changes(slug))
        .await
        .or_not_found("University")?;

    AuditLogger::record(
        AuditAction::Updated,
        auth_user.user_id,
        "university",
        Some(university.id),
        None,
    );

    Ok(ApiResponse::ok(university).with_message("University updated successfully"))
}

/// DELETE /api/universities/{id}
#[utoipa::path(
    delete,
    path = "/universities/{id}",
    tag = "Universities",
    operation_id = "deleteUniversity",
    params(("id" = Uuid, Path, description = "University ID")),
    responses(
        (status = 200, description = "University deleted"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "University not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_university(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(university_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    if University::delete(&mut conn, university_id).await? == 0 {
        return Err(ApiError::not_found("University"));
    }

    AuditLogger::record(
        AuditAction::Deleted,
        auth_user.user_id,
        "university",
        Some(university_id),
        None,
    );

    Ok(ApiResponse::message("University deleted successfully"))
}
