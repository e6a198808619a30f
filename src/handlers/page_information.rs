// Page information (CMS) handlers. Admin CRUD plus the public slug lookup
// used by the marketing site.

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
        page_information::{
            validate_sections, CreatePageInformationRequest, PageInformation,
            PageInformationFilter, PageInformationQuery, UpdatePageInformationRequest,
        },
        pagination::{PageQuery, PageRequest},
        parse_filter,
        response::ApiResponse,
    },
    utils::{
        resolve_slug, trim_optional_field, ApiError, ApiResult, AuditAction, AuditLogger,
        OrNotFound,
    },
};

/// GET /api/page-information
#[utoipa::path(
    get,
    path = "/page-information",
    tag = "Page Information",
    operation_id = "listPages",
    params(PageQuery, PageInformationFilter),
    responses(
        (status = 200, description = "Paginated pages", body = [PageInformation]),
        (status = 400, description = "Invalid filter value"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_pages(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<PageInformationFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = PageInformationQuery {
        search: trim_optional_field(filter.search.as_ref()),
        status: parse_filter(filter.status.as_deref())?,
    };

    let page = PageInformation::list(&state.diesel_pool, &query, &request).await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/page-information/{id}
#[utoipa::path(
    get,
    path = "/page-information/{id}",
    tag = "Page Information",
    operation_id = "getPage",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Page", body = PageInformation),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Page not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let page = PageInformation::find_by_id(&mut conn, page_id)
        .await
        .or_not_found("Page")?;

    Ok(ApiResponse::ok(page))
}

/// Published page by slug. Drafts are visible in development only.
/// GET /api/page-information/public/{slug}
#[utoipa::path(
    get,
    path = "/page-information/public/{slug}",
    tag = "Page Information",
    operation_id = "getPublicPage",
    params(("slug" = String, Path, description = "Page slug")),
    responses(
        (status = 200, description = "Page", body = PageInformation),
        (status = 404, description = "Page not found")
    )
)]
pub async fn get_public_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let published_only = !state.config.is_development();

    let mut conn = state.diesel_pool.get().await?;
    let page = PageInformation::find_by_slug(&mut conn, &slug, published_only)
        .await?
        .ok_or_else(|| ApiError::not_found("Page"))?;

    Ok(ApiResponse::ok(page))
}

/// Create a page. Sections are stored ordered by their `order` field.
/// POST /api/page-information
#[utoipa::path(
    post,
    path = "/page-information",
    tag = "Page Information",
    operation_id = "createPage",
    request_body = CreatePageInformationRequest,
    responses(
        (status = 201, description = "Page created", body = PageInformation),
        (status = 400, description = "Validation failed or duplicate slug"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_page(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreatePageInformationRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    validate_sections(&request.sections)?;
    let slug =
        resolve_slug(request.slug.as_ref(), &request.page_name).map_err(ApiError::Validation)?;

    let mut conn = state.diesel_pool.get().await?;
    let page = PageInformation::create(&mut conn, request.into_new(slug, auth_user.user_id)).await?;

    AuditLogger::record(
        AuditAction::Created,
        auth_user.user_id,
        "page_information",
        Some(page.id),
        Some(page.slug.clone()),
    );

    Ok(ApiResponse::created(page).with_message("Page created successfully"))
}

/// PUT /api/page-information/{id}
#[utoipa::path(
    put,
    path = "/page-information/{id}",
    tag = "Page Information",
    operation_id = "updatePage",
    params(("id" = Uuid, Path, description = "Page ID")),
    request_body = UpdatePageInformationRequest,
    responses(
        (status = 200, description = "Page updated", body = PageInformation),
        (status = 400, description = "Validation failed or duplicate slug"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Page not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_page(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(page_id): Path<Uuid>,
    Json(request): Json<UpdatePageInformationRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    if let Some(sections) = request.sections.as_deref() {
        validate_sections(sections)?;
    }
    let slug = match request.slug.as_ref() {
        Some(explicit) => Some(resolve_slug(Some(explicit), "").map_err(ApiError::Validation)?),
        None => None,
    };

    let mut conn = state.diesel_pool.get().await?;
    let page = PageInformation::update(&mut conn, page_id, request.into_changes(slug))
        .await
        .or_not_found("Page")?;

    AuditLogger::record(
        AuditAction::Updated,
        auth_user.user_id,
        "page_information",
        Some(page.id),
        Some(format!("status={}", page.status)),
    );

    Ok(ApiResponse::ok(page).with_message("Page updated successfully"))
}

/// DELETE /api/page-information/{id}
#[utoipa::path(
    delete,
    path = "/page-information/{id}",
    tag = "Page Information",
    operation_id = "deletePage",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Page deleted"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Page not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_page(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(page_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    if PageInformation::delete(&mut conn, page_id).await? == 0 {
        return Err(ApiError::not_found("Page"));
    }

    AuditLogger::record(
        AuditAction::Deleted,
        auth_user.user_id,
        "page_information",
        Some(page_id),
        None,
    );

    Ok(ApiResponse::message("Page deleted successfully"))
}
