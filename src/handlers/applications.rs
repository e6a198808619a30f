// Application handlers. Staff see every application; plain users only
// their own.

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
        application::{
            Application, ApplicationChanges, ApplicationFilter, ApplicationQuery,
            ApplicationView, CreateApplicationRequest, NewApplication, UpdateApplicationRequest,
        },
        pagination::{Page, PageQuery, PageRequest},
        parse_filter,
        response::ApiResponse,
    },
    utils::{trim_optional_field, ApiError, ApiResult, AuditAction, AuditLogger, OrNotFound},
};

impl ApplicationFilter {
    fn into_query(self, owner: Option<Uuid>) -> ApiResult<ApplicationQuery> {
        Ok(ApplicationQuery {
            search: trim_optional_field(self.search.as_ref()),
            cams_id: trim_optional_field(self.cams_id.as_ref()),
            student_name: trim_optional_field(self.student_name.as_ref()),
            passport_no: trim_optional_field(self.passport_no.as_ref()),
            student_id: trim_optional_field(self.student_id.as_ref()),
            primary_status: parse_filter(self.primary_status.as_deref())?,
            university: self.university,
            course: self.course,
            owner,
        })
    }
}

/// Load an application the caller is allowed to see
async fn load_visible(
    state: &AppState,
    auth_user: &AuthenticatedUser,
    application_id: Uuid,
) -> ApiResult<Application> {
    let mut conn = state.diesel_pool.get().await?;
    let application = Application::find_by_id(&mut conn, application_id)
        .await
        .or_not_found("Application")?;

    auth_user.require_owner_or_staff(application.user_id)?;
    Ok(application)
}

/// List applications
/// GET /api/applications
#[utoipa::path(
    get,
    path = "/applications",
    tag = "Applications",
    operation_id = "listApplications",
    params(PageQuery, ApplicationFilter),
    responses(
        (status = 200, description = "Paginated applications", body = [ApplicationView]),
        (status = 400, description = "Invalid filter value"),
        (status = 401, description = "Unauthorized - invalid or missing token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_applications(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<ApplicationFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = filter.into_query(auth_user.scope())?;

    let Page { items, pagination } =
        Application::list(&state.diesel_pool, &query, &request).await?;
    let mut conn = state.diesel_pool.get().await?;
    let items = Application::populate(&mut conn, items).await?;

    Ok(ApiResponse::page(Page { items, pagination }))
}

/// GET /api/applications/{id}
#[utoipa::path(
    get,
    path = "/applications/{id}",
    tag = "Applications",
    operation_id = "getApplication",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application", body = ApplicationView),
        (status = 403, description = "Forbidden - not the applicant"),
        (status = 404, description = "Application not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_application(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(application_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let application = load_visible(&state, &auth_user, application_id).await?;

    let mut conn = state.diesel_pool.get().await?;
    let view = Application::populate(&mut conn, vec![application])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Application"))?;

    Ok(ApiResponse::ok(view))
}

/// Create an application owned by the caller
/// POST /api/applications
#[utoipa::path(
    post,
    path = "/applications",
    tag = "Applications",
    operation_id = "createApplication",
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Application created", body = Application),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized - invalid or missing token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_application(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateApplicationRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let application = Application::create(
        &mut conn,
        NewApplication::from_request(request, auth_user.user_id),
    )
    .await?;

    tracing::info!(
        "Application {} created by {}",
        application.id,
        auth_user.user_id
    );

    Ok(ApiResponse::created(application).with_message("Application created successfully"))
}

/// PUT /api/applications/{id}
#[utoipa::path(
    put,
    path = "/applications/{id}",
    tag = "Applications",
    operation_id = "updateApplication",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = UpdateApplicationRequest,
    responses(
        (status = 200, description = "Application updated", body = Application),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden - not the applicant"),
        (status = 404, description = "Application not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_application(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(application_id): Path<Uuid>,
    Json(request): Json<UpdateApplicationRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    load_visible(&state, &auth_user, application_id).await?;

    let mut conn = state.diesel_pool.get().await?;
    let application =
        Application::update(&mut conn, application_id, ApplicationChanges::from(request))
            .await
            .or_not_found("Application")?;

    AuditLogger::record(
        AuditAction::Updated,
        auth_user.user_id,
        "application",
        Some(application.id),
        Some(format!("primaryStatus={}", application.primary_status)),
    );

    Ok(ApiResponse::ok(application).with_message("Application updated successfully"))
}

/// DELETE /api/applications/{id}
#[utoipa::path(
    delete,
    path = "/applications/{id}",
    tag = "Applications",
    operation_id = "deleteApplication",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application deleted"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Application not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_application(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(application_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    if Application::delete(&mut conn, application_id).await? == 0 {
        return Err(ApiError::not_found("Application"));
    }

    AuditLogger::record(
        AuditAction::Deleted,
        auth_user.user_id,
        "application",
        Some(application_id),
        None,
    );

    Ok(ApiResponse::message("Application deleted successfully"))
}
