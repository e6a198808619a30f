// Program handlers

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
            CreateProgramRequest, Program, ProgramFilter, ProgramQuery, UpdateProgramRequest,
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

/// GET /api/programs
#[utoipa::path(
    get,
    path = "/programs",
    tag = "Programs",
    operation_id = "listPrograms",
    params(PageQuery, ProgramFilter),
    responses(
        (status = 200, description = "Paginated programs", body = [Program]),
        (status = 400, description = "Invalid filter value")
    )
)]
pub async fn list_programs(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<ProgramFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = ProgramQuery {
        search: trim_optional_field(filter.search.as_ref()),
        status: parse_filter(filter.status.as_deref())?,
    };

    let page = Program::list(&state.diesel_pool, &query, &request).await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/programs/{id}
#[utoipa::path(
    get,
    path = "/programs/{id}",
    tag = "Programs",
    operation_id = "getProgram",
    params(("id" = Uuid, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Program", body = Program),
        (status = 404, description = "Program not found")
    )
)]
pub async fn get_program(
    State(state): State<AppState>,
    Path(program_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let program = Program::find_by_id(&mut conn, program_id)
        .await
        .or_not_found("Program")?;

    Ok(ApiResponse::ok(program))
}

/// POST /api/programs
#[utoipa::path(
    post,
    path = "/programs",
    tag = "Programs",
    operation_id = "createProgram",
    request_body = CreateProgramRequest,
    responses(
        (status = 201, description = "Program created", body = Program),
        (status = 400, description = "Validation failed or duplicate slug"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_program(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateProgramRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    let slug =
        resolve_slug(request.slug.as_ref(), &request.title).map_err(ApiError::Validation)?;

    let mut conn = state.diesel_pool.get().await?;
    let program = Program::create(&mut conn, request.into_new(slug)).await?;

    AuditLogger::record(
        AuditAction::Created,
        auth_user.user_id,
        "program",
        Some(program.id),
        Some(program.slug.clone()),
    );

    Ok(ApiResponse::created(program).with_message("Program created successfully"))
}

/// PUT /api/programs/{id}
#[utoipa::path(
    put,
    path = "/programs/{id}",
    tag = "Programs",
    operation_id = "updateProgram",
    params(("id" = Uuid, Path, description = "Program ID")),
    request_body = UpdateProgramRequest,
    responses(
        (status = 200, description = "Program updated", body = Program),
        (status = 400, description = "Validation failed or duplicate slug"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Program not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_program(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(program_id): Path<Uuid>,
    Json(request): Json<UpdateProgramRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    let slug = match request.slug.as_ref() {
        Some(explicit) => Some(resolve_slug(Some(explicit), "").map_err(ApiError::Validation)?),
        None => None,
    };

    let mut conn = state.diesel_pool.get().await?;
    let program = Program::update(&mut conn, program_id, request.into_changes(slug))
        .await
        .or_not_found("Program")?;

    AuditLogger::record(AuditAction::Updated, auth_user.user_id, "program", Some(program.id), None);

    Ok(ApiResponse::ok(program).with_message("Program updated successfully"))
}

/// DELETE /api/programs/{id}
#[utoipa::path(
    delete,
    path = "/programs/{id}",
    tag = "Programs",
    operation_id = "deleteProgram",
    params(("id" = Uuid, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Program deleted"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Program not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_program(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(program_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    if Program::delete(&mut conn, program_id).await? == 0 {
        return Err(ApiError::not_found("Program"));
    }

    AuditLogger::record(AuditAction::Deleted, auth_user.user_id, "program", Some(program_id), None);

    Ok(ApiResponse::message("Program deleted successfully"))
}
