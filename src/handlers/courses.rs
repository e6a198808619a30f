// Course handlers

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
            Course, CourseFilter, CourseQuery, CourseView, CreateCourseRequest,
            UpdateCourseRequest,
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

/// List courses with their university
/// GET /api/courses
#[utoipa::path(
    get,
    path = "/courses",
    tag = "Courses",
    operation_id = "listCourses",
    params(PageQuery, CourseFilter),
    responses(
        (status = 200, description = "Paginated courses", body = [CourseView]),
        (status = 400, description = "Invalid filter value")
    )
)]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CourseFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = CourseQuery {
        search: trim_optional_field(filter.search.as_ref()),
        university: filter.university,
        level: trim_optional_field(filter.level.as_ref()),
        status: parse_filter(filter.status.as_deref())?,
    };

    let Page { items, pagination } = Course::list(&state.diesel_pool, &query, &request).await?;
    let mut conn = state.diesel_pool.get().await?;
    let items = Course::populate(&mut conn, items).await?;

    Ok(ApiResponse::page(Page { items, pagination }))
}

/// GET /api/courses/{id}
#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "Courses",
    operation_id = "getCourse",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course", body = CourseView),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let course = Course::find_by_id(&mut conn, course_id)
        .await
        .or_not_found("Course")?;

    let view = Course::populate(&mut conn, vec![course])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Course"))?;

    Ok(ApiResponse::ok(view))
}

/// POST /api/courses
#[utoipa::path(
    post,
    path = "/courses",
    tag = "Courses",
    operation_id = "createCourse",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Validation failed or duplicate slug"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_course(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateCourseRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    let slug =
        resolve_slug(request.slug.as_ref(), &request.title).map_err(ApiError::Validation)?;

    let mut conn = state.diesel_pool.get().await?;
    let course = Course::create(&mut conn, request.into_new(slug)).await?;

    AuditLogger::record(
        AuditAction::Created,
        auth_user.user_id,
        "course",
        Some(course.id),
        Some(course.slug.clone()),
    );

    Ok(ApiResponse::created(course).with_message("Course created successfully"))
}

/// PUT /api/courses/{id}
#[utoipa::path(
    put,
    path = "/courses/{id}",
    tag = "Courses",
    operation_id = "updateCourse",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Validation failed or duplicate slug"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Course not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_course(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(course_id): Path<Uuid>,
    Json(request): Json<UpdateCourseRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    let slug = match request.slug.as_ref() {
        Some(explicit) => Some(resolve_slug(Some(explicit), "").map_err(ApiError::Validation)?),
        None => None,
    };

    let mut conn = state.diesel_pool.get().await?;
    let course = Course::update(&mut conn, course_id, request.into_changes(slug))
        .await
        .or_not_found("Course")?;

    AuditLogger::record(AuditAction::Updated, auth_user.user_id, "course", Some(course.id), None);

    Ok(ApiResponse::ok(course).with_message("Course updated successfully"))
}

/// DELETE /api/courses/{id}
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    tag = "Courses",
    operation_id = "deleteCourse",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Course not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_course(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    if Course::delete(&mut conn, course_id).await? == 0 {
        return Err(ApiError::not_found("Course"));
    }

    AuditLogger::record(AuditAction::Deleted, auth_user.user_id, "course", Some(course_id), None);

    Ok(ApiResponse::message("Course deleted successfully"))
}
