// Support ticket handlers

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
        response::ApiResponse,
        support_ticket::{
            CreateSupportTicketRequest, NewSupportTicket, SupportTicket, SupportTicketChanges,
            SupportTicketFilter, SupportTicketQuery, SupportTicketView,
            UpdateSupportTicketRequest,
        },
    },
    utils::{trim_optional_field, ApiError, ApiResult, AuditAction, AuditLogger, OrNotFound},
};

/// Raise a ticket
/// POST /api/support
#[utoipa::path(
    post,
    path = "/support",
    tag = "Support",
    operation_id = "createTicket",
    request_body = CreateSupportTicketRequest,
    responses(
        (status = 201, description = "Ticket created", body = SupportTicket),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized - invalid or missing token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateSupportTicketRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let ticket = SupportTicket::create(
        &mut conn,
        NewSupportTicket::from_request(request, auth_user.user_id),
    )
    .await?;

    tracing::info!(
        "Support ticket {} opened by {} ({})",
        ticket.id,
        auth_user.user_id,
        ticket.priority
    );

    Ok(ApiResponse::created(ticket).with_message("Support ticket created successfully"))
}

/// List tickets. Plain users only see their own.
/// GET /api/support
#[utoipa::path(
    get,
    path = "/support",
    tag = "Support",
    operation_id = "listTickets",
    params(PageQuery, SupportTicketFilter),
    responses(
        (status = 200, description = "Paginated tickets", body = [SupportTicketView]),
        (status = 400, description = "Invalid filter value"),
        (status = 401, description = "Unauthorized - invalid or missing token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<SupportTicketFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = SupportTicketQuery {
        search: trim_optional_field(filter.search.as_ref()),
        status: parse_filter(filter.status.as_deref())?,
        priority: parse_filter(filter.priority.as_deref())?,
        category: trim_optional_field(filter.category.as_ref()),
        owner: auth_user.scope(),
    };

    let Page { items, pagination } =
        SupportTicket::list(&state.diesel_pool, &query, &request).await?;
    let mut conn = state.diesel_pool.get().await?;
    let items = SupportTicket::populate(&mut conn, items).await?;

    Ok(ApiResponse::page(Page { items, pagination }))
}

/// GET /api/support/{id}
#[utoipa::path(
    get,
    path = "/support/{id}",
    tag = "Support",
    operation_id = "getTicket",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Ticket", body = SupportTicketView),
        (status = 403, description = "Forbidden - not the ticket owner"),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(ticket_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let ticket = SupportTicket::find_by_id(&mut conn, ticket_id)
        .await
        .or_not_found("Support ticket")?;
    auth_user.require_owner_or_staff(ticket.user_id)?;

    let view = SupportTicket::populate(&mut conn, vec![ticket])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Support ticket"))?;

    Ok(ApiResponse::ok(view))
}

/// Work a ticket: status, priority, response, assignee
/// PUT /api/support/{id}
#[utoipa::path(
    put,
    path = "/support/{id}",
    tag = "Support",
    operation_id = "updateTicket",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    request_body = UpdateSupportTicketRequest,
    responses(
        (status = 200, description = "Ticket updated", body = SupportTicket),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden - staff only"),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<UpdateSupportTicketRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let ticket = SupportTicket::update(&mut conn, ticket_id, SupportTicketChanges::from(request))
        .await
        .or_not_found("Support ticket")?;

    AuditLogger::record(
        AuditAction::Updated,
        auth_user.user_id,
        "support_ticket",
        Some(ticket.id),
        Some(format!("status={}", ticket.status)),
    );

    Ok(ApiResponse::ok(ticket).with_message("Support ticket updated successfully"))
}

/// DELETE /api/support/{id}
#[utoipa::path(
    delete,
    path = "/support/{id}",
    tag = "Support",
    operation_id = "deleteTicket",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Ticket deleted"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_ticket(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(ticket_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    if SupportTicket::delete(&mut conn, ticket_id).await? == 0 {
        return Err(ApiError::not_found("Support ticket"));
    }

    AuditLogger::record(
        AuditAction::Deleted,
        auth_user.user_id,
        "support_ticket",
        Some(ticket_id),
        None,
    );

    Ok(ApiResponse::message("Support ticket deleted successfully"))
}
