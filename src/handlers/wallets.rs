// Wallet handlers. Owners read their own wallet; admins manage every
// wallet and post ledger transactions.

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
        wallet::{
            CreateWalletRequest, NewWallet, UpdateWalletRequest, Wallet, WalletChanges,
            WalletFilter, WalletQuery, WalletTransaction, WalletTransactionReceipt,
            WalletTransactionRequest, WalletView,
        },
    },
    services::WalletService,
    utils::{ApiError, ApiResult, AuditAction, AuditLogger, OrNotFound},
};

/// Wallet of the current user, opened on first read
/// GET /api/wallets/me
#[utoipa::path(
    get,
    path = "/wallets/me",
    tag = "Wallets",
    operation_id = "getMyWallet",
    responses(
        (status = 200, description = "Wallet", body = Wallet),
        (status = 401, description = "Unauthorized - invalid or missing token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn my_wallet(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let wallet =
        Wallet::get_or_create(&mut conn, auth_user.user_id, &state.config.default_currency)
            .await?;

    Ok(ApiResponse::ok(wallet))
}

/// GET /api/wallets
#[utoipa::path(
    get,
    path = "/wallets",
    tag = "Wallets",
    operation_id = "listWallets",
    params(PageQuery, WalletFilter),
    responses(
        (status = 200, description = "Paginated wallets", body = [WalletView]),
        (status = 400, description = "Invalid filter value"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_wallets(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<WalletFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = WalletQuery {
        status: parse_filter(filter.status.as_deref())?,
        user: filter.user,
    };

    let Page { items, pagination } = Wallet::list(&state.diesel_pool, &query, &request).await?;
    let mut conn = state.diesel_pool.get().await?;
    let items = Wallet::populate(&mut conn, items).await?;

    Ok(ApiResponse::page(Page { items, pagination }))
}

/// GET /api/wallets/{id}
#[utoipa::path(
    get,
    path = "/wallets/{id}",
    tag = "Wallets",
    operation_id = "getWallet",
    params(("id" = Uuid, Path, description = "Wallet ID")),
    responses(
        (status = 200, description = "Wallet", body = WalletView),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Wallet not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let wallet = Wallet::find_by_id(&mut conn, wallet_id)
        .await
        .or_not_found("Wallet")?;

    let view = Wallet::populate(&mut conn, vec![wallet])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Wallet"))?;

    Ok(ApiResponse::ok(view))
}

/// Open an empty wallet for a user
/// POST /api/wallets
#[utoipa::path(
    post,
    path = "/wallets",
    tag = "Wallets",
    operation_id = "createWallet",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = Wallet),
        (status = 400, description = "Validation failed or user already has a wallet"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_wallet(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateWalletRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let currency = request
        .currency
        .as_deref()
        .map(str::trim)
        .unwrap_or(&state.config.default_currency);
    let mut new = NewWallet::empty(request.user_id, currency);
    if let Some(status) = request.status {
        new.status = status;
    }

    let mut conn = state.diesel_pool.get().await?;
    let wallet = Wallet::create(&mut conn, new).await?;

    AuditLogger::record(
        AuditAction::Created,
        auth_user.user_id,
        "wallet",
        Some(wallet.id),
        Some(format!("user={}", wallet.user_id)),
    );

    Ok(ApiResponse::created(wallet).with_message("Wallet created successfully"))
}

/// Change currency or freeze a wallet. The balance only moves through
/// transactions.
/// PUT /api/wallets/{id}
#[utoipa::path(
    put,
    path = "/wallets/{id}",
    tag = "Wallets",
    operation_id = "updateWallet",
    params(("id" = Uuid, Path, description = "Wallet ID")),
    request_body = UpdateWalletRequest,
    responses(
        (status = 200, description = "Wallet updated", body = Wallet),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Wallet not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_wallet(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(wallet_id): Path<Uuid>,
    Json(request): Json<UpdateWalletRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let wallet = Wallet::update(&mut conn, wallet_id, WalletChanges::from(request))
        .await
        .or_not_found("Wallet")?;

    AuditLogger::record(
        AuditAction::Updated,
        auth_user.user_id,
        "wallet",
        Some(wallet.id),
        Some(format!("status={}", wallet.status)),
    );

    Ok(ApiResponse::ok(wallet).with_message("Wallet updated successfully"))
}

/// DELETE /api/wallets/{id}
#[utoipa::path(
    delete,
    path = "/wallets/{id}",
    tag = "Wallets",
    operation_id = "deleteWallet",
    params(("id" = Uuid, Path, description = "Wallet ID")),
    responses(
        (status = 200, description = "Wallet deleted"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Wallet not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_wallet(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(wallet_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    if Wallet::delete(&mut conn, wallet_id).await? == 0 {
        return Err(ApiError::not_found("Wallet"));
    }

    AuditLogger::record(AuditAction::Deleted, auth_user.user_id, "wallet", Some(wallet_id), None);

    Ok(ApiResponse::message("Wallet deleted successfully"))
}

/// Credit or debit a wallet
/// POST /api/wallets/{id}/transactions
#[utoipa::path(
    post,
    path = "/wallets/{id}/transactions",
    tag = "Wallets",
    operation_id = "createWalletTransaction",
    params(("id" = Uuid, Path, description = "Wallet ID")),
    request_body = WalletTransactionRequest,
    responses(
        (status = 201, description = "Transaction posted", body = WalletTransactionReceipt),
        (status = 400, description = "Validation failed, frozen wallet or insufficient balance"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Wallet not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(wallet_id): Path<Uuid>,
    Json(request): Json<WalletTransactionRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let receipt = WalletService::new(&state)
        .apply(auth_user.user_id, wallet_id, request)
        .await?;

    Ok(ApiResponse::created(receipt).with_message("Transaction recorded successfully"))
}

/// Ledger of a wallet, newest first by default
/// GET /api/wallets/{id}/transactions
#[utoipa::path(
    get,
    path = "/wallets/{id}/transactions",
    tag = "Wallets",
    operation_id = "listWalletTransactions",
    params(("id" = Uuid, Path, description = "Wallet ID"), PageQuery),
    responses(
        (status = 200, description = "Paginated transactions", body = [WalletTransaction]),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Wallet not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);

    {
        let mut conn = state.diesel_pool.get().await?;
        Wallet::find_by_id(&mut conn, wallet_id)
            .await
            .or_not_found("Wallet")?;
    }

    let page = WalletTransaction::list_for_wallet(&state.diesel_pool, wallet_id, &request).await?;
    Ok(ApiResponse::page(page))
}
