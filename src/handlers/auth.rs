// Account handlers: registration, login, OTP and email verification,
// profile, role and account status management

use axum::{
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel_async::AsyncPgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        catalog::patch_optional,
        pagination::{PageQuery, PageRequest},
        parse_filter,
        response::ApiResponse,
        user::{
            AuthPayload, LoginRequest, NewUser, RegisterRequest, SendOtpRequest,
            UpdateProfileRequest, UpdateRoleRequest, UpdateStatusRequest, User, UserFilter, UserQuery, UserResponse,
            UserRole, UserUpdate, VerifyOtpRequest,
        },
    },
    services::{verification::VerificationError, VerificationService},
    utils::{
        hash_password, password::needs_rehash, trim_optional_field, verify_password, ApiError,
        ApiResult, AuditAction, AuditLogger, OrNotFound,
    },
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn auth_payload(state: &AppState, user: User) -> ApiResult<AuthPayload> {
    let token = state.jwt_service.token_for_user(&user)?;
    Ok(AuthPayload {
        token,
        user: user.into(),
    })
}

/// Resolve the account an OTP request refers to, by email first, then phone
enum Identifier {
    Email(String),
    Phone(String),
}

/// Email wins when both are given
fn parse_identifier(email: Option<&String>, phone: Option<&String>) -> ApiResult<Identifier> {
    match (trim_optional_field(email), trim_optional_field(phone)) {
        (Some(email), _) => Ok(Identifier::Email(email)),
        (None, Some(phone)) => Ok(Identifier::Phone(phone)),
        (None, None) => Err(ApiError::BadRequest(
            "Please provide an email or phone number".to_string(),
        )),
    }
}

async fn find_by_identifier(
    conn: &mut AsyncPgConnection,
    identifier: &Identifier,
) -> ApiResult<User> {
    let user = match identifier {
        Identifier::Email(email) => User::find_by_email(conn, email).await?,
        Identifier::Phone(phone) => User::find_by_phone(conn, phone).await?,
    };

    user.ok_or_else(|| ApiError::not_found("User"))
}

// =============================================================================
// PUBLIC ENDPOINTS
// =============================================================================

/// Register a new account
/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    operation_id = "register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthPayload),
        (status = 400, description = "Validation failed or email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let email = request.email.trim().to_lowercase();
    let mut conn = state.diesel_pool.get().await?;

    if User::find_by_email(&mut conn, &email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash_password(&request.password)?;
    let issued = state.verification_service.issue_email_token(Utc::now());

    let new_user = NewUser {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        email,
        phone: trim_optional_field(request.phone.as_ref()),
        password_hash,
        role: UserRole::User,
        is_active: true,
        email_verified: false,
        verification_token_hash: Some(issued.token_hash),
        verification_expires_at: Some(issued.expires_at),
    };

    let user = User::create(&mut conn, new_user).await?;
    tracing::info!("New user registered: {}", user.email);

    // No mail goes out, so outside production the link is only in the logs
    if !state.config.is_production() {
        tracing::info!(
            "Verification link for {}: /api/auth/verify-email/{}",
            user.email,
            issued.token
        );
    }

    Ok(ApiResponse::created(auth_payload(&state, user)?)
        .with_message("Registration successful"))
}

/// Log in with email and password
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    operation_id = "login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthPayload),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account deactivated")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let user = User::find_by_email(&mut conn, &request.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::warn!("Failed login attempt for {}", user.email);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    let user = if needs_rehash(&user.password_hash) {
        let update = UserUpdate {
            password_hash: Some(hash_password(&request.password)?),
            ..Default::default()
        };
        match User::update(&mut conn, user.id, update).await {
            Ok(upgraded) => upgraded,
            Err(e) => {
                tracing::warn!("Failed to upgrade legacy password hash for {}: {}", user.id, e);
                user
            },
        }
    } else {
        user
    };

    tracing::info!("Login successful: {}", user.email);
    Ok(ApiResponse::ok(auth_payload(&state, user)?))
}

/// Request a one-time code
/// POST /api/auth/send-otp
#[utoipa::path(
    post,
    path = "/auth/send-otp",
    tag = "Auth",
    operation_id = "sendOtp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP sent"),
        (status = 400, description = "Neither email nor phone given"),
        (status = 404, description = "User not found")
    )
)]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(request): Json<SendOtpRequest>,
) -> ApiResult<impl IntoResponse> {
    let identifier = parse_identifier(request.email.as_ref(), request.phone.as_ref())?;

    let mut conn = state.diesel_pool.get().await?;
    let user = find_by_identifier(&mut conn, &identifier).await?;

    // No delivery channel: the configured static code is the OTP.
    tracing::info!("OTP requested for user {}", user.id);
    Ok(ApiResponse::message("OTP sent successfully"))
}

/// Verify a one-time code and mark the email verified
/// POST /api/auth/verify-otp
#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    tag = "Auth",
    operation_id = "verifyOtp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP verified", body = AuthPayload),
        (status = 400, description = "Invalid OTP"),
        (status = 404, description = "User not found")
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> ApiResult<impl IntoResponse> {
    let identifier = parse_identifier(request.email.as_ref(), request.phone.as_ref())?;
    state.verification_service.check_otp(&request.otp)?;

    let mut conn = state.diesel_pool.get().await?;
    let user = find_by_identifier(&mut conn, &identifier).await?;

    let user = if user.email_verified {
        user
    } else {
        let update = UserUpdate {
            email_verified: Some(true),
            verification_token_hash: Some(None),
            verification_expires_at: Some(None),
            ..Default::default()
        };
        User::update(&mut conn, user.id, update).await?
    };

    Ok(ApiResponse::ok(auth_payload(&state, user)?).with_message("OTP verified successfully"))
}

/// Confirm an email address with the token issued at registration
/// GET /api/auth/verify-email/{token}
#[utoipa::path(
    get,
    path = "/auth/verify-email/{token}",
    tag = "Auth",
    operation_id = "verifyEmail",
    params(("token" = String, Path, description = "Verification token")),
    responses(
        (status = 200, description = "Email verified"),
        (status = 400, description = "Invalid or expired token")
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let token_hash = VerificationService::hash_token(token.trim());
    let mut conn = state.diesel_pool.get().await?;

    let user = User::find_by_verification_token(&mut conn, &token_hash)
        .await?
        .ok_or(VerificationError::InvalidToken)?;

    if user.email_verified {
        return Err(VerificationError::AlreadyVerified.into());
    }
    if !user.verification_pending(Utc::now()) {
        return Err(VerificationError::InvalidToken.into());
    }

    let update = UserUpdate {
        email_verified: Some(true),
        verification_token_hash: Some(None),
        verification_expires_at: Some(None),
        ..Default::default()
    };
    User::update(&mut conn, user.id, update).await?;

    tracing::info!("Email verified for user {}", user.id);
    Ok(ApiResponse::message("Email verified successfully"))
}

// =============================================================================
// AUTHENTICATED ENDPOINTS
// =============================================================================

/// Current account
/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    operation_id = "getCurrentUser",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let user = User::find_by_id(&mut conn, auth_user.user_id)
        .await
        .or_not_found("User")?;

    Ok(ApiResponse::ok(UserResponse::from(user)))
}

/// Update name, phone or password of the current account
/// PUT /api/auth/profile
#[utoipa::path(
    put,
    path = "/auth/profile",
    tag = "Auth",
    operation_id = "updateProfile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized - invalid or missing token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let password_hash = match request.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let update = UserUpdate {
        name: request.name.map(|n| n.trim().to_string()),
        phone: patch_optional(request.phone),
        password_hash,
        ..Default::default()
    };

    let mut conn = state.diesel_pool.get().await?;
    let user = User::update(&mut conn, auth_user.user_id, update)
        .await
        .or_not_found("User")?;

    Ok(ApiResponse::ok(UserResponse::from(user)).with_message("Profile updated"))
}

// =============================================================================
// ADMIN ENDPOINTS
// =============================================================================

/// List accounts
/// GET /api/auth/users
#[utoipa::path(
    get,
    path = "/auth/users",
    tag = "Auth",
    operation_id = "listUsers",
    params(PageQuery, UserFilter),
    responses(
        (status = 200, description = "Paginated users", body = [UserResponse]),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = UserQuery {
        role: parse_filter(filter.role.as_deref())?,
        search: trim_optional_field(filter.search.as_ref()),
    };

    let page = User::list(&state.diesel_pool, &query, &request).await?;
    Ok(ApiResponse::page(page.map(UserResponse::from)))
}

/// Change the role of an account
/// PUT /api/auth/users/{id}/role
#[utoipa::path(
    put,
    path = "/auth/users/{id}/role",
    tag = "Auth",
    operation_id = "updateUserRole",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserResponse),
        (status = 400, description = "Cannot change own role"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    if user_id == auth_user.user_id {
        return Err(ApiError::BadRequest("You cannot change your own role".to_string()));
    }

    let update = UserUpdate {
        role: Some(request.role),
        ..Default::default()
    };

    let mut conn = state.diesel_pool.get().await?;
    let user = User::update(&mut conn, user_id, update)
        .await
        .or_not_found("User")?;

    AuditLogger::record(
        AuditAction::RoleChanged,
        auth_user.user_id,
        "user",
        Some(user.id),
        Some(format!("role={}", user.role)),
    );

    Ok(ApiResponse::ok(UserResponse::from(user)).with_message("Role updated"))
}

/// Deactivate or reactivate an account. Deactivated accounts cannot log in
/// and their existing tokens stop working.
/// PUT /api/auth/users/{id}/status
#[utoipa::path(
    put,
    path = "/auth/users/{id}/status",
    tag = "Auth",
    operation_id = "updateUserStatus",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = UserResponse),
        (status = 400, description = "Cannot deactivate own account"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    if user_id == auth_user.user_id {
        return Err(ApiError::BadRequest(
            "You cannot change your own account status".to_string(),
        ));
    }

    let update = UserUpdate {
        is_active: Some(request.is_active),
        ..Default::default()
    };

    let mut conn = state.diesel_pool.get().await?;
    let user = User::update(&mut conn, user_id, update)
        .await
        .or_not_found("User")?;

    AuditLogger::record(
        AuditAction::StatusChanged,
        auth_user.user_id,
        "user",
        Some(user.id),
        Some(format!("active={}", user.is_active)),
    );

    let message = if user.is_active {
        "Account reactivated"
    } else {
        "Account deactivated"
    };
    Ok(ApiResponse::ok(UserResponse::from(user)).with_message(message))
}
