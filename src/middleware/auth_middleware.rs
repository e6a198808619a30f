// Route guards: `protect` verifies the bearer token and loads the account's
// current role, `admin` and `staff` check that role

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::Response,
};

use crate::{app::AppState, middleware::auth::AuthenticatedUser, utils::ApiError};

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validates the JWT, checks the account is still active and adds
/// AuthenticatedUser to request extensions
pub async fn protect(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))?;

    let claims = app_state.jwt_service.validate_access_token(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        ApiError::from(e)
    })?;
    let mut auth_user = AuthenticatedUser::from_claims(claims)?;

    let standing = app_state
        .accounts
        .standing(auth_user.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, user not found".to_string()))?;
    if !standing.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }
    auth_user.role = standing.role;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

fn current_user(request: &Request<Body>) -> Result<&AuthenticatedUser, ApiError> {
    request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))
}

/// Requires the admin role. Must run after `protect`.
pub async fn admin(request: Request<Body>, next: Next) -> Result<Response, ApiError> {
    current_user(&request)?.require_admin()?;
    Ok(next.run(request).await)
}

/// Requires admin, manager or counsellor. Must run after `protect`.
pub async fn staff(request: Request<Body>, next: Next) -> Result<Response, ApiError> {
    current_user(&request)?.require_staff()?;
    Ok(next.run(request).await)
}

/// Extractor for AuthenticatedUser from request extensions
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))
    }
}
