// Identity attached to a request once its bearer token has been verified

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    models::{user::UserRole, AccessTokenClaims},
    utils::{ApiError, ApiResult},
};

/// Authenticated user information extracted from JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub token_id: String,
    pub email: String,
    pub role: UserRole,
    pub exp: u64,
}

impl AuthenticatedUser {
    /// Claims that fail to name a user or a known role are rejected
    pub fn from_claims(claims: AccessTokenClaims) -> Result<Self, ApiError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Not authorized, token failed".to_string()))?;
        let role = UserRole::from_str(&claims.role)
            .map_err(|_| ApiError::Unauthorized("Not authorized, token failed".to_string()))?;

        Ok(AuthenticatedUser {
            user_id,
            token_id: claims.jti,
            email: claims.email,
            role,
            exp: claims.exp,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn require_staff(&self) -> ApiResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not authorized for this action".to_string()))
        }
    }

    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not authorized as an admin".to_string()))
        }
    }

    /// Staff may act on any record, other users only on their own
    pub fn require_owner_or_staff(&self, owner: Uuid) -> ApiResult<()> {
        if self.is_staff() || self.user_id == owner {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not authorized to access this resource".to_string()))
        }
    }

    /// Owner restriction to apply to listings: None for staff
    pub fn scope(&self) -> Option<Uuid> {
        if self.is_staff() {
            None
        } else {
            Some(self.user_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str) -> AccessTokenClaims {
        AccessTokenClaims {
            sub: Uuid::new_v4().to_string(),
            jti: "jti".to_string(),
            email: "a@example.com".to_string(),
            role: role.to_string(),
            aud: "campus-admin".to_string(),
            iss: "campus-admin-backend".to_string(),
            iat: 0,
            exp: u64::MAX,
        }
    }

    #[test]
    fn test_from_claims() {
        let user = AuthenticatedUser::from_claims(claims("counsellor")).unwrap();
        assert_eq!(user.role, UserRole::Counsellor);
        assert!(user.require_staff().is_ok());
        assert!(user.require_admin().is_err());
        assert_eq!(user.scope(), None);
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(AuthenticatedUser::from_claims(claims("root")).is_err());
    }

    #[test]
    fn test_plain_user_scope() {
        let user = AuthenticatedUser::from_claims(claims("user")).unwrap();
        assert_eq!(user.scope(), Some(user.user_id));
        assert!(user.require_owner_or_staff(user.user_id).is_ok());
        assert!(user.require_owner_or_staff(Uuid::new_v4()).is_err());
    }
}
