// Error taxonomy shared by every handler
// Rendered as the uniform `{success: false, message}` envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::jwt::JwtError;
use crate::services::verification::VerificationError;
use crate::utils::password::PasswordError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error")]
    Database(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(resource: &str) -> Self {
        ApiError::NotFound(format!("{} not found", resource))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Duplicate(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Turn a missing row into a 404 naming the resource
pub trait OrNotFound<T> {
    fn or_not_found(self, resource: &str) -> ApiResult<T>;
}

impl<T> OrNotFound<T> for Result<T, DieselError> {
    fn or_not_found(self, resource: &str) -> ApiResult<T> {
        self.map_err(|err| match err {
            DieselError::NotFound => ApiError::not_found(resource),
            other => other.into(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Database(detail) => error!("Database failure: {}", detail),
            ApiError::Internal(detail) => error!("Internal failure: {}", detail),
            _ => {},
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Column name a unique constraint protects, derived from `<table>_<column>_key`
fn constraint_field(table: Option<&str>, constraint: &str) -> String {
    let trimmed = constraint.strip_suffix("_key").unwrap_or(constraint);
    let column = table
        .and_then(|t| trimmed.strip_prefix(t))
        .map(|rest| rest.trim_start_matches('_'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(trimmed);

    // camelCase to match the JSON field names clients send
    let mut out = String::with_capacity(column.len());
    let mut upper = false;
    for ch in column.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                match info.constraint_name() {
                    Some("purchases_completed_course_key")
                    | Some("purchases_completed_program_key") => {
                        ApiError::BadRequest("Item already purchased".to_string())
                    },
                    Some(constraint) => {
                        ApiError::Duplicate(constraint_field(info.table_name(), constraint))
                    },
                    None => ApiError::Duplicate("Record".to_string()),
                }
            },
            DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                ApiError::Validation(format!(
                    "Validation failed: {}",
                    info.constraint_name().unwrap_or("check constraint")
                ))
            },
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                match info.constraint_name() {
                    Some("purchases_course_id_fkey") => ApiError::BadRequest(
                        "Course has purchases and cannot be deleted".to_string(),
                    ),
                    Some("purchases_program_id_fkey") => ApiError::BadRequest(
                        "Program has purchases and cannot be deleted".to_string(),
                    ),
                    constraint => ApiError::BadRequest(format!(
                        "Referenced record does not exist ({})",
                        constraint.unwrap_or("foreign key")
                    )),
                }
            },
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut field_errors: Vec<_> = err.field_errors().into_iter().collect();
        field_errors.sort_by(|a, b| a.0.cmp(b.0));

        let messages: Vec<String> = field_errors
            .iter()
            .flat_map(|(field, errors)| {
                errors
                    .iter()
                    .map(move |e| format!("{}: {}", field, e.message.as_ref().unwrap_or(&e.code)))
            })
            .collect();

        ApiError::Validation(messages.join(", "))
    }
}

impl<E: std::fmt::Display + std::error::Error + 'static> From<bb8::RunError<E>> for ApiError {
    fn from(err: bb8::RunError<E>) -> Self {
        ApiError::Database(format!("Connection pool error: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::Encoding(e) => ApiError::Internal(e),
            _ => ApiError::Unauthorized("Not authorized, token failed".to_string()),
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 2, max = 3, message = "Country code must be 2-3 characters"))]
        code: String,
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    #[test]
    fn test_constraint_field_extraction() {
        assert_eq!(constraint_field(Some("users"), "users_email_key"), "email");
        assert_eq!(constraint_field(Some("rewards"), "rewards_user_id_key"), "userId");
        assert_eq!(
            constraint_field(Some("page_information"), "page_information_slug_key"),
            "slug"
        );
        assert_eq!(constraint_field(None, "slug_key"), "slug");
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let sample = Sample {
            code: "ABCD".to_string(),
            name: String::new(),
        };
        let err: ApiError = sample.validate().unwrap_err().into();

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "code: Country code must be 2-3 characters, name: Name is required"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Duplicate("email".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Duplicate("email".into()).to_string(), "email already exists");
        assert_eq!(ApiError::not_found("Coupon").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::not_found("Coupon").to_string(), "Coupon not found");
        assert_eq!(
            ApiError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Database("secret driver text".into()).to_string(),
            "Database error"
        );
    }

    struct ConstraintInfo(&'static str);

    impl diesel::result::DatabaseErrorInformation for ConstraintInfo {
        fn message(&self) -> &str {
            "constraint violated"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            Some("purchases")
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            Some(self.0)
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn foreign_key_violation(constraint: &'static str) -> ApiError {
        DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new(ConstraintInfo(constraint)),
        )
        .into()
    }

    #[test]
    fn test_deleting_a_sold_item_explains_why() {
        let err = foreign_key_violation("purchases_course_id_fkey");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Course has purchases and cannot be deleted");

        assert_eq!(
            foreign_key_violation("purchases_program_id_fkey").to_string(),
            "Program has purchases and cannot be deleted"
        );
        assert_eq!(
            foreign_key_violation("applications_user_id_fkey").to_string(),
            "Referenced record does not exist (applications_user_id_fkey)"
        );
    }

    #[test]
    fn test_not_found_from_diesel() {
        let err: ApiError = DieselError::NotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let named = Err::<(), _>(DieselError::NotFound).or_not_found("Wallet");
        assert_eq!(named.unwrap_err().to_string(), "Wallet not found");
    }
}
