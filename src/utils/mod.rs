// Utility modules for the admin backend

pub mod api_error;
pub mod audit_logger;
pub mod password;
pub mod validation;

pub use api_error::{ApiError, ApiResult, OrNotFound};
pub use audit_logger::{AuditAction, AuditLogger};
pub use password::{hash_password, verify_password, PasswordError};
pub use validation::{escape_like, like_pattern, resolve_slug, slugify, trim_and_validate_field, trim_optional_field};
