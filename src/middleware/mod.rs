// Request middleware: bearer-token guards and CORS

pub mod auth;
pub mod auth_middleware;
pub mod cors;

pub use auth::AuthenticatedUser;
pub use auth_middleware::{admin, protect, staff};
pub use cors::dynamic_cors_middleware;
