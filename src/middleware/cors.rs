use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderValue},
        Method, Request, Response, StatusCode,
    },
    middleware::Next,
};
use tracing::debug;

use crate::{app::AppState, app_config::AppConfig};

/// Origin to echo back, if any. A `*` entry reflects every origin outside
/// production; otherwise only whitelisted origins are echoed.
pub fn allowed_origin(config: &AppConfig, origin: Option<&str>) -> Option<HeaderValue> {
    let origin = origin?;
    let origins = &config.security.cors_allowed_origins;
    let has_wildcard = origins.iter().any(|o| o == "*");

    let allowed = if has_wildcard && !config.is_production() {
        debug!("CORS: Reflecting origin outside production: {}", origin);
        true
    } else {
        let listed = origins.iter().any(|o| o == origin);
        debug!("CORS: Origin {} whitelisted: {}", origin, listed);
        listed
    };

    if allowed {
        HeaderValue::from_str(origin).ok()
    } else {
        None
    }
}

/// Dynamic CORS middleware that supports credentials with a reflected origin
pub async fn dynamic_cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response<Body>, StatusCode> {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    let allowed = allowed_origin(&state.config, origin);

    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());

        if let Some(allowed) = allowed {
            let headers = response.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type, authorization, accept, origin, x-requested-with"),
            );
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("3600"));
        }

        *response.status_mut() = StatusCode::NO_CONTENT;
        return Ok(response);
    }

    let mut response = next.run(req).await;

    if let Some(allowed) = allowed {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::Environment;

    fn config(environment: Environment, origins: &[&str]) -> AppConfig {
        let mut config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/campus_test".to_string()),
            "JWT_SECRET" => Some("x".repeat(48)),
            _ => None,
        })
        .unwrap();
        config.environment = environment;
        config.security.cors_allowed_origins = origins.iter().map(|o| o.to_string()).collect();
        config
    }

    #[test]
    fn test_wildcard_reflects_outside_production() {
        let dev = config(Environment::Development, &["*"]);
        assert_eq!(
            allowed_origin(&dev, Some("http://localhost:3000")),
            Some(HeaderValue::from_static("http://localhost:3000"))
        );

        let prod = config(Environment::Production, &["*"]);
        assert_eq!(allowed_origin(&prod, Some("http://localhost:3000")), None);
    }

    #[test]
    fn test_whitelist() {
        let prod = config(Environment::Production, &["https://admin.example.com"]);
        assert!(allowed_origin(&prod, Some("https://admin.example.com")).is_some());
        assert!(allowed_origin(&prod, Some("https://evil.example.com")).is_none());
        assert!(allowed_origin(&prod, None).is_none());
    }
}
