//! API Middleware (Auth, Rate Limiting, Logging)
//!
//! Order on the way in: auth resolves the caller identity, the rate limiter
//! admits or rejects that identity, then the request is logged.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::handlers::AppState;
use super::types::{ApiError, ApiResponse};

/// Caller identity attached to every request by [`auth_middleware`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

/// Authentication provider: decides whether an API key is acceptable
pub trait ApiKeyValidator: Send + Sync {
    fn validate(&self, key: &str) -> bool;
}

/// Accepts keys starting with `sk_` or `pk_`, plus `demo`
#[derive(Debug, Default, Clone, Copy)]
pub struct PrefixKeyValidator;

impl ApiKeyValidator for PrefixKeyValidator {
    fn validate(&self, key: &str) -> bool {
        key.starts_with("sk_") || key.starts_with("pk_") || key == "demo"
    }
}

fn is_health(request: &Request) -> bool {
    let path = request.uri().path();
    path == "/health" || path == "/v1/health"
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-api-key").and_then(|v| v.to_str().ok())
}

/// Caller identity: API key when present, else client address
fn caller_identity(headers: &HeaderMap) -> CallerId {
    if let Some(key) = api_key(headers) {
        return CallerId(format!("key:{}", key));
    }
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown");
    CallerId(format!("ip:{}", ip))
}

/// API Key authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_health(&request) {
        return next.run(request).await;
    }

    if let Some(key) = api_key(request.headers()) {
        if !state.auth.validate(key) {
            warn!("🔒 Invalid API key attempted");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error(ApiError::unauthorized(), 0.0)),
            )
                .into_response();
        }
    }

    // Requests without a key are allowed and limited by address
    let caller = caller_identity(request.headers());
    request.extensions_mut().insert(caller);
    next.run(request).await
}

/// Per-caller sliding-window rate limiting
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if is_health(&request) {
        return next.run(request).await;
    }

    let caller = request
        .extensions()
        .get::<CallerId>()
        .cloned()
        .unwrap_or_else(|| caller_identity(request.headers()));

    let decision = state.caller_limiter.check(&caller.0);
    let limit = state.caller_limiter.config_for(&caller.0).limit;
    // Round up so clients never retry a moment too early
    let reset_secs =
        decision.reset_after.as_secs() + u64::from(decision.reset_after.subsec_nanos() > 0);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        warn!(caller = %caller.0, "🚦 Caller rate limit exceeded");
        let mut denied = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::error(ApiError::rate_limited(reset_secs), 0.0)),
        )
            .into_response();
        denied
            .headers_mut()
            .insert("Retry-After", HeaderValue::from(reset_secs));
        denied
    };

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_secs));
    response
}

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_validator() {
        let validator = PrefixKeyValidator;
        assert!(validator.validate("sk_live_123"));
        assert!(validator.validate("pk_test"));
        assert!(validator.validate("demo"));
        assert!(!validator.validate("letmein"));
    }

    #[test]
    fn test_caller_identity_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(caller_identity(&headers), CallerId("ip:203.0.113.7".to_string()));

        headers.insert("x-api-key", HeaderValue::from_static("sk_abc"));
        assert_eq!(caller_identity(&headers), CallerId("key:sk_abc".to_string()));

        assert_eq!(caller_identity(&HeaderMap::new()), CallerId("ip:unknown".to_string()));
    }
}
