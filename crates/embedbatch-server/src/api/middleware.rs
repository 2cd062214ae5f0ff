//! Request middleware: authentication, per-client rate limiting and request metrics.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use embedbatch_monitoring::metrics::ServerMetrics;
use tracing::{debug, warn};

use super::errors::ApiError;
use crate::server::AppState;

pub const RAPIDAPI_SECRET_HEADER: &str = "x-rapidapi-proxy-secret";
pub const RAPIDAPI_USER_HEADER: &str = "x-rapidapi-user";

/// Who the request was authenticated as, stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    RapidApi { user: Option<String> },
    ApiKey { key: String },
}

impl AuthContext {
    /// Identifier used to pick the rate limit bucket.
    pub fn client_id(&self) -> Option<&str> {
        match self {
            AuthContext::RapidApi { user } => user.as_deref(),
            AuthContext::ApiKey { key } => Some(key),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Resolves the caller from the RapidAPI proxy secret or a bearer API key.
pub fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<AuthContext, ApiError> {
    if let Some(secret) = state.config.rapidapi_proxy_secret.as_deref() {
        if header_str(headers, RAPIDAPI_SECRET_HEADER) == Some(secret) {
            return Ok(AuthContext::RapidApi {
                user: header_str(headers, RAPIDAPI_USER_HEADER).map(str::to_string),
            });
        }
    }

    let auth_header = header_str(headers, header::AUTHORIZATION.as_str())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = match auth_header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => {
            return Err(ApiError::Unauthorized(
                "Invalid Authorization header format. Use: Bearer <token>".to_string(),
            ))
        }
    };

    if state.config.api_keys.iter().any(|key| key.trim() == token) {
        Ok(AuthContext::ApiKey {
            key: token.to_string(),
        })
    } else {
        Err(ApiError::Unauthorized("Invalid API key".to_string()))
    }
}

/// Authentication middleware for every `/v1` route except health
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match authenticate(request.headers(), &state) {
        Ok(context) => {
            request.extensions_mut().insert(context);
            Ok(next.run(request).await)
        }
        Err(err) => {
            warn!(path = %request.uri().path(), "Rejected unauthenticated request");
            Err(err)
        }
    }
}

/// Token bucket rate limiting keyed by the authenticated client.
///
/// Falls back to the peer address, then to a shared anonymous bucket.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = request
        .extensions()
        .get::<AuthContext>()
        .and_then(|context| context.client_id().map(str::to_string))
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "anonymous".to_string());

    match state.rate_limiter.allow(&client) {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                "x-ratelimit-limit",
                HeaderValue::from(state.rate_limiter.config().burst),
            );
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            Ok(response)
        }
        Err(err) => {
            debug!(client = %client, "{}", err);
            Err(err.into())
        }
    }
}

/// Records one `http_requests_total` sample per request.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().to_string();

    let response = next.run(request).await;

    ServerMetrics::record_http_request(
        &path,
        &method,
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0,
    );
    response
}
