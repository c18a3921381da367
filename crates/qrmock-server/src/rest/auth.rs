//! Header validation middleware for `/v1` routes.
//!
//! Every request must carry a supported `IBM-API-Version`, an
//! `Authorization: Bearer <token>` header and a `Service-CRN` header.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::ApiError;
use crate::config::DEFAULT_API_VERSIONS;

pub const API_VERSION_HEADER: &str = "ibm-api-version";
pub const SERVICE_CRN_HEADER: &str = "service-crn";

/// Shared authentication state.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// Expected API key. `None` accepts any bearer token.
    pub api_key: Option<Arc<String>>,
    pub supported_versions: Arc<Vec<String>>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            api_key: None,
            supported_versions: Arc::new(DEFAULT_API_VERSIONS.iter().map(|v| v.to_string()).collect()),
        }
    }
}

impl AuthState {
    pub fn new(api_key: Option<String>, supported_versions: Vec<String>) -> Self {
        Self {
            api_key: api_key.map(Arc::new),
            supported_versions: Arc::new(supported_versions),
        }
    }
}

/// Constant-time string comparison to prevent timing side-channel attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

fn auth_state(request: &Request) -> AuthState {
    request
        .extensions()
        .get::<AuthState>()
        .cloned()
        .unwrap_or_default()
}

fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Reject requests without a supported `IBM-API-Version` header.
pub async fn require_api_version(request: Request, next: Next) -> Response {
    let state = auth_state(&request);
    let supported = match header(&request, API_VERSION_HEADER) {
        Some(version) => state.supported_versions.iter().any(|v| v == version),
        None => {
            return ApiError::BadRequest("Missing IBM-API-Version header".to_string())
                .into_response();
        }
    };
    if !supported {
        return ApiError::BadRequest(format!(
            "Unsupported API version. Supported versions: {}",
            state.supported_versions.join(", ")
        ))
        .into_response();
    }
    next.run(request).await
}

/// Validate `Authorization: Bearer <token>` and `Service-CRN`.
pub async fn require_auth(request: Request, next: Next) -> Response {
    let state = auth_state(&request);

    let token = match header(&request, "authorization").and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if !token.is_empty() => token,
        _ => {
            return ApiError::Unauthorized(
                "Invalid authorization header format. Expected 'Bearer <token>'".to_string(),
            )
            .into_response();
        }
    };

    if let Some(expected) = state.api_key.as_ref() {
        if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
            return ApiError::Unauthorized("Invalid API key".to_string()).into_response();
        }
    }

    if header(&request, SERVICE_CRN_HEADER).is_none_or(str::is_empty) {
        return ApiError::Unauthorized("Missing Service-CRN header".to_string()).into_response();
    }

    next.run(request).await
}
