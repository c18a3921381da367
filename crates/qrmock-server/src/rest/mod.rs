//! REST surface of the mock runtime.
//!
//! `/v1` routes sit behind the header checks in [`auth`]; `/`, `/health` and
//! `/metrics` do not.

pub mod auth;
mod backends;
pub mod error;
mod jobs;
mod sessions;
pub mod types;

use axum::{
    Extension, Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use qrmock_catalog::DeviceCatalog;

use crate::health::{HealthState, create_health_router};
use crate::metrics::Metrics;
use crate::server::{JobEngine, SessionRegistry};

use auth::AuthState;

/// Application state shared across all REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobEngine,
    pub sessions: Arc<SessionRegistry>,
    pub catalog: Arc<DeviceCatalog>,
    pub metrics: Metrics,
    pub auth: AuthState,
}

impl AppState {
    /// State sharing the catalog and session registry of `jobs`.
    pub fn new(jobs: JobEngine, auth: AuthState) -> Self {
        Self {
            sessions: Arc::clone(jobs.sessions()),
            catalog: Arc::clone(jobs.catalog()),
            jobs,
            metrics: Metrics::new(),
            auth,
        }
    }
}

/// Build the full application router.
///
/// `cors_origins` lists allowed origins; a single `*` allows any origin.
pub fn rest_router(state: AppState, cors_origins: &[String]) -> Router {
    let health = create_health_router(HealthState::new(
        Arc::clone(&state.catalog),
        Arc::clone(&state.sessions),
        state.metrics,
    ));

    let api = Router::new()
        .route("/v1/backends", get(backends::list_backends))
        .route(
            "/v1/backends/{id}/configuration",
            get(backends::get_configuration),
        )
        .route("/v1/backends/{id}/defaults", get(backends::get_defaults))
        .route(
            "/v1/backends/{id}/properties",
            get(backends::get_properties),
        )
        .route("/v1/backends/{id}/status", get(backends::get_status))
        .route("/v1/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route(
            "/v1/jobs/{id}",
            get(jobs::get_job_status).delete(jobs::cancel_job),
        )
        .route("/v1/jobs/{id}/results", get(jobs::get_job_results))
        .route("/v1/sessions", post(sessions::create_session))
        .route(
            "/v1/sessions/{id}",
            get(sessions::get_session).patch(sessions::update_session),
        )
        .route("/v1/sessions/{id}/close", delete(sessions::cancel_session))
        .layer(middleware::from_fn(auth::require_auth))
        .layer(middleware::from_fn(auth::require_api_version))
        .layer(Extension(state.auth.clone()))
        .with_state(state);

    Router::new().merge(health).merge(api).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(build_cors_layer(cors_origins)),
    )
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(auth::API_VERSION_HEADER),
            HeaderName::from_static(auth::SERVICE_CRN_HEADER),
        ]);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        layer.allow_origin(allowed)
    }
}
