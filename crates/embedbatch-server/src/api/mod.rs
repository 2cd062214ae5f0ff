//! API routes and handlers for the Embedbatch server

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod embed;
pub mod errors;
pub mod health;
pub mod jobs;
pub mod middleware;
pub mod results;

use crate::server::AppState;

/// Build the router for API endpoints
pub fn build_router(state: AppState) -> Router {
    // Authenticated and rate limited
    let protected = Router::new()
        .route("/v1/embed", post(embed::embed_handler))
        .route(
            "/v1/embed/file",
            post(embed::embed_file_handler).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/v1/jobs",
            post(jobs::create_job_handler).get(jobs::list_jobs_handler),
        )
        .route("/v1/jobs/:job_id", get(jobs::get_job_handler))
        .route("/v1/results/:filename", get(results::get_result_handler))
        .route_layer(from_fn_with_state(state.clone(), middleware::rate_limit_middleware))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    Router::new()
        .route("/v1/health", get(health::health_check))
        .merge(protected)
        .layer(from_fn(middleware::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-rapidapi-key"),
            HeaderName::from_static("x-rapidapi-host"),
        ])
}
