use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in): the roster surfaces and the liveness probe.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load
        // balancer checks. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // The landing payload: every student plus the full catalog of majors.
        .route("/", get(handlers::index))
        // GET /major/{major_id}
        // The roster filtered to the students of one major; 404 when the
        // major id does not exist at all.
        .route("/major/{major_id}", get(handlers::students_by_major))
}
