use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

// Module for routing segregation (Public, Account, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{account, admin, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use error::AppError;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application, aggregating every path and schema decorated with the
/// `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index, handlers::students_by_major,
        handlers::new_student_form, handlers::create_student,
        handlers::edit_student_form, handlers::update_student,
        handlers::delete_student,
        handlers::register_form, handlers::register,
        handlers::login_form, handlers::login, handlers::logout,
    ),
    components(
        schemas(
            models::Student, models::Major, models::Role, models::Gender,
            models::StudentForm, models::RosterPayload, models::StudentFormPayload,
            models::RegisterRequest, models::LoginRequest, models::LoginResponse,
            models::UserProfile, error::ErrorBody,
        )
    ),
    tags(
        (name = "student-portal", description = "Student Records Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all essential
/// application services and configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors to selectively pull components from
// the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the session routes. The `AuthUser` extractor
/// performs token validation, the session-row check, and the DB lookup; if any
/// step fails the request is rejected with 401 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// browser_error_layer
///
/// Content-negotiated degradation of authorization failures for browser
/// clients: a 401 becomes a redirect to the login page and a 403 becomes a
/// redirect home with a warning notice, instead of a bare status. Clients not
/// asking for HTML keep the JSON error body untouched.
async fn browser_error_layer(request: Request, next: Next) -> Response {
    let accepts_html = request
        .headers()
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(|accept| accept.contains("text/html"))
        .unwrap_or(false);

    let response = next.run(request).await;

    if !accepts_html {
        return response;
    }

    match response.status() {
        StatusCode::UNAUTHORIZED => Redirect::to("/login").into_response(),
        StatusCode::FORBIDDEN => Redirect::to("/?notice=forbidden").into_response(),
        _ => response,
    }
}

/// fallback_not_found
///
/// Unknown routes resolve to the 404 entry of the error taxonomy rather than
/// an empty body.
async fn fallback_not_found() -> AppError {
    AppError::NotFound("resource")
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Account routes: the anonymous-only guard runs inside the handlers,
        // since an authenticated caller gets a courtesy redirect, not a 401.
        .merge(account::account_routes())
        // Session routes (logout): protected by the authentication layer.
        .merge(
            account::session_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Admin routes: the role check runs in the service-layer guard
        // pipeline after the handlers resolve the optional identity.
        .merge(admin::admin_routes())
        // Unknown paths resolve through the error taxonomy.
        .fallback(fallback_not_found)
        // Browser-facing degradation of 401/403 responses.
        .layer(middleware::from_fn(browser_error_layer))
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in a span
                // that carries the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: return the x-request-id header to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: includes the
/// `x-request-id` header (if present) alongside the HTTP method and URI, so
/// every log line for a single request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
