use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Account Router Module
///
/// Registration and login are anonymous-only: an already-authenticated caller
/// is redirected home by the handlers rather than rejected (a courtesy no-op,
/// not an error). Logout lives in `session_routes` so the router assembly can
/// wrap it in the authentication middleware layer.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        // GET /register: guard probe for the registration form.
        // POST /register: create a guest account.
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        // GET /login: guard probe for the login form.
        // POST /login: authenticate and establish a session.
        .route("/login", get(handlers::login_form).post(handlers::login))
}

/// Routes that require an authenticated session. The `AuthUser` extractor in
/// the handler resolves the identity; the middleware layer applied in
/// `create_router` rejects anonymous callers before the handler runs.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        // GET /logout: destroys the session unconditionally.
        .route("/logout", get(handlers::logout))
}
