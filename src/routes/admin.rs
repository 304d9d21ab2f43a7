use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Defines the routes whose operations are exclusively available to users with
/// the 'admin' role: every mutation of the student registry plus the
/// form-population reads that precede them.
///
/// Access Control:
/// Handlers here resolve an *optional* identity and pass it to the service
/// layer, where the guard pipeline runs in fixed order (authenticate, then
/// authorize). Anonymous callers get 401, authenticated non-admins get 403,
/// and the browser error layer degrades both into redirects.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /new: form payload (catalog for the major selection).
        // POST /new: validate and insert a new student.
        .route(
            "/new",
            get(handlers::new_student_form).post(handlers::create_student),
        )
        // GET /edit/{student_id}: form payload pre-populated with the stored
        //                         values, including the resolved major.
        // POST /edit/{student_id}: overwrite all fields; the primary key may
        //                          change with this call.
        .route(
            "/edit/{student_id}",
            get(handlers::edit_student_form).post(handlers::update_student),
        )
        // GET/POST /delete/{student_id}
        // Accepts GET as well as POST (not REST-pure, preserved as-is for the
        // links the presentation layer emits).
        .route(
            "/delete/{student_id}",
            get(handlers::delete_student).post(handlers::delete_student),
        )
}
