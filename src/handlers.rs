use crate::{
    AppState,
    auth::{AuthUser, OptionalAuthUser},
    error::AppError,
    models::{
        LoginRequest, LoginResponse, RegisterRequest, RosterPayload, Student, StudentForm,
        StudentFormPayload, UserProfile,
    },
    service,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

// Handlers are deliberately thin adapters: resolve the (optional) identity,
// hand the explicit context to the service, translate the result. Guard
// evaluation and validation live entirely in the service layer.

/// index
///
/// [Public Route] The roster payload behind GET /: all students plus the
/// catalog used for the per-major filter links.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "All students and majors", body = RosterPayload))
)]
pub async fn index(State(state): State<AppState>) -> Result<Json<RosterPayload>, AppError> {
    Ok(Json(service::roster(&state.repo).await?))
}

/// students_by_major
///
/// [Public Route] The roster filtered to one major. 404 when the major id does
/// not resolve at all (as opposed to an empty student list, which is a 200).
#[utoipa::path(
    get,
    path = "/major/{major_id}",
    params(("major_id" = i32, Path, description = "Major ID")),
    responses(
        (status = 200, description = "Students of the major", body = RosterPayload),
        (status = 404, description = "Major not found")
    )
)]
pub async fn students_by_major(
    State(state): State<AppState>,
    Path(major_id): Path<i32>,
) -> Result<Json<RosterPayload>, AppError> {
    Ok(Json(service::roster_by_major(&state.repo, major_id).await?))
}

/// new_student_form
///
/// [Admin Route] GET /new: the form-population payload for an empty create
/// form (the catalog drives the major selection choices).
#[utoipa::path(
    get,
    path = "/new",
    responses(
        (status = 200, description = "Form payload", body = StudentFormPayload),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn new_student_form(
    OptionalAuthUser(ctx): OptionalAuthUser,
    State(state): State<AppState>,
) -> Result<Json<StudentFormPayload>, AppError> {
    Ok(Json(
        service::new_student_form(&state.repo, ctx.as_ref()).await?,
    ))
}

/// create_student
///
/// [Admin Route] POST /new: validate and insert. The inserted record is
/// immediately visible to subsequent roster reads.
#[utoipa::path(
    post,
    path = "/new",
    request_body = StudentForm,
    responses(
        (status = 201, description = "Created", body = Student),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_student(
    OptionalAuthUser(ctx): OptionalAuthUser,
    State(state): State<AppState>,
    Json(form): Json<StudentForm>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = service::create_student(&state.repo, ctx.as_ref(), form).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// edit_student_form
///
/// [Admin Route] GET /edit/{student_id}: the form-population payload carrying
/// the stored values, including the resolved major selection.
#[utoipa::path(
    get,
    path = "/edit/{student_id}",
    params(("student_id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Form payload with stored values", body = StudentFormPayload),
        (status = 404, description = "Student not found")
    )
)]
pub async fn edit_student_form(
    OptionalAuthUser(ctx): OptionalAuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
) -> Result<Json<StudentFormPayload>, AppError> {
    Ok(Json(
        service::edit_student_form(&state.repo, ctx.as_ref(), student_id).await?,
    ))
}

/// update_student
///
/// [Admin Route] POST /edit/{student_id}: overwrite every field of the
/// addressed record. The primary key itself may change; afterwards the record
/// answers only to the new id.
#[utoipa::path(
    post,
    path = "/edit/{student_id}",
    params(("student_id" = i32, Path, description = "Student ID before the update")),
    request_body = StudentForm,
    responses(
        (status = 200, description = "Updated", body = Student),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn update_student(
    OptionalAuthUser(ctx): OptionalAuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
    Json(form): Json<StudentForm>,
) -> Result<Json<Student>, AppError> {
    let student = service::update_student(&state.repo, ctx.as_ref(), student_id, form).await?;
    Ok(Json(student))
}

/// delete_student
///
/// [Admin Route] GET/POST /delete/{student_id}. Accepting GET is not
/// REST-pure but matches the links the presentation layer emits, so it stays.
/// Deleting an id that is already gone is a soft condition: the caller ends up
/// in the same state either way.
#[utoipa::path(
    get,
    path = "/delete/{student_id}",
    params(("student_id" = i32, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Deleted (or already absent)"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn delete_student(
    OptionalAuthUser(ctx): OptionalAuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    match service::delete_student(&state.repo, ctx.as_ref(), student_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(AppError::NotFound(_)) => {
            tracing::debug!(student_id, "delete of absent student treated as no-op");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(e),
    }
}

/// register_form
///
/// [Anonymous-only Route] GET /register. There is nothing to populate, but the
/// guard still runs: an authenticated caller is courteously sent home instead
/// of being shown the form again.
#[utoipa::path(
    get,
    path = "/register",
    responses(
        (status = 204, description = "Anonymous caller may register"),
        (status = 303, description = "Already signed in, redirected home")
    )
)]
pub async fn register_form(OptionalAuthUser(ctx): OptionalAuthUser) -> Response {
    if ctx.is_some() {
        return Redirect::to("/").into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

/// register
///
/// [Anonymous-only Route] POST /register: create a guest account. A duplicate
/// username is rejected without overwriting the existing account.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserProfile),
        (status = 400, description = "Validation failed or username taken"),
        (status = 303, description = "Already signed in, redirected home")
    )
)]
pub async fn register(
    OptionalAuthUser(ctx): OptionalAuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    if ctx.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let profile = service::register(&state.repo, payload).await?;
    Ok((StatusCode::CREATED, Json(profile)).into_response())
}

/// login_form
///
/// [Anonymous-only Route] GET /login: guard probe, same courtesy redirect as
/// the registration form.
#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 204, description = "Anonymous caller may sign in"),
        (status = 303, description = "Already signed in, redirected home")
    )
)]
pub async fn login_form(OptionalAuthUser(ctx): OptionalAuthUser) -> Response {
    if ctx.is_some() {
        return Redirect::to("/").into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

/// login
///
/// [Anonymous-only Route] POST /login: authenticate and establish a session.
/// The response body never reveals whether the username or the password was
/// wrong.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 303, description = "Already signed in, redirected home")
    )
)]
pub async fn login(
    OptionalAuthUser(ctx): OptionalAuthUser,
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    if ctx.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let response = service::login(&state.repo, &state.config, payload).await?;
    Ok(Json(response).into_response())
}

/// logout
///
/// [Authenticated Route] GET /logout: destroys the session unconditionally and
/// sends the caller home. The required `AuthUser` extractor rejects anonymous
/// callers with a 401 before this body runs.
#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Session destroyed, redirected home"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn logout(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    service::logout(&state.repo, &auth_user).await?;
    Ok(Redirect::to("/"))
}
