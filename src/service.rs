use chrono::{Duration, Utc};
use tokio::task;

use crate::{
    auth::{self, AuthUser, REMEMBER_LIFETIME_DAYS, SESSION_LIFETIME_DAYS},
    config::AppConfig,
    error::AppError,
    models::{
        LoginRequest, LoginResponse, RegisterRequest, Role, RosterPayload, Student, StudentForm,
        StudentFormPayload, User, UserProfile,
    },
    repository::RepositoryState,
};

// The Record Service: orchestration of the student registry and the academic
// catalog, with the guard pipeline evaluated before every mutation. All
// authorization here is a pure function of the explicit `Option<&AuthUser>`
// context a handler resolved for the request; there is no ambient current
// user anywhere in the crate.

// --- Public read surface ---

/// roster
///
/// The landing payload: every student plus the full catalog. No auth required.
pub async fn roster(repo: &RepositoryState) -> Result<RosterPayload, AppError> {
    Ok(RosterPayload {
        students: repo.list_students().await?,
        majors: repo.list_majors().await?,
    })
}

/// roster_by_major
///
/// The filtered roster: exactly the students whose `major_id` matches. An
/// unknown major is a NotFound, not an empty listing.
pub async fn roster_by_major(
    repo: &RepositoryState,
    major_id: i32,
) -> Result<RosterPayload, AppError> {
    repo.get_major(major_id)
        .await?
        .ok_or(AppError::NotFound("major"))?;

    Ok(RosterPayload {
        students: repo.students_of_major(major_id).await?,
        majors: repo.list_majors().await?,
    })
}

// --- Form population (admin-only, mutation precursors) ---

/// new_student_form
///
/// Payload behind GET /new: the catalog that populates the major selection of
/// an empty form.
pub async fn new_student_form(
    repo: &RepositoryState,
    ctx: Option<&AuthUser>,
) -> Result<StudentFormPayload, AppError> {
    auth::require_role(ctx, Role::Admin)?;

    Ok(StudentFormPayload {
        majors: repo.list_majors().await?,
        student: None,
    })
}

/// edit_student_form
///
/// Payload behind GET /edit/{student_id}: the catalog plus the stored record,
/// including the currently resolved major selection.
pub async fn edit_student_form(
    repo: &RepositoryState,
    ctx: Option<&AuthUser>,
    student_id: i32,
) -> Result<StudentFormPayload, AppError> {
    auth::require_role(ctx, Role::Admin)?;

    let student = repo
        .get_student(student_id)
        .await?
        .ok_or(AppError::NotFound("student"))?;

    Ok(StudentFormPayload {
        majors: repo.list_majors().await?,
        student: Some(student),
    })
}

// --- Validation ---

/// validate_student_form
///
/// Field-level constraints shared by create and update. Gender and birthday
/// arrive already typed; what remains is the textual and relational checks.
pub fn validate_student_form(form: &StudentForm) -> Result<(), AppError> {
    if form.student_id <= 0 {
        return Err(AppError::validation(
            "student_id",
            "student id must be a positive integer",
        ));
    }
    if form.name.trim().is_empty() {
        return Err(AppError::validation("name", "name must not be empty"));
    }
    if form.name.len() > 255 {
        return Err(AppError::validation(
            "name",
            "name must be at most 255 characters",
        ));
    }
    if form.age < 0 {
        return Err(AppError::validation("age", "age must not be negative"));
    }
    Ok(())
}

/// validate_registration
///
/// Registration constraints: bounded username, minimum password length, and
/// the confirmation match.
pub fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::validation(
            "username",
            "username must not be empty",
        ));
    }
    if req.username.len() > 64 {
        return Err(AppError::validation(
            "username",
            "username must be at most 64 characters",
        ));
    }
    if req.password.len() < 8 {
        return Err(AppError::validation(
            "password",
            "password must be at least 8 characters",
        ));
    }
    if req.password.len() > 255 {
        return Err(AppError::validation(
            "password",
            "password must be at most 255 characters",
        ));
    }
    if req.password != req.confirm_password {
        return Err(AppError::validation(
            "confirm_password",
            "passwords do not match",
        ));
    }
    Ok(())
}

/// Resolves the optional major link; None is always valid.
async fn check_major_link(
    repo: &RepositoryState,
    major_id: Option<i32>,
) -> Result<(), AppError> {
    if let Some(id) = major_id {
        repo.get_major(id)
            .await?
            .ok_or_else(|| AppError::validation("major_id", "unknown major"))?;
    }
    Ok(())
}

// --- Student mutations (admin-only) ---

/// create_student
///
/// Guard pipeline, then validation, then insert. The new record is immediately
/// visible to subsequent roster calls; each operation commits before it
/// returns.
pub async fn create_student(
    repo: &RepositoryState,
    ctx: Option<&AuthUser>,
    form: StudentForm,
) -> Result<Student, AppError> {
    auth::require_role(ctx, Role::Admin)?;
    validate_student_form(&form)?;
    check_major_link(repo, form.major_id).await?;

    if repo.get_student(form.student_id).await?.is_some() {
        return Err(AppError::validation(
            "student_id",
            "a student with this id already exists",
        ));
    }

    repo.insert_student(&form).await
}

/// update_student
///
/// Overwrites all fields of the record addressed by `student_id`, including
/// the primary key itself; afterwards the record is addressable only by the
/// new id. A rename onto an occupied id fails validation rather than silently
/// clobbering the other record.
pub async fn update_student(
    repo: &RepositoryState,
    ctx: Option<&AuthUser>,
    student_id: i32,
    form: StudentForm,
) -> Result<Student, AppError> {
    auth::require_role(ctx, Role::Admin)?;
    validate_student_form(&form)?;
    check_major_link(repo, form.major_id).await?;

    let existing = repo
        .get_student(student_id)
        .await?
        .ok_or(AppError::NotFound("student"))?;

    if form.student_id != existing.student_id && repo.get_student(form.student_id).await?.is_some()
    {
        return Err(AppError::validation(
            "student_id",
            "a student with this id already exists",
        ));
    }

    repo.update_student(student_id, &form)
        .await?
        .ok_or(AppError::NotFound("student"))
}

/// delete_student
///
/// Removes the record. An absent id surfaces as NotFound here; the HTTP
/// boundary treats that as a soft already-absent condition.
pub async fn delete_student(
    repo: &RepositoryState,
    ctx: Option<&AuthUser>,
    student_id: i32,
) -> Result<(), AppError> {
    auth::require_role(ctx, Role::Admin)?;

    if repo.delete_student(student_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("student"))
    }
}

// --- Account operations ---

/// register
///
/// Creates a guest account. The plaintext password is hashed on a blocking
/// thread (Argon2 is CPU-intensive and would stall the async runtime) and a
/// duplicate username is rejected without touching the existing row.
pub async fn register(
    repo: &RepositoryState,
    req: RegisterRequest,
) -> Result<UserProfile, AppError> {
    validate_registration(&req)?;

    let password = req.password.clone();
    let password_hash = task::spawn_blocking(move || auth::hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task panicked: {e}")))??;

    let user = repo
        .create_user(&req.username, &password_hash, Role::Guest)
        .await?;

    Ok(user.into())
}

/// verify_credentials
///
/// Looks up by exact username and recomputes the hash check. The core
/// distinguishes an unknown user from a wrong password; the login boundary
/// collapses both into one 401.
pub async fn verify_credentials(
    repo: &RepositoryState,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = repo
        .get_user_by_username(username)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let stored_hash = user.password_hash.clone();
    let password = password.to_string();
    let valid = task::spawn_blocking(move || auth::verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(format!("verification task panicked: {e}")))??;

    if valid {
        Ok(user)
    } else {
        Err(AppError::WrongPassword)
    }
}

/// login
///
/// Anonymous → Authenticated transition: verify, establish the session row,
/// issue the bearer token. `remember_me` selects the extended lifetime.
pub async fn login(
    repo: &RepositoryState,
    config: &AppConfig,
    req: LoginRequest,
) -> Result<LoginResponse, AppError> {
    let user = match verify_credentials(repo, &req.username, &req.password).await {
        Ok(user) => user,
        Err(AppError::NotFound(_) | AppError::WrongPassword) => {
            return Err(AppError::WrongPassword);
        }
        Err(e) => return Err(e),
    };

    let lifetime = if req.remember_me {
        Duration::days(REMEMBER_LIFETIME_DAYS)
    } else {
        Duration::days(SESSION_LIFETIME_DAYS)
    };
    let session = repo.create_session(user.id, Utc::now() + lifetime).await?;

    let token = auth::issue_token(&config.jwt_secret, user.id, session.id, session.expires_at)?;

    Ok(LoginResponse {
        token,
        user: user.into(),
    })
}

/// logout
///
/// Authenticated → Anonymous transition: destroys the session unconditionally.
/// A row that is already gone still counts as logged out.
pub async fn logout(repo: &RepositoryState, ctx: &AuthUser) -> Result<(), AppError> {
    repo.delete_session(ctx.session_id).await?;
    Ok(())
}
