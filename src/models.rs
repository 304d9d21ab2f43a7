use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The coarse permission tag attached to every user. Only `admin` may mutate
/// student records; newly registered accounts are always `guest`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    Guest,
}

/// Gender
///
/// Enumerated value stored for every student record (`basicinfo.gender`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[ts(export)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

/// User
///
/// Represents the user's canonical identity record stored in the `users` table.
/// The password hash never leaves the server: it is skipped during serialization
/// and only ever compared via the credential verification path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
}

/// Major
///
/// An academic program from the `majors` table. Static reference data: students
/// point at it through a nullable foreign key, and no mutation is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Major {
    pub id: i32,
    pub name: String,
}

/// Student
///
/// A student record from the `basicinfo` table. The primary key (`student_id`)
/// is externally supplied rather than generated, and the update operation may
/// change it; afterwards the record is addressable only by the new id.
///
/// `age` is stored independently of `birthday`; the two are not cross-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Student {
    pub student_id: i32,
    pub name: String,
    pub gender: Gender,
    #[ts(type = "string")]
    pub birthday: NaiveDate,
    pub age: i32,
    // Nullable FK into majors; None means "no major assigned".
    pub major_id: Option<i32>,
}

/// Session
///
/// A server-side session row. The bearer token a client holds references this
/// row by id; logout deletes the row, which revokes the token regardless of its
/// remaining signed lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /register).
/// The plaintext password is hashed immediately and never persisted or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// LoginRequest
///
/// Input payload for POST /login. `remember_me` extends the session lifetime
/// from one day to thirty.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// StudentForm
///
/// The single validated input payload shared by the create (POST /new) and
/// update (POST /edit/{student_id}) paths. The two flows only ever differed by
/// a submit label, which is a presentation concern and does not exist here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StudentForm {
    pub student_id: i32,
    pub name: String,
    pub gender: Gender,
    #[ts(type = "string")]
    pub birthday: NaiveDate,
    pub age: i32,
    pub major_id: Option<i32>,
}

impl From<StudentForm> for Student {
    fn from(form: StudentForm) -> Self {
        Student {
            student_id: form.student_id,
            name: form.name,
            gender: form.gender,
            birthday: form.birthday,
            age: form.age,
            major_id: form.major_id,
        }
    }
}

/// --- Response Schemas (Output) ---

/// UserProfile
///
/// Output schema for a user identity. This is the only shape in which account
/// data crosses the HTTP boundary; the stored hash stays internal.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// LoginResponse
///
/// Output schema of a successful login: the signed bearer token plus the
/// resolved profile of the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// RosterPayload
///
/// Output schema for the roster surfaces (GET / and GET /major/{id}): the
/// student listing plus the full catalog, which the presentation layer uses
/// for the per-major filter links.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RosterPayload {
    pub students: Vec<Student>,
    pub majors: Vec<Major>,
}

/// StudentFormPayload
///
/// Output schema for the form surfaces (GET /new and GET /edit/{id}): the
/// catalog that populates the major selection, and (on edit) the stored
/// record the form is pre-populated from.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StudentFormPayload {
    pub majors: Vec<Major>,
    pub student: Option<Student>,
}
