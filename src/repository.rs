use crate::{
    error::AppError,
    models::{Major, Role, Session, Student, StudentForm, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing the
/// service layer to interact with storage without knowing the concrete backend
/// (Postgres in production, in-memory mocks in tests).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    // Rejects a duplicate username with Error(DuplicateUsername); the existing
    // row is never overwritten.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    // --- Sessions ---
    async fn create_session(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AppError>;
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, AppError>;
    // Returns true if a row was deleted, false if it was already gone.
    async fn delete_session(&self, id: Uuid) -> Result<bool, AppError>;

    // --- Academic Catalog (read-only) ---
    // Ordered by name ascending; feeds both display and form population.
    async fn list_majors(&self) -> Result<Vec<Major>, AppError>;
    async fn get_major(&self, id: i32) -> Result<Option<Major>, AppError>;
    async fn students_of_major(&self, major_id: i32) -> Result<Vec<Student>, AppError>;

    // --- Student Registry ---
    async fn list_students(&self) -> Result<Vec<Student>, AppError>;
    async fn get_student(&self, student_id: i32) -> Result<Option<Student>, AppError>;
    async fn insert_student(&self, form: &StudentForm) -> Result<Student, AppError>;
    // Overwrites every field, including the primary key itself. Returns None
    // when no row matched the old id.
    async fn update_student(
        &self,
        student_id: i32,
        form: &StudentForm,
    ) -> Result<Option<Student>, AppError>;
    async fn delete_student(&self, student_id: i32) -> Result<bool, AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// True when the error is a unique-constraint violation, which the callers
/// translate into a domain error instead of a 500.
fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, username, password_hash, role)
               VALUES ($1, $2, $3, $4)
               RETURNING id, username, password_hash, role"#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateUsername
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        // Case-sensitive exact match: the unique index is on the raw value.
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AppError> {
        let session = sqlx::query_as::<_, Session>(
            r#"INSERT INTO sessions (id, user_id, expires_at)
               VALUES ($1, $2, $3)
               RETURNING id, user_id, expires_at, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_majors(&self) -> Result<Vec<Major>, AppError> {
        let majors = sqlx::query_as::<_, Major>("SELECT id, name FROM majors ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(majors)
    }

    async fn get_major(&self, id: i32) -> Result<Option<Major>, AppError> {
        let major = sqlx::query_as::<_, Major>("SELECT id, name FROM majors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(major)
    }

    async fn students_of_major(&self, major_id: i32) -> Result<Vec<Student>, AppError> {
        let students = sqlx::query_as::<_, Student>(
            r#"SELECT student_id, name, gender, birthday, age, major_id
               FROM basicinfo
               WHERE major_id = $1
               ORDER BY student_id ASC"#,
        )
        .bind(major_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    async fn list_students(&self) -> Result<Vec<Student>, AppError> {
        let students = sqlx::query_as::<_, Student>(
            r#"SELECT student_id, name, gender, birthday, age, major_id
               FROM basicinfo
               ORDER BY student_id ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    async fn get_student(&self, student_id: i32) -> Result<Option<Student>, AppError> {
        let student = sqlx::query_as::<_, Student>(
            r#"SELECT student_id, name, gender, birthday, age, major_id
               FROM basicinfo
               WHERE student_id = $1"#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    async fn insert_student(&self, form: &StudentForm) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(
            r#"INSERT INTO basicinfo (student_id, name, gender, birthday, age, major_id)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING student_id, name, gender, birthday, age, major_id"#,
        )
        .bind(form.student_id)
        .bind(&form.name)
        .bind(form.gender)
        .bind(form.birthday)
        .bind(form.age)
        .bind(form.major_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::validation("student_id", "a student with this id already exists")
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn update_student(
        &self,
        student_id: i32,
        form: &StudentForm,
    ) -> Result<Option<Student>, AppError> {
        // A single statement keyed on the old id: the rename and the field
        // overwrite either happen together or not at all. Renaming onto an
        // occupied id trips the primary-key index rather than losing a row.
        sqlx::query_as::<_, Student>(
            r#"UPDATE basicinfo
               SET student_id = $2, name = $3, gender = $4, birthday = $5, age = $6, major_id = $7
               WHERE student_id = $1
               RETURNING student_id, name, gender, birthday, age, major_id"#,
        )
        .bind(student_id)
        .bind(form.student_id)
        .bind(&form.name)
        .bind(form.gender)
        .bind(form.birthday)
        .bind(form.age)
        .bind(form.major_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::validation("student_id", "a student with this id already exists")
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn delete_student(&self, student_id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM basicinfo WHERE student_id = $1")
            .bind(student_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
