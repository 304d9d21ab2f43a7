use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::Role,
    repository::RepositoryState,
};

/// Session lifetime without the "remember me" extension.
pub const SESSION_LIFETIME_DAYS: i64 = 1;
/// Extended session lifetime when "remember me" is requested at login.
pub const REMEMBER_LIFETIME_DAYS: i64 = 30;

/// Claims
///
/// The payload structure signed into every bearer token. Validated on every
/// authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the user, used to re-resolve the identity
    /// and current role from the `users` table.
    pub sub: Uuid,
    /// Session id (sid): the server-side session row this token is bound to.
    /// The token is only accepted while that row still exists, which is what
    /// makes logout an unconditional revocation.
    pub sid: Uuid,
    /// Expiration Time (exp): timestamp after which the token must not be
    /// accepted. Mirrors the session row's expiry.
    pub exp: usize,
    /// Issued At (iat): timestamp when the token was issued.
    pub iat: usize,
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request: who the caller is, what
/// role they carry, and which session produced the binding. Handlers pass this
/// (or its absence) into the guard pipeline.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub session_id: Uuid,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any authenticated handler, separating authentication
/// from the handler's business logic.
///
/// The process:
/// 1. Dependency resolution: Repository and AppConfig from the application state.
/// 2. Local bypass: development-time access via the 'x-user-id' header.
/// 3. Token validation: Bearer extraction and JWT decoding.
/// 4. Session check: the `sid` row must still exist and not be expired.
/// 5. DB lookup: the user's existence and current role.
///
/// Rejection: `AppError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Local Development Bypass
        // In Env::Local, a known user UUID in the 'x-user-id' header stands in
        // for a full login. The user must still exist so the role is real.
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        if let Some(user) = repo.get_user(user_id).await? {
                            return Ok(AuthUser {
                                id: user.id,
                                role: user.role,
                                session_id: Uuid::nil(),
                            });
                        }
                    }
                }
            }
        }
        // In Production, or when the bypass did not resolve, execution falls
        // through to the standard token validation flow.

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                match e.kind() {
                    // Token expired: the most common failure for a valid-but-old token.
                    ErrorKind::ExpiredSignature => return Err(AppError::Unauthorized),
                    // All other failure types (bad signature, malformed token, ...).
                    _ => return Err(AppError::Unauthorized),
                }
            }
        };

        // Session revocation check: logout deletes the row, which invalidates
        // the token even while its signature is still within lifetime.
        let session = repo
            .get_session(token_data.claims.sid)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if session.expires_at <= Utc::now() {
            // Lazy purge; the reject stands either way.
            let _ = repo.delete_session(session.id).await;
            return Err(AppError::Unauthorized);
        }

        // Final verification against the database. This denies access if the
        // user was deleted after the token was issued, and picks up the
        // current role rather than trusting a stale one.
        let user = repo
            .get_user(token_data.claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
            session_id: session.id,
        })
    }
}

/// OptionalAuthUser
///
/// Extractor variant that treats any authentication failure as "anonymous"
/// instead of rejecting the request. Handlers use it to hand an explicit
/// `Option<AuthUser>` context to the guard pipeline, and for the
/// anonymous-only surfaces (register/login) where an authenticated caller is
/// courteously redirected rather than rejected.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthUser(
            AuthUser::from_request_parts(parts, state).await.ok(),
        ))
    }
}

// --- Guard Pipeline ---
//
// Evaluated in fixed order (authenticate, then authorize) as pure functions of
// the explicit request context. No ambient current-user state exists anywhere.

/// require_authenticated
///
/// First stage of the pipeline: an anonymous context is rejected with
/// `Unauthorized`.
pub fn require_authenticated(ctx: Option<&AuthUser>) -> Result<&AuthUser, AppError> {
    ctx.ok_or(AppError::Unauthorized)
}

/// require_role
///
/// Second stage: runs only after authentication passed. A role mismatch is
/// `Forbidden`, which the HTTP boundary degrades into a redirect-with-warning
/// for browser clients rather than a hard failure page.
pub fn require_role(ctx: Option<&AuthUser>, role: Role) -> Result<&AuthUser, AppError> {
    let user = require_authenticated(ctx)?;
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

// --- Password Hashing ---

/// hash_password
///
/// Hashes a plaintext password with Argon2id and a fresh random salt, producing
/// a self-describing PHC string. CPU-intensive: callers on the async runtime
/// wrap this in `spawn_blocking`.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// verify_password
///
/// Recomputes the Argon2id hash check against a stored PHC string. The digest
/// comparison inside the argon2 crate is constant-time. Returns Ok(false) for
/// a wrong password; only a malformed stored hash is an error.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("invalid stored password hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!(
            "password verification failed: {e}"
        ))),
    }
}

// --- Token Issuing ---

/// issue_token
///
/// Encodes the signed bearer token binding a user to a session row. The token
/// expiry mirrors the session row's `expires_at`.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    session_id: Uuid,
    expires_at: DateTime<Utc>,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        sid: session_id,
        iat: Utc::now().timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
}
