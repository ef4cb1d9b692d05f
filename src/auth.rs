use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::user::User, state::AppState};

pub const SESSION_COOKIE: &str = "roadtrip_session";
pub const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub username: String,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };
        Ok(Self(lookup_session(&state.db, cookie.value()).await?))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(AppError::validation("a valid email address is required"));
        }
        if self.username.trim().is_empty() {
            return Err(AppError::validation("username cannot be empty"));
        }
        if self.password.len() < 8 {
            return Err(AppError::validation(
                "password must be at least 8 characters",
            ));
        }
        if self.password != self.password_confirm {
            return Err(AppError::validation("passwords do not match"));
        }
        Ok(())
    }
}

pub async fn register_user(db: &DbPool, input: &RegisterInput) -> Result<User, AppError> {
    input.validate()?;

    if User::find_by_email(db, &input.email).await?.is_some() {
        return Err(AppError::validation("a user with this email already exists"));
    }
    let username_taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
        .bind(&input.username)
        .fetch_optional(db)
        .await?;
    if username_taken.is_some() {
        return Err(AppError::validation("this username is already taken"));
    }

    let password_hash = hash_password(&input.password)?;
    let result = sqlx::query(
        "INSERT INTO users
         (uuid, email, username, first_name, last_name, password_hash, preferences, created_at)
         VALUES (?, ?, ?, ?, ?, ?, '{}', ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&input.email)
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&password_hash)
    .bind(Utc::now())
    .execute(db)
    .await
    .map_err(|err| AppError::on_unique_violation(err, "a user with this email already exists"))?;

    User::find_by_id(db, result.last_insert_rowid())
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn authenticate_user(db: &DbPool, email: &str, password: &str) -> Result<User, AppError> {
    let user = User::find_by_email(db, email)
        .await?
        .ok_or(AppError::Unauthorized)?;
    verify_password(password, &user.password_hash)?;

    sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user.id)
        .execute(db)
        .await?;
    Ok(user)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| AppError::Other(anyhow::anyhow!("password hashing failed: {err}")))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<(), AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| AppError::Unauthorized)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized)
}

pub async fn create_session(db: &DbPool, user_id: i64) -> Result<String, AppError> {
    let session_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, created_at, last_seen_at, expires_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(now)
    .bind(now)
    .bind(now + Duration::days(SESSION_TTL_DAYS))
    .execute(db)
    .await?;
    Ok(session_id)
}

pub async fn destroy_session(db: &DbPool, session_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn lookup_session(
    db: &DbPool,
    session_id: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT u.* FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.id = ? AND (s.expires_at IS NULL OR s.expires_at > ?)",
    )
    .bind(session_id)
    .bind(Utc::now())
    .fetch_optional(db)
    .await?;

    let Some(user) = user else {
        return Ok(None);
    };
    sqlx::query("UPDATE sessions SET last_seen_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(session_id)
        .execute(db)
        .await?;
    Ok(Some(AuthenticatedUser::from(&user)))
}

pub fn apply_session_cookie(jar: PrivateCookieJar, session_id: &str) -> PrivateCookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/").build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> RegisterInput {
        RegisterInput {
            email: "ada@example.com".into(),
            username: "ada".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            password: "difference engine".into(),
            password_confirm: "difference engine".into(),
        }
    }

    #[test]
    fn registration_requires_matching_passwords() {
        let mut input = sample_input();
        input.password_confirm = "analytical engine".into();
        assert!(matches!(input.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn registration_rejects_short_password() {
        let mut input = sample_input();
        input.password = "short".into();
        input.password_confirm = "short".into();
        assert!(input.validate().is_err());
    }

    #[test]
    fn registration_rejects_bad_email() {
        let mut input = sample_input();
        input.email = "not-an-email".into();
        assert!(input.validate().is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(verify_password("wrong password", &hash).is_err());
    }
}
