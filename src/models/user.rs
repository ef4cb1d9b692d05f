use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use crate::{db::DbPool, error::AppError};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub preferences: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn preferences_map(&self) -> Map<String, Value> {
        serde_json::from_str(&self.preferences).unwrap_or_default()
    }

    pub async fn find_by_id(db: &DbPool, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &DbPool, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn update_profile(
        db: &DbPool,
        id: i64,
        update: &ProfileUpdate,
    ) -> Result<User, AppError> {
        sqlx::query("UPDATE users SET first_name = ?, last_name = ? WHERE id = ?")
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(id)
            .execute(db)
            .await?;
        Self::find_by_id(db, id).await?.ok_or(AppError::NotFound)
    }

    /// Merges `patch` into the stored preference map and rewrites the whole
    /// map in one statement. Keys in `patch` win over stored keys; other keys
    /// are preserved. Returns the merged map.
    pub async fn merge_preferences(
        db: &DbPool,
        id: i64,
        patch: Map<String, Value>,
    ) -> Result<Map<String, Value>, AppError> {
        let mut tx = db.begin().await?;
        let stored: String = sqlx::query_scalar("SELECT preferences FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut merged: Map<String, Value> = serde_json::from_str(&stored).unwrap_or_default();
        for (key, value) in patch {
            merged.insert(key, value);
        }

        let serialized =
            serde_json::to_string(&merged).map_err(|err| AppError::Other(err.into()))?;
        sqlx::query("UPDATE users SET preferences = ? WHERE id = ?")
            .bind(&serialized)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(merged)
    }
}

/// Public view of a user, safe to serialize in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub preferences: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            preferences: user.preferences_map(),
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            uuid: "u-1".into(),
            email: "ada@example.com".into(),
            username: "ada".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            password_hash: String::new(),
            preferences: r#"{"units":"miles"}"#.into(),
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn full_name_joins_and_trims() {
        let mut user = sample_user();
        assert_eq!(user.full_name(), "Ada Lovelace");
        user.last_name.clear();
        assert_eq!(user.full_name(), "Ada");
    }

    #[test]
    fn preferences_parse_and_survive_garbage() {
        let mut user = sample_user();
        assert_eq!(
            user.preferences_map().get("units"),
            Some(&Value::String("miles".into()))
        );
        user.preferences = "not json".into();
        assert!(user.preferences_map().is_empty());
    }
}
