use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{db::DbPool, error::AppError, models::user::User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    View,
    Edit,
    Admin,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::View => "view",
            PermissionLevel::Edit => "edit",
            PermissionLevel::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "view" => Some(PermissionLevel::View),
            "edit" => Some(PermissionLevel::Edit),
            "admin" => Some(PermissionLevel::Admin),
            _ => None,
        }
    }

    pub fn allows_write(&self) -> bool {
        matches!(self, PermissionLevel::Edit | PermissionLevel::Admin)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TripShare {
    pub id: i64,
    pub trip_id: i64,
    pub shared_with_id: i64,
    pub shared_by_id: i64,
    pub permission_level: String,
    pub message: Option<String>,
    pub shared_at: DateTime<Utc>,
    pub is_active: bool,
}

impl TripShare {
    pub async fn fetch(db: &DbPool, trip_id: i64, id: i64) -> Result<Option<TripShare>, AppError> {
        let share =
            sqlx::query_as::<_, TripShare>("SELECT * FROM trip_shares WHERE id = ? AND trip_id = ?")
                .bind(id)
                .bind(trip_id)
                .fetch_optional(db)
                .await?;
        Ok(share)
    }

    /// Active share of a trip towards a given user, if any.
    pub async fn active_for(
        db: &DbPool,
        trip_id: i64,
        user_id: i64,
    ) -> Result<Option<TripShare>, AppError> {
        let share = sqlx::query_as::<_, TripShare>(
            "SELECT * FROM trip_shares
             WHERE trip_id = ? AND shared_with_id = ? AND is_active = 1",
        )
        .bind(trip_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(share)
    }

    pub async fn list_active_for_trip(
        db: &DbPool,
        trip_id: i64,
    ) -> Result<Vec<TripShareView>, AppError> {
        let shares = sqlx::query_as::<_, TripShareView>(&format!(
            "{VIEW_SELECT} WHERE ts.trip_id = ? AND ts.is_active = 1 ORDER BY ts.shared_at DESC"
        ))
        .bind(trip_id)
        .fetch_all(db)
        .await?;
        Ok(shares)
    }

    pub async fn fetch_view(
        db: &DbPool,
        trip_id: i64,
        id: i64,
    ) -> Result<Option<TripShareView>, AppError> {
        let share = sqlx::query_as::<_, TripShareView>(&format!(
            "{VIEW_SELECT} WHERE ts.id = ? AND ts.trip_id = ?"
        ))
        .bind(id)
        .bind(trip_id)
        .fetch_optional(db)
        .await?;
        Ok(share)
    }

    /// Creates a share towards the user behind `shared_with_email`. The
    /// recipient must exist, and `shared_by` is always the acting user. A
    /// second active share for the same recipient trips the uniqueness
    /// constraint and comes back as a validation error.
    pub async fn create(
        db: &DbPool,
        trip_id: i64,
        shared_with_email: &str,
        shared_by_id: i64,
        input: &ShareInput,
    ) -> Result<TripShare, AppError> {
        let permission = input.permission_level();
        if permission.is_none() {
            return Err(AppError::validation(format!(
                "unknown permission level '{}'",
                input.permission_level
            )));
        }
        let recipient = User::find_by_email(db, shared_with_email)
            .await?
            .ok_or_else(|| AppError::validation("user with this email does not exist"))?;

        let result = sqlx::query(
            "INSERT INTO trip_shares
             (trip_id, shared_with_id, shared_by_id, permission_level, message, shared_at, is_active)
             VALUES (?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(trip_id)
        .bind(recipient.id)
        .bind(shared_by_id)
        .bind(&input.permission_level)
        .bind(&input.message)
        .bind(Utc::now())
        .execute(db)
        .await
        .map_err(|err| {
            AppError::on_unique_violation(err, "trip is already shared with this user")
        })?;

        Self::fetch(db, trip_id, result.last_insert_rowid())
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn update(
        db: &DbPool,
        trip_id: i64,
        id: i64,
        update: &ShareUpdate,
    ) -> Result<TripShare, AppError> {
        if let Some(level) = &update.permission_level {
            if PermissionLevel::parse(level).is_none() {
                return Err(AppError::validation(format!(
                    "unknown permission level '{level}'"
                )));
            }
        }
        let existing = Self::fetch(db, trip_id, id).await?.ok_or(AppError::NotFound)?;
        sqlx::query(
            "UPDATE trip_shares SET permission_level = ?, is_active = ?, message = ? WHERE id = ?",
        )
        .bind(
            update
                .permission_level
                .as_deref()
                .unwrap_or(&existing.permission_level),
        )
        .bind(update.is_active.unwrap_or(existing.is_active))
        .bind(update.message.as_deref().or(existing.message.as_deref()))
        .bind(id)
        .execute(db)
        .await?;
        Self::fetch(db, trip_id, id).await?.ok_or(AppError::NotFound)
    }

    pub async fn delete(db: &DbPool, trip_id: i64, id: i64) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM trip_shares WHERE id = ? AND trip_id = ?")
            .bind(id)
            .bind(trip_id)
            .execute(db)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub fn permission(&self) -> PermissionLevel {
        PermissionLevel::parse(&self.permission_level).unwrap_or(PermissionLevel::View)
    }
}

const VIEW_SELECT: &str = r#"
    SELECT ts.id, ts.trip_id, ts.shared_with_id, ts.shared_by_id,
           ts.permission_level, ts.message, ts.shared_at, ts.is_active,
           t.name AS trip_name,
           TRIM(rw.first_name || ' ' || rw.last_name) AS shared_with_name,
           rw.email AS shared_with_email,
           TRIM(rb.first_name || ' ' || rb.last_name) AS shared_by_name
    FROM trip_shares ts
    JOIN trips t ON t.id = ts.trip_id
    JOIN users rw ON rw.id = ts.shared_with_id
    JOIN users rb ON rb.id = ts.shared_by_id"#;

/// Share row joined with trip and user names for API responses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TripShareView {
    pub id: i64,
    pub trip_id: i64,
    pub trip_name: String,
    pub shared_with_id: i64,
    pub shared_with_name: String,
    pub shared_with_email: String,
    pub shared_by_id: i64,
    pub shared_by_name: String,
    pub permission_level: String,
    pub message: Option<String>,
    pub shared_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShareInput {
    pub shared_with_email: String,
    #[serde(default = "default_permission")]
    pub permission_level: String,
    pub message: Option<String>,
}

fn default_permission() -> String {
    PermissionLevel::View.as_str().to_string()
}

impl ShareInput {
    pub fn permission_level(&self) -> Option<PermissionLevel> {
        PermissionLevel::parse(&self.permission_level)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShareUpdate {
    pub permission_level: Option<String>,
    pub is_active: Option<bool>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_level_cannot_write() {
        assert!(!PermissionLevel::View.allows_write());
        assert!(PermissionLevel::Edit.allows_write());
        assert!(PermissionLevel::Admin.allows_write());
    }

    #[test]
    fn parse_round_trips() {
        for level in [
            PermissionLevel::View,
            PermissionLevel::Edit,
            PermissionLevel::Admin,
        ] {
            assert_eq!(PermissionLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(PermissionLevel::parse("owner"), None);
    }
}
