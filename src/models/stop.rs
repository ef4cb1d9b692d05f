use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{db::DbPool, error::AppError, ordering::StopOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopType {
    Start,
    Destination,
    Waypoint,
}

impl StopType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopType::Start => "start",
            StopType::Destination => "destination",
            StopType::Waypoint => "waypoint",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "start" => Some(StopType::Start),
            "destination" => Some(StopType::Destination),
            "waypoint" => Some(StopType::Waypoint),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Stop {
    pub id: i64,
    pub trip_id: i64,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub place_id: Option<String>,
    pub stop_type: String,
    pub order: i64,
    pub arrival_time: Option<NaiveTime>,
    pub departure_time: Option<NaiveTime>,
    pub duration_minutes: Option<i64>,
    pub travel_time_to_next: Option<f64>,
    pub travel_distance_to_next: Option<f64>,
    pub notes: Option<String>,
    pub estimated_cost: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stop {
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    pub async fn list_for_trip(db: &DbPool, trip_id: i64) -> Result<Vec<Stop>, AppError> {
        let stops =
            sqlx::query_as::<_, Stop>(r#"SELECT * FROM stops WHERE trip_id = ? ORDER BY "order""#)
                .bind(trip_id)
                .fetch_all(db)
                .await?;
        Ok(stops)
    }

    pub async fn fetch(db: &DbPool, trip_id: i64, id: i64) -> Result<Option<Stop>, AppError> {
        let stop = sqlx::query_as::<_, Stop>("SELECT * FROM stops WHERE id = ? AND trip_id = ?")
            .bind(id)
            .bind(trip_id)
            .fetch_optional(db)
            .await?;
        Ok(stop)
    }

    /// Inserts a stop; without an explicit order it lands after the current
    /// last stop.
    pub async fn insert(db: &DbPool, trip_id: i64, input: &StopInput) -> Result<Stop, AppError> {
        input.validate()?;
        let order = match input.order {
            Some(order) => order,
            None => {
                let last: Option<i64> =
                    sqlx::query_scalar(r#"SELECT MAX("order") FROM stops WHERE trip_id = ?"#)
                        .bind(trip_id)
                        .fetch_one(db)
                        .await?;
                last.unwrap_or(0) + 1
            }
        };

        let now = Utc::now();
        let result = sqlx::query(
            r#"INSERT INTO stops
               (trip_id, name, address, latitude, longitude, place_id, stop_type, "order",
                arrival_time, departure_time, duration_minutes, notes, estimated_cost,
                created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(trip_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.place_id)
        .bind(&input.stop_type)
        .bind(order)
        .bind(input.arrival_time)
        .bind(input.departure_time)
        .bind(input.duration_minutes)
        .bind(&input.notes)
        .bind(input.estimated_cost)
        .bind(now)
        .bind(now)
        .execute(db)
        .await
        .map_err(|err| {
            AppError::on_unique_violation(err, "a stop with this order already exists in the trip")
        })?;

        Self::fetch(db, trip_id, result.last_insert_rowid())
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn update(
        db: &DbPool,
        trip_id: i64,
        id: i64,
        input: &StopInput,
    ) -> Result<Stop, AppError> {
        input.validate()?;
        let existing = Self::fetch(db, trip_id, id).await?.ok_or(AppError::NotFound)?;
        let order = input.order.unwrap_or(existing.order);
        sqlx::query(
            r#"UPDATE stops SET
               name = ?, address = ?, latitude = ?, longitude = ?, place_id = ?,
               stop_type = ?, "order" = ?, arrival_time = ?, departure_time = ?,
               duration_minutes = ?, notes = ?, estimated_cost = ?, updated_at = ?
               WHERE id = ? AND trip_id = ?"#,
        )
        .bind(&input.name)
        .bind(&input.address)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.place_id)
        .bind(&input.stop_type)
        .bind(order)
        .bind(input.arrival_time)
        .bind(input.departure_time)
        .bind(input.duration_minutes)
        .bind(&input.notes)
        .bind(input.estimated_cost)
        .bind(Utc::now())
        .bind(id)
        .bind(trip_id)
        .execute(db)
        .await
        .map_err(|err| {
            AppError::on_unique_violation(err, "a stop with this order already exists in the trip")
        })?;
        Self::fetch(db, trip_id, id).await?.ok_or(AppError::NotFound)
    }

    pub async fn delete(db: &DbPool, trip_id: i64, id: i64) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM stops WHERE id = ? AND trip_id = ?")
            .bind(id)
            .bind(trip_id)
            .execute(db)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Applies a validated reorder batch in one transaction. Orders are
    /// written negated first, then flipped, so the per-trip uniqueness
    /// constraint holds at every statement even when stops swap positions.
    /// An id that does not belong to the trip rolls the whole batch back.
    pub async fn apply_orders(
        db: &DbPool,
        trip_id: i64,
        orders: &[StopOrder],
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        let now = Utc::now();
        for pair in orders {
            let updated = sqlx::query(
                r#"UPDATE stops SET "order" = ?, updated_at = ? WHERE id = ? AND trip_id = ?"#,
            )
            .bind(-pair.order)
            .bind(now)
            .bind(pair.id)
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(AppError::NotFound);
            }
        }
        sqlx::query(r#"UPDATE stops SET "order" = -"order" WHERE trip_id = ? AND "order" < 0"#)
            .bind(trip_id)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                AppError::on_unique_violation(
                    err,
                    "reorder would duplicate the order of a stop not in the batch",
                )
            })?;
        tx.commit().await?;
        Ok(())
    }
}

/// View of a stop for API responses, with the coordinate pair the clients
/// expect alongside the raw fields.
#[derive(Debug, Clone, Serialize)]
pub struct StopView {
    #[serde(flatten)]
    pub stop: Stop,
    pub coordinates: (f64, f64),
}

impl From<Stop> for StopView {
    fn from(stop: Stop) -> Self {
        let coordinates = stop.coordinates();
        Self { stop, coordinates }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopInput {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub place_id: Option<String>,
    #[serde(default = "default_stop_type")]
    pub stop_type: String,
    pub order: Option<i64>,
    pub arrival_time: Option<NaiveTime>,
    pub departure_time: Option<NaiveTime>,
    pub duration_minutes: Option<i64>,
    pub notes: Option<String>,
    pub estimated_cost: Option<f64>,
}

fn default_stop_type() -> String {
    StopType::Waypoint.as_str().to_string()
}

impl StopInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("stop name cannot be empty"));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::validation("latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::validation(
                "longitude must be between -180 and 180",
            ));
        }
        if StopType::parse(&self.stop_type).is_none() {
            return Err(AppError::validation(format!(
                "unknown stop type '{}'",
                self.stop_type
            )));
        }
        if let Some(order) = self.order {
            if order < 1 {
                return Err(AppError::validation("order must be a positive integer"));
            }
        }
        if let Some(minutes) = self.duration_minutes {
            if minutes < 0 {
                return Err(AppError::validation("duration minutes cannot be negative"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> StopInput {
        StopInput {
            name: "Grand Canyon".into(),
            address: "Arizona, USA".into(),
            latitude: 36.1,
            longitude: -112.1,
            place_id: None,
            stop_type: "waypoint".into(),
            order: None,
            arrival_time: None,
            departure_time: None,
            duration_minutes: Some(120),
            notes: None,
            estimated_cost: Some(35.0),
        }
    }

    #[test]
    fn accepts_valid_input() {
        assert!(sample_input().validate().is_ok());
    }

    #[test]
    fn rejects_latitude_out_of_range() {
        let mut input = sample_input();
        input.latitude = 90.5;
        assert!(matches!(input.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_longitude_out_of_range() {
        let mut input = sample_input();
        input.longitude = -181.0;
        assert!(input.validate().is_err());
    }

    #[test]
    fn rejects_unknown_stop_type() {
        let mut input = sample_input();
        input.stop_type = "teleporter".into();
        assert!(input.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_explicit_order() {
        let mut input = sample_input();
        input.order = Some(0);
        assert!(input.validate().is_err());
    }
}
