use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    db::DbPool,
    error::AppError,
    models::stop::Stop,
    services::routing::RouteEstimator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Fastest,
    Scenic,
    Custom,
}

impl RouteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Fastest => "fastest",
            RouteType::Scenic => "scenic",
            RouteType::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fastest" => Some(RouteType::Fastest),
            "scenic" => Some(RouteType::Scenic),
            "custom" => Some(RouteType::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Trip {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub route_type: String,
    pub total_distance: f64,
    pub total_time: f64,
    pub estimated_fuel_cost: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_public: bool,
    pub fuel_efficiency: f64,
    pub fuel_price_per_gallon: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Inclusive day count between start and end date; `None` unless both
    /// dates are set.
    pub fn duration_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days() + 1),
            _ => None,
        }
    }

    pub async fn fetch(db: &DbPool, id: i64) -> Result<Option<Trip>, AppError> {
        let trip = sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(trip)
    }

    pub async fn insert(db: &DbPool, user_id: i64, input: &TripInput) -> Result<Trip, AppError> {
        input.validate()?;
        let now = Utc::now();
        let result = sqlx::query(
            r#"INSERT INTO trips
               (user_id, name, description, route_type, start_date, end_date,
                is_public, fuel_efficiency, fuel_price_per_gallon, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.route_type)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.is_public)
        .bind(input.fuel_efficiency)
        .bind(input.fuel_price_per_gallon)
        .bind(now)
        .bind(now)
        .execute(db)
        .await?;

        Self::fetch(db, result.last_insert_rowid())
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Updates the user-writable fields only; aggregate totals stay
    /// system-computed.
    pub async fn update(db: &DbPool, id: i64, input: &TripInput) -> Result<Trip, AppError> {
        input.validate()?;
        let updated = sqlx::query(
            r#"UPDATE trips SET
               name = ?, description = ?, route_type = ?, start_date = ?, end_date = ?,
               is_public = ?, fuel_efficiency = ?, fuel_price_per_gallon = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.route_type)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.is_public)
        .bind(input.fuel_efficiency)
        .bind(input.fuel_price_per_gallon)
        .bind(Utc::now())
        .bind(id)
        .execute(db)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Self::fetch(db, id).await?.ok_or(AppError::NotFound)
    }

    pub async fn delete(db: &DbPool, id: i64) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM trips WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub async fn stops_count(db: &DbPool, trip_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stops WHERE trip_id = ?")
            .bind(trip_id)
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    /// Trips owned by or actively shared with the user, most recently
    /// updated first.
    pub async fn list_visible_to(db: &DbPool, user_id: i64) -> Result<Vec<TripSummary>, AppError> {
        let rows = sqlx::query_as::<_, TripSummary>(&format!(
            "{SUMMARY_SELECT} WHERE t.user_id = ? OR EXISTS (
                 SELECT 1 FROM trip_shares ts
                 WHERE ts.trip_id = t.id AND ts.shared_with_id = ? AND ts.is_active = 1)
             ORDER BY t.updated_at DESC"
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(TripSummary::finalize).collect())
    }

    pub async fn list_shared_with(db: &DbPool, user_id: i64) -> Result<Vec<TripSummary>, AppError> {
        let rows = sqlx::query_as::<_, TripSummary>(&format!(
            "{SUMMARY_SELECT} WHERE EXISTS (
                 SELECT 1 FROM trip_shares ts
                 WHERE ts.trip_id = t.id AND ts.shared_with_id = ? AND ts.is_active = 1)
             ORDER BY t.updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(TripSummary::finalize).collect())
    }

    pub async fn count_public(db: &DbPool) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trips WHERE is_public = 1")
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    pub async fn list_public(
        db: &DbPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TripSummary>, AppError> {
        let rows = sqlx::query_as::<_, TripSummary>(&format!(
            "{SUMMARY_SELECT} WHERE t.is_public = 1
             ORDER BY t.updated_at DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(TripSummary::finalize).collect())
    }

    /// Recomputes per-leg travel fields and aggregate totals from the stop
    /// list, in one transaction. With fewer than two stops everything zeroes
    /// out; otherwise each stop except the last gets the estimator's leg to
    /// its successor, and the fuel cost follows from the configured
    /// efficiency and price.
    pub async fn recalculate_statistics(
        db: &DbPool,
        estimator: &RouteEstimator,
        trip_id: i64,
    ) -> Result<Trip, AppError> {
        let mut tx = db.begin().await?;
        let trip = sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = ?")
            .bind(trip_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound)?;
        let stops =
            sqlx::query_as::<_, Stop>(r#"SELECT * FROM stops WHERE trip_id = ? ORDER BY "order""#)
                .bind(trip_id)
                .fetch_all(&mut *tx)
                .await?;

        let now = Utc::now();
        let (total_distance, total_time, fuel_cost) = if stops.len() < 2 {
            for stop in &stops {
                sqlx::query(
                    "UPDATE stops SET travel_time_to_next = NULL,
                     travel_distance_to_next = NULL, updated_at = ? WHERE id = ?",
                )
                .bind(now)
                .bind(stop.id)
                .execute(&mut *tx)
                .await?;
            }
            (0.0, 0.0, 0.0)
        } else {
            let waypoints: Vec<(f64, f64)> = stops.iter().map(Stop::coordinates).collect();
            let estimate = estimator.estimate(&waypoints);
            for (index, stop) in stops.iter().enumerate() {
                let leg = estimate.legs.get(index);
                sqlx::query(
                    "UPDATE stops SET travel_time_to_next = ?,
                     travel_distance_to_next = ?, updated_at = ? WHERE id = ?",
                )
                .bind(leg.map(|l| l.duration))
                .bind(leg.map(|l| l.distance))
                .bind(now)
                .bind(stop.id)
                .execute(&mut *tx)
                .await?;
            }
            let fuel_cost =
                estimate.total_distance / trip.fuel_efficiency * trip.fuel_price_per_gallon;
            (estimate.total_distance, estimate.total_time, fuel_cost)
        };

        sqlx::query(
            "UPDATE trips SET total_distance = ?, total_time = ?,
             estimated_fuel_cost = ?, updated_at = ? WHERE id = ?",
        )
        .bind(total_distance)
        .bind(total_time)
        .bind(fuel_cost)
        .bind(now)
        .bind(trip_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Self::fetch(db, trip_id).await?.ok_or(AppError::NotFound)
    }
}

const SUMMARY_SELECT: &str = r#"
    SELECT t.id, t.user_id, t.name, t.description, t.route_type,
           t.total_distance, t.total_time, t.estimated_fuel_cost,
           t.start_date, t.end_date, t.is_public,
           t.created_at, t.updated_at,
           TRIM(u.first_name || ' ' || u.last_name) AS user_name,
           (SELECT COUNT(*) FROM stops s WHERE s.trip_id = t.id) AS stops_count
    FROM trips t JOIN users u ON u.id = t.user_id"#;

/// Listing view of a trip: row columns plus the derived fields.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TripSummary {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub route_type: String,
    pub user_name: String,
    pub total_distance: f64,
    pub total_time: f64,
    pub estimated_fuel_cost: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[sqlx(default)]
    pub duration_days: Option<i64>,
    pub stops_count: i64,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TripSummary {
    fn finalize(mut self) -> Self {
        self.duration_days = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days() + 1),
            _ => None,
        };
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_route_type")]
    pub route_type: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "default_fuel_efficiency")]
    pub fuel_efficiency: f64,
    #[serde(default = "default_fuel_price")]
    pub fuel_price_per_gallon: f64,
}

fn default_route_type() -> String {
    RouteType::Fastest.as_str().to_string()
}

fn default_fuel_efficiency() -> f64 {
    25.0
}

fn default_fuel_price() -> f64 {
    3.50
}

impl TripInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("trip name cannot be empty"));
        }
        if RouteType::parse(&self.route_type).is_none() {
            return Err(AppError::validation(format!(
                "unknown route type '{}'",
                self.route_type
            )));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(AppError::validation(
                    "end date cannot be before start date",
                ));
            }
        }
        if !(5.0..=100.0).contains(&self.fuel_efficiency) {
            return Err(AppError::validation(
                "fuel efficiency must be between 5 and 100 MPG",
            ));
        }
        if !(1.0..=10.0).contains(&self.fuel_price_per_gallon) {
            return Err(AppError::validation(
                "fuel price must be between 1 and 10 USD per gallon",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trip() -> Trip {
        Trip {
            id: 1,
            user_id: 1,
            name: "Coast drive".into(),
            description: String::new(),
            route_type: "fastest".into(),
            total_distance: 0.0,
            total_time: 0.0,
            estimated_fuel_cost: 0.0,
            start_date: None,
            end_date: None,
            is_public: false,
            fuel_efficiency: 25.0,
            fuel_price_per_gallon: 3.5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_input() -> TripInput {
        TripInput {
            name: "Coast drive".into(),
            description: String::new(),
            route_type: "fastest".into(),
            start_date: None,
            end_date: None,
            is_public: false,
            fuel_efficiency: 25.0,
            fuel_price_per_gallon: 3.5,
        }
    }

    #[test]
    fn duration_days_is_inclusive() {
        let mut trip = sample_trip();
        trip.start_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        trip.end_date = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(trip.duration_days(), Some(5));
    }

    #[test]
    fn duration_days_single_day_trip() {
        let mut trip = sample_trip();
        trip.start_date = NaiveDate::from_ymd_opt(2024, 3, 10);
        trip.end_date = NaiveDate::from_ymd_opt(2024, 3, 10);
        assert_eq!(trip.duration_days(), Some(1));
    }

    #[test]
    fn duration_days_needs_both_dates() {
        let mut trip = sample_trip();
        assert_eq!(trip.duration_days(), None);
        trip.start_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(trip.duration_days(), None);
    }

    #[test]
    fn input_rejects_end_before_start() {
        let mut input = sample_input();
        input.start_date = NaiveDate::from_ymd_opt(2024, 1, 5);
        input.end_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(matches!(input.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn input_rejects_unknown_route_type() {
        let mut input = sample_input();
        input.route_type = "teleport".into();
        assert!(input.validate().is_err());
    }

    #[test]
    fn input_rejects_out_of_range_fuel_settings() {
        let mut input = sample_input();
        input.fuel_efficiency = 3.0;
        assert!(input.validate().is_err());
        input.fuel_efficiency = 25.0;
        input.fuel_price_per_gallon = 12.0;
        assert!(input.validate().is_err());
    }
}
