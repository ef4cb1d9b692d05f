//! Route estimation between waypoints.
//!
//! Flat per-leg estimate until a real directions provider is wired in.
//! Distances are miles, durations hours.
//!
//! TODO: replace the flat estimate with a Google Directions API client.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RouteLeg {
    pub distance: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteEstimate {
    pub total_distance: f64,
    pub total_time: f64,
    pub legs: Vec<RouteLeg>,
}

#[derive(Debug, Clone)]
pub struct RouteEstimator {
    pub miles_per_leg: f64,
    pub average_speed_mph: f64,
}

impl Default for RouteEstimator {
    fn default() -> Self {
        Self {
            miles_per_leg: 150.0,
            average_speed_mph: 60.0,
        }
    }
}

impl RouteEstimator {
    /// One leg per consecutive waypoint pair; fewer than two waypoints means
    /// no legs and zero totals.
    pub fn estimate(&self, waypoints: &[(f64, f64)]) -> RouteEstimate {
        let leg_count = waypoints.len().saturating_sub(1);
        let leg_duration = self.miles_per_leg / self.average_speed_mph;
        let legs: Vec<RouteLeg> = (0..leg_count)
            .map(|_| RouteLeg {
                distance: self.miles_per_leg,
                duration: leg_duration,
            })
            .collect();
        RouteEstimate {
            total_distance: self.miles_per_leg * leg_count as f64,
            total_time: leg_duration * leg_count as f64,
            legs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_waypoints_make_three_legs() {
        let estimate = RouteEstimator::default().estimate(&[
            (40.7, -74.0),
            (41.9, -87.6),
            (39.7, -104.9),
            (36.2, -115.1),
        ]);
        assert_eq!(estimate.legs.len(), 3);
        assert_eq!(estimate.total_distance, 450.0);
        assert_eq!(estimate.total_time, 7.5);
        assert_eq!(estimate.legs[0].duration, 2.5);
    }

    #[test]
    fn single_waypoint_has_no_legs() {
        let estimate = RouteEstimator::default().estimate(&[(40.7, -74.0)]);
        assert!(estimate.legs.is_empty());
        assert_eq!(estimate.total_distance, 0.0);
        assert_eq!(estimate.total_time, 0.0);
    }
}
