//! Haversine router (fallback when OSRM is unavailable).
//!
//! Uses great-circle distance to estimate travel time.
//! Less accurate than OSRM (ignores roads) but always available.

use crate::route::{Leg, Route, RoutingType, Step};
use crate::traits::Router;
use crate::types::Pos;

/// Average driving speed assumption for time estimation.
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine-based router.
///
/// Estimates travel time using straight-line distance and an assumed speed.
/// Full routes are a single straight step from origin to destination.
#[derive(Debug, Clone)]
pub struct HaversineRouter {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineRouter {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineRouter {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Calculate haversine distance between two points in kilometers.
    pub fn haversine_km(from: Pos, to: Pos) -> f64 {
        let lat1_rad = from.lat.to_radians();
        let lat2_rad = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_lng = (to.lon - from.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    /// Convert distance in km to travel time in seconds.
    fn km_to_seconds(&self, km: f64) -> f64 {
        km / self.speed_kmh * 3600.0
    }
}

impl Router for HaversineRouter {
    fn query(&self, origin: Pos, destination: Pos, routing_type: RoutingType) -> Route {
        let km = Self::haversine_km(origin, destination);
        let distance_m = km * 1000.0;
        let duration_s = self.km_to_seconds(km);

        match routing_type {
            RoutingType::TimeOnly => Route::time_only(distance_m, duration_s),
            RoutingType::FullRoute => Route {
                distance_m,
                duration_s,
                legs: vec![Leg {
                    distance_m,
                    duration_s,
                    steps: vec![Step {
                        distance_m,
                        duration_s,
                        poses: vec![origin, destination],
                    }],
                }],
            },
        }
    }
}
