//! Fleet and trip data model.
//!
//! Trips and vehicles live in append-only stores owned by the platform and are
//! referenced everywhere by their index (`id`). Waypoints carry a `trip_id`
//! rather than the trip itself.

use serde::{Deserialize, Serialize};

use crate::route::Route;

/// A geocoordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pos {
    pub lon: f64,
    pub lat: f64,
}

impl Pos {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Point at `ratio` of the way from `self` to `other`.
    pub fn lerp(self, other: Pos, ratio: f64) -> Pos {
        Pos {
            lon: self.lon + ratio * (other.lon - self.lon),
            lat: self.lat + ratio * (other.lat - self.lat),
        }
    }

    /// Manhattan distance in degrees.
    pub fn manhattan(self, other: Pos) -> f64 {
        (self.lon - other.lon).abs() + (self.lat - other.lat).abs()
    }
}

/// A trip request as produced by a demand generator. Ids are assigned by the
/// platform when the request enters the trip store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub origin: Pos,
    pub destination: Pos,
    pub request_time_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripStatus {
    Requested,
    Dispatched,
    PickedUp,
    DroppedOff,
    /// Nobody could reach the rider before the walkaway deadline.
    Walkaway,
}

/// Where a trip was spliced into a vehicle schedule at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub vehicle_id: usize,
    pub pickup_index: usize,
    pub dropoff_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub id: usize,
    pub origin: Pos,
    pub destination: Pos,
    pub status: TripStatus,
    pub request_time_s: f64,
    /// Request time plus the walkaway tolerance.
    pub max_pickup_time_s: f64,
    pub assignment: Option<Assignment>,
    pub pickup_time_s: Option<f64>,
    pub dropoff_time_s: Option<f64>,
}

impl Trip {
    pub fn new(id: usize, request: Request, walkaway_time_s: f64) -> Self {
        Self {
            id,
            origin: request.origin,
            destination: request.destination,
            status: TripStatus::Requested,
            request_time_s: request.request_time_s,
            max_pickup_time_s: request.request_time_s + walkaway_time_s,
            assignment: None,
            pickup_time_s: None,
            dropoff_time_s: None,
        }
    }

    pub fn is_onboard(&self) -> bool {
        self.status == TripStatus::PickedUp
    }

    /// Time from request to pickup, once picked up.
    pub fn wait_time_s(&self) -> Option<f64> {
        self.pickup_time_s.map(|t| t - self.request_time_s)
    }

    /// Time from pickup to dropoff, once dropped off.
    pub fn in_vehicle_time_s(&self) -> Option<f64> {
        match (self.pickup_time_s, self.dropoff_time_s) {
            (Some(pickup), Some(dropoff)) => Some(dropoff - pickup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaypointOp {
    Pickup,
    Dropoff,
}

/// A scheduled stop. `route` is the leg driven from the previous stop (or the
/// vehicle's position) to `pos`; `arrival_time_s` is absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub pos: Pos,
    pub op: WaypointOp,
    pub trip_id: usize,
    pub route: Route,
    pub arrival_time_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: usize,
    pub pos: Pos,
    pub capacity: usize,
    /// Number of trips currently onboard.
    pub load: usize,
    pub waypoints: Vec<Waypoint>,
}

impl Vehicle {
    pub fn new(id: usize, pos: Pos, capacity: usize) -> Self {
        Self {
            id,
            pos,
            capacity,
            load: 0,
            waypoints: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.waypoints.is_empty()
    }
}
