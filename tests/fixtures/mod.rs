//! Test fixtures for mod-sim.
//!
//! Provides:
//! - Deterministic routers (Manhattan grid, call counting)
//! - A scripted demand generator
//! - Builders for trips, vehicles and platform configs
//! - Real Las Vegas locations

#![allow(dead_code)]

pub mod las_vegas;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use mod_sim::config::{AreaConfig, FleetConfig, PlatformConfig, RequestConfig, SimulationConfig};
use mod_sim::route::{Leg, Route, RoutingType, Step};
use mod_sim::traits::{DemandGenerator, Router};
use mod_sim::types::{Pos, Request, Trip, Vehicle, WaypointOp};

// ============================================================================
// Routers
// ============================================================================

/// Seconds per degree of Manhattan distance.
pub const SECONDS_PER_DEGREE: f64 = 60.0;

/// Grid router: travel time is Manhattan distance at one degree per minute.
/// Full routes are a single straight step.
pub struct ManhattanRouter;

impl Router for ManhattanRouter {
    fn query(&self, origin: Pos, destination: Pos, routing_type: RoutingType) -> Route {
        let degrees = origin.manhattan(destination);
        let duration_s = degrees * SECONDS_PER_DEGREE;
        let distance_m = degrees * 1000.0;

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

/// Wraps a router and counts queries per routing type.
pub struct CountingRouter<R> {
    inner: R,
    time_only: AtomicUsize,
    full_route: AtomicUsize,
}

impl<R: Router> CountingRouter<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            time_only: AtomicUsize::new(0),
            full_route: AtomicUsize::new(0),
        }
    }

    pub fn time_only_calls(&self) -> usize {
        self.time_only.load(Ordering::SeqCst)
    }

    pub fn full_route_calls(&self) -> usize {
        self.full_route.load(Ordering::SeqCst)
    }
}

impl<R: Router> Router for CountingRouter<R> {
    fn query(&self, origin: Pos, destination: Pos, routing_type: RoutingType) -> Route {
        match routing_type {
            RoutingType::TimeOnly => self.time_only.fetch_add(1, Ordering::SeqCst),
            RoutingType::FullRoute => self.full_route.fetch_add(1, Ordering::SeqCst),
        };
        self.inner.query(origin, destination, routing_type)
    }
}

// ============================================================================
// Demand
// ============================================================================

/// Replays a fixed list of requests in time order.
pub struct ScriptedDemand {
    requests: VecDeque<Request>,
}

impl ScriptedDemand {
    pub fn new(mut requests: Vec<Request>) -> Self {
        requests.sort_by(|a, b| a.request_time_s.total_cmp(&b.request_time_s));
        Self {
            requests: requests.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl DemandGenerator for ScriptedDemand {
    fn generate(&mut self, current_time_s: f64) -> Vec<Request> {
        let mut due = Vec::new();
        while self
            .requests
            .front()
            .is_some_and(|r| r.request_time_s <= current_time_s)
        {
            if let Some(request) = self.requests.pop_front() {
                due.push(request);
            }
        }
        due
    }
}

pub fn request(origin: (f64, f64), destination: (f64, f64), request_time_s: f64) -> Request {
    Request {
        origin: Pos::new(origin.0, origin.1),
        destination: Pos::new(destination.0, destination.1),
        request_time_s,
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Builder for trips with sensible defaults: requested at t = 0 with a
/// ten-minute walkaway tolerance.
#[derive(Clone, Debug)]
pub struct TestTrip {
    id: usize,
    origin: Pos,
    destination: Pos,
    request_time_s: f64,
    walkaway_time_s: f64,
}

impl TestTrip {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            origin: Pos::new(0.0, 0.0),
            destination: Pos::new(1.0, 0.0),
            request_time_s: 0.0,
            walkaway_time_s: minutes(10.0),
        }
    }

    pub fn from(mut self, lon: f64, lat: f64) -> Self {
        self.origin = Pos::new(lon, lat);
        self
    }

    pub fn to(mut self, lon: f64, lat: f64) -> Self {
        self.destination = Pos::new(lon, lat);
        self
    }

    pub fn requested_at(mut self, time_s: f64) -> Self {
        self.request_time_s = time_s;
        self
    }

    pub fn walkaway(mut self, time_s: f64) -> Self {
        self.walkaway_time_s = time_s;
        self
    }

    pub fn build(self) -> Trip {
        Trip::new(
            self.id,
            Request {
                origin: self.origin,
                destination: self.destination,
                request_time_s: self.request_time_s,
            },
            self.walkaway_time_s,
        )
    }
}

pub fn vehicle(id: usize, lon: f64, lat: f64, capacity: usize) -> Vehicle {
    Vehicle::new(id, Pos::new(lon, lat), capacity)
}

/// A 10 x 10 degree grid config with one-minute cycles and no datalog.
pub fn grid_config(fleet_size: usize, veh_capacity: usize) -> PlatformConfig {
    PlatformConfig {
        area: AreaConfig {
            lon_min: 0.0,
            lon_max: 10.0,
            lat_min: 0.0,
            lat_max: 10.0,
        },
        fleet: FleetConfig {
            fleet_size,
            veh_capacity,
            initial_pos: Pos::new(5.0, 5.0),
        },
        request: RequestConfig {
            requests_per_hour: 0.0,
            walkaway_time_s: minutes(10.0),
            seed: 0,
        },
        simulation: SimulationConfig {
            cycle_s: 60.0,
            warmup_duration_s: 0.0,
            simulation_duration_s: minutes(10.0),
            winddown_duration_s: minutes(60.0),
        },
        ..PlatformConfig::default()
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn minutes(m: f64) -> f64 {
    m * 60.0
}

/// Onboard count after each stop, starting from `initial_load`.
pub fn load_profile(initial_load: usize, ops: impl IntoIterator<Item = WaypointOp>) -> Vec<i64> {
    let mut load = initial_load as i64;
    ops.into_iter()
        .map(|op| {
            match op {
                WaypointOp::Pickup => load += 1,
                WaypointOp::Dropoff => load -= 1,
            }
            load
        })
        .collect()
}
