//! mod-sim: mobility-on-demand fleet simulation
//!
//! A time-stepped simulator for a pooled ride-hailing fleet. Trip requests
//! arrive over time and are assigned to vehicles by an insertion heuristic
//! that splices pickup/dropoff stops into each vehicle's schedule, subject to
//! seat capacity and rider walkaway deadlines. Travel times come from a
//! pluggable [`traits::Router`] (haversine estimate or an OSRM server).

pub mod types;
pub mod route;
pub mod traits;
pub mod dispatch;
pub mod vehicle;
pub mod platform;
pub mod demand;
pub mod config;
pub mod datalog;
pub mod routing;
pub mod osrm;
pub mod osrm_data;
pub mod haversine;
pub mod logging;

pub use config::PlatformConfig;
pub use platform::{Platform, PlatformError, SimulationReport};
pub use route::{Route, RoutingType};
pub use traits::{DemandGenerator, Router};
pub use types::{Pos, Request, Trip, TripStatus, Vehicle, Waypoint, WaypointOp};
