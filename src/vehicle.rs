//! Moving vehicles along their committed schedules.

use serde::Serialize;
use tracing::trace;

use crate::route::truncate_route_by_time;
use crate::types::{Trip, TripStatus, Vehicle, WaypointOp};

/// A pickup or dropoff that happened while advancing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaypointEvent {
    pub vehicle_id: usize,
    pub trip_id: usize,
    pub op: WaypointOp,
    pub time_s: f64,
}

/// Drive `vehicle` for `duration_s` seconds starting at `start_time_s`.
///
/// Every front waypoint reachable in the remaining time is served in order.
/// If time runs out mid-leg, the leg is cut by the elapsed time and the
/// vehicle is placed at the start of what is left.
pub fn advance_vehicle(
    vehicle: &mut Vehicle,
    trips: &mut [Trip],
    start_time_s: f64,
    duration_s: f64,
) -> Vec<WaypointEvent> {
    let mut events = Vec::new();
    let mut time_s = start_time_s;
    let mut remaining_s = duration_s;

    while let Some(wp) = vehicle.waypoints.first_mut() {
        if wp.route.duration_s <= remaining_s {
            time_s += wp.route.duration_s;
            remaining_s -= wp.route.duration_s;
            vehicle.pos = wp.pos;

            if let Some(trip) = trips.get_mut(wp.trip_id) {
                match wp.op {
                    WaypointOp::Pickup => {
                        trip.pickup_time_s = Some(time_s);
                        trip.status = TripStatus::PickedUp;
                        vehicle.load += 1;
                    }
                    WaypointOp::Dropoff => {
                        trip.dropoff_time_s = Some(time_s);
                        trip.status = TripStatus::DroppedOff;
                        vehicle.load = vehicle.load.saturating_sub(1);
                    }
                }
            }

            trace!(vehicle_id = vehicle.id, trip_id = wp.trip_id, op = ?wp.op, time_s, "waypoint reached");
            events.push(WaypointEvent {
                vehicle_id: vehicle.id,
                trip_id: wp.trip_id,
                op: wp.op,
                time_s,
            });
            vehicle.waypoints.remove(0);
            continue;
        }

        if wp.route.has_geometry() {
            truncate_route_by_time(&mut wp.route, remaining_s);
            if let Some(pos) = wp.route.first_pose() {
                vehicle.pos = pos;
            }
        } else if remaining_s > 0.0 {
            let ratio = remaining_s / wp.route.duration_s;
            vehicle.pos = vehicle.pos.lerp(wp.pos, ratio);
            truncate_route_by_time(&mut wp.route, remaining_s);
        }
        break;
    }

    events
}

/// Advance every vehicle by the same interval. Events are ordered by vehicle,
/// then by time.
pub fn advance_vehicles(
    vehicles: &mut [Vehicle],
    trips: &mut [Trip],
    start_time_s: f64,
    duration_s: f64,
) -> Vec<WaypointEvent> {
    vehicles
        .iter_mut()
        .flat_map(|vehicle| advance_vehicle(vehicle, trips, start_time_s, duration_s))
        .collect()
}
