//! Insertion-heuristic dispatch.
//!
//! Pending trips are assigned one at a time, in arrival order, against the
//! current fleet state. For every vehicle, every `(pickup_index,
//! dropoff_index)` slot of its schedule is tried; the cheapest feasible slot
//! over the whole fleet is committed. Trips with no feasible slot stay pending
//! and are retried on the next cycle.
//!
//! Cost is total service time: the sum of leg durations from the vehicle's
//! position through every stop of its schedule. The cost of an insertion is
//! the difference between the schedule with and without the new stops, both
//! routed from the vehicle's current position.
//!
//! Trials always use [`RoutingType::TimeOnly`]; only the committed schedule is
//! routed with [`RoutingType::FullRoute`].

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::{debug, instrument, trace, warn};

use crate::route::RoutingType;
use crate::traits::Router;
use crate::types::{Assignment, Pos, Trip, TripStatus, Vehicle, Waypoint, WaypointOp};

/// Outcome of a feasible insertion trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertionResult {
    pub vehicle_id: usize,
    /// Additional service time in seconds.
    pub cost_s: f64,
    pub pickup_index: usize,
    pub dropoff_index: usize,
}

impl InsertionResult {
    /// Lower cost wins; equal costs go to the lower vehicle id.
    fn is_better_than(&self, other: &InsertionResult) -> bool {
        match self.cost_s.total_cmp(&other.cost_s) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.vehicle_id < other.vehicle_id,
        }
    }
}

fn select_better(a: InsertionResult, b: InsertionResult) -> InsertionResult {
    if b.is_better_than(&a) { b } else { a }
}

/// Assign the pending trips, in order, to the vehicles.
///
/// Each trip sees the schedules produced by the insertions before it. Returns
/// the ids that could not be assigned, in their original order.
///
/// `vehicles[i].id` must equal `i`, and `trips[i].id` must equal `i`.
#[instrument(level = "debug", skip(pending_trip_ids, trips, vehicles, router), fields(pending = pending_trip_ids.len()))]
pub fn assign_trips_through_insertion_heuristics<R: Router + ?Sized>(
    pending_trip_ids: &[usize],
    trips: &mut [Trip],
    vehicles: &mut [Vehicle],
    system_time_s: f64,
    router: &R,
) -> Vec<usize> {
    let mut unassigned = Vec::new();

    for &trip_id in pending_trip_ids {
        match assign_trip_through_insertion_heuristics(trip_id, trips, vehicles, system_time_s, router) {
            Some(result) => debug!(
                trip_id,
                vehicle_id = result.vehicle_id,
                cost_s = result.cost_s,
                pickup_index = result.pickup_index,
                dropoff_index = result.dropoff_index,
                "trip assigned"
            ),
            None => unassigned.push(trip_id),
        }
    }

    debug!(
        assigned = pending_trip_ids.len() - unassigned.len(),
        unassigned = unassigned.len(),
        "dispatch finished"
    );
    unassigned
}

/// Assign one trip to the vehicle where it adds the least service time.
///
/// Vehicles are evaluated in parallel; the selection only depends on
/// `(cost, vehicle_id)`, so the outcome is the same as a sequential scan.
/// Returns `None` and leaves every store untouched when no vehicle can take
/// the trip.
pub fn assign_trip_through_insertion_heuristics<R: Router + ?Sized>(
    trip_id: usize,
    trips: &mut [Trip],
    vehicles: &mut [Vehicle],
    system_time_s: f64,
    router: &R,
) -> Option<InsertionResult> {
    let best = {
        let trips: &[Trip] = trips;
        let trip = trips.get(trip_id)?;
        if trip.status != TripStatus::Requested {
            return None;
        }

        vehicles
            .par_iter()
            .filter_map(|vehicle| {
                compute_cost_of_inserting_trip_to_vehicle(trip, trips, vehicle, system_time_s, router)
            })
            .reduce_with(select_better)?
    };

    let vehicle = vehicles.get_mut(best.vehicle_id)?;
    insert_trip_to_vehicle(
        trip_id,
        trips,
        vehicle,
        best.pickup_index,
        best.dropoff_index,
        system_time_s,
        router,
    )
    .then_some(best)
}

/// Cheapest feasible slot for `trip` in `vehicle`'s schedule, trying every
/// `pickup_index` in `[0, n]` and `dropoff_index` in `[pickup_index, n]`.
pub fn compute_cost_of_inserting_trip_to_vehicle<R: Router + ?Sized>(
    trip: &Trip,
    trips: &[Trip],
    vehicle: &Vehicle,
    system_time_s: f64,
    router: &R,
) -> Option<InsertionResult> {
    let n = vehicle.waypoints.len();
    let mut best: Option<InsertionResult> = None;

    for pickup_index in 0..=n {
        let pickup_time_s = get_pickup_time(
            vehicle.pos,
            &vehicle.waypoints,
            trip.origin,
            pickup_index,
            system_time_s,
            router,
        )?;
        if pickup_time_s > trip.max_pickup_time_s {
            trace!(vehicle_id = vehicle.id, pickup_index, pickup_time_s, "pickup too late");
            continue;
        }

        for dropoff_index in pickup_index..=n {
            let Some(cost_s) = compute_cost_of_inserting_trip_to_vehicle_given_pickup_and_dropoff_indices(
                trip,
                trips,
                vehicle,
                pickup_index,
                dropoff_index,
                system_time_s,
                router,
            ) else {
                continue;
            };

            if best.is_none_or(|b| cost_s < b.cost_s) {
                best = Some(InsertionResult {
                    vehicle_id: vehicle.id,
                    cost_s,
                    pickup_index,
                    dropoff_index,
                });
            }
        }
    }

    best
}

/// Additional service time of inserting `trip` at the given indices, or
/// `None` when the resulting schedule breaks a constraint.
pub fn compute_cost_of_inserting_trip_to_vehicle_given_pickup_and_dropoff_indices<R: Router + ?Sized>(
    trip: &Trip,
    trips: &[Trip],
    vehicle: &Vehicle,
    pickup_index: usize,
    dropoff_index: usize,
    system_time_s: f64,
    router: &R,
) -> Option<f64> {
    if pickup_index > dropoff_index || dropoff_index > vehicle.waypoints.len() {
        return None;
    }

    let trial = generate_waypoints(
        trip,
        vehicle,
        pickup_index,
        dropoff_index,
        system_time_s,
        RoutingType::TimeOnly,
        router,
    );
    if !validate_waypoints(&trial, trips, vehicle, system_time_s) {
        return None;
    }

    let current = chain_waypoints(
        vehicle.pos,
        vehicle.waypoints.iter().map(|wp| (wp.pos, wp.op, wp.trip_id)),
        system_time_s,
        RoutingType::TimeOnly,
        router,
    );

    Some(get_cost_of_waypoints(&trial) - get_cost_of_waypoints(&current))
}

/// Total service time of a schedule: the sum of its leg durations.
pub fn get_cost_of_waypoints(waypoints: &[Waypoint]) -> f64 {
    waypoints.iter().map(|wp| wp.route.duration_s).sum()
}

/// Check a schedule against every constraint in one left-to-right scan.
///
/// Fails on the first of: an unknown trip, a non-monotonic arrival time, a
/// pickup after the trip's walkaway deadline, a load above capacity, or a
/// dropoff of a trip that is neither onboard nor picked up earlier in the
/// schedule.
pub fn validate_waypoints(
    waypoints: &[Waypoint],
    trips: &[Trip],
    vehicle: &Vehicle,
    system_time_s: f64,
) -> bool {
    let mut load = vehicle.load;
    let mut time_s = system_time_s;
    let mut last_arrival_s = system_time_s;
    let mut picked_up: Vec<usize> = Vec::new();

    for wp in waypoints {
        time_s += wp.route.duration_s;

        if wp.arrival_time_s < last_arrival_s {
            return false;
        }
        last_arrival_s = wp.arrival_time_s;

        let Some(trip) = trips.get(wp.trip_id) else {
            return false;
        };

        match wp.op {
            WaypointOp::Pickup => {
                if time_s > trip.max_pickup_time_s {
                    return false;
                }
                load += 1;
                if load > vehicle.capacity {
                    return false;
                }
                picked_up.push(wp.trip_id);
            }
            WaypointOp::Dropoff => {
                if !trip.is_onboard() && !picked_up.contains(&wp.trip_id) {
                    return false;
                }
                if load == 0 {
                    return false;
                }
                load -= 1;
            }
        }
    }

    true
}

/// Absolute time the vehicle would reach `pickup_pos` if the pickup were
/// inserted at `pickup_index`. `None` if the index is past the end of the
/// schedule.
pub fn get_pickup_time<R: Router + ?Sized>(
    pos: Pos,
    waypoints: &[Waypoint],
    pickup_pos: Pos,
    pickup_index: usize,
    system_time_s: f64,
    router: &R,
) -> Option<f64> {
    let preceding = waypoints.get(..pickup_index)?;

    let mut time_s = system_time_s;
    let mut prev = pos;
    for wp in preceding {
        time_s += router.query(prev, wp.pos, RoutingType::TimeOnly).duration_s;
        prev = wp.pos;
    }
    time_s += router.query(prev, pickup_pos, RoutingType::TimeOnly).duration_s;

    Some(time_s)
}

/// The vehicle's schedule with `trip` spliced in: the pickup at
/// `pickup_index`, the dropoff after it and in front of the original stop at
/// `dropoff_index`. Every leg is routed with `routing_type`, starting from the
/// vehicle's position at `system_time_s`.
pub fn generate_waypoints<R: Router + ?Sized>(
    trip: &Trip,
    vehicle: &Vehicle,
    pickup_index: usize,
    dropoff_index: usize,
    system_time_s: f64,
    routing_type: RoutingType,
    router: &R,
) -> Vec<Waypoint> {
    let mut stops: Vec<(Pos, WaypointOp, usize)> = vehicle
        .waypoints
        .iter()
        .map(|wp| (wp.pos, wp.op, wp.trip_id))
        .collect();

    let pickup_index = pickup_index.min(stops.len());
    let dropoff_index = dropoff_index.clamp(pickup_index, stops.len());
    stops.insert(dropoff_index, (trip.destination, WaypointOp::Dropoff, trip.id));
    stops.insert(pickup_index, (trip.origin, WaypointOp::Pickup, trip.id));

    chain_waypoints(vehicle.pos, stops, system_time_s, routing_type, router)
}

/// Commit `trip_id` into `vehicle` at the given indices.
///
/// The schedule is rebuilt with full geometry and validated again; nothing is
/// changed if it fails. On success the trip is marked dispatched.
pub fn insert_trip_to_vehicle<R: Router + ?Sized>(
    trip_id: usize,
    trips: &mut [Trip],
    vehicle: &mut Vehicle,
    pickup_index: usize,
    dropoff_index: usize,
    system_time_s: f64,
    router: &R,
) -> bool {
    let Some(trip) = trips.get(trip_id) else {
        return false;
    };

    let waypoints = generate_waypoints(
        trip,
        vehicle,
        pickup_index,
        dropoff_index,
        system_time_s,
        RoutingType::FullRoute,
        router,
    );
    if !validate_waypoints(&waypoints, trips, vehicle, system_time_s) {
        warn!(trip_id, vehicle_id = vehicle.id, "routed schedule violates constraints, insertion dropped");
        return false;
    }

    vehicle.waypoints = waypoints;

    let trip = &mut trips[trip_id];
    trip.status = TripStatus::Dispatched;
    trip.assignment = Some(Assignment {
        vehicle_id: vehicle.id,
        pickup_index,
        dropoff_index,
    });
    true
}

/// Route a sequence of stops leg by leg from `origin`, stamping absolute
/// arrival times.
fn chain_waypoints<R, I>(
    origin: Pos,
    stops: I,
    system_time_s: f64,
    routing_type: RoutingType,
    router: &R,
) -> Vec<Waypoint>
where
    R: Router + ?Sized,
    I: IntoIterator<Item = (Pos, WaypointOp, usize)>,
{
    let mut time_s = system_time_s;
    let mut prev = origin;

    stops
        .into_iter()
        .map(|(pos, op, trip_id)| {
            let route = router.query(prev, pos, routing_type);
            time_s += route.duration_s;
            prev = pos;
            Waypoint {
                pos,
                op,
                trip_id,
                route,
                arrival_time_s: time_s,
            }
        })
        .collect()
}
