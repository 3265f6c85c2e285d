//! Time-stepped simulation of a mobility-on-demand fleet.
//!
//! The [`Platform`] owns the trip store, the fleet and the pending queue. Each
//! cycle it pulls new demand, dispatches pending trips with the insertion
//! heuristic and then drives the fleet forward by one cycle.

use std::collections::VecDeque;
use std::fmt;
use std::io;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::{ConfigError, PlatformConfig, SimulationPhase};
use crate::datalog::{Datalog, FrameRecord};
use crate::dispatch::assign_trips_through_insertion_heuristics;
use crate::traits::{DemandGenerator, Router};
use crate::types::{Trip, TripStatus, Vehicle};
use crate::vehicle::advance_vehicles;

#[derive(Debug)]
pub enum PlatformError {
    Config(ConfigError),
    Datalog(io::Error),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Config(err) => write!(f, "{}", err),
            PlatformError::Datalog(err) => write!(f, "datalog error: {}", err),
        }
    }
}

impl std::error::Error for PlatformError {}

impl From<ConfigError> for PlatformError {
    fn from(err: ConfigError) -> Self {
        PlatformError::Config(err)
    }
}

impl From<io::Error> for PlatformError {
    fn from(err: io::Error) -> Self {
        PlatformError::Datalog(err)
    }
}

/// Level-of-service summary over the trips requested in the steady window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationReport {
    pub requests: usize,
    pub dispatched: usize,
    pub picked_up: usize,
    pub served: usize,
    pub walkaways: usize,
    /// Mean of pickup minus request time over picked-up trips.
    pub mean_wait_time_s: Option<f64>,
    /// Mean of dropoff minus pickup time over served trips.
    pub mean_in_vehicle_time_s: Option<f64>,
}

impl SimulationReport {
    pub fn from_trips<'a>(trips: impl IntoIterator<Item = &'a Trip>) -> Self {
        let mut report = SimulationReport::default();
        let mut total_wait_s = 0.0;
        let mut total_in_vehicle_s = 0.0;

        for trip in trips {
            report.requests += 1;
            if trip.assignment.is_some() {
                report.dispatched += 1;
            }
            if trip.status == TripStatus::Walkaway {
                report.walkaways += 1;
            }
            if let Some(wait_s) = trip.wait_time_s() {
                report.picked_up += 1;
                total_wait_s += wait_s;
            }
            if let Some(in_vehicle_s) = trip.in_vehicle_time_s() {
                report.served += 1;
                total_in_vehicle_s += in_vehicle_s;
            }
        }

        report.mean_wait_time_s = mean(total_wait_s, report.picked_up);
        report.mean_in_vehicle_time_s = mean(total_in_vehicle_s, report.served);
        report
    }
}

fn mean(total: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| total / count as f64)
}

pub struct Platform<R, D> {
    config: PlatformConfig,
    router: R,
    demand: D,
    trips: Vec<Trip>,
    vehicles: Vec<Vehicle>,
    pending: VecDeque<usize>,
    system_time_s: f64,
    datalog: Option<Datalog>,
}

impl<R: Router, D: DemandGenerator> Platform<R, D> {
    pub fn new(config: PlatformConfig, router: R, demand: D) -> Result<Self, PlatformError> {
        config.validate()?;

        let fleet = &config.fleet;
        let vehicles = (0..fleet.fleet_size)
            .map(|id| Vehicle::new(id, fleet.initial_pos, fleet.veh_capacity))
            .collect();

        let datalog = match &config.output.path_to_output_datalog {
            Some(path) => {
                info!(path = %path.display(), "writing datalog");
                Some(Datalog::create(path)?)
            }
            None => None,
        };

        Ok(Self {
            config,
            router,
            demand,
            trips: Vec::new(),
            vehicles,
            pending: VecDeque::new(),
            system_time_s: 0.0,
            datalog,
        })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn pending_trip_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.pending.iter().copied()
    }

    /// Start of the last cycle run. Vehicles have been driven one cycle
    /// past this.
    pub fn system_time_s(&self) -> f64 {
        self.system_time_s
    }

    /// Run cycles until warmup, steady and winddown have all elapsed.
    pub fn run_simulation(&mut self) -> Result<SimulationReport, PlatformError> {
        let total_s = self.config.simulation.total_duration_s();
        info!(
            total_s,
            fleet_size = self.vehicles.len(),
            cycle_s = self.config.simulation.cycle_s,
            "simulation started"
        );

        while self.system_time_s < total_s {
            self.run_cycle()?;
        }

        if let Some(datalog) = self.datalog.as_mut() {
            datalog.flush()?;
        }

        let report = self.report();
        info!(
            requests = report.requests,
            served = report.served,
            walkaways = report.walkaways,
            mean_wait_time_s = report.mean_wait_time_s,
            "simulation finished"
        );
        Ok(report)
    }

    /// Summary over trips requested during the steady window.
    pub fn report(&self) -> SimulationReport {
        let simulation = &self.config.simulation;
        SimulationReport::from_trips(
            self.trips
                .iter()
                .filter(|trip| simulation.phase_at(trip.request_time_s) == SimulationPhase::Steady),
        )
    }

    #[instrument(level = "debug", skip(self), fields(t = self.system_time_s))]
    fn run_cycle(&mut self) -> Result<(), PlatformError> {
        let cycle_s = self.config.simulation.cycle_s;
        self.system_time_s += cycle_s;
        let now = self.system_time_s;

        let new_trips = self.accept_requests(now);
        let walkaways = self.expire_walkaways(now);
        self.dispatch(now);
        self.advance(now, cycle_s)?;

        info!(
            t = now,
            phase = ?self.config.simulation.phase_at(now),
            new_trips,
            walkaways,
            pending = self.pending.len(),
            "cycle complete"
        );
        Ok(())
    }

    fn accept_requests(&mut self, now: f64) -> usize {
        let requests = self.demand.generate(now);
        let count = requests.len();
        let walkaway_time_s = self.config.request.walkaway_time_s;

        for request in requests {
            debug_assert!(self.config.area.contains(request.origin), "request origin out of area");
            debug_assert!(
                self.config.area.contains(request.destination),
                "request destination out of area"
            );
            let id = self.trips.len();
            self.trips.push(Trip::new(id, request, walkaway_time_s));
            self.pending.push_back(id);
        }
        count
    }

    /// Drop pending trips nobody can reach in time any more.
    fn expire_walkaways(&mut self, now: f64) -> usize {
        let trips = &mut self.trips;
        let before = self.pending.len();
        self.pending.retain(|&id| match trips.get_mut(id) {
            Some(trip) if trip.max_pickup_time_s < now => {
                trip.status = TripStatus::Walkaway;
                false
            }
            Some(_) => true,
            None => false,
        });
        before - self.pending.len()
    }

    fn dispatch(&mut self, now: f64) {
        if self.pending.is_empty() {
            return;
        }
        let pending: Vec<usize> = self.pending.drain(..).collect();
        let unassigned = assign_trips_through_insertion_heuristics(
            &pending,
            &mut self.trips,
            &mut self.vehicles,
            now,
            &self.router,
        );
        debug!(
            dispatched = pending.len() - unassigned.len(),
            unassigned = unassigned.len(),
            "dispatch complete"
        );
        self.pending.extend(unassigned);
    }

    /// Drive the fleet over `[start_time_s, start_time_s + duration_s)`,
    /// split into frames when a datalog is being written.
    fn advance(&mut self, start_time_s: f64, duration_s: f64) -> Result<(), PlatformError> {
        let Some(datalog) = self.datalog.as_mut() else {
            advance_vehicles(&mut self.vehicles, &mut self.trips, start_time_s, duration_s);
            return Ok(());
        };

        let frames = self.config.output.frames_per_cycle.max(1);
        let frame_s = duration_s / frames as f64;
        for frame in 0..frames {
            let frame_start_s = start_time_s + frame as f64 * frame_s;
            let events = advance_vehicles(&mut self.vehicles, &mut self.trips, frame_start_s, frame_s);
            datalog.write_record(&FrameRecord::new(frame_start_s + frame_s, &self.vehicles, events))?;
        }
        Ok(())
    }
}
