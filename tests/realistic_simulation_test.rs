//! Simulation over real Las Vegas locations with haversine travel times.

mod fixtures;

use mod_sim::config::PlatformConfig;
use mod_sim::haversine::HaversineRouter;
use mod_sim::platform::Platform;
use mod_sim::routing::CachedRouter;
use mod_sim::types::{Request, TripStatus};

use fixtures::las_vegas::{self, CASINOS, DESTINATIONS};
use fixtures::{CountingRouter, ScriptedDemand, minutes};

/// Casino-to-destination rides every two minutes, alternating casinos.
fn strip_requests(count: usize) -> Vec<Request> {
    (0..count)
        .map(|i| Request {
            origin: CASINOS[i % CASINOS.len()].pos,
            destination: DESTINATIONS[i % DESTINATIONS.len()].pos,
            request_time_s: minutes(2.0) * i as f64 + 1.0,
        })
        .collect()
}

fn strip_config() -> PlatformConfig {
    let mut config = PlatformConfig::default();
    config.area = las_vegas::area();
    config.fleet.fleet_size = 4;
    config.fleet.veh_capacity = 3;
    config.fleet.initial_pos = CASINOS[3].pos;
    config.request.walkaway_time_s = minutes(10.0);
    config.simulation.cycle_s = 30.0;
    config.simulation.warmup_duration_s = 0.0;
    config.simulation.simulation_duration_s = minutes(40.0);
    config.simulation.winddown_duration_s = minutes(60.0);
    config
}

#[test]
fn strip_rides_are_served() {
    let requests = strip_requests(20);
    let mut platform = Platform::new(
        strip_config(),
        HaversineRouter::default(),
        ScriptedDemand::new(requests),
    )
    .expect("platform");

    let report = platform.run_simulation().expect("run");

    assert_eq!(report.requests, 20);
    // The fleet starts on the strip, so the first rides are always reachable.
    assert!(report.served > 0);
    assert_eq!(report.served + report.walkaways, 20);
    for trip in platform.trips() {
        if trip.status == TripStatus::DroppedOff {
            let wait = trip.wait_time_s().expect("wait");
            assert!(wait <= minutes(10.0) + 1e-6, "trip {} waited {}", trip.id, wait);
            assert!(trip.in_vehicle_time_s().expect("ride") > 0.0);
        }
    }
}

#[test]
fn route_cache_absorbs_repeated_trials() {
    let counting = CountingRouter::new(HaversineRouter::default());
    let cached = CachedRouter::new(counting, 50_000);
    let mut platform =
        Platform::new(strip_config(), &cached, ScriptedDemand::new(strip_requests(20))).expect("platform");

    platform.run_simulation().expect("run");

    let backend_calls = cached.inner().time_only_calls() + cached.inner().full_route_calls();
    assert!(backend_calls > 0);
    assert!(cached.len() <= backend_calls);
}
