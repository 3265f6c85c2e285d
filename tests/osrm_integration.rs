//! OSRM-backed routing and simulation against the Nevada extract.
//!
//! Needs Docker and downloads map data on first run:
//! `cargo test --test osrm_integration -- --ignored`

mod fixtures;

use std::env;

use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::runners::SyncRunner;
use testcontainers::{Container, GenericImage, ImageExt, ReuseDirective, TestcontainersError};

use mod_sim::config::PlatformConfig;
use mod_sim::demand::PoissonDemandGenerator;
use mod_sim::osrm::{OsrmConfig, OsrmRouter};
use mod_sim::osrm_data::{GeofabrikRegion, OsrmDataset, OsrmDatasetConfig};
use mod_sim::platform::Platform;
use mod_sim::route::RoutingType;
use mod_sim::routing::{CachedRouter, RouterConfig, build_router};
use mod_sim::traits::Router;
use mod_sim::types::TripStatus;

use fixtures::las_vegas::{self, CASINOS, DESTINATIONS};

// ============================================================================
// Test Infrastructure
// ============================================================================

fn osrm_container() -> Result<(Container<GenericImage>, String, OsrmDataset), TestcontainersError> {
    let data_root = env::var("OSRM_DATA_DIR").unwrap_or_else(|_| "osrm-data".to_string());
    let region = GeofabrikRegion::new("north-america/us/nevada");
    let config = OsrmDatasetConfig::new(region, data_root);
    let dataset = OsrmDataset::ensure(&config)
        .map_err(|err| TestcontainersError::other(format!("OSRM prep failed: {}", err)))?;
    let mtime = std::fs::metadata(dataset.osrm_base.with_extension("osrm.partition"))
        .ok()
        .and_then(|meta| meta.modified().ok())
        .and_then(|time| time.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
        .map(|duration| duration.as_secs())
        .unwrap_or(0);
    let container_name = format!("mod-sim-osrm-nevada-{}", mtime);

    let image = GenericImage::new("osrm/osrm-backend", "latest")
        .with_exposed_port(5000.tcp())
        .with_mount(Mount::bind_mount(
            dataset.data_dir.to_string_lossy().to_string(),
            "/data",
        ))
        .with_cmd(vec![
            "osrm-routed",
            "--algorithm",
            "mld",
            "/data/nevada-latest.osrm",
        ])
        .with_container_name(container_name)
        .with_startup_timeout(std::time::Duration::from_secs(30))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(5000.tcp())?;
    let base_url = format!("http://127.0.0.1:{}", port);

    Ok((container, base_url, dataset))
}

fn osrm_config(base_url: &str) -> OsrmConfig {
    OsrmConfig {
        base_url: base_url.to_string(),
        timeout_secs: 10,
        ..OsrmConfig::default()
    }
}

/// Poll until the server answers a real route, or give up after 15 s.
fn wait_until_ready(router: &OsrmRouter) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < std::time::Duration::from_secs(15) {
        if router
            .fetch(CASINOS[0].pos, CASINOS[1].pos, RoutingType::TimeOnly)
            .is_ok()
        {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(500));
    }
    false
}

fn dump_logs(container: &Container<GenericImage>) {
    if let Ok(stderr) = container.stderr_to_vec() {
        if !stderr.is_empty() {
            eprintln!("OSRM stderr:\n{}", String::from_utf8_lossy(&stderr));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
#[ignore = "needs docker and the Nevada OSRM extract"]
fn osrm_routes_between_strip_casinos() {
    let (container, base_url, _dataset) = osrm_container().expect("start OSRM container");
    let router = OsrmRouter::new(osrm_config(&base_url)).expect("build OSRM client");
    if !wait_until_ready(&router) {
        dump_logs(&container);
        panic!("OSRM did not become ready");
    }

    let wynn = CASINOS[0].pos;
    let mgm = CASINOS[1].pos;

    let time_only = router.fetch(wynn, mgm, RoutingType::TimeOnly).expect("time-only route");
    assert!(time_only.duration_s > 60.0 && time_only.duration_s < 1800.0);
    assert!(!time_only.has_geometry());

    let full = router.fetch(wynn, mgm, RoutingType::FullRoute).expect("full route");
    assert!(full.has_geometry());
    assert!((full.duration_s - time_only.duration_s).abs() < 1.0);
    assert!(full.poses().len() > 2);

    drop(container);
}

#[test]
#[ignore = "needs docker and the Nevada OSRM extract"]
fn build_router_checks_offline_data() {
    let (container, base_url, dataset) = osrm_container().expect("start OSRM container");

    let config = RouterConfig::Osrm(OsrmConfig {
        path_to_osrm_data: Some(dataset.osrm_base.clone()),
        ..osrm_config(&base_url)
    });
    let router = build_router(&config).expect("router");
    let route = router.query(CASINOS[2].pos, DESTINATIONS[0].pos, RoutingType::TimeOnly);
    assert!(route.duration_s > 0.0);

    drop(container);
}

#[test]
#[ignore = "needs docker and the Nevada OSRM extract"]
fn simulation_on_las_vegas_roads() {
    let (container, base_url, _dataset) = osrm_container().expect("start OSRM container");
    let osrm = OsrmRouter::new(osrm_config(&base_url)).expect("build OSRM client");
    if !wait_until_ready(&osrm) {
        dump_logs(&container);
        panic!("OSRM did not become ready");
    }

    let mut config = PlatformConfig::default();
    config.area = las_vegas::area();
    config.fleet.fleet_size = 5;
    config.fleet.veh_capacity = 3;
    config.fleet.initial_pos = CASINOS[3].pos;
    config.request.requests_per_hour = 120.0;
    config.request.seed = 7;
    config.simulation.cycle_s = 60.0;
    config.simulation.warmup_duration_s = 0.0;
    config.simulation.simulation_duration_s = 1800.0;
    config.simulation.winddown_duration_s = 3600.0;

    let demand = PoissonDemandGenerator::from_config(&config.area, &config.request);
    let router = CachedRouter::new(osrm, 10_000);
    let mut platform = Platform::new(config, router, demand).expect("platform");
    let report = platform.run_simulation().expect("run");

    assert!(report.requests > 0);
    assert_eq!(report.served + report.walkaways, report.requests);
    assert!(platform
        .trips()
        .iter()
        .all(|t| matches!(t.status, TripStatus::DroppedOff | TripStatus::Walkaway)));

    drop(container);
}
