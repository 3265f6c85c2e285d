//! OSRM HTTP adapter for point-to-point routes.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::haversine::HaversineRouter;
use crate::route::{Leg, Route, RoutingType, Step};
use crate::traits::Router;
use crate::types::Pos;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
    /// Offline map data served by the OSRM backend (`<region>-latest.osrm`).
    /// Checked at startup when set.
    pub path_to_osrm_data: Option<PathBuf>,
    /// Capacity of the route cache wrapped around the client. Zero disables it.
    pub cache_capacity: usize,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
            path_to_osrm_data: None,
            cache_capacity: 20_000,
        }
    }
}

#[derive(Debug)]
pub enum OsrmError {
    Http(reqwest::Error),
    Api(String),
    NoRoute,
}

impl fmt::Display for OsrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsrmError::Http(err) => write!(f, "OSRM request failed: {}", err),
            OsrmError::Api(code) => write!(f, "OSRM returned code {}", code),
            OsrmError::NoRoute => write!(f, "OSRM returned no route"),
        }
    }
}

impl std::error::Error for OsrmError {}

impl From<reqwest::Error> for OsrmError {
    fn from(err: reqwest::Error) -> Self {
        OsrmError::Http(err)
    }
}

/// Routes via an OSRM HTTP endpoint.
///
/// Failed requests fall back to [`HaversineRouter`] so that a query always
/// completes.
#[derive(Debug, Clone)]
pub struct OsrmRouter {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
    fallback: HaversineRouter,
}

impl OsrmRouter {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            fallback: HaversineRouter::default(),
        })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn url_for(&self, origin: Pos, destination: Pos, routing_type: RoutingType) -> String {
        let options = match routing_type {
            RoutingType::TimeOnly => "overview=false&steps=false",
            RoutingType::FullRoute => "overview=false&steps=true&geometries=geojson",
        };
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            origin.lon,
            origin.lat,
            destination.lon,
            destination.lat,
            options
        )
    }

    /// Query OSRM without falling back.
    pub fn fetch(
        &self,
        origin: Pos,
        destination: Pos,
        routing_type: RoutingType,
    ) -> Result<Route, OsrmError> {
        let body = self
            .client
            .get(self.url_for(origin, destination, routing_type))
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmRouteResponse>())?;

        parse_route_response(body, routing_type)
    }
}

impl Router for OsrmRouter {
    fn query(&self, origin: Pos, destination: Pos, routing_type: RoutingType) -> Route {
        match self.fetch(origin, destination, routing_type) {
            Ok(route) => route,
            Err(err) => {
                warn!(%err, ?origin, ?destination, "OSRM query failed, using haversine estimate");
                self.fallback.query(origin, destination, routing_type)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64, // metres
    duration: f64, // seconds
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    duration: f64,
    geometry: Option<OsrmGeometry>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>, // [lng, lat]
}

pub(crate) fn parse_route_response(
    resp: OsrmRouteResponse,
    routing_type: RoutingType,
) -> Result<Route, OsrmError> {
    if resp.code != "Ok" {
        return Err(OsrmError::Api(resp.code));
    }

    let route = resp.routes.into_iter().next().ok_or(OsrmError::NoRoute)?;

    if routing_type == RoutingType::TimeOnly {
        return Ok(Route::time_only(route.distance, route.duration));
    }

    let legs = route
        .legs
        .into_iter()
        .map(|leg| Leg {
            distance_m: leg.distance,
            duration_s: leg.duration,
            steps: leg
                .steps
                .into_iter()
                .map(|step| Step {
                    distance_m: step.distance,
                    duration_s: step.duration,
                    poses: step
                        .geometry
                        .map(|g| g.coordinates.iter().map(|c| Pos::new(c[0], c[1])).collect())
                        .unwrap_or_default(),
                })
                .collect(),
        })
        .collect();

    Ok(Route {
        distance_m: route.distance,
        duration_s: route.duration,
        legs,
    })
}
