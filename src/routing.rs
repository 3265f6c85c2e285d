//! Router selection and caching.
//!
//! [`build_router`] turns a [`RouterConfig`] into a boxed [`Router`]. OSRM
//! routers are wrapped in a [`CachedRouter`], since the dispatch engine asks
//! for the same legs over and over while it scans insertion positions.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::haversine::{DEFAULT_SPEED_KMH, HaversineRouter};
use crate::osrm::{OsrmConfig, OsrmRouter};
use crate::osrm_data::{OsrmDataError, OsrmDataset};
use crate::route::{Route, RoutingType};
use crate::traits::Router;
use crate::types::Pos;

/// Which routing backend to use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouterConfig {
    Haversine { speed_kmh: f64 },
    Osrm(OsrmConfig),
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig::Haversine {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

#[derive(Debug)]
pub enum RouterBuildError {
    Client(reqwest::Error),
    Data(OsrmDataError),
}

impl fmt::Display for RouterBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterBuildError::Client(err) => write!(f, "failed to build HTTP client: {}", err),
            RouterBuildError::Data(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RouterBuildError {}

impl From<reqwest::Error> for RouterBuildError {
    fn from(err: reqwest::Error) -> Self {
        RouterBuildError::Client(err)
    }
}

impl From<OsrmDataError> for RouterBuildError {
    fn from(err: OsrmDataError) -> Self {
        RouterBuildError::Data(err)
    }
}

type CacheKey = (u64, u64, u64, u64, RoutingType);

fn cache_key(origin: Pos, destination: Pos, routing_type: RoutingType) -> CacheKey {
    (
        origin.lon.to_bits(),
        origin.lat.to_bits(),
        destination.lon.to_bits(),
        destination.lat.to_bits(),
        routing_type,
    )
}

/// LRU-cached wrapper around any [`Router`].
///
/// Keys are exact coordinates plus the routing type, so a cached answer is
/// only reused for the identical query.
pub struct CachedRouter<R> {
    inner: R,
    cache: Mutex<LruCache<CacheKey, Route>>,
}

impl<R: Router> CachedRouter<R> {
    pub fn new(inner: R, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Router> Router for CachedRouter<R> {
    fn query(&self, origin: Pos, destination: Pos, routing_type: RoutingType) -> Route {
        let key = cache_key(origin, destination, routing_type);

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&key) {
                return cached.clone();
            }
        }

        // Query without holding the lock so other workers are not serialised
        // behind a slow backend.
        let route = self.inner.query(origin, destination, routing_type);

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, route.clone());
        }
        route
    }
}

/// Construct a boxed [`Router`] from a [`RouterConfig`].
///
/// - `Haversine` is returned without caching (it is already cheap).
/// - `Osrm` checks the offline dataset when `path_to_osrm_data` is set, and is
///   wrapped in a [`CachedRouter`] unless `cache_capacity` is zero.
pub fn build_router(config: &RouterConfig) -> Result<Box<dyn Router>, RouterBuildError> {
    match config {
        RouterConfig::Haversine { speed_kmh } => Ok(Box::new(HaversineRouter::new(*speed_kmh))),
        RouterConfig::Osrm(osrm) => {
            if let Some(path) = &osrm.path_to_osrm_data {
                let dataset = OsrmDataset::open(path)?;
                info!(path = %dataset.osrm_base.display(), "using OSRM map data");
            }
            let router = OsrmRouter::new(osrm.clone())?;
            if osrm.cache_capacity == 0 {
                Ok(Box::new(router))
            } else {
                Ok(Box::new(CachedRouter::new(router, osrm.cache_capacity)))
            }
        }
    }
}
