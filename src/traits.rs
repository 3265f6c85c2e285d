//! Capabilities the simulator consumes.
//!
//! The dispatch engine and platform only see these traits; tests swap in
//! deterministic fakes.

use crate::route::{Route, RoutingType};
use crate::types::{Pos, Request};

/// Answers travel-time/path queries between two coordinates.
///
/// Queries must be pure functions of their arguments and must always return.
/// The returned duration must not depend on `routing_type`; only the presence
/// of geometry does. Implementations are shared across rayon workers during
/// dispatch, hence `Send + Sync`.
pub trait Router: Send + Sync {
    fn query(&self, origin: Pos, destination: Pos, routing_type: RoutingType) -> Route;
}

impl<R: Router + ?Sized> Router for Box<R> {
    fn query(&self, origin: Pos, destination: Pos, routing_type: RoutingType) -> Route {
        (**self).query(origin, destination, routing_type)
    }
}

impl<R: Router + ?Sized> Router for &R {
    fn query(&self, origin: Pos, destination: Pos, routing_type: RoutingType) -> Route {
        (**self).query(origin, destination, routing_type)
    }
}

/// Produces the trip requests that arrived since the previous call.
pub trait DemandGenerator {
    /// Requests with `request_time_s <= current_time_s` not yet returned.
    fn generate(&mut self, current_time_s: f64) -> Vec<Request>;
}

impl<D: DemandGenerator + ?Sized> DemandGenerator for Box<D> {
    fn generate(&mut self, current_time_s: f64) -> Vec<Request> {
        (**self).generate(current_time_s)
    }
}
