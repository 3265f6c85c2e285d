//! Synthetic trip demand.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{AreaConfig, RequestConfig};
use crate::traits::DemandGenerator;
use crate::types::{Pos, Request};

/// Poisson arrivals with origins and destinations drawn uniformly from the
/// service area.
///
/// Each call to [`DemandGenerator::generate`] returns the requests that
/// arrived since the previous call, up to and including `current_time_s`.
/// The same seed always yields the same request stream.
#[derive(Debug, Clone)]
pub struct PoissonDemandGenerator {
    area: AreaConfig,
    rate_per_sec: f64,
    rng: StdRng,
    next_arrival_s: f64,
}

impl PoissonDemandGenerator {
    pub fn new(area: AreaConfig, requests_per_hour: f64, seed: u64) -> Self {
        let mut generator = Self {
            area,
            rate_per_sec: requests_per_hour.max(0.0) / 3600.0,
            rng: StdRng::seed_from_u64(seed),
            next_arrival_s: 0.0,
        };
        generator.next_arrival_s = generator.sample_gap_s();
        generator
    }

    pub fn from_config(area: &AreaConfig, request: &RequestConfig) -> Self {
        Self::new(area.clone(), request.requests_per_hour, request.seed)
    }

    /// Exponential inter-arrival gap: -ln(U) / lambda.
    fn sample_gap_s(&mut self) -> f64 {
        if self.rate_per_sec <= 0.0 {
            return f64::INFINITY;
        }
        let u: f64 = self.rng.gen_range(1e-10..1.0);
        -u.ln() / self.rate_per_sec
    }

    fn sample_pos(&mut self) -> Pos {
        Pos::new(
            self.rng.gen_range(self.area.lon_min..=self.area.lon_max),
            self.rng.gen_range(self.area.lat_min..=self.area.lat_max),
        )
    }
}

impl DemandGenerator for PoissonDemandGenerator {
    fn generate(&mut self, current_time_s: f64) -> Vec<Request> {
        let mut requests = Vec::new();
        while self.next_arrival_s <= current_time_s {
            let origin = self.sample_pos();
            let destination = self.sample_pos();
            requests.push(Request {
                origin,
                destination,
                request_time_s: self.next_arrival_s,
            });
            self.next_arrival_s += self.sample_gap_s();
        }
        requests
    }
}
