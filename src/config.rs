//! Platform configuration.
//!
//! Loaded from a JSON file. Every section has defaults, so a file only needs
//! to name what it changes.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::routing::RouterConfig;
use crate::types::Pos;

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(serde_json::Error),
    /// A field is out of its valid range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read config: {}", err),
            ConfigError::Parse(err) => write!(f, "failed to parse config: {}", err),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Bounding box of the service area, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaConfig {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl Default for AreaConfig {
    fn default() -> Self {
        // Hong Kong Island and Kowloon.
        Self {
            lon_min: 113.93,
            lon_max: 114.28,
            lat_min: 22.20,
            lat_max: 22.42,
        }
    }
}

impl AreaConfig {
    pub fn contains(&self, pos: Pos) -> bool {
        pos.lon >= self.lon_min
            && pos.lon <= self.lon_max
            && pos.lat >= self.lat_min
            && pos.lat <= self.lat_max
    }

    pub fn center(&self) -> Pos {
        Pos::new(
            (self.lon_min + self.lon_max) / 2.0,
            (self.lat_min + self.lat_max) / 2.0,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub fleet_size: usize,
    pub veh_capacity: usize,
    /// Where every vehicle starts.
    pub initial_pos: Pos,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            fleet_size: 100,
            veh_capacity: 4,
            initial_pos: AreaConfig::default().center(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub requests_per_hour: f64,
    /// How long a rider waits for pickup before walking away.
    pub walkaway_time_s: f64,
    pub seed: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            requests_per_hour: 1000.0,
            walkaway_time_s: 600.0,
            seed: 0,
        }
    }
}

/// Which statistics window a point in time falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationPhase {
    Warmup,
    Steady,
    Winddown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub cycle_s: f64,
    pub warmup_duration_s: f64,
    pub simulation_duration_s: f64,
    pub winddown_duration_s: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cycle_s: 30.0,
            warmup_duration_s: 900.0,
            simulation_duration_s: 3600.0,
            winddown_duration_s: 900.0,
        }
    }
}

impl SimulationConfig {
    pub fn total_duration_s(&self) -> f64 {
        self.warmup_duration_s + self.simulation_duration_s + self.winddown_duration_s
    }

    pub fn phase_at(&self, time_s: f64) -> SimulationPhase {
        if time_s < self.warmup_duration_s {
            SimulationPhase::Warmup
        } else if time_s < self.warmup_duration_s + self.simulation_duration_s {
            SimulationPhase::Steady
        } else {
            SimulationPhase::Winddown
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSON-lines datalog of vehicle positions. Not written when unset.
    pub path_to_output_datalog: Option<PathBuf>,
    /// Datalog frames written per cycle.
    pub frames_per_cycle: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path_to_output_datalog: None,
            frames_per_cycle: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub area: AreaConfig,
    pub fleet: FleetConfig,
    pub request: RequestConfig,
    pub simulation: SimulationConfig,
    pub router: RouterConfig,
    pub output: OutputConfig,
}

impl PlatformConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: PlatformConfig = serde_json::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), "loaded platform config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let area = &self.area;
        if !(area.lon_min < area.lon_max && area.lat_min < area.lat_max) {
            return Err(ConfigError::Invalid(format!(
                "area [{}, {}] x [{}, {}] is empty",
                area.lon_min, area.lon_max, area.lat_min, area.lat_max
            )));
        }

        let sim = &self.simulation;
        if !(sim.cycle_s > 0.0) {
            return Err(ConfigError::Invalid("cycle_s must be positive".into()));
        }
        for (name, value) in [
            ("warmup_duration_s", sim.warmup_duration_s),
            ("simulation_duration_s", sim.simulation_duration_s),
            ("winddown_duration_s", sim.winddown_duration_s),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::Invalid(format!("{} must not be negative", name)));
            }
        }

        if !(self.request.walkaway_time_s > 0.0) {
            return Err(ConfigError::Invalid("walkaway_time_s must be positive".into()));
        }
        if !(self.request.requests_per_hour >= 0.0) {
            return Err(ConfigError::Invalid("requests_per_hour must not be negative".into()));
        }
        if self.fleet.veh_capacity == 0 {
            return Err(ConfigError::Invalid("veh_capacity must be at least 1".into()));
        }
        if !area.contains(self.fleet.initial_pos) {
            return Err(ConfigError::Invalid(format!(
                "initial position {:?} is outside the area",
                self.fleet.initial_pos
            )));
        }
        if self.output.frames_per_cycle == 0 {
            return Err(ConfigError::Invalid("frames_per_cycle must be at least 1".into()));
        }

        Ok(())
    }
}
