//! Real Las Vegas / Henderson pickup and dropoff points.
//!
//! Coordinates sourced from OpenStreetMap. They are routable with the OSRM
//! Nevada extract.

use mod_sim::config::AreaConfig;
use mod_sim::types::Pos;

/// A named location.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub name: &'static str,
    pub pos: Pos,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lon: f64) -> Self {
        Self {
            name,
            pos: Pos::new(lon, lat),
        }
    }
}

// ============================================================================
// Strip casinos (good depots)
// ============================================================================

pub const CASINOS: &[Location] = &[
    Location::new("Wynn Las Vegas", 36.1263781, -115.1658180),
    Location::new("MGM Grand", 36.1023654, -115.1688720),
    Location::new("Bellagio", 36.1126, -115.1767),
    Location::new("Caesars Palace", 36.1162, -115.1745),
];

// ============================================================================
// Spread across the metro area
// ============================================================================

pub const DESTINATIONS: &[Location] = &[
    Location::new("Green Valley Ranch Area", 36.0308, -115.0825),
    Location::new("Sunset Station Area", 36.0614, -115.0631),
    Location::new("Rivas Mexican Grill North", 36.1450055, -115.0482587),
    Location::new("Beers and Bets", 36.1428945, -115.1573836),
    Location::new("Bootlegger Bistro", 36.0492047, -115.1715744),
    Location::new("Mikos Izakaya", 36.0429503, -115.1527627),
    Location::new("Marakesh", 36.1177772, -115.1546882),
    Location::new("Coco's Bakery", 36.1004202, -115.1652380),
];

/// Bounding box around every fixture location.
pub fn area() -> AreaConfig {
    AreaConfig {
        lon_min: -115.20,
        lon_max: -115.00,
        lat_min: 36.00,
        lat_max: 36.17,
    }
}

/// Every location, casinos first.
pub fn all_locations() -> Vec<Location> {
    CASINOS.iter().chain(DESTINATIONS.iter()).copied().collect()
}
