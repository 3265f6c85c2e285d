//! JSON-lines datalog of fleet state, one record per frame.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::types::{Pos, Vehicle, WaypointOp};
use crate::vehicle::WaypointEvent;

#[derive(Debug, Serialize)]
pub struct WaypointRecord {
    pub trip_id: usize,
    pub op: WaypointOp,
    pub arrival_time_s: f64,
    /// Remaining path to the waypoint. Empty when the leg has no geometry.
    pub path: Vec<Pos>,
}

#[derive(Debug, Serialize)]
pub struct VehicleRecord {
    pub id: usize,
    pub pos: Pos,
    pub load: usize,
    pub waypoints: Vec<WaypointRecord>,
}

#[derive(Debug, Serialize)]
pub struct FrameRecord {
    pub system_time_s: f64,
    pub vehicles: Vec<VehicleRecord>,
    pub events: Vec<WaypointEvent>,
}

impl FrameRecord {
    pub fn new(system_time_s: f64, vehicles: &[Vehicle], events: Vec<WaypointEvent>) -> Self {
        Self {
            system_time_s,
            vehicles: vehicles
                .iter()
                .map(|vehicle| VehicleRecord {
                    id: vehicle.id,
                    pos: vehicle.pos,
                    load: vehicle.load,
                    waypoints: vehicle
                        .waypoints
                        .iter()
                        .map(|wp| WaypointRecord {
                            trip_id: wp.trip_id,
                            op: wp.op,
                            arrival_time_s: wp.arrival_time_s,
                            path: wp.route.poses(),
                        })
                        .collect(),
                })
                .collect(),
            events,
        }
    }
}

/// Append-only datalog file. Closed when dropped.
#[derive(Debug)]
pub struct Datalog {
    writer: BufWriter<File>,
    records: usize,
}

impl Datalog {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            records: 0,
        })
    }

    pub fn write_record(&mut self, record: &FrameRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
