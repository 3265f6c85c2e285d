//! OSRM offline map data: verification of a prepared dataset, plus download and
//! preprocessing helpers for setting one up.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

#[derive(Debug, Clone)]
pub struct GeofabrikRegion {
    /// Geofabrik region path, e.g. "north-america/us/nevada".
    pub path: String,
}

impl GeofabrikRegion {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn name(&self) -> String {
        self.path
            .split('/')
            .next_back()
            .unwrap_or("region")
            .to_string()
    }

    pub fn url(&self) -> String {
        format!("https://download.geofabrik.de/{}-latest.osm.pbf", self.path)
    }
}

#[derive(Debug, Clone)]
pub struct OsrmDatasetConfig {
    pub region: GeofabrikRegion,
    pub data_root: PathBuf,
}

impl OsrmDatasetConfig {
    pub fn new(region: GeofabrikRegion, data_root: impl Into<PathBuf>) -> Self {
        Self {
            region,
            data_root: data_root.into(),
        }
    }
}

/// A prepared (MLD) OSRM dataset on disk.
#[derive(Debug, Clone)]
pub struct OsrmDataset {
    pub data_dir: PathBuf,
    /// Base file, e.g. `<data_dir>/nevada-latest.osrm`.
    pub osrm_base: PathBuf,
}

#[derive(Debug)]
pub enum OsrmDataError {
    Io(io::Error),
    Http(reqwest::Error),
    ProcessFailure(String),
    /// The dataset is missing or not fully preprocessed.
    MissingData(PathBuf),
}

impl fmt::Display for OsrmDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsrmDataError::Io(err) => write!(f, "I/O error: {}", err),
            OsrmDataError::Http(err) => write!(f, "download failed: {}", err),
            OsrmDataError::ProcessFailure(msg) => write!(f, "preprocessing failed: {}", msg),
            OsrmDataError::MissingData(path) => {
                write!(f, "OSRM data at {} is missing or incomplete", path.display())
            }
        }
    }
}

impl std::error::Error for OsrmDataError {}

impl From<io::Error> for OsrmDataError {
    fn from(err: io::Error) -> Self {
        OsrmDataError::Io(err)
    }
}

impl From<reqwest::Error> for OsrmDataError {
    fn from(err: reqwest::Error) -> Self {
        OsrmDataError::Http(err)
    }
}

impl OsrmDataset {
    /// Open an already prepared dataset. `osrm_base` is the `.osrm` file the
    /// backend is started with.
    pub fn open(osrm_base: impl Into<PathBuf>) -> Result<Self, OsrmDataError> {
        let osrm_base = osrm_base.into();
        if !mld_ready(&osrm_base) {
            return Err(OsrmDataError::MissingData(osrm_base));
        }
        let data_dir = osrm_base
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self {
            data_dir,
            osrm_base,
        })
    }

    /// Download and preprocess the region if needed, using the
    /// `osrm/osrm-backend` docker image.
    pub fn ensure(config: &OsrmDatasetConfig) -> Result<Self, OsrmDataError> {
        let region_name = config.region.name();
        let data_root = if config.data_root.is_absolute() {
            config.data_root.clone()
        } else {
            std::env::current_dir()?.join(&config.data_root)
        };
        let data_dir = data_root.join(&region_name);
        fs::create_dir_all(&data_dir)?;

        let pbf_path = data_dir.join(format!("{}-latest.osm.pbf", region_name));
        if !pbf_path.exists() {
            info!(url = %config.region.url(), "downloading OSM extract");
            download_pbf(&config.region.url(), &pbf_path)?;
        }

        let osrm_base = data_dir.join(format!("{}-latest.osrm", region_name));
        if !osrm_base.exists() {
            run_docker(
                &["osrm-extract", "-p", "/opt/car.lua", &format!("/data/{}", file_name(&pbf_path))],
                &data_dir,
            )?;
        }

        if !mld_ready(&osrm_base) {
            run_docker(&["osrm-partition", &format!("/data/{}", file_name(&osrm_base))], &data_dir)?;
            run_docker(&["osrm-customize", &format!("/data/{}", file_name(&osrm_base))], &data_dir)?;
        }

        Ok(Self {
            data_dir,
            osrm_base,
        })
    }
}

fn download_pbf(url: &str, dest: &Path) -> Result<(), OsrmDataError> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let tmp_path = dest.with_extension("tmp");
    let mut writer = BufWriter::new(File::create(&tmp_path)?);
    let bytes = response.bytes()?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    fs::rename(tmp_path, dest)?;
    Ok(())
}

fn mld_ready(osrm_base: &Path) -> bool {
    let partition = osrm_base.with_extension("osrm.partition");
    let mldgr = osrm_base.with_extension("osrm.mldgr");
    let cells = osrm_base.with_extension("osrm.cells");
    osrm_base.exists() && partition.exists() && mldgr.exists() && cells.exists()
}

fn run_docker(args: &[&str], data_dir: &Path) -> Result<(), OsrmDataError> {
    let status = Command::new("docker")
        .arg("run")
        .arg("--rm")
        .arg("-t")
        .arg("-v")
        .arg(format!("{}:/data", data_dir.display()))
        .arg("osrm/osrm-backend")
        .args(args)
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(OsrmDataError::ProcessFailure(format!(
            "docker exited with status {}",
            status
        )))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}
