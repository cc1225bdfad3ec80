//! Pipeline configuration.
//!
//! Every value has a built-in default; a TOML file only needs the keys it
//! overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::geodesy;

/// Proximity filter: max distance from a checkpoint to its country's border
pub const MAX_DISTANCE_KM: f64 = 5.0;
/// Duplicate clustering radius around the cluster anchor
pub const CLUSTER_RADIUS_KM: f64 = 1.0;
/// Country-pair stage: max distance to the destination country's border
pub const MAX_DIST_KM: f64 = 10.0;
/// Gate linking radius
pub const RADIUS_KM: f64 = 1.0;
pub const EARTH_RADIUS_KM: f64 = geodesy::EARTH_RADIUS_KM;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub thresholds: Thresholds,
    pub paths: PathsConfig,
    pub borders: BordersConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Thresholds {
    pub max_distance_km: f64,
    pub cluster_radius_km: f64,
    pub country_to_max_km: f64,
    pub gate_radius_km: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_distance_km: MAX_DISTANCE_KM,
            cluster_radius_km: CLUSTER_RADIUS_KM,
            country_to_max_km: MAX_DIST_KM,
            gate_radius_km: RADIUS_KM,
        }
    }
}

/// Snapshot locations, relative to `data_dir` unless absolute
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub checkpoints_raw: PathBuf,
    pub borders: PathBuf,
    pub checkpoints_filtered: PathBuf,
    pub checkpoints_clustered: PathBuf,
    pub checkpoints_final: PathBuf,
    pub gates_raw: PathBuf,
    pub gates_linked: PathBuf,
    pub gates_linked_dedup: PathBuf,
    pub rows_csv: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            checkpoints_raw: PathBuf::from("osm_checkpoints_raw.json"),
            borders: PathBuf::from("osm_country_borders.json"),
            checkpoints_filtered: PathBuf::from("osm_checkpoints_filtered.json"),
            checkpoints_clustered: PathBuf::from("osm_checkpoints_clustered.json"),
            checkpoints_final: PathBuf::from("osm_checkpoints_final.json"),
            gates_raw: PathBuf::from("osm_gates_raw.json"),
            gates_linked: PathBuf::from("osm_gates_linked.json"),
            gates_linked_dedup: PathBuf::from("osm_gates_linked_deduplicated.json"),
            rows_csv: PathBuf::from("checkpoints_rows.csv"),
        }
    }
}

impl PathsConfig {
    /// Resolve a snapshot file against `data_dir`
    pub fn resolve(&self, file: &Path) -> PathBuf {
        self.data_dir.join(file)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BordersConfig {
    pub merge_outer_ways: bool,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
