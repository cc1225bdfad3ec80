//! Checkpoint and gate records produced by the curation stages.

use serde::{Deserialize, Serialize};

use super::element::{Element, GeoPoint, OsmType, Tags};

/// A checkpoint candidate that survived the proximity filter.
///
/// Serializes as the raw element with the stage fields appended, so the
/// filtered, clustered and final snapshots share one record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(flatten)]
    pub element: Element,

    pub distance_to_border_km: f64,

    /// Origin country
    pub country_match: String,

    /// Destination country, set by the country-pair stage when found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_to: Option<String>,
}

impl Checkpoint {
    pub fn new(element: Element, distance_to_border_km: f64, country_match: String) -> Self {
        Self {
            element,
            distance_to_border_km,
            country_match,
            country_to: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.element.id
    }

    pub fn coordinate(&self) -> Option<GeoPoint> {
        self.element.coordinate()
    }

    pub fn name(&self) -> Option<&str> {
        self.element.name()
    }
}

/// A gate attached to a checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedGate {
    pub id: i64,

    #[serde(rename = "type")]
    pub osm_type: OsmType,

    pub lat: f64,
    pub lon: f64,

    #[serde(default)]
    pub tags: Tags,

    pub distance_to_checkpoint_km: f64,
}

/// One entry of the linked-gate record set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointGates {
    pub checkpoint_id: i64,
    pub checkpoint_name: String,
    pub checkpoint_lat: f64,
    pub checkpoint_lon: f64,
    pub gates: Vec<LinkedGate>,
}

/// Storage row consumed by the live service's checkpoint import.
///
/// The aggregate wait-time fields of the stored checkpoint belong to the
/// statistics job and are deliberately absent here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRow {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country_from: String,
    pub country_to: Option<String>,
}

impl CheckpointRow {
    /// Build the storage row, `None` when the record has no coordinate.
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Option<Self> {
        let coord = checkpoint.coordinate()?;
        Some(Self {
            name: checkpoint.name().unwrap_or("Unknown").to_string(),
            lat: coord.lat,
            lon: coord.lon,
            country_from: checkpoint.country_match.clone(),
            country_to: checkpoint.country_to.clone(),
        })
    }
}
