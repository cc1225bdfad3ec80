//! Raw survey elements as delivered by the map-data fetchers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of OSM object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// As a `geo` point (x = lon, y = lat)
    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }
}

/// Free-form OSM tags. Ordered so that written snapshots are stable.
pub type Tags = BTreeMap<String, String>;

/// A raw checkpoint or gate element.
///
/// Point features carry `lat`/`lon` directly; ways and relations exported
/// with `out center` carry a computed `center` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: i64,

    #[serde(rename = "type")]
    pub osm_type: OsmType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<GeoPoint>,

    #[serde(default)]
    pub tags: Tags,
}

impl Element {
    pub fn node(id: i64, lat: f64, lon: f64) -> Self {
        Self {
            id,
            osm_type: OsmType::Node,
            lat: Some(lat),
            lon: Some(lon),
            center: None,
            tags: Tags::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Direct lat/lon first, else the area center.
    pub fn coordinate(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
            _ => self.center,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.tags.get("name").map(String::as_str)
    }

    /// Name length in characters, 0 when unnamed
    pub fn name_len(&self) -> usize {
        self.name().map(|n| n.chars().count()).unwrap_or(0)
    }
}

/// A coordinate of a boundary member way
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemberPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A member of a boundary relation exported with `out geom`.
///
/// Node members (admin centres, labels) have no `geometry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationMember {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub member_type: Option<OsmType>,

    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub member_ref: Option<i64>,

    #[serde(default)]
    pub role: String,

    #[serde(default)]
    pub geometry: Vec<MemberPoint>,
}

/// An administrative boundary relation.
///
/// Tags and members are optional in the raw dump; relations lacking either
/// are ignored by the border builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRelation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(rename = "type")]
    pub osm_type: OsmType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<RelationMember>>,
}
