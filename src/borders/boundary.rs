//! Country boundary construction from administrative relations.

use geo::{BoundingRect, Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use hashbrown::HashMap;
use tracing::{debug, info, warn};

use super::rings::stitch_rings;
use super::CountryBorders;
use crate::error::CurateError;
use crate::models::{BoundaryRelation, OsmType};

/// Outer rings with fewer raw points are discarded
const MIN_RING_POINTS: usize = 3;
/// Shortest member way worth stitching
const MIN_WAY_POINTS: usize = 2;

/// A country's outer perimeter.
///
/// Inner rings are never subtracted; distances are always measured to the
/// outer perimeter kept in `perimeter`.
#[derive(Debug, Clone)]
pub struct CountryBoundary {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub perimeter: MultiLineString<f64>,
    /// Relations that contributed rings
    pub relation_ids: Vec<i64>,
}

impl CountryBoundary {
    pub fn new(name: String, geometry: MultiPolygon<f64>, relation_ids: Vec<i64>) -> Self {
        let perimeter = MultiLineString::new(
            geometry
                .iter()
                .map(|polygon| polygon.exterior().clone())
                .collect(),
        );
        Self {
            name,
            geometry,
            perimeter,
            relation_ids,
        }
    }

    /// Get the bounding box of this boundary
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    fn absorb(&mut self, other: CountryBoundary) {
        self.geometry.0.extend(other.geometry.0);
        self.perimeter.0.extend(other.perimeter.0);
        self.relation_ids.extend(other.relation_ids);
    }
}

/// Options for the border builder
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Stitch open outer ways into closed rings before building polygons
    pub merge_outer_ways: bool,
}

/// Build the country mapping from boundary relations.
///
/// Relations without tags, members or a usable outer ring are dropped.
/// A relation whose geometry cannot be built is logged and skipped; the
/// rest of the run is unaffected. Relations sharing a name are combined
/// into one multipolygon.
pub fn build_country_borders(relations: &[BoundaryRelation], options: BuildOptions) -> CountryBorders {
    info!("Building country boundaries from {} elements...", relations.len());

    let mut by_name: HashMap<String, CountryBoundary> = HashMap::new();
    let mut skipped = 0usize;

    for relation in relations {
        if relation.osm_type != OsmType::Relation {
            continue;
        }
        let (Some(tags), Some(members)) = (&relation.tags, &relation.members) else {
            continue;
        };

        let name = tags
            .get("name")
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());

        // Stitching needs the two-point ways too, so the ring size check
        // applies to its output instead of the members
        let min_member_points = if options.merge_outer_ways {
            MIN_WAY_POINTS
        } else {
            MIN_RING_POINTS
        };
        let ways: Vec<Vec<Coord<f64>>> = members
            .iter()
            .filter(|m| m.role == "outer")
            .map(|m| {
                m.geometry
                    .iter()
                    .map(|pt| Coord { x: pt.lon, y: pt.lat })
                    .collect::<Vec<_>>()
            })
            .filter(|way| way.len() >= min_member_points)
            .collect();

        let rings: Vec<Vec<Coord<f64>>> = if options.merge_outer_ways {
            stitch_rings(&ways)
                .into_iter()
                .filter(|ring| ring.len() >= MIN_RING_POINTS)
                .collect()
        } else {
            ways
        };

        if rings.is_empty() {
            debug!("Relation {:?} ({}) has no usable outer ring", relation.id, name);
            continue;
        }

        let geometry = match build_geometry(&name, rings) {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!("{}", e);
                skipped += 1;
                continue;
            }
        };

        let boundary = CountryBoundary::new(name.clone(), geometry, relation.id.into_iter().collect());
        match by_name.get_mut(&name) {
            Some(existing) => {
                debug!("Merging another relation into {}", name);
                existing.absorb(boundary);
            }
            None => {
                by_name.insert(name, boundary);
            }
        }
    }

    info!(
        "Loaded {} country boundaries ({} skipped as malformed)",
        by_name.len(),
        skipped
    );

    CountryBorders::build(by_name.into_values().collect())
}

/// One polygon per outer ring, closed automatically.
pub fn build_geometry(
    country: &str,
    rings: Vec<Vec<Coord<f64>>>,
) -> Result<MultiPolygon<f64>, CurateError> {
    let malformed = |reason: String| CurateError::MalformedGeometry {
        country: country.to_string(),
        reason,
    };

    if rings.is_empty() {
        return Err(malformed("no outer ring".to_string()));
    }

    let mut polygons = Vec::with_capacity(rings.len());
    for (i, ring) in rings.into_iter().enumerate() {
        if ring.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(malformed(format!("ring {} has a non-finite coordinate", i)));
        }

        let mut distinct: Vec<Coord<f64>> = Vec::with_capacity(ring.len());
        for c in &ring {
            if !distinct.contains(c) {
                distinct.push(*c);
                if distinct.len() >= MIN_RING_POINTS {
                    break;
                }
            }
        }
        if distinct.len() < MIN_RING_POINTS {
            return Err(malformed(format!(
                "ring {} collapses to {} distinct points",
                i,
                distinct.len()
            )));
        }

        polygons.push(Polygon::new(LineString::new(ring), vec![]));
    }

    Ok(MultiPolygon::new(polygons))
}
