//! Spherical nearest-neighbour index over gate positions.
//!
//! Gates are stored as unit vectors in an R-tree. A great-circle radius
//! query becomes a chord-length query in 3D, and each hit is then confirmed
//! against the haversine angle.

use hashbrown::HashSet;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::{info, warn};

use crate::error::CurateError;
use crate::geodesy::angular_distance;
use crate::models::{Element, GeoPoint};

/// Relative widening of the chord search so rounding never loses a hit
/// that the haversine check accepts
const CHORD_SLACK: f64 = 1e-9;

type GateEntry = GeomWithData<[f64; 3], usize>;

/// A gate with its resolved position
#[derive(Debug, Clone)]
pub struct IndexedGate {
    pub element: Element,
    pub position: GeoPoint,
}

pub struct GateIndex {
    gates: Vec<IndexedGate>,
    tree: RTree<GateEntry>,
}

fn unit_vector(p: GeoPoint) -> [f64; 3] {
    let lat = p.lat.to_radians();
    let lon = p.lon.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

impl GateIndex {
    /// Index raw gate elements.
    ///
    /// Gates without a coordinate are skipped. A gate id seen twice (the raw
    /// snapshot is assembled from overlapping tiles) keeps its first
    /// occurrence.
    pub fn build(elements: Vec<Element>) -> Self {
        let total = elements.len();
        let mut seen = HashSet::new();
        let mut gates = Vec::with_capacity(total);

        for element in elements {
            if !seen.insert(element.id) {
                continue;
            }
            match element.coordinate() {
                Some(position) => gates.push(IndexedGate { element, position }),
                None => warn!("Skipping gate: {}", CurateError::MissingCoordinate { id: element.id }),
            }
        }

        let entries: Vec<GateEntry> = gates
            .iter()
            .enumerate()
            .map(|(i, g)| GeomWithData::new(unit_vector(g.position), i))
            .collect();
        let tree = RTree::bulk_load(entries);

        info!("Gate index built with {} of {} gates", gates.len(), total);
        Self { gates, tree }
    }

    pub fn gate(&self, i: usize) -> &IndexedGate {
        &self.gates[i]
    }

    /// Indices of all gates within `angle` radians of `center`, ascending.
    pub fn within(&self, center: GeoPoint, angle: f64) -> Vec<usize> {
        let angle = angle.clamp(0.0, std::f64::consts::PI);
        let chord = 2.0 * (angle / 2.0).sin() * (1.0 + CHORD_SLACK);

        let mut hits: Vec<usize> = self
            .tree
            .locate_within_distance(unit_vector(center), chord * chord)
            .map(|entry| entry.data)
            .filter(|&i| angular_distance(center, self.gates[i].position) <= angle)
            .collect();
        hits.sort_unstable();
        hits
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::EARTH_RADIUS_KM;

    /// Deterministic scatter of gates around (48N, 30E)
    fn scatter() -> Vec<Element> {
        (0..400)
            .map(|i| {
                let lat = 48.0 + ((i * 37) % 101) as f64 * 0.0004 - 0.02;
                let lon = 30.0 + ((i * 53) % 97) as f64 * 0.0006 - 0.03;
                Element::node(i, lat, lon)
            })
            .collect()
    }

    #[test]
    fn test_radius_query_matches_brute_force() {
        let elements = scatter();
        let index = GateIndex::build(elements.clone());
        let center = GeoPoint::new(48.001, 30.002);
        let angle = 1.0 / EARTH_RADIUS_KM;

        let expected: Vec<usize> = elements
            .iter()
            .enumerate()
            .filter(|(_, e)| angular_distance(center, e.coordinate().unwrap()) <= angle)
            .map(|(i, _)| i)
            .collect();

        assert!(!expected.is_empty());
        assert!(expected.len() < elements.len());
        assert_eq!(index.within(center, angle), expected);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let index = GateIndex::build(vec![
            Element::node(7, 48.0, 30.0),
            Element::node(7, 10.0, 10.0),
            Element::node(8, 48.0, 30.001),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.gate(0).position, GeoPoint::new(48.0, 30.0));
    }

    #[test]
    fn test_gate_without_coordinate_is_skipped() {
        let mut broken = Element::node(1, 0.0, 0.0);
        broken.lat = None;
        let index = GateIndex::build(vec![broken]);
        assert!(index.is_empty());
        assert!(index.within(GeoPoint::new(0.0, 0.0), 1.0).is_empty());
    }
}
