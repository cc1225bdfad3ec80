//! Name-ordered, spatially indexed set of country boundaries.

use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::info;

use super::CountryBoundary;
use crate::models::GeoPoint;

/// Shortest ground length of one degree of latitude, in km
const KM_PER_DEGREE_LAT_MIN: f64 = 110.5;
/// Ground length of one degree of longitude at the equator, in km
const KM_PER_DEGREE_LON_EQUATOR: f64 = 111.4;
/// Widening applied to the search window so the prefilter never excludes
/// a boundary that the exact distance would accept
const WINDOW_SLACK: f64 = 1.25;

/// Wrapper for R-tree indexing of country boundaries
#[derive(Clone)]
struct IndexedBoundary {
    /// Position in the name-sorted list
    rank: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBoundary {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Country boundaries built once per run and shared read-only.
///
/// Iteration order is ascending country name. This is the order the
/// proximity filter uses to pick the first country under its threshold.
pub struct CountryBorders {
    sorted: Vec<Arc<CountryBoundary>>,
    tree: RTree<IndexedBoundary>,
}

impl CountryBorders {
    pub fn build(mut boundaries: Vec<CountryBoundary>) -> Self {
        boundaries.sort_by(|a, b| a.name.cmp(&b.name));
        let sorted: Vec<Arc<CountryBoundary>> = boundaries.into_iter().map(Arc::new).collect();

        let indexed: Vec<IndexedBoundary> = sorted
            .iter()
            .enumerate()
            .filter_map(|(rank, b)| {
                let (min_x, min_y, max_x, max_y) = b.bbox()?;
                Some(IndexedBoundary {
                    rank,
                    envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
                })
            })
            .collect();

        let tree = RTree::bulk_load(indexed);
        info!("Spatial index built with {} country boundaries", tree.size());

        Self { sorted, tree }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CountryBoundary>> {
        self.sorted
            .binary_search_by(|b| b.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.sorted[i])
    }

    /// All boundaries in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CountryBoundary>> {
        self.sorted.iter()
    }

    /// Boundaries whose extent may lie within `km` of the point, in name order.
    ///
    /// This is a bounding-box prefilter only; callers still measure the
    /// exact boundary distance.
    pub fn candidates_within(&self, point: GeoPoint, km: f64) -> Vec<&Arc<CountryBoundary>> {
        let dlat = km / KM_PER_DEGREE_LAT_MIN * WINDOW_SLACK;
        let lat_edge = (point.lat.abs() + dlat).min(90.0);
        let lon_scale = lat_edge.to_radians().cos() * KM_PER_DEGREE_LON_EQUATOR;
        let dlon = if lon_scale > 1e-6 {
            (km / lon_scale * WINDOW_SLACK).min(360.0)
        } else {
            360.0
        };

        let window = AABB::from_corners(
            [point.lon - dlon, point.lat - dlat],
            [point.lon + dlon, point.lat + dlat],
        );

        let mut ranks: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&window)
            .map(|ib| ib.rank)
            .collect();
        ranks.sort_unstable();
        ranks.into_iter().map(|rank| &self.sorted[rank]).collect()
    }

    /// Get total number of boundaries
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}
