//! Distance functions shared by every stage.
//!
//! All proximity decisions use geodesic (ellipsoidal) distance. The gate
//! index pre-filters with a spherical haversine angle, so the two models can
//! disagree by a few metres at the edge of a radius.

use geo::{Closest, ClosestPoint, Distance, Geodesic, HaversineMeasure, MultiLineString};

use crate::models::GeoPoint;

/// Mean Earth radius used for the spherical radius query
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geodesic distance in kilometres
pub fn geodesic_km(a: GeoPoint, b: GeoPoint) -> f64 {
    Geodesic.distance(a.to_point(), b.to_point()) / 1000.0
}

/// Central angle between two points on the sphere, in radians (haversine).
pub fn angular_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    HaversineMeasure::new(EARTH_RADIUS_KM).distance(a.to_point(), b.to_point()) / EARTH_RADIUS_KM
}

/// Distance from a point to the nearest point on a boundary perimeter.
///
/// The nearest point is found by planar projection in lon/lat space onto the
/// perimeter lines (not the enclosed area, so points inside a country still
/// measure the distance to its edge), then measured geodesically.
/// Returns `None` for an empty perimeter.
pub fn boundary_distance_km(point: GeoPoint, perimeter: &MultiLineString<f64>) -> Option<f64> {
    let nearest = match perimeter.closest_point(&point.to_point()) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p,
        Closest::Indeterminate => return None,
    };
    Some(geodesic_km(point, GeoPoint::new(nearest.y(), nearest.x())))
}

/// Round to a fixed number of decimals for record output
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, LineString};

    const TOLERANCE_KM: f64 = 1e-6;

    #[test]
    fn test_geodesic_symmetry() {
        let p = GeoPoint::new(48.0, 30.0);
        let q = GeoPoint::new(48.005, 30.001);
        assert!((geodesic_km(p, q) - geodesic_km(q, p)).abs() < TOLERANCE_KM);
        assert!(geodesic_km(p, p).abs() < TOLERANCE_KM);
    }

    #[test]
    fn test_geodesic_known_distance() {
        // One degree of latitude near 48N is about 111.2 km
        let d = geodesic_km(GeoPoint::new(48.0, 30.0), GeoPoint::new(49.0, 30.0));
        assert!((d - 111.2).abs() < 0.2, "got {}", d);
    }

    #[test]
    fn test_angular_distance_matches_radius() {
        let p = GeoPoint::new(0.0, 0.0);
        let q = GeoPoint::new(0.0, 1.0);
        let expected = 1f64.to_radians();
        assert!((angular_distance(p, q) - expected).abs() < 1e-12);
        assert!((angular_distance(q, p) - expected).abs() < 1e-12);
        assert_eq!(angular_distance(p, p), 0.0);
    }

    #[test]
    fn test_angular_distance_along_meridian() {
        // 0.0081 degrees of latitude is about 0.9 km on the 6371 km sphere
        let angle = angular_distance(GeoPoint::new(48.0, 30.0), GeoPoint::new(48.0081, 30.0));
        assert!((angle - 0.0081f64.to_radians()).abs() < 1e-12);
        assert!((angle * EARTH_RADIUS_KM - 0.9007).abs() < 1e-3);
    }

    #[test]
    fn test_boundary_distance_from_inside_measures_to_edge() {
        let square = LineString::new(vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 0.0 },
            coord! { x: 1.0, y: 1.0 },
            coord! { x: 0.0, y: 1.0 },
            coord! { x: 0.0, y: 0.0 },
        ]);
        let perimeter = MultiLineString::new(vec![square]);

        // Inside the square, 0.1 degree from the western edge
        let d = boundary_distance_km(GeoPoint::new(0.5, 0.1), &perimeter).unwrap();
        let expected = geodesic_km(GeoPoint::new(0.5, 0.1), GeoPoint::new(0.5, 0.0));
        assert!((d - expected).abs() < TOLERANCE_KM);
        assert!(d > 10.0 && d < 12.0);
    }

    #[test]
    fn test_boundary_distance_on_edge_is_zero() {
        let line = LineString::new(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 0.0, y: 1.0 }]);
        let perimeter = MultiLineString::new(vec![line]);
        let d = boundary_distance_km(GeoPoint::new(0.5, 0.0), &perimeter).unwrap();
        assert!(d < TOLERANCE_KM);
    }

    #[test]
    fn test_boundary_distance_empty_perimeter() {
        let perimeter: MultiLineString<f64> = MultiLineString::new(vec![]);
        assert!(boundary_distance_km(GeoPoint::new(0.0, 0.0), &perimeter).is_none());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(0.3004, 3), 0.3);
    }
}
