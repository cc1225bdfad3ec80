//! Proximity filter: keep checkpoint candidates close to a country border.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::StageReport;
use crate::borders::CountryBorders;
use crate::error::CurateError;
use crate::geodesy::{boundary_distance_km, round_to};
use crate::models::{Checkpoint, Element, GeoPoint};

enum Outcome {
    Accepted(Checkpoint),
    NoCoordinate(i64),
    TooFar(Element),
}

/// First country, in name order, whose perimeter lies within `max_km`.
///
/// This is deliberately the first match and not the nearest one.
pub fn first_country_within(
    point: GeoPoint,
    borders: &CountryBorders,
    max_km: f64,
) -> Option<(String, f64)> {
    borders
        .candidates_within(point, max_km)
        .into_iter()
        .find_map(|country| {
            let d = boundary_distance_km(point, &country.perimeter)?;
            (d <= max_km).then(|| (country.name.clone(), d))
        })
}

/// Keep candidates within `max_distance_km` of some country's border.
///
/// Survivors carry the matched country and the distance rounded to 2
/// decimals. Input order is preserved.
pub fn filter_by_proximity(
    elements: Vec<Element>,
    borders: &CountryBorders,
    max_distance_km: f64,
) -> (Vec<Checkpoint>, StageReport) {
    let mut report = StageReport::new("proximity filter", elements.len());

    let outcomes: Vec<Outcome> = elements
        .into_par_iter()
        .map(|el| {
            let Some(point) = el.coordinate() else {
                return Outcome::NoCoordinate(el.id);
            };
            match first_country_within(point, borders, max_distance_km) {
                Some((country, d)) => Outcome::Accepted(Checkpoint::new(el, round_to(d, 2), country)),
                None => Outcome::TooFar(el),
            }
        })
        .collect();

    let mut filtered = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Accepted(cp) => {
                debug!(
                    "Checkpoint {} ({}) OK: {} km from {}",
                    cp.id(),
                    cp.name().unwrap_or("Unnamed"),
                    cp.distance_to_border_km,
                    cp.country_match
                );
                filtered.push(cp);
            }
            Outcome::NoCoordinate(id) => {
                warn!("Skipping: {}", CurateError::MissingCoordinate { id });
                report.dropped += 1;
            }
            Outcome::TooFar(el) => {
                debug!(
                    "Checkpoint {} ({}) dropped: no border within {} km",
                    el.id,
                    el.name().unwrap_or("Unnamed"),
                    max_distance_km
                );
                report.dropped += 1;
            }
        }
    }

    report.output = filtered.len();
    info!("{}", report);
    (filtered, report)
}
