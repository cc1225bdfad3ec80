//! Country-pair assignment: find the destination country of each checkpoint.

use rayon::prelude::*;
use tracing::{debug, info};

use super::StageReport;
use crate::borders::CountryBorders;
use crate::geodesy::boundary_distance_km;
use crate::models::{Checkpoint, GeoPoint};

/// Nearest country other than `origin` whose perimeter is within `max_km`.
/// On equal distances the first in name order is kept.
pub fn nearest_other_country(
    point: GeoPoint,
    origin: &str,
    borders: &CountryBorders,
    max_km: f64,
) -> Option<(String, f64)> {
    let mut closest: Option<(&str, f64)> = None;

    for country in borders.candidates_within(point, max_km) {
        if country.name == origin {
            continue;
        }
        let Some(d) = boundary_distance_km(point, &country.perimeter) else {
            continue;
        };
        if d > max_km {
            continue;
        }
        if closest.map_or(true, |(_, best)| d < best) {
            closest = Some((country.name.as_str(), d));
        }
    }

    closest.map(|(name, d)| (name.to_string(), d))
}

/// Populate `country_to` where a second country is close enough.
///
/// Checkpoints are never removed here; a miss only leaves `country_to`
/// unset.
pub fn assign_country_to(
    mut checkpoints: Vec<Checkpoint>,
    borders: &CountryBorders,
    max_km: f64,
) -> (Vec<Checkpoint>, StageReport) {
    let mut report = StageReport::new("country-pair assignment", checkpoints.len());

    checkpoints.par_iter_mut().for_each(|cp| {
        cp.country_to = cp.coordinate().and_then(|point| {
            nearest_other_country(point, &cp.country_match, borders, max_km).map(|(name, _)| name)
        });
    });

    for cp in &checkpoints {
        match &cp.country_to {
            Some(to) => debug!(
                "Checkpoint {} ({}): {} -> {}",
                cp.id(),
                cp.name().unwrap_or("Unnamed"),
                cp.country_match,
                to
            ),
            None => {
                debug!(
                    "Checkpoint {} ({}): no second country within {} km",
                    cp.id(),
                    cp.name().unwrap_or("Unnamed"),
                    max_km
                );
                report.incomplete += 1;
            }
        }
    }

    report.output = checkpoints.len();
    info!("{}", report);
    (checkpoints, report)
}
