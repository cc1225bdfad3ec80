//! Gate linking: attach nearby gates to each checkpoint.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::GateIndex;
use crate::error::CurateError;
use crate::geodesy::{geodesic_km, round_to, EARTH_RADIUS_KM};
use crate::models::{Checkpoint, CheckpointGates, LinkedGate};
use crate::stages::StageReport;

/// Link every gate within `radius_km` to each checkpoint.
///
/// Candidates come from a spherical radius query; the recorded distance is
/// the geodesic one rounded to 3 decimals, so a gate right at the radius
/// may show a distance marginally above it. Gates are listed nearest
/// first. A gate can still be linked to several checkpoints here.
pub fn link_gates(
    checkpoints: &[Checkpoint],
    index: &GateIndex,
    radius_km: f64,
) -> (Vec<CheckpointGates>, StageReport) {
    let mut report = StageReport::new("gate linking", checkpoints.len());
    let angle = radius_km / EARTH_RADIUS_KM;

    let linked: Vec<Option<CheckpointGates>> = checkpoints
        .par_iter()
        .map(|cp| {
            let center = cp.coordinate()?;

            let mut gates: Vec<LinkedGate> = index
                .within(center, angle)
                .into_iter()
                .map(|i| {
                    let gate = index.gate(i);
                    LinkedGate {
                        id: gate.element.id,
                        osm_type: gate.element.osm_type,
                        lat: gate.position.lat,
                        lon: gate.position.lon,
                        tags: gate.element.tags.clone(),
                        distance_to_checkpoint_km: round_to(geodesic_km(center, gate.position), 3),
                    }
                })
                .collect();
            gates.sort_by(|a, b| {
                a.distance_to_checkpoint_km
                    .total_cmp(&b.distance_to_checkpoint_km)
                    .then(a.id.cmp(&b.id))
            });

            Some(CheckpointGates {
                checkpoint_id: cp.id(),
                checkpoint_name: cp.name().unwrap_or("Unknown").to_string(),
                checkpoint_lat: center.lat,
                checkpoint_lon: center.lon,
                gates,
            })
        })
        .collect();

    let mut result = Vec::with_capacity(linked.len());
    for (cp, entry) in checkpoints.iter().zip(linked) {
        match entry {
            Some(entry) => {
                debug!("Checkpoint {}: {} gates linked", entry.checkpoint_id, entry.gates.len());
                if entry.gates.is_empty() {
                    report.incomplete += 1;
                }
                result.push(entry);
            }
            None => {
                warn!("Skipping: {}", CurateError::MissingCoordinate { id: cp.id() });
                report.dropped += 1;
            }
        }
    }

    report.output = result.len();
    info!("{}", report);
    (result, report)
}
