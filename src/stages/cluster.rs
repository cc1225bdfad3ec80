//! Duplicate clustering: collapse checkpoints that describe the same crossing.
//!
//! Clusters are stars around an anchor: every member is within the radius
//! of the anchor, but two members are not necessarily within the radius of
//! each other, and membership is not chained transitively.

use tracing::{debug, info, warn};

use super::StageReport;
use crate::error::CurateError;
use crate::geodesy::geodesic_km;
use crate::models::{Checkpoint, GeoPoint};

/// Indices of the unclaimed checkpoints that join the cluster anchored at
/// `anchor`, anchor first, in input order. Joined indices are marked in
/// `claimed`.
pub fn form_cluster(
    anchor: usize,
    checkpoints: &[Checkpoint],
    positions: &[Option<GeoPoint>],
    claimed: &mut [bool],
    radius_km: f64,
) -> Vec<usize> {
    let mut members = vec![anchor];
    claimed[anchor] = true;

    let Some(anchor_pos) = positions[anchor] else {
        return members;
    };
    let country = &checkpoints[anchor].country_match;

    for j in (anchor + 1)..checkpoints.len() {
        if claimed[j] {
            continue;
        }
        let Some(pos) = positions[j] else {
            continue;
        };
        if checkpoints[j].country_match != *country {
            continue;
        }
        if geodesic_km(anchor_pos, pos) <= radius_km {
            claimed[j] = true;
            members.push(j);
        }
    }

    members
}

/// The member with the longest name; the earliest one on ties.
pub fn pick_representative(checkpoints: &[Checkpoint], members: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for &i in members {
        let len = checkpoints[i].element.name_len();
        match best {
            Some((_, best_len)) if len <= best_len => {}
            _ => best = Some((i, len)),
        }
    }
    best.map(|(i, _)| i)
}

/// Collapse near-duplicate checkpoints of the same country.
///
/// Anchors are taken in input order; one representative is emitted per
/// cluster, in anchor order. Records without a coordinate are dropped.
pub fn cluster_checkpoints(
    checkpoints: Vec<Checkpoint>,
    radius_km: f64,
) -> (Vec<Checkpoint>, StageReport) {
    let mut report = StageReport::new("duplicate clustering", checkpoints.len());

    let positions: Vec<Option<GeoPoint>> = checkpoints.iter().map(|c| c.coordinate()).collect();
    let mut claimed = vec![false; checkpoints.len()];
    let mut chosen = Vec::new();

    for i in 0..checkpoints.len() {
        if claimed[i] {
            continue;
        }
        if positions[i].is_none() {
            warn!("Skipping: {}", CurateError::MissingCoordinate { id: checkpoints[i].id() });
            continue;
        }

        let members = form_cluster(i, &checkpoints, &positions, &mut claimed, radius_km);
        let Some(rep) = pick_representative(&checkpoints, &members) else {
            continue;
        };

        if members.len() > 1 {
            debug!(
                "Cluster at checkpoint {} ({}) has {} members, keeping {} ({})",
                checkpoints[i].id(),
                checkpoints[i].name().unwrap_or(""),
                members.len(),
                checkpoints[rep].id(),
                checkpoints[rep].name().unwrap_or("")
            );
        }
        chosen.push(rep);
    }

    let mut slots: Vec<Option<Checkpoint>> = checkpoints.into_iter().map(Some).collect();
    let clustered: Vec<Checkpoint> = chosen.into_iter().filter_map(|i| slots[i].take()).collect();

    report.output = clustered.len();
    report.dropped = report.input - report.output;
    info!("{}", report);
    (clustered, report)
}
