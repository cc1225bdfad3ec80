//! Gate deduplication: give each gate to a single checkpoint.
//!
//! A gate claimed by several checkpoints stays with the one it is nearest
//! to (the earliest checkpoint on equal distance) and is removed from the
//! others. This is a per-gate choice; it does not balance gates across
//! checkpoints and is not a global optimal matching.

use hashbrown::{HashMap, HashSet};
use tracing::{debug, info};

use crate::models::CheckpointGates;
use crate::stages::StageReport;

/// Resolve gates linked to more than one checkpoint.
///
/// `dropped` in the report counts removed gate links.
pub fn dedup_gates(mut linked: Vec<CheckpointGates>) -> (Vec<CheckpointGates>, StageReport) {
    let mut report = StageReport::new("gate deduplication", linked.len());

    // gate id -> (checkpoint position, distance), in checkpoint order
    let mut claims: HashMap<i64, Vec<(usize, f64)>> = HashMap::new();
    for (idx, cp) in linked.iter().enumerate() {
        for gate in &cp.gates {
            claims
                .entry(gate.id)
                .or_default()
                .push((idx, gate.distance_to_checkpoint_km));
        }
    }

    let mut losers: HashSet<(usize, i64)> = HashSet::new();
    for (gate_id, refs) in &claims {
        if refs.len() <= 1 {
            continue;
        }

        let mut winner = refs[0];
        for &r in &refs[1..] {
            if r.1 < winner.1 {
                winner = r;
            }
        }

        debug!(
            "Gate {} claimed by {} checkpoints, kept by {}",
            gate_id,
            refs.len(),
            linked[winner.0].checkpoint_id
        );
        for &(idx, _) in refs {
            if idx != winner.0 {
                losers.insert((idx, *gate_id));
            }
        }
    }

    let mut removed = 0;
    for (idx, cp) in linked.iter_mut().enumerate() {
        let before = cp.gates.len();
        cp.gates.retain(|g| !losers.contains(&(idx, g.id)));
        removed += before - cp.gates.len();
    }

    report.output = linked.len();
    report.dropped = removed;
    report.incomplete = linked.iter().filter(|cp| cp.gates.is_empty()).count();
    info!("{}", report);
    (linked, report)
}
