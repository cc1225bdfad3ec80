//! The curation stages. Each one is a pure transformation of an in-memory
//! record collection; file handling lives in [`crate::pipeline`].

pub mod cluster;
pub mod country_pair;
pub mod gates;
pub mod proximity;

pub use cluster::cluster_checkpoints;
pub use country_pair::assign_country_to;
pub use gates::{dedup_gates, link_gates, GateIndex};
pub use proximity::filter_by_proximity;

use std::fmt;

/// Record counts of a finished stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub stage: &'static str,
    pub input: usize,
    pub output: usize,
    /// Records removed by the stage (rejected, merged or unusable)
    pub dropped: usize,
    /// Records kept with a field left unset
    pub incomplete: usize,
}

impl StageReport {
    pub fn new(stage: &'static str, input: usize) -> Self {
        Self {
            stage,
            input,
            output: 0,
            dropped: 0,
            incomplete: 0,
        }
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} in, {} out, {} dropped",
            self.stage, self.input, self.output, self.dropped
        )?;
        if self.incomplete > 0 {
            write!(f, ", {} incomplete", self.incomplete)?;
        }
        Ok(())
    }
}
