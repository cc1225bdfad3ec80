//! Gate linking and deduplication.

mod dedup;
mod index;
mod link;

pub use dedup::dedup_gates;
pub use index::{GateIndex, IndexedGate};
pub use link::link_gates;
