//! Record types exchanged between the curation stages.

pub mod checkpoint;
pub mod element;

pub use checkpoint::{Checkpoint, CheckpointGates, CheckpointRow, LinkedGate};
pub use element::{BoundaryRelation, Element, GeoPoint, MemberPoint, OsmType, RelationMember, Tags};
