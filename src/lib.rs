//! Borderpost - border checkpoint curation from raw map survey data
//!
//! This library turns raw checkpoint, boundary and barrier snapshots into a
//! de-duplicated set of border checkpoints, each with the pair of countries
//! it connects and the gates that belong to it.

pub mod borders;
pub mod config;
pub mod error;
pub mod geodesy;
pub mod models;
pub mod pipeline;
pub mod records;
pub mod stages;

pub use error::CurateError;
pub use models::{Checkpoint, CheckpointGates, Element, GeoPoint, OsmType};
pub use pipeline::{Pipeline, Stage};
