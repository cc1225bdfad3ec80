//! Error taxonomy for the curation pipeline.
//!
//! Per-element variants (`MalformedGeometry`, `MissingCoordinate`) are
//! logged where they occur and never abort a stage. File variants are fatal
//! to the stage that hit them.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CurateError {
    #[error("malformed boundary geometry for {country}: {reason}")]
    MalformedGeometry { country: String, reason: String },

    #[error("element {id} has no coordinate")]
    MissingCoordinate { id: i64 },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to export rows to {path}")]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, CurateError>;
