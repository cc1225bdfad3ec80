//! Snapshot files exchanged between stages.
//!
//! Checkpoint, gate and boundary snapshots use the Overpass envelope
//! `{ "elements": [...] }`; the linked-gate sets are a bare JSON array.
//! Files ending in `.gz` are read and written gzip-compressed.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{CurateError, Result};
use crate::models::CheckpointRow;

#[derive(Deserialize)]
struct EnvelopeIn {
    #[serde(default = "Vec::new")]
    elements: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct EnvelopeOut<'a, T> {
    elements: &'a [T],
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == "gz")
}

fn open(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|source| CurateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

fn read_value<T: DeserializeOwned>(path: &Path) -> Result<T> {
    serde_json::from_reader(open(path)?).map_err(|source| CurateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_value<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let write_err = |source: std::io::Error| CurateError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let file = File::create(path).map_err(write_err)?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer_pretty(&mut encoder, value).map_err(|e| write_err(e.into()))?;
        encoder.finish().map_err(write_err)?.flush().map_err(write_err)?;
    } else {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|e| write_err(e.into()))?;
        writer.flush().map_err(write_err)?;
    }
    Ok(())
}

/// Decode each record on its own so one bad record never sinks the file.
fn decode_each<T: DeserializeOwned>(path: &Path, values: Vec<serde_json::Value>) -> Vec<T> {
    let total = values.len();
    let records: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping record {} of {}: {}", i, path.display(), e);
                None
            }
        })
        .collect();
    debug!("Read {}/{} records from {}", records.len(), total, path.display());
    records
}

/// Read the elements of an Overpass-style snapshot.
///
/// A missing `elements` key reads as an empty snapshot.
pub fn read_elements<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let envelope: EnvelopeIn = read_value(path)?;
    Ok(decode_each(path, envelope.elements))
}

pub fn write_elements<T: Serialize>(path: &Path, elements: &[T]) -> Result<()> {
    write_value(path, &EnvelopeOut { elements })
}

/// Read a bare JSON array of records
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let values: Vec<serde_json::Value> = read_value(path)?;
    Ok(decode_each(path, values))
}

pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    write_value(path, records)
}

/// Write storage rows as CSV with a header line
pub fn write_rows_csv(path: &Path, rows: &[CheckpointRow]) -> Result<()> {
    let export_err = |source: csv::Error| CurateError::Export {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CurateError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(export_err)?;
    for row in rows {
        writer.serialize(row).map_err(export_err)?;
    }
    writer.flush().map_err(|source| CurateError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Checkpoint, Element};

    #[test]
    fn test_elements_round_trip_plain_and_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let elements = vec![
            Element::node(1, 48.0, 30.0).with_tag("name", "West"),
            Element::node(2, 48.1, 30.1),
        ];

        for file in ["snap.json", "nested/snap.json.gz"] {
            let path = dir.path().join(file);
            write_elements(&path, &elements).unwrap();
            let back: Vec<Element> = read_elements(&path).unwrap();
            assert_eq!(back, elements);
        }
    }

    #[test]
    fn test_bad_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.json");
        std::fs::write(
            &path,
            r#"{"version": 0.6, "elements": [
                {"id": 1, "type": "node", "lat": 1.0, "lon": 2.0},
                {"type": "node", "lat": 1.0},
                {"id": 3, "type": "way", "center": {"lat": 3.0, "lon": 4.0}}
            ]}"#,
        )
        .unwrap();

        let elements: Vec<Element> = read_elements(&path).unwrap();
        let ids: Vec<i64> = elements.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_missing_elements_key_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, r#"{"remark": "runtime error"}"#).unwrap();
        let elements: Vec<Element> = read_elements(&path).unwrap();
        assert!(elements.is_empty());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = read_elements::<Element>(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(CurateError::Read { .. })));

        let garbled = dir.path().join("garbled.json");
        std::fs::write(&garbled, "{ not json").unwrap();
        assert!(matches!(
            read_elements::<Element>(&garbled),
            Err(CurateError::Parse { .. })
        ));
    }

    #[test]
    fn test_rows_csv_has_header_and_empty_country_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let cp = Checkpoint::new(
            Element::node(1, 48.0, 30.0).with_tag("name", "West"),
            0.5,
            "Alpha".to_string(),
        );
        let row = CheckpointRow::from_checkpoint(&cp).unwrap();
        write_rows_csv(&path, &[row]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("name,lat,lon,country_from,country_to"));
        assert_eq!(lines.next(), Some("West,48.0,30.0,Alpha,"));
    }
}
