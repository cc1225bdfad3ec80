//! File-to-file stage runners.
//!
//! Each stage reads its whole input snapshot, transforms it in memory and
//! writes its whole output snapshot. A failed stage leaves its previous
//! output untouched and can simply be rerun.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::borders::{build_country_borders, BuildOptions, CountryBorders};
use crate::config::Config;
use crate::models::{BoundaryRelation, Checkpoint, CheckpointGates, CheckpointRow, Element};
use crate::records::{read_elements, read_records, write_elements, write_records, write_rows_csv};
use crate::stages::{
    assign_country_to, cluster_checkpoints, dedup_gates, filter_by_proximity, link_gates,
    GateIndex, StageReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Filter,
    Cluster,
    Assign,
    LinkGates,
    DedupGates,
    Export,
}

impl Stage {
    /// Stages of a full run, in order
    pub const PIPELINE: [Stage; 5] = [
        Stage::Filter,
        Stage::Cluster,
        Stage::Assign,
        Stage::LinkGates,
        Stage::DedupGates,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Filter => "filter",
            Stage::Cluster => "cluster",
            Stage::Assign => "assign",
            Stage::LinkGates => "link-gates",
            Stage::DedupGates => "dedup-gates",
            Stage::Export => "export",
        }
    }
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn path(&self, file: &Path) -> PathBuf {
        self.config.paths.resolve(file)
    }

    /// Build the country boundaries from the borders snapshot
    pub fn load_borders(&self) -> Result<CountryBorders> {
        let path = self.path(&self.config.paths.borders);
        info!("Loading country borders from {}", path.display());
        let relations: Vec<BoundaryRelation> =
            read_elements(&path).context("Failed to load country borders")?;

        let options = BuildOptions {
            merge_outer_ways: self.config.borders.merge_outer_ways,
        };
        let borders = build_country_borders(&relations, options);
        if borders.is_empty() {
            warn!("No usable country boundaries in {}", path.display());
        }
        Ok(borders)
    }

    /// Run one stage. Stages that need boundaries build them when none are
    /// passed in.
    pub fn run_stage(&self, stage: Stage, borders: Option<&CountryBorders>) -> Result<StageReport> {
        let report = match stage {
            Stage::Filter => self.with_borders(borders, |b| self.filter(b)),
            Stage::Cluster => self.cluster(),
            Stage::Assign => self.with_borders(borders, |b| self.assign(b)),
            Stage::LinkGates => self.link_gates(),
            Stage::DedupGates => self.dedup_gates(),
            Stage::Export => self.export_rows(),
        };
        report.with_context(|| format!("Stage {} failed", stage.name()))
    }

    fn with_borders<F>(&self, borders: Option<&CountryBorders>, run: F) -> Result<StageReport>
    where
        F: FnOnce(&CountryBorders) -> Result<StageReport>,
    {
        match borders {
            Some(borders) => run(borders),
            None => run(&self.load_borders()?),
        }
    }

    /// Stages 2 through 5, building the boundaries once
    pub fn run_all(&self) -> Result<Vec<StageReport>> {
        let borders = self.load_borders()?;
        Stage::PIPELINE
            .iter()
            .map(|&stage| self.run_stage(stage, Some(&borders)))
            .collect()
    }

    pub fn filter(&self, borders: &CountryBorders) -> Result<StageReport> {
        let paths = &self.config.paths;
        let elements: Vec<Element> = read_elements(&self.path(&paths.checkpoints_raw))?;
        let (filtered, report) =
            filter_by_proximity(elements, borders, self.config.thresholds.max_distance_km);
        write_elements(&self.path(&paths.checkpoints_filtered), &filtered)?;
        Ok(report)
    }

    pub fn cluster(&self) -> Result<StageReport> {
        let paths = &self.config.paths;
        let checkpoints: Vec<Checkpoint> = read_elements(&self.path(&paths.checkpoints_filtered))?;
        let (clustered, report) =
            cluster_checkpoints(checkpoints, self.config.thresholds.cluster_radius_km);
        write_elements(&self.path(&paths.checkpoints_clustered), &clustered)?;
        Ok(report)
    }

    pub fn assign(&self, borders: &CountryBorders) -> Result<StageReport> {
        let paths = &self.config.paths;
        let checkpoints: Vec<Checkpoint> =
            read_elements(&self.path(&paths.checkpoints_clustered))?;
        let (assigned, report) =
            assign_country_to(checkpoints, borders, self.config.thresholds.country_to_max_km);
        write_elements(&self.path(&paths.checkpoints_final), &assigned)?;
        Ok(report)
    }

    pub fn link_gates(&self) -> Result<StageReport> {
        let paths = &self.config.paths;
        let checkpoints: Vec<Checkpoint> = read_elements(&self.path(&paths.checkpoints_final))?;
        let gates: Vec<Element> = read_elements(&self.path(&paths.gates_raw))?;
        let index = GateIndex::build(gates);
        let (linked, report) =
            link_gates(&checkpoints, &index, self.config.thresholds.gate_radius_km);
        write_records(&self.path(&paths.gates_linked), &linked)?;
        Ok(report)
    }

    pub fn dedup_gates(&self) -> Result<StageReport> {
        let paths = &self.config.paths;
        let linked: Vec<CheckpointGates> = read_records(&self.path(&paths.gates_linked))?;
        let (deduped, report) = dedup_gates(linked);
        write_records(&self.path(&paths.gates_linked_dedup), &deduped)?;
        Ok(report)
    }

    /// Storage rows for the live service's import
    pub fn export_rows(&self) -> Result<StageReport> {
        let paths = &self.config.paths;
        let checkpoints: Vec<Checkpoint> = read_elements(&self.path(&paths.checkpoints_final))?;
        let mut report = StageReport::new("row export", checkpoints.len());

        let rows: Vec<CheckpointRow> = checkpoints
            .iter()
            .filter_map(|cp| {
                let row = CheckpointRow::from_checkpoint(cp);
                if row.is_none() {
                    warn!("Checkpoint {} has no coordinate, not exported", cp.id());
                }
                row
            })
            .collect();

        write_rows_csv(&self.path(&paths.rows_csv), &rows)?;
        report.output = rows.len();
        report.dropped = report.input - report.output;
        info!("{}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;

    /// Alpha covers 30..31E, Beta 31..32E, both 47.5..48.5N. Beta also has a
    /// degenerate outer member that must be ignored, and Gamma is malformed.
    const BORDERS: &str = r#"{"elements": [
        {"type": "relation", "id": 1, "tags": {"name": "Alpha", "admin_level": "2"},
         "members": [
            {"type": "way", "ref": 11, "role": "outer", "geometry": [
                {"lat": 47.5, "lon": 30.0}, {"lat": 47.5, "lon": 31.0},
                {"lat": 48.5, "lon": 31.0}, {"lat": 48.5, "lon": 30.0}, {"lat": 47.5, "lon": 30.0}]},
            {"type": "node", "ref": 12, "role": "admin_centre", "lat": 48.0, "lon": 30.5}
         ]},
        {"type": "relation", "id": 2, "tags": {"name": "Beta", "admin_level": "2"},
         "members": [
            {"type": "way", "ref": 21, "role": "outer", "geometry": [
                {"lat": 47.5, "lon": 31.0}, {"lat": 47.5, "lon": 32.0},
                {"lat": 48.5, "lon": 32.0}, {"lat": 48.5, "lon": 31.0}]},
            {"type": "way", "ref": 22, "role": "outer", "geometry": [
                {"lat": 40.0, "lon": 40.0}, {"lat": 40.1, "lon": 40.1}]}
         ]},
        {"type": "relation", "id": 3, "tags": {"name": "Gamma"},
         "members": [
            {"type": "way", "ref": 31, "role": "outer", "geometry": [
                {"lat": 10.0, "lon": 10.0}, {"lat": 10.0, "lon": 10.0}, {"lat": 10.0, "lon": 10.0}]}
         ]}
    ]}"#;

    /// Two near-duplicates by the Alpha/Beta line, a separate post 1.1 km
    /// north of them, one far inland, one without coordinates
    const CHECKPOINTS: &str = r#"{"elements": [
        {"id": 101, "type": "node", "lat": 48.0000, "lon": 30.9950, "tags": {"barrier": "border_control"}},
        {"id": 102, "type": "node", "lat": 48.0050, "lon": 30.9960,
         "tags": {"barrier": "border_control", "name": "Checkpoint West"}},
        {"id": 106, "type": "node", "lat": 48.0150, "lon": 30.9960,
         "tags": {"barrier": "border_control", "name": "Checkpoint North"}},
        {"id": 103, "type": "node", "lat": 48.0000, "lon": 30.5000, "tags": {"name": "Inland"}},
        {"id": 104, "type": "way", "tags": {"name": "Nowhere"}},
        {"id": 105, "type": "way", "center": {"lat": 47.7000, "lon": 31.0030},
         "tags": {"government": "customs", "name": "South Post"}}
    ]}"#;

    /// Gate 201 is within reach of 102 (0.33 km) and 106 (0.78 km); 204 is
    /// only near 106, 202 only near 105, 203 near nothing. 201 is listed
    /// twice as it would be by overlapping tile fetches.
    const GATES: &str = r#"{"elements": [
        {"id": 201, "type": "node", "lat": 48.0080, "lon": 30.9960, "tags": {"barrier": "lift_gate"}},
        {"id": 202, "type": "node", "lat": 47.7010, "lon": 31.0030, "tags": {"barrier": "lift_gate"}},
        {"id": 203, "type": "node", "lat": 45.0000, "lon": 25.0000, "tags": {"barrier": "lift_gate"}},
        {"id": 204, "type": "node", "lat": 48.0160, "lon": 30.9960, "tags": {"barrier": "lift_gate"}},
        {"id": 201, "type": "node", "lat": 48.0080, "lon": 30.9960, "tags": {"barrier": "lift_gate"}}
    ]}"#;

    fn pipeline_in(dir: &Path) -> Pipeline {
        std::fs::write(dir.join("osm_country_borders.json"), BORDERS).unwrap();
        std::fs::write(dir.join("osm_checkpoints_raw.json"), CHECKPOINTS).unwrap();
        std::fs::write(dir.join("osm_gates_raw.json"), GATES).unwrap();

        let mut config = Config::default();
        config.paths = PathsConfig {
            data_dir: dir.to_path_buf(),
            ..PathsConfig::default()
        };
        Pipeline::new(config)
    }

    #[test]
    fn test_full_run() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());

        let reports = pipeline.run_all().unwrap();
        let names: Vec<&str> = reports.iter().map(|r| r.stage).collect();
        assert_eq!(
            names,
            vec![
                "proximity filter",
                "duplicate clustering",
                "country-pair assignment",
                "gate linking",
                "gate deduplication"
            ]
        );

        // Stage 2: 101, 102, 106 and 105 survive
        let filtered: Vec<Checkpoint> =
            read_elements(&dir.path().join("osm_checkpoints_filtered.json")).unwrap();
        let ids: Vec<i64> = filtered.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![101, 102, 106, 105]);
        assert!(filtered.iter().all(|c| c.distance_to_border_km <= 5.0));
        assert!(filtered.iter().all(|c| c.country_match == "Alpha"));

        // Stage 3: the unnamed 101 collapses into "Checkpoint West"
        let clustered: Vec<Checkpoint> =
            read_elements(&dir.path().join("osm_checkpoints_clustered.json")).unwrap();
        let names: Vec<Option<&str>> = clustered.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![Some("Checkpoint West"), Some("Checkpoint North"), Some("South Post")]
        );
        assert_eq!(clustered[0].distance_to_border_km, filtered[1].distance_to_border_km);

        // Stage 4: the destination is the neighbour
        let finals: Vec<Checkpoint> =
            read_elements(&dir.path().join("osm_checkpoints_final.json")).unwrap();
        assert!(finals.iter().all(|c| c.country_to.as_deref() == Some("Beta")));

        // Stage 5A: 201 is linked to both neighbours
        let gate_ids = |linked: &[CheckpointGates]| -> Vec<Vec<i64>> {
            linked
                .iter()
                .map(|cp| cp.gates.iter().map(|g| g.id).collect())
                .collect()
        };
        let linked: Vec<CheckpointGates> =
            read_records(&dir.path().join("osm_gates_linked.json")).unwrap();
        assert_eq!(gate_ids(&linked), vec![vec![201], vec![204, 201], vec![202]]);

        // Stage 5B: every gate has at most one owner, the nearest
        let deduped: Vec<CheckpointGates> =
            read_records(&dir.path().join("osm_gates_linked_deduplicated.json")).unwrap();
        assert_eq!(gate_ids(&deduped), vec![vec![201], vec![204], vec![202]]);
        assert_eq!(deduped[0].checkpoint_id, 102);

        // Export is not part of a full run
        assert!(!dir.path().join("checkpoints_rows.csv").exists());
        let export = pipeline.run_stage(Stage::Export, None).unwrap();
        assert_eq!(export.output, 3);
        let csv = std::fs::read_to_string(dir.path().join("checkpoints_rows.csv")).unwrap();
        assert!(csv.contains("Checkpoint West,48.005,30.996,Alpha,Beta"));
    }

    #[test]
    fn test_single_stage_loads_borders() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());
        let report = pipeline.run_stage(Stage::Filter, None).unwrap();
        assert_eq!(report.input, 6);
        assert_eq!(report.output, 4);
        assert_eq!(report.dropped, 2);
    }

    #[test]
    fn test_missing_input_fails_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());
        let err = pipeline.run_stage(Stage::Cluster, None).unwrap_err();
        assert!(format!("{:#}", err).contains("Stage cluster failed"));
        assert!(!dir.path().join("osm_checkpoints_clustered.json").exists());
    }

    #[test]
    fn test_dedup_rerun_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());
        pipeline.run_all().unwrap();

        let first = std::fs::read_to_string(dir.path().join("osm_gates_linked_deduplicated.json"))
            .unwrap();
        pipeline.run_stage(Stage::DedupGates, None).unwrap();
        let second = std::fs::read_to_string(dir.path().join("osm_gates_linked_deduplicated.json"))
            .unwrap();
        assert_eq!(first, second);
    }
}
