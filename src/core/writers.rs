//! Persistence and skip/resume collaborators.
//!
//! This module defines the two capabilities the batch driver is injected
//! with: a [`RecordSink`] that durably stores one [`BatteryRecord`] under a
//! key derived from its cell id, and a [`SkipIndex`] that answers whether a
//! cell was already processed in a prior run. The JSON directory sink
//! implements both, so re-runs resume where they left off; an in-memory
//! index backs tests and alternative deployments.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::records::BatteryRecord;

/// Errors that can occur while persisting or reading records.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create the output directory.
    #[error("failed to create output directory '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open a record file.
    #[error("failed to open record file '{path}': {source}")]
    OpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization or deserialization error.
    #[error("JSON error for '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Accepts one battery record and durably stores it.
///
/// Implementations must support concurrent independent stores: the driver
/// fans out across battery groups, and distinct cell ids never alias.
pub trait RecordSink: Send + Sync {
    /// Store one record under a key derived from its cell identifier.
    fn store(&self, record: &BatteryRecord) -> Result<()>;
}

/// Reports whether a battery was already processed in a prior run.
///
/// The driver honors a positive answer by skipping recomputation entirely.
pub trait SkipIndex: Send + Sync {
    /// True if a record for `cell_id` already exists.
    fn contains(&self, cell_id: &str) -> bool;
}

/// Directory-backed JSON sink: one `<cell_id>.json` file per battery.
#[derive(Debug, Clone)]
pub struct JsonRecordSink {
    output_dir: PathBuf,
}

impl JsonRecordSink {
    /// Create a sink rooted at `output_dir`, creating the directory if
    /// needed.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir).map_err(|e| WriteError::CreateDirectory {
            path: output_dir.display().to_string(),
            source: e,
        })?;
        Ok(Self { output_dir })
    }

    /// Path under which a cell's record is stored.
    pub fn record_path(&self, cell_id: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", cell_id))
    }
}

impl RecordSink for JsonRecordSink {
    fn store(&self, record: &BatteryRecord) -> Result<()> {
        let path = self.record_path(&record.cell_id);
        let file = File::create(&path).map_err(|e| WriteError::OpenFile {
            path: path.display().to_string(),
            source: e,
        })?;
        let writer = BufWriter::new(file);

        serde_json::to_writer(writer, record).map_err(|e| WriteError::Json {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }
}

impl SkipIndex for JsonRecordSink {
    fn contains(&self, cell_id: &str) -> bool {
        self.record_path(cell_id).is_file()
    }
}

/// In-memory skip index over a fixed set of cell ids.
#[derive(Debug, Default, Clone)]
pub struct MemorySkipIndex {
    cells: HashSet<String>,
}

impl MemorySkipIndex {
    /// Create an index marking the given cell ids as already processed.
    pub fn new<I, S>(cell_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cell_ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl SkipIndex for MemorySkipIndex {
    fn contains(&self, cell_id: &str) -> bool {
        self.cells.contains(cell_id)
    }
}

/// Read one battery record back from a JSON file.
///
/// Round-trip counterpart of [`JsonRecordSink::store`], used by the
/// `inspect` and `plot` commands.
pub fn read_battery_record<P: AsRef<Path>>(path: P) -> Result<BatteryRecord> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| WriteError::OpenFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|e| WriteError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::CycleRecord;
    use tempfile::TempDir;

    fn test_record(cell_id: &str) -> BatteryRecord {
        BatteryRecord {
            cell_id: cell_id.to_string(),
            form_factor: "unknown".to_string(),
            anode_material: "unknown".to_string(),
            cathode_material: "unknown".to_string(),
            nominal_capacity_in_ah: 2.0,
            max_voltage_limit_in_v: 4.2,
            min_voltage_limit_in_v: 2.7,
            soc_interval: [0.0, 1.0],
            cycle_data: vec![CycleRecord {
                cycle_number: 1,
                voltage_in_v: vec![3.6, 3.4],
                current_in_a: vec![-2.0, -2.0],
                time_in_s: vec![0.0, 3600.0],
                charge_capacity_in_ah: vec![0.0, 0.0],
                discharge_capacity_in_ah: vec![0.0, 2.0],
            }],
        }
    }

    #[test]
    fn test_store_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let sink = JsonRecordSink::new(dir.path()).unwrap();
        let record = test_record("CSV_Battery_1");

        sink.store(&record).unwrap();

        let path = sink.record_path("CSV_Battery_1");
        assert!(path.exists());

        let loaded = read_battery_record(&path).unwrap();
        assert_eq!(loaded.cell_id, "CSV_Battery_1");
        assert_eq!(loaded.num_cycles(), 1);
        assert_eq!(loaded.cycle_data[0].discharge_capacity_in_ah, vec![0.0, 2.0]);
    }

    #[test]
    fn test_sink_is_its_own_skip_index() {
        let dir = TempDir::new().unwrap();
        let sink = JsonRecordSink::new(dir.path()).unwrap();

        assert!(!sink.contains("CSV_Battery_1"));
        sink.store(&test_record("CSV_Battery_1")).unwrap();
        assert!(sink.contains("CSV_Battery_1"));
        assert!(!sink.contains("CSV_Battery_2"));
    }

    #[test]
    fn test_sink_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out").join("records");

        let sink = JsonRecordSink::new(&nested).unwrap();
        assert!(nested.is_dir());

        sink.store(&test_record("CSV_Battery_3")).unwrap();
        assert!(nested.join("CSV_Battery_3.json").exists());
    }

    #[test]
    fn test_memory_skip_index() {
        let index = MemorySkipIndex::new(["CSV_Battery_1", "CSV_Battery_2"]);
        assert!(index.contains("CSV_Battery_1"));
        assert!(!index.contains("CSV_Battery_9"));
    }

    #[test]
    fn test_read_missing_record() {
        let dir = TempDir::new().unwrap();
        let result = read_battery_record(dir.path().join("absent.json"));
        assert!(matches!(result, Err(WriteError::OpenFile { .. })));
    }
}
