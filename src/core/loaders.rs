//! Data loaders for battery cycler CSV files.
//!
//! This module is the source-format adapter: it parses tabular cycler
//! exports into [`RawSample`] rows and groups them per battery. The
//! processors downstream only ever see ordered sample sequences, so other
//! cycler formats can plug in by producing the same rows.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

use crate::config::ColumnsConfig;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Missing required columns: {0}")]
    MissingColumns(String),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// One raw measurement row from a cycler export.
///
/// No ordering invariant holds until the per-battery time sort; raw cycle
/// indices need not be consecutive or monotonic.
#[derive(Debug, Clone)]
pub struct RawSample {
    /// Battery identifier, verbatim from the source column.
    pub battery_id: String,
    /// Raw cycle index as emitted by the cycler.
    pub cycle_index: i64,
    /// Elapsed test time in seconds.
    pub test_time_s: f64,
    /// Current in amperes (positive = charge, negative = discharge).
    pub current_a: f64,
    /// Voltage in volts.
    pub voltage_v: f64,
}

/// Resolved column positions for one CSV file's header.
struct ColumnIndices {
    battery_id: usize,
    cycle_index: usize,
    test_time: usize,
    current: usize,
    voltage: usize,
}

impl ColumnIndices {
    fn resolve(headers: &csv::StringRecord, columns: &ColumnsConfig) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let lookups = [
            (find(&columns.battery_id), &columns.battery_id),
            (find(&columns.cycle_index), &columns.cycle_index),
            (find(&columns.test_time), &columns.test_time),
            (find(&columns.current), &columns.current),
            (find(&columns.voltage), &columns.voltage),
        ];

        let missing: Vec<String> = lookups
            .iter()
            .filter(|(idx, _)| idx.is_none())
            .map(|(_, name)| (*name).clone())
            .collect();

        if !missing.is_empty() {
            return Err(LoaderError::MissingColumns(missing.join(", ")));
        }

        Ok(Self {
            battery_id: lookups[0].0.unwrap_or(0),
            cycle_index: lookups[1].0.unwrap_or(0),
            test_time: lookups[2].0.unwrap_or(0),
            current: lookups[3].0.unwrap_or(0),
            voltage: lookups[4].0.unwrap_or(0),
        })
    }

    fn span(&self) -> usize {
        [
            self.battery_id,
            self.cycle_index,
            self.test_time,
            self.current,
            self.voltage,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

/// Load cycler measurement rows from a CSV file.
///
/// The expected format is one header row naming the columns configured in
/// [`ColumnsConfig`], followed by one measurement per row. Rows shorter than
/// the resolved column span are skipped; unparseable numeric fields default
/// to 0.
///
/// # Arguments
///
/// * `path` - Path to the cycler CSV file
/// * `columns` - Column-name mapping for this source
///
/// # Returns
///
/// All measurement rows in file order.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the header lacks a required
/// column, or no data rows are present.
pub fn load_cycler_csv<P: AsRef<Path>>(path: P, columns: &ColumnsConfig) -> Result<Vec<RawSample>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let indices = ColumnIndices::resolve(&headers, columns)?;
    let min_len = indices.span();

    let mut samples = Vec::with_capacity(4096);

    for result in reader.records() {
        let record = result?;

        if record.len() < min_len {
            continue;
        }

        let parse_f64 = |idx: usize| {
            record
                .get(idx)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or(0.0)
        };

        let battery_id = record
            .get(indices.battery_id)
            .unwrap_or_default()
            .trim()
            .to_string();

        samples.push(RawSample {
            battery_id,
            cycle_index: parse_f64(indices.cycle_index) as i64,
            test_time_s: parse_f64(indices.test_time),
            current_a: parse_f64(indices.current),
            voltage_v: parse_f64(indices.voltage),
        });
    }

    if samples.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(samples)
}

/// Group measurement rows by battery identifier.
///
/// One input file may interleave multiple batteries; the returned map keys
/// them in deterministic (sorted) order so repeated runs process groups in
/// the same sequence. Row order within each group is preserved.
pub fn group_by_battery(samples: Vec<RawSample>) -> BTreeMap<String, Vec<RawSample>> {
    let mut groups: BTreeMap<String, Vec<RawSample>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(sample.battery_id.clone())
            .or_default()
            .push(sample);
    }
    groups
}

/// Sort one battery's rows by elapsed test time, in place.
///
/// The sort is stable so rows sharing a timestamp keep their file order.
pub fn sort_by_time(samples: &mut [RawSample]) {
    samples.sort_by(|a, b| a.test_time_s.total_cmp(&b.test_time_s));
}

/// List the CSV files in a directory, sorted by path.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn find_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut csv_files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();

    csv_files.sort();
    Ok(csv_files)
}
