//! Batch driver: directories to persisted battery records.
//!
//! One invocation walks a directory of cycler CSV files, groups rows per
//! battery, runs the per-battery transformation pipeline and persists one
//! record per physical battery. Failures are absorbed at the smallest
//! meaningful unit (one file, one battery group) and the batch continues.

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::core::loaders::{self, RawSample};
use crate::core::records::BatteryRecord;
use crate::core::writers::{RecordSink, SkipIndex};

use super::assemble::assemble_battery;
use super::cycles::build_cycles;
use super::outliers::{filter_cycles, OutlierError};

/// Counters for one batch run.
///
/// Batteries whose cycle data is empty or fully rejected land in
/// `no_valid_data`: they are neither processed nor skipped-as-duplicate,
/// and re-running the batch will attempt them again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Batteries successfully processed and persisted.
    pub processed: usize,
    /// Batteries skipped because a prior run already persisted them.
    pub skipped: usize,
    /// Batteries dropped for lack of usable cycle data.
    pub no_valid_data: usize,
}

impl ProcessSummary {
    /// The (processed, skipped) pair; batteries without usable data
    /// appear in neither bucket.
    pub fn counts(&self) -> (usize, usize) {
        (self.processed, self.skipped)
    }
}

impl std::ops::Add for ProcessSummary {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            processed: self.processed + other.processed,
            skipped: self.skipped + other.skipped,
            no_valid_data: self.no_valid_data + other.no_valid_data,
        }
    }
}

/// Output key for one battery identifier.
pub fn cell_id_for(battery_id: &str) -> String {
    format!("CSV_Battery_{}", battery_id)
}

/// Run the transformation pipeline for one battery group.
///
/// Sorts the rows by elapsed time, normalizes cycle indices, integrates
/// capacities, rejects outlier cycles and assembles the final record.
///
/// # Errors
///
/// Returns an error when the battery has no usable cycle data; callers skip
/// the battery without emitting a record.
pub fn process_battery(
    cell_id: &str,
    mut rows: Vec<RawSample>,
    config: &PipelineConfig,
) -> std::result::Result<BatteryRecord, OutlierError> {
    loaders::sort_by_time(&mut rows);
    let cycles = build_cycles(&rows);
    let clean = filter_cycles(cycles, &config.outliers)?;
    Ok(assemble_battery(cell_id, clean, &config.battery))
}

/// Process every battery group found in one CSV file.
///
/// Groups are processed independently and in parallel; each battery either
/// increments exactly one summary counter or is logged and dropped (store
/// failure). The sink only sees records for batteries the skip index did
/// not already contain.
pub fn process_file(
    path: &Path,
    sink: &dyn RecordSink,
    index: &dyn SkipIndex,
    config: &PipelineConfig,
) -> Result<ProcessSummary> {
    let samples = loaders::load_cycler_csv(path, &config.columns)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let groups: Vec<(String, Vec<RawSample>)> =
        loaders::group_by_battery(samples).into_iter().collect();

    let summary = groups
        .into_par_iter()
        .map(|(battery_id, rows)| {
            let cell_id = cell_id_for(&battery_id);

            if index.contains(&cell_id) {
                info!("skipping already processed battery {}", cell_id);
                return ProcessSummary {
                    skipped: 1,
                    ..Default::default()
                };
            }

            match process_battery(&cell_id, rows, config) {
                Ok(record) => match sink.store(&record) {
                    Ok(()) => {
                        info!(
                            "stored {} ({} cycles, nominal {:.3} Ah)",
                            record.cell_id,
                            record.num_cycles(),
                            record.nominal_capacity_in_ah
                        );
                        ProcessSummary {
                            processed: 1,
                            ..Default::default()
                        }
                    }
                    Err(e) => {
                        error!("failed to store {}: {}", cell_id, e);
                        ProcessSummary::default()
                    }
                },
                Err(e) => {
                    warn!("no usable cycle data for {}: {}", cell_id, e);
                    ProcessSummary {
                        no_valid_data: 1,
                        ..Default::default()
                    }
                }
            }
        })
        .reduce(ProcessSummary::default, |a, b| a + b);

    Ok(summary)
}

/// Process a directory of cycler CSV files.
///
/// Files are visited in sorted order with a progress bar. An unreadable
/// file is logged and skipped; a missing directory is a directory-level
/// error and processes nothing.
///
/// # Arguments
///
/// * `input_dir` - Directory containing cycler CSV files
/// * `sink` - Persistence collaborator receiving one record per battery
/// * `index` - Skip/resume collaborator consulted before recomputation
/// * `config` - Pipeline configuration
/// * `limit` - Maximum number of files to process (None for all)
pub fn process_directory(
    input_dir: &Path,
    sink: &dyn RecordSink,
    index: &dyn SkipIndex,
    config: &PipelineConfig,
    limit: Option<usize>,
) -> Result<ProcessSummary> {
    let files = loaders::find_csv_files(input_dir)
        .with_context(|| format!("failed to read input directory {}", input_dir.display()))?;

    if files.is_empty() {
        warn!("no CSV files found in {}", input_dir.display());
        return Ok(ProcessSummary::default());
    }

    let count = limit.unwrap_or(files.len()).min(files.len());
    let files = &files[..count];
    info!("found {} CSV files to process", files.len());

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.green/white} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut summary = ProcessSummary::default();

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        progress.set_message(name);

        match process_file(path, sink, index, config) {
            Ok(file_summary) => summary = summary + file_summary,
            Err(e) => error!("skipping file {}: {:#}", path.display(), e),
        }

        progress.inc(1);
    }

    progress.finish_and_clear();
    Ok(summary)
}
