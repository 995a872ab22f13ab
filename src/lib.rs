//! Battery cycler data preprocessing pipeline.
//!
//! This crate provides tools for:
//! - Loading raw cycler measurement CSVs and grouping rows per battery
//! - Normalizing noisy cycle indices into consecutive sequences
//! - Integrating per-cycle charge/discharge capacity from current samples
//! - Rejecting outlier cycles with a median-filter + MAD threshold
//! - Persisting one normalized JSON record per physical battery
//!
//! # Example
//!
//! ```no_run
//! use cycler_pipeline::config::PipelineConfig;
//! use cycler_pipeline::core::writers::JsonRecordSink;
//! use cycler_pipeline::processors::pipeline::process_directory;
//! use std::path::Path;
//!
//! let config = PipelineConfig::default();
//! let sink = JsonRecordSink::new("processed").unwrap();
//! let summary =
//!     process_directory(Path::new("raw_data"), &sink, &sink, &config, None).unwrap();
//! println!("processed {} batteries", summary.processed);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{BatteryConfig, ColumnsConfig, OutlierConfig, PipelineConfig};
pub use core::records::{BatteryRecord, CycleRecord};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
