//! Command-line interface for the cycler pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "cycler-pipeline")]
#[command(about = "Battery cycler data preprocessing pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a directory of cycler CSVs into per-battery records
    Process {
        /// Directory containing cycler CSV files
        input_dir: PathBuf,
        /// Output directory for battery record JSON files
        output_dir: PathBuf,
        /// Limit number of files to process
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print a summary of one processed battery record
    Inspect {
        /// Battery record JSON file
        record_file: PathBuf,
    },

    /// Plot a battery's capacity-fade curve as PNG
    Plot {
        /// Battery record JSON file
        record_file: PathBuf,
        /// Output PNG file path (defaults to same name with .png extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    ShowConfig {
        /// Write the YAML to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Process {
            input_dir,
            output_dir,
            limit,
        } => {
            cmd_process(&input_dir, &output_dir, limit, &config);
        }
        Commands::Inspect { record_file } => {
            cmd_inspect(&record_file);
        }
        Commands::Plot {
            record_file,
            output,
        } => {
            cmd_plot(&record_file, output);
        }
        Commands::ShowConfig { output } => {
            cmd_show_config(output, &config);
        }
    }
}

fn cmd_process(
    input_dir: &PathBuf,
    output_dir: &PathBuf,
    limit: Option<usize>,
    config: &PipelineConfig,
) {
    use crate::core::writers::JsonRecordSink;
    use crate::processors::pipeline;

    let start = Instant::now();

    println!("Processing cycler data...");
    println!("Input directory: {}", input_dir.display());
    println!("Output directory: {}", output_dir.display());

    if let Some(lim) = limit {
        println!("Processing limit: {} files", lim);
    }

    let sink = match JsonRecordSink::new(output_dir) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to prepare output directory: {}", e);
            std::process::exit(1);
        }
    };

    match pipeline::process_directory(input_dir, &sink, &sink, config, limit) {
        Ok(summary) => {
            print_summary(
                "Processing Complete",
                &[
                    ("Input directory", input_dir.display().to_string()),
                    ("Output directory", output_dir.display().to_string()),
                    ("Processed", summary.processed.to_string()),
                    ("Skipped", summary.skipped.to_string()),
                    ("No valid data", summary.no_valid_data.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            error!("Processing failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_inspect(record_file: &PathBuf) {
    use crate::core::writers::read_battery_record;

    let spinner = create_spinner("Loading battery record...");

    let record = match read_battery_record(record_file) {
        Ok(r) => r,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load record: {}", e);
            std::process::exit(1);
        }
    };

    spinner.finish_and_clear();

    let peaks = record.peak_discharge_capacities();
    let first_peak = peaks.first().copied().unwrap_or(0.0);
    let last_peak = peaks.last().copied().unwrap_or(0.0);
    let retention = if first_peak > 0.0 {
        100.0 * last_peak / first_peak
    } else {
        0.0
    };

    print_summary(
        "Battery Record",
        &[
            ("Cell ID", record.cell_id.clone()),
            ("Cycles", record.num_cycles().to_string()),
            (
                "Nominal capacity",
                format!("{:.4} Ah", record.nominal_capacity_in_ah),
            ),
            (
                "Voltage limits",
                format!(
                    "{:.2} - {:.2} V",
                    record.min_voltage_limit_in_v, record.max_voltage_limit_in_v
                ),
            ),
            ("First peak", format!("{:.4} Ah", first_peak)),
            ("Last peak", format!("{:.4} Ah", last_peak)),
            ("Retention", format!("{:.1} %", retention)),
            ("Form factor", record.form_factor.clone()),
        ],
    );
}

fn cmd_plot(record_file: &PathBuf, output: Option<PathBuf>) {
    use crate::core::writers::read_battery_record;
    use crate::visualization;

    let start = Instant::now();

    // Default to the record's name with a .png extension
    let output_path = output.unwrap_or_else(|| {
        let mut path = record_file.clone();
        path.set_extension("png");
        path
    });

    println!("Plotting capacity fade...");
    println!("Input: {}", record_file.display());
    println!("Output: {}", output_path.display());

    let spinner = create_spinner("Loading battery record...");

    let record = match read_battery_record(record_file) {
        Ok(r) => r,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load record: {}", e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Generating plot...");

    match visualization::plot_capacity_fade(&output_path, &record) {
        Ok(()) => {
            spinner.finish_and_clear();

            print_summary(
                "Plot Complete",
                &[
                    ("Input file", record_file.display().to_string()),
                    ("Output PNG", output_path.display().to_string()),
                    ("Cycles plotted", record.num_cycles().to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Plotting failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_show_config(output: Option<PathBuf>, config: &PipelineConfig) {
    match output {
        Some(path) => match config.to_yaml(&path) {
            Ok(()) => println!("Config written to {}", path.display()),
            Err(e) => {
                error!("Failed to write config: {}", e);
                std::process::exit(1);
            }
        },
        None => match serde_yaml::to_string(config) {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => {
                error!("Failed to serialize config: {}", e);
                std::process::exit(1);
            }
        },
    }
}
