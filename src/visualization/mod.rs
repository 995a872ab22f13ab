//! Visualization tools for processed battery records.
//!
//! This module renders the capacity-fade curve of one battery (peak
//! discharge capacity versus cycle number) as a PNG using the plotters
//! library.

use std::path::Path;

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::core::records::BatteryRecord;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Record has no cycles")]
    EmptyRecord,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Default plot width in pixels.
const DEFAULT_WIDTH: u32 = 1280;

/// Default plot height in pixels.
const DEFAULT_HEIGHT: u32 = 720;

/// Line/point color for the fade curve.
const CURVE_COLOR: (u8, u8, u8) = (55, 126, 184);

/// Horizontal guide color for the nominal capacity.
const NOMINAL_COLOR: (u8, u8, u8) = (228, 26, 28);

/// Plot a battery's capacity-fade curve and save it as PNG.
///
/// Draws peak discharge capacity against cycle number, plus a horizontal
/// guide at the record's nominal capacity estimate. No text is rendered so
/// the plot works without fonts installed.
///
/// # Arguments
///
/// * `output_path` - Path to save the PNG image
/// * `record` - The battery record to visualize
pub fn plot_capacity_fade(output_path: &Path, record: &BatteryRecord) -> Result<()> {
    if record.cycle_data.is_empty() {
        return Err(VisualizationError::EmptyRecord);
    }

    let peaks = record.peak_discharge_capacities();
    let points: Vec<(f32, f32)> = record
        .cycle_data
        .iter()
        .zip(peaks.iter())
        .map(|(cycle, &peak)| (cycle.cycle_number as f32, peak as f32))
        .collect();

    let (x_min, x_max, y_min, y_max) = compute_bounds(&points, record.nominal_capacity_in_ah as f32);
    let x_padding = (x_max - x_min) * 0.05;
    let y_padding = (y_max - y_min) * 0.05;

    let root = BitMapBackend::new(output_path, (DEFAULT_WIDTH, DEFAULT_HEIGHT)).into_drawing_area();

    root.fill(&WHITE)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(
            (x_min - x_padding)..(x_max + x_padding),
            (y_min - y_padding)..(y_max + y_padding),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .draw()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let nominal = record.nominal_capacity_in_ah as f32;
    let guide = RGBColor(NOMINAL_COLOR.0, NOMINAL_COLOR.1, NOMINAL_COLOR.2);
    chart
        .draw_series(LineSeries::new(
            vec![(x_min - x_padding, nominal), (x_max + x_padding, nominal)],
            guide.stroke_width(1),
        ))
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let curve = RGBColor(CURVE_COLOR.0, CURVE_COLOR.1, CURVE_COLOR.2);
    chart
        .draw_series(LineSeries::new(points.clone(), curve.stroke_width(2)))
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, curve.filled())),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    root.present()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}

/// Compute the bounds (min/max) for cycle numbers and capacities.
fn compute_bounds(points: &[(f32, f32)], nominal: f32) -> (f32, f32, f32, f32) {
    let mut x_min = f32::MAX;
    let mut x_max = f32::MIN;
    let mut y_min = nominal;
    let mut y_max = nominal;

    for &(x, y) in points {
        if x < x_min {
            x_min = x;
        }
        if x > x_max {
            x_max = x;
        }
        if y < y_min {
            y_min = y;
        }
        if y > y_max {
            y_max = y;
        }
    }

    if (x_max - x_min).abs() < f32::EPSILON {
        x_min -= 1.0;
        x_max += 1.0;
    }
    if (y_max - y_min).abs() < f32::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }

    (x_min, x_max, y_min, y_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::CycleRecord;
    use tempfile::TempDir;

    fn record_with_peaks(peaks: &[f64]) -> BatteryRecord {
        BatteryRecord {
            cell_id: "CSV_Battery_1".to_string(),
            form_factor: "unknown".to_string(),
            anode_material: "unknown".to_string(),
            cathode_material: "unknown".to_string(),
            nominal_capacity_in_ah: 2.0,
            max_voltage_limit_in_v: 4.2,
            min_voltage_limit_in_v: 2.7,
            soc_interval: [0.0, 1.0],
            cycle_data: peaks
                .iter()
                .enumerate()
                .map(|(i, &p)| CycleRecord {
                    cycle_number: i as u32 + 1,
                    voltage_in_v: vec![3.6, 3.4],
                    current_in_a: vec![0.0, -p],
                    time_in_s: vec![0.0, 3600.0],
                    charge_capacity_in_ah: vec![0.0, 0.0],
                    discharge_capacity_in_ah: vec![0.0, p],
                })
                .collect(),
        }
    }

    #[test]
    fn test_plot_capacity_fade_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fade.png");
        let record = record_with_peaks(&[2.0, 1.95, 1.9, 1.85]);

        plot_capacity_fade(&path, &record).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_plot_empty_record_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fade.png");
        let record = record_with_peaks(&[]);

        let result = plot_capacity_fade(&path, &record);
        assert!(matches!(result, Err(VisualizationError::EmptyRecord)));
    }

    #[test]
    fn test_compute_bounds_degenerate_range() {
        let points = vec![(1.0, 2.0)];
        let (x_min, x_max, y_min, y_max) = compute_bounds(&points, 2.0);
        assert!(x_max > x_min);
        assert!(y_max > y_min);
    }
}
