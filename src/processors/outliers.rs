//! Outlier-cycle rejection based on discharge-capacity drift.
//!
//! Cyclers occasionally emit a spurious short or aborted cycle with
//! anomalously low or high apparent capacity. A local median trend plus a
//! MAD-style threshold tolerates gradual capacity fade while rejecting
//! abrupt single-cycle excursions.

use log::debug;
use thiserror::Error;

use crate::config::OutlierConfig;
use crate::core::records::CycleRecord;

/// Errors that mark a battery as having no usable cycle data.
#[derive(Error, Debug)]
pub enum OutlierError {
    #[error("no cycles with discharge data")]
    NoCycles,

    #[error("no clean cycles remain after filtering ({total} rejected)")]
    AllRejected { total: usize },
}

/// Median filter with zero padding outside the input bounds.
///
/// For each position the window of `window` values centered on it is
/// collected, positions outside the input contribute 0.0, and the middle
/// element of the sorted window is taken. `window` must be odd; a window of
/// 1 is the identity.
///
/// # Arguments
///
/// * `values` - Input sequence
/// * `window` - Odd window size
///
/// # Returns
///
/// The smoothed sequence, same length as the input.
pub fn median_filter(values: &[f64], window: usize) -> Vec<f64> {
    debug_assert!(window % 2 == 1, "window must be odd");

    let half = window / 2;
    let n = values.len();
    let mut smoothed = Vec::with_capacity(n);
    let mut buf = vec![0.0; window];

    for i in 0..n {
        for (j, slot) in buf.iter_mut().enumerate() {
            let idx = i as isize + j as isize - half as isize;
            *slot = if idx >= 0 && (idx as usize) < n {
                values[idx as usize]
            } else {
                0.0
            };
        }
        buf.sort_by(f64::total_cmp);
        smoothed.push(buf[half]);
    }

    smoothed
}

/// Median of a sequence, averaging the two middle elements for even lengths.
///
/// Returns 0.0 for an empty input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Effective median-filter window for a battery with `num_cycles` cycles.
///
/// The full window applies when enough cycles exist; short sequences fall
/// back to the smaller of the fallback window and the cycle count, clamped
/// down to the nearest odd value (minimum 1).
fn effective_window(num_cycles: usize, config: &OutlierConfig) -> usize {
    let window = if num_cycles >= config.median_window {
        config.median_window
    } else {
        num_cycles.min(config.fallback_window)
    };

    let window = if window % 2 == 0 { window - 1 } else { window };
    window.max(1)
}

/// Remove anomalous cycles and renumber the survivors from 1.
///
/// Each cycle's peak discharge capacity is compared against a median-filter
/// smoothed reference; the rejection threshold is the median absolute
/// deviation from that trend. A cycle survives iff its deviation is
/// strictly below `deviation_multiplier` times the threshold AND its peak
/// is strictly above the capacity floor. Survivors keep their original
/// relative order and are renumbered 1..K.
///
/// With very few cycles the threshold degenerates (a single cycle always
/// yields threshold 0 and is rejected by the strict comparison); this
/// small-sample behavior is intentional and preserved.
///
/// # Arguments
///
/// * `cycles` - Cycle records in time order
/// * `config` - Window sizes, deviation multiplier and capacity floor
///
/// # Errors
///
/// Returns an error when no cycles were supplied or none survive; callers
/// skip the battery in both cases.
pub fn filter_cycles(
    cycles: Vec<CycleRecord>,
    config: &OutlierConfig,
) -> Result<Vec<CycleRecord>, OutlierError> {
    let peaks: Vec<f64> = cycles
        .iter()
        .map(CycleRecord::peak_discharge_capacity)
        .collect();

    if peaks.is_empty() {
        return Err(OutlierError::NoCycles);
    }

    let window = effective_window(peaks.len(), config);
    let smoothed = median_filter(&peaks, window);

    let deviations: Vec<f64> = peaks
        .iter()
        .zip(smoothed.iter())
        .map(|(p, s)| (p - s).abs())
        .collect();
    let threshold = median(&deviations);

    debug!(
        "outlier filter: {} cycles, window {}, threshold {:.6}",
        peaks.len(),
        window,
        threshold
    );

    let total = cycles.len();
    let mut survivors = Vec::with_capacity(total);
    let mut index: u32 = 0;

    for (i, mut cycle) in cycles.into_iter().enumerate() {
        let keep = deviations[i] < config.deviation_multiplier * threshold
            && peaks[i] > config.min_peak_capacity_ah;
        if keep {
            index += 1;
            cycle.cycle_number = index;
            survivors.push(cycle);
        }
    }

    if survivors.is_empty() {
        return Err(OutlierError::AllRejected { total });
    }

    Ok(survivors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle_with_peak(peak: f64) -> CycleRecord {
        CycleRecord {
            cycle_number: 0,
            voltage_in_v: vec![3.7, 3.5],
            current_in_a: vec![0.0, -peak],
            time_in_s: vec![0.0, 3600.0],
            charge_capacity_in_ah: vec![0.0, 0.0],
            discharge_capacity_in_ah: vec![0.0, peak],
        }
    }

    fn cycles_with_peaks(peaks: &[f64]) -> Vec<CycleRecord> {
        peaks.iter().map(|&p| cycle_with_peak(p)).collect()
    }

    #[test]
    fn test_median_filter_zero_padded() {
        // Reference values for a zero-padded centered window of 3.
        let smoothed = median_filter(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(smoothed, vec![1.0, 2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn test_median_filter_window_one_is_identity() {
        let values = vec![5.0, 1.0, 9.0];
        assert_eq!(median_filter(&values, 1), values);
    }

    #[test]
    fn test_median_even_length_averages_middle() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[3.0, 1.0]), 2.0);
    }

    #[test]
    fn test_median_odd_length() {
        assert_eq!(median(&[9.0, 1.0, 5.0]), 5.0);
    }

    #[test]
    fn test_effective_window_selection() {
        let config = OutlierConfig::default();
        assert_eq!(effective_window(30, &config), 21);
        assert_eq!(effective_window(21, &config), 21);
        assert_eq!(effective_window(20, &config), 5);
        assert_eq!(effective_window(7, &config), 5);
        assert_eq!(effective_window(5, &config), 5);
        assert_eq!(effective_window(4, &config), 3);
        assert_eq!(effective_window(3, &config), 3);
        assert_eq!(effective_window(2, &config), 1);
        assert_eq!(effective_window(1, &config), 1);
    }

    #[test]
    fn test_capacity_floor_is_strict() {
        // Near-constant battery hovering just above the floor, so every
        // deviation passes and only the floor decides. Exactly 0.1 Ah must
        // be rejected, slightly above retained.
        let mut peaks: Vec<f64> = (0..24).map(|i| 0.101 + 0.001 * (i % 2) as f64).collect();
        peaks[12] = 0.1;
        peaks[17] = 0.100001;

        let result = filter_cycles(cycles_with_peaks(&peaks), &OutlierConfig::default()).unwrap();
        assert_eq!(result.len(), 23);

        let kept: Vec<f64> = result
            .iter()
            .map(CycleRecord::peak_discharge_capacity)
            .collect();
        assert!(!kept.contains(&0.1));
        assert!(kept.contains(&0.100001));
    }

    #[test]
    fn test_survivors_renumbered_from_one() {
        // Plateau then gentle decline with one degenerate cycle; the other
        // 29 survive and are renumbered consecutively.
        let mut peaks: Vec<f64> = Vec::new();
        for i in 0..30 {
            if i < 10 {
                peaks.push(2.0);
            } else {
                peaks.push(2.0 - 0.5 * (i - 9) as f64 / 20.0);
            }
        }
        peaks[14] = 0.05;

        let result = filter_cycles(cycles_with_peaks(&peaks), &OutlierConfig::default()).unwrap();

        let numbers: Vec<u32> = result.iter().map(|c| c.cycle_number).collect();
        let expected: Vec<u32> = (1..=29).collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn test_spike_rejected_by_deviation() {
        // Plateau then gentle decline, with one degenerate and one spiked
        // cycle. Both anomalies must go; every other cycle stays.
        let mut peaks: Vec<f64> = Vec::new();
        for i in 0..30 {
            if i < 10 {
                peaks.push(2.0);
            } else {
                peaks.push(2.0 - 0.5 * (i - 9) as f64 / 20.0);
            }
        }
        peaks[14] = 0.05;
        peaks[19] = 4.0;

        let result = filter_cycles(cycles_with_peaks(&peaks), &OutlierConfig::default()).unwrap();
        assert_eq!(result.len(), 28);

        let kept: Vec<f64> = result
            .iter()
            .map(CycleRecord::peak_discharge_capacity)
            .collect();
        assert!(!kept.contains(&0.05));
        assert!(!kept.contains(&4.0));
    }

    #[test]
    fn test_empty_input_is_error() {
        let result = filter_cycles(Vec::new(), &OutlierConfig::default());
        assert!(matches!(result, Err(OutlierError::NoCycles)));
    }

    #[test]
    fn test_single_cycle_always_rejected() {
        // Threshold degenerates to 0 and the strict comparison rejects the
        // only cycle, whatever its capacity.
        let result = filter_cycles(cycles_with_peaks(&[1.5]), &OutlierConfig::default());
        assert!(matches!(
            result,
            Err(OutlierError::AllRejected { total: 1 })
        ));
    }
}
