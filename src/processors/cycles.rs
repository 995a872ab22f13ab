//! Grouping of normalized samples into per-cycle records.

use crate::core::loaders::RawSample;
use crate::core::records::CycleRecord;

use super::capacity::{integrate_capacity, Polarity};
use super::normalize::normalize_cycle_index;

/// Build per-cycle records from one battery's time-sorted samples.
///
/// Raw cycle indices are normalized first, then samples are grouped by
/// maximal runs of equal normalized index (the normalized sequence is
/// non-decreasing, so each distinct value is one contiguous run). Each group
/// yields a [`CycleRecord`] with both capacity integrations; `cycle_number`
/// is the 0-based enumeration order of the groups, later reassigned by the
/// outlier filter.
///
/// Pure function of the input rows.
///
/// # Arguments
///
/// * `samples` - One battery's measurement rows, sorted by elapsed time
///
/// # Returns
///
/// One record per distinct normalized cycle index, in time order.
pub fn build_cycles(samples: &[RawSample]) -> Vec<CycleRecord> {
    if samples.is_empty() {
        return Vec::new();
    }

    let raw_indices: Vec<i64> = samples.iter().map(|s| s.cycle_index).collect();
    let normalized = normalize_cycle_index(&raw_indices);

    let mut cycles = Vec::new();
    let mut start = 0;

    for end in 1..=samples.len() {
        let run_ends = end == samples.len() || normalized[end] != normalized[start];
        if !run_ends {
            continue;
        }

        let group = &samples[start..end];
        let current: Vec<f64> = group.iter().map(|s| s.current_a).collect();
        let time: Vec<f64> = group.iter().map(|s| s.test_time_s).collect();
        let voltage: Vec<f64> = group.iter().map(|s| s.voltage_v).collect();

        let charge = integrate_capacity(&current, &time, Polarity::Charge);
        let discharge = integrate_capacity(&current, &time, Polarity::Discharge);

        cycles.push(CycleRecord {
            cycle_number: cycles.len() as u32,
            voltage_in_v: voltage,
            current_in_a: current,
            time_in_s: time,
            charge_capacity_in_ah: charge,
            discharge_capacity_in_ah: discharge,
        });

        start = end;
    }

    cycles
}
