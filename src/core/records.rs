//! Normalized per-battery record types.
//!
//! A [`BatteryRecord`] is the unit of output: one physical battery with its
//! cleaned cycle list and metadata. Each [`CycleRecord`] carries the raw
//! signals of one charge/discharge cycle plus the integrated capacity
//! sequences.

use serde::{Deserialize, Serialize};

/// One charge/discharge cycle of a battery.
///
/// The five sequences share identical length and index alignment: sample `i`
/// of every sequence refers to the same measurement row. Capacity sequences
/// are non-negative and non-decreasing within the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    /// Cycle number, reassigned to 1..K after outlier filtering.
    pub cycle_number: u32,
    /// Voltage samples in volts.
    pub voltage_in_v: Vec<f64>,
    /// Current samples in amperes (positive = charge, negative = discharge).
    pub current_in_a: Vec<f64>,
    /// Elapsed test time samples in seconds.
    pub time_in_s: Vec<f64>,
    /// Cumulative charge capacity in ampere-hours.
    pub charge_capacity_in_ah: Vec<f64>,
    /// Cumulative discharge capacity in ampere-hours.
    pub discharge_capacity_in_ah: Vec<f64>,
}

impl CycleRecord {
    /// Returns the number of samples in this cycle.
    #[inline]
    pub fn len(&self) -> usize {
        self.time_in_s.len()
    }

    /// Returns true if the cycle holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time_in_s.is_empty()
    }

    /// Maximum value of the discharge-capacity sequence, or 0.0 when the
    /// sequence is empty. Used as the cycle's scalar health indicator.
    pub fn peak_discharge_capacity(&self) -> f64 {
        if self.discharge_capacity_in_ah.is_empty() {
            0.0
        } else {
            self.discharge_capacity_in_ah
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max)
        }
    }
}

/// One physical battery: metadata plus its cleaned, renumbered cycles.
///
/// Constructed once per battery group, immutable afterward, persisted to the
/// output sink and then dropped. Cycle numbers are consecutive starting at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryRecord {
    /// Unique cell identifier (e.g. `CSV_Battery_7`).
    pub cell_id: String,
    /// Physical form factor, `"unknown"` when not derivable from the source.
    pub form_factor: String,
    /// Anode material, `"unknown"` when not derivable from the source.
    pub anode_material: String,
    /// Cathode material, `"unknown"` when not derivable from the source.
    pub cathode_material: String,
    /// Nominal capacity estimate in ampere-hours, from early clean cycles.
    pub nominal_capacity_in_ah: f64,
    /// Upper voltage operating limit in volts.
    pub max_voltage_limit_in_v: f64,
    /// Lower voltage operating limit in volts.
    pub min_voltage_limit_in_v: f64,
    /// State-of-charge interval covered by the cycles.
    pub soc_interval: [f64; 2],
    /// Cleaned cycles, numbered 1..K in original relative order.
    pub cycle_data: Vec<CycleRecord>,
}

impl BatteryRecord {
    /// Returns the number of cycles in this record.
    #[inline]
    pub fn num_cycles(&self) -> usize {
        self.cycle_data.len()
    }

    /// Peak discharge capacities of all cycles, in cycle order.
    pub fn peak_discharge_capacities(&self) -> Vec<f64> {
        self.cycle_data
            .iter()
            .map(CycleRecord::peak_discharge_capacity)
            .collect()
    }
}
