//! Final per-battery record assembly.

use crate::config::BatteryConfig;
use crate::core::records::{BatteryRecord, CycleRecord};

/// Package the cleaned, renumbered cycle list into a [`BatteryRecord`].
///
/// Nominal capacity is estimated as the arithmetic mean of the first few
/// surviving cycles' peak discharge capacity (the configured count, or fewer
/// when fewer exist). Voltage limits, SOC interval and material metadata
/// come from the configured defaults; the source format carries no
/// physical/chemical metadata of its own.
///
/// # Arguments
///
/// * `cell_id` - Unique cell identifier for the output record
/// * `cycles` - Cleaned cycles, already renumbered 1..K
/// * `config` - Estimation parameters and default metadata
pub fn assemble_battery(
    cell_id: &str,
    cycles: Vec<CycleRecord>,
    config: &BatteryConfig,
) -> BatteryRecord {
    let initial_peaks: Vec<f64> = cycles
        .iter()
        .take(config.nominal_capacity_cycles)
        .map(CycleRecord::peak_discharge_capacity)
        .collect();

    let nominal_capacity = if initial_peaks.is_empty() {
        config.default_nominal_capacity_ah
    } else {
        initial_peaks.iter().sum::<f64>() / initial_peaks.len() as f64
    };

    BatteryRecord {
        cell_id: cell_id.to_string(),
        form_factor: config.form_factor.clone(),
        anode_material: config.anode_material.clone(),
        cathode_material: config.cathode_material.clone(),
        nominal_capacity_in_ah: nominal_capacity,
        max_voltage_limit_in_v: config.max_voltage_limit_v,
        min_voltage_limit_in_v: config.min_voltage_limit_v,
        soc_interval: [0.0, 1.0],
        cycle_data: cycles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(number: u32, peak: f64) -> CycleRecord {
        CycleRecord {
            cycle_number: number,
            voltage_in_v: vec![3.7, 3.5],
            current_in_a: vec![0.0, -peak],
            time_in_s: vec![0.0, 3600.0],
            charge_capacity_in_ah: vec![0.0, 0.0],
            discharge_capacity_in_ah: vec![0.0, peak],
        }
    }

    #[test]
    fn test_nominal_capacity_mean_of_first_five() {
        let cycles: Vec<CycleRecord> = [2.0, 1.9, 1.8, 1.7, 1.6, 1.0, 0.5]
            .iter()
            .enumerate()
            .map(|(i, &p)| cycle(i as u32 + 1, p))
            .collect();

        let battery = assemble_battery("CSV_Battery_1", cycles, &BatteryConfig::default());
        assert!((battery.nominal_capacity_in_ah - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_nominal_capacity_fewer_than_five() {
        let cycles = vec![cycle(1, 2.0), cycle(2, 1.0)];

        let battery = assemble_battery("CSV_Battery_1", cycles, &BatteryConfig::default());
        assert!((battery.nominal_capacity_in_ah - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_default_metadata_and_limits() {
        let battery = assemble_battery("CSV_Battery_9", vec![cycle(1, 1.2)], &BatteryConfig::default());

        assert_eq!(battery.cell_id, "CSV_Battery_9");
        assert_eq!(battery.form_factor, "unknown");
        assert_eq!(battery.anode_material, "unknown");
        assert_eq!(battery.cathode_material, "unknown");
        assert_eq!(battery.max_voltage_limit_in_v, 4.2);
        assert_eq!(battery.min_voltage_limit_in_v, 2.7);
        assert_eq!(battery.soc_interval, [0.0, 1.0]);
    }

    #[test]
    fn test_no_cycles_falls_back_to_default_capacity() {
        let battery = assemble_battery("CSV_Battery_1", Vec::new(), &BatteryConfig::default());
        assert_eq!(battery.nominal_capacity_in_ah, 1.0);
    }
}
