//! Configuration types for the cycler pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column-name mapping for the cycler CSV source.
///
/// Other cycler exports can be ingested by overriding these names; the
/// processors never see column names, only parsed sample rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    /// Battery identifier column
    #[serde(default = "default_battery_id_column")]
    pub battery_id: String,

    /// Raw cycle index column
    #[serde(default = "default_cycle_index_column")]
    pub cycle_index: String,

    /// Elapsed test time column, in seconds
    #[serde(default = "default_test_time_column")]
    pub test_time: String,

    /// Current column, in amperes
    #[serde(default = "default_current_column")]
    pub current: String,

    /// Voltage column, in volts
    #[serde(default = "default_voltage_column")]
    pub voltage: String,
}

fn default_battery_id_column() -> String {
    "Battery_ID".to_string()
}

fn default_cycle_index_column() -> String {
    "Cycle_Index".to_string()
}

fn default_test_time_column() -> String {
    "Test_Time(s)".to_string()
}

fn default_current_column() -> String {
    "Current(A)".to_string()
}

fn default_voltage_column() -> String {
    "Voltage(V)".to_string()
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            battery_id: default_battery_id_column(),
            cycle_index: default_cycle_index_column(),
            test_time: default_test_time_column(),
            current: default_current_column(),
            voltage: default_voltage_column(),
        }
    }
}

/// Parameters for the outlier-cycle filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Median-filter window for batteries with at least this many cycles
    #[serde(default = "default_median_window")]
    pub median_window: usize,

    /// Fallback window for short cycle sequences
    #[serde(default = "default_fallback_window")]
    pub fallback_window: usize,

    /// Multiple of the MAD threshold a cycle may deviate before rejection
    #[serde(default = "default_deviation_multiplier")]
    pub deviation_multiplier: f64,

    /// Hard floor on peak discharge capacity in Ah (strict comparison)
    #[serde(default = "default_min_peak_capacity")]
    pub min_peak_capacity_ah: f64,
}

fn default_median_window() -> usize {
    21
}

fn default_fallback_window() -> usize {
    5
}

fn default_deviation_multiplier() -> f64 {
    3.0
}

fn default_min_peak_capacity() -> f64 {
    0.1
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            median_window: default_median_window(),
            fallback_window: default_fallback_window(),
            deviation_multiplier: default_deviation_multiplier(),
            min_peak_capacity_ah: default_min_peak_capacity(),
        }
    }
}

/// Nominal-capacity estimation and default record metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryConfig {
    /// How many early clean cycles feed the nominal capacity estimate
    #[serde(default = "default_nominal_capacity_cycles")]
    pub nominal_capacity_cycles: usize,

    /// Nominal capacity in Ah when no cycles are available
    #[serde(default = "default_nominal_capacity")]
    pub default_nominal_capacity_ah: f64,

    /// Upper voltage operating limit in volts
    #[serde(default = "default_max_voltage_limit")]
    pub max_voltage_limit_v: f64,

    /// Lower voltage operating limit in volts
    #[serde(default = "default_min_voltage_limit")]
    pub min_voltage_limit_v: f64,

    /// Form factor recorded when not derivable from the source
    #[serde(default = "default_unknown")]
    pub form_factor: String,

    /// Anode material recorded when not derivable from the source
    #[serde(default = "default_unknown")]
    pub anode_material: String,

    /// Cathode material recorded when not derivable from the source
    #[serde(default = "default_unknown")]
    pub cathode_material: String,
}

fn default_nominal_capacity_cycles() -> usize {
    5
}

fn default_nominal_capacity() -> f64 {
    1.0
}

fn default_max_voltage_limit() -> f64 {
    4.2
}

fn default_min_voltage_limit() -> f64 {
    2.7
}

fn default_unknown() -> String {
    "unknown".to_string()
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            nominal_capacity_cycles: default_nominal_capacity_cycles(),
            default_nominal_capacity_ah: default_nominal_capacity(),
            max_voltage_limit_v: default_max_voltage_limit(),
            min_voltage_limit_v: default_min_voltage_limit(),
            form_factor: default_unknown(),
            anode_material: default_unknown(),
            cathode_material: default_unknown(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub columns: ColumnsConfig,

    #[serde(default)]
    pub outliers: OutlierConfig,

    #[serde(default)]
    pub battery: BatteryConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_columns_config() {
        let config = ColumnsConfig::default();
        assert_eq!(config.battery_id, "Battery_ID");
        assert_eq!(config.test_time, "Test_Time(s)");
    }

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.outliers.median_window, 21);
        assert_eq!(config.outliers.min_peak_capacity_ah, 0.1);
        assert_eq!(config.battery.nominal_capacity_cycles, 5);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "outliers:\n  median_window: 11\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.outliers.median_window, 11);
        assert_eq!(config.outliers.fallback_window, 5);
        assert_eq!(config.columns.current, "Current(A)");
    }
}
