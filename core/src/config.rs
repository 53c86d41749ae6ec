//! Planner configuration, loaded from `<data_dir>/planner.json`.
//!
//! Every field has a default, so a missing file (or a file that names
//! only some fields) is fine. A malformed file is an error.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "planner.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Calendar month (1 = January) in which the fiscal year starts.
    pub fiscal_year_start_month: u32,
    pub rag: RagThresholds,
    /// Quarters an estimate is spread across when its initiative has no dates.
    pub no_date_range_quarters: u32,
    pub contractor_expiry_window_days: i64,
    pub working_days_per_month: f64,
    pub working_days_per_year: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            fiscal_year_start_month: 7,
            rag: RagThresholds::default(),
            no_date_range_quarters: 4,
            contractor_expiry_window_days: 30,
            working_days_per_month: 21.0,
            working_days_per_year: 252.0,
        }
    }
}

/// Utilisation cut-offs. Both comparisons are strictly greater-than:
/// exactly `red_above` is amber, exactly `amber_above` is green.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagThresholds {
    pub red_above:   f64,
    pub amber_above: f64,
}

impl Default for RagThresholds {
    fn default() -> Self {
        Self { red_above: 90.0, amber_above: 70.0 }
    }
}

impl PlannerConfig {
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = Path::new(data_dir).join(CONFIG_FILE);
        if !path.exists() {
            log::info!("no {} in {data_dir}, using defaults", CONFIG_FILE);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: PlannerConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=12).contains(&self.fiscal_year_start_month) {
            anyhow::bail!(
                "fiscal_year_start_month must be 1..=12, got {}",
                self.fiscal_year_start_month
            );
        }
        if self.rag.amber_above > self.rag.red_above {
            anyhow::bail!(
                "rag.amber_above ({}) must not exceed rag.red_above ({})",
                self.rag.amber_above,
                self.rag.red_above
            );
        }
        if self.no_date_range_quarters == 0 {
            anyhow::bail!("no_date_range_quarters must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config: PlannerConfig =
            serde_json::from_str(r#"{ "fiscal_year_start_month": 1 }"#).unwrap();
        assert_eq!(config.fiscal_year_start_month, 1);
        assert_eq!(config.rag, RagThresholds::default());
        assert_eq!(config.no_date_range_quarters, 4);
    }

    #[test]
    fn rejects_bad_start_month() {
        let config = PlannerConfig { fiscal_year_start_month: 13, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let config = PlannerConfig {
            rag: RagThresholds { red_above: 50.0, amber_above: 80.0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = std::env::temp_dir().join("capacity-core-config-missing");
        let config = PlannerConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config, PlannerConfig::default());
    }
}
