//! gNB Configuration File
//!
//! One file describes every cell of a DU in the srsRAN-compatible
//! `cell_cfg` layout, plus the implementation policy and the executor
//! layout. Loaded from YAML or TOML depending on the file extension.

use anyhow::{anyhow, bail, Context};
use cell_config::{CellIntent, CellPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GnbConfig {
    /// Cells served by the DU
    pub cells: Vec<CellIntent>,
    /// Implementation policy shared by every cell
    #[serde(default)]
    pub policy: CellPolicy,
    /// Executor layout
    #[serde(default)]
    pub expert_execution: ExpertExecutionConfig,
}

/// Executor configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExpertExecutionConfig {
    /// CPU affinities, one entry per cell or none
    #[serde(default)]
    pub cell_affinities: Vec<CellAffinityConfig>,
}

/// CPU affinity of the executors of one cell
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CellAffinityConfig {
    /// CPUs of the L1 downlink workers
    #[serde(default)]
    pub l1_dl_cpus: Vec<usize>,
    /// CPUs of the L2 cell executor
    #[serde(default)]
    pub l2_cell_cpus: Vec<usize>,
}

impl GnbConfig {
    /// Load configuration from a YAML (`.yml`, `.yaml`) or TOML (`.toml`) file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let config = match extension {
            "yml" | "yaml" => Self::from_yaml_str(&contents)?,
            "toml" => Self::from_toml_str(&contents)?,
            other => bail!("Unsupported configuration format '{}' of {}", other, path.display()),
        };
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Self> {
        let config: GnbConfig = serde_yaml::from_str(contents)?;
        config.check_shape()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: GnbConfig = toml::from_str(contents)?;
        config.check_shape()?;
        Ok(config)
    }

    /// Check the array lengths the cell validator does not cover
    pub fn check_shape(&self) -> anyhow::Result<()> {
        if self.cells.is_empty() {
            return Err(anyhow!("No cell configured"));
        }
        let affinities = self.expert_execution.cell_affinities.len();
        if affinities != 0 && affinities != self.cells.len() {
            return Err(anyhow!(
                "{} cell affinities for {} cells, expected one per cell or none",
                affinities,
                self.cells.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::Bandwidth;

    const SAMPLE_YAML: &str = include_str!("../configs/gnb_n78_two_cells.yml");
    const SAMPLE_TOML: &str = include_str!("../configs/gnb_band3.toml");

    #[test]
    fn test_sample_yaml() {
        let config = GnbConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        assert_eq!(config.cells.len(), 2);
        assert_eq!(config.cells[0].band, Some(78));
        assert_eq!(config.cells[1].prach.prach_root_sequence_index, 100);
        assert_eq!(config.policy.max_pucch_rb_percent, 40);
        assert_eq!(config.policy.max_k1, cell_config::policy::DEFAULT_MAX_K1);
        assert_eq!(config.expert_execution.cell_affinities.len(), 2);
    }

    #[test]
    fn test_sample_toml() {
        let config = GnbConfig::from_toml_str(SAMPLE_TOML).unwrap();
        assert_eq!(config.cells.len(), 1);
        assert_eq!(config.cells[0].channel_bandwidth, Bandwidth::Bw10);
        assert!(config.expert_execution.cell_affinities.is_empty());
    }

    #[test]
    fn test_affinity_length() {
        let yaml = r#"
cells:
  - pci: 1
    dl_arfcn: 632628
  - pci: 2
    dl_arfcn: 632628
expert_execution:
  cell_affinities:
    - l1_dl_cpus: [2, 3]
"#;
        let err = GnbConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("one per cell"));
        assert!(GnbConfig::from_yaml_str("cells: []\n").is_err());
    }

    #[test]
    fn test_unknown_extension() {
        assert!(GnbConfig::from_file(Path::new("gnb.json")).is_err());
    }
}
