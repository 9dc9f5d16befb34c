//! Implementation Policy
//!
//! Limits and defaults where the standard leaves freedom to the gNB. These are
//! deliberate local choices, kept as named constants so that a deployment can
//! override them through [`CellPolicy`] without touching the derivations.

use serde::{Deserialize, Serialize};

/// Maximum share of BWP resource blocks that PUCCH resources may occupy
pub const DEFAULT_MAX_PUCCH_RB_PERCENT: u32 = 50;
/// Largest k1 delay searched by the candidate generator
pub const DEFAULT_MAX_K1: u8 = 15;
/// Maximum number of k1 candidates (dl-DataToUL-ACK has 8 entries)
pub const DEFAULT_MAX_NOF_K1: usize = 8;
/// Largest k2 delay searched by the candidate generator
pub const DEFAULT_MAX_K2: u8 = 32;
/// Maximum number of PUSCH time-domain resources (TS 38.331 maxNrofUL-Allocations)
pub const DEFAULT_MAX_NOF_K2: usize = 16;
/// PRACH configuration index used for FDD cells without an operator value
pub const DEFAULT_FDD_PRACH_CONFIG_INDEX: u8 = 16;
/// Largest PRB count tried when auto-sizing PUCCH Format 2 resources
pub const DEFAULT_MAX_PUCCH_F2_PRBS: u32 = 16;
/// Largest RA response window in milliseconds
pub const DEFAULT_MAX_RA_RESP_WINDOW_MS: u32 = 10;
/// Slots between the CSI-RS measurement occasion and the earliest CSI report
pub const DEFAULT_CSI_REPORT_DELAY_SLOTS: u32 = 0;

/// Antenna counts per direction the PHY and the CSI report sizing support
pub const DEFAULT_SUPPORTED_ANTENNAS: [u32; 3] = [1, 2, 4];

/// HARQ-ACK resources per PUCCH resource set
pub const DEFAULT_PUCCH_RES_PER_SET: u32 = 6;
/// Number of cell-wide PUCCH resource sets
pub const DEFAULT_NOF_PUCCH_RES_SETS: u32 = 2;
/// Cell-wide SR resources
pub const DEFAULT_NOF_SR_RESOURCES: u32 = 2;
/// Cell-wide CSI resources
pub const DEFAULT_NOF_CSI_RESOURCES: u32 = 2;

/// Overridable implementation policy applied by the validator and the builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellPolicy {
    /// PUCCH RB ceiling in percent of the BWP
    pub max_pucch_rb_percent: u32,
    /// Largest k1 considered
    pub max_k1: u8,
    /// Maximum number of k1 candidates
    pub max_nof_k1: usize,
    /// Largest k2 considered
    pub max_k2: u8,
    /// Maximum number of k2 candidates
    pub max_nof_k2: usize,
    /// PRACH configuration index for FDD when none is configured
    pub fdd_prach_config_index: u8,
    /// Auto-sizing limit for PUCCH Format 2
    pub max_pucch_f2_prbs: u32,
    /// RA response window ceiling in ms
    pub max_ra_resp_window_ms: u32,
    /// CSI report delay in slots
    pub csi_report_delay_slots: u32,
    /// Accepted DL and UL antenna counts, every count must be non-zero
    pub supported_antennas: Vec<u32>,
}

impl Default for CellPolicy {
    fn default() -> Self {
        Self {
            max_pucch_rb_percent: DEFAULT_MAX_PUCCH_RB_PERCENT,
            max_k1: DEFAULT_MAX_K1,
            max_nof_k1: DEFAULT_MAX_NOF_K1,
            max_k2: DEFAULT_MAX_K2,
            max_nof_k2: DEFAULT_MAX_NOF_K2,
            fdd_prach_config_index: DEFAULT_FDD_PRACH_CONFIG_INDEX,
            max_pucch_f2_prbs: DEFAULT_MAX_PUCCH_F2_PRBS,
            max_ra_resp_window_ms: DEFAULT_MAX_RA_RESP_WINDOW_MS,
            csi_report_delay_slots: DEFAULT_CSI_REPORT_DELAY_SLOTS,
            supported_antennas: DEFAULT_SUPPORTED_ANTENNAS.to_vec(),
        }
    }
}

impl CellPolicy {
    /// PUCCH RB ceiling for a BWP of `bwp_rbs` resource blocks
    pub fn pucch_rb_ceiling(&self, bwp_rbs: u32) -> u32 {
        bwp_rbs * self.max_pucch_rb_percent / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pucch_ceiling() {
        let policy = CellPolicy::default();
        assert_eq!(policy.pucch_rb_ceiling(106), 53);
        assert_eq!(policy.pucch_rb_ceiling(51), 25);
    }

    #[test]
    fn test_partial_override() {
        let policy: CellPolicy = serde_json::from_str(r#"{"max_pucch_rb_percent": 30}"#).unwrap();
        assert_eq!(policy.max_pucch_rb_percent, 30);
        assert_eq!(policy.max_k1, DEFAULT_MAX_K1);
        assert_eq!(policy.supported_antennas, DEFAULT_SUPPORTED_ANTENNAS);
    }
}
