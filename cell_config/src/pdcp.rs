//! Packet Data Convergence Protocol (PDCP) Bearer Configuration
//!
//! PDCP-Config parameters of TS 38.331 and the t-Reordering values of TS 38.323

use crate::rlc::{round_up_to, RlcMode};
use serde::Serialize;

/// t-Reordering values in ms
pub fn t_reordering_values() -> impl Iterator<Item = u32> + Clone {
    [0, 1, 2, 4, 5, 8, 10, 15, 20, 30, 40, 50, 60, 80]
        .into_iter()
        .chain((100..=300).step_by(20))
        .chain((500..=3000).step_by(250))
}

/// PDCP configuration of one bearer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PdcpConfig {
    /// SN size in bits (12 or 18)
    pub sn_size: u8,
    /// Discard timer in ms, infinite when absent
    pub discard_timer_ms: Option<u32>,
    /// Reordering timer in ms
    pub t_reordering_ms: u32,
    /// Enable integrity protection
    pub integrity_protection: bool,
    /// Enable ciphering
    pub ciphering: bool,
}

impl PdcpConfig {
    /// Signalling radio bearer
    pub fn srb() -> Self {
        Self {
            sn_size: 12,
            discard_timer_ms: None,
            t_reordering_ms: 35,
            integrity_protection: true,
            ciphering: true,
        }
    }

    /// Data radio bearer over an RLC mode
    pub fn drb(mode: RlcMode) -> Self {
        match mode {
            RlcMode::Am => Self {
                sn_size: 18,
                discard_timer_ms: None,
                t_reordering_ms: 80,
                integrity_protection: false,
                ciphering: true,
            },
            RlcMode::Um => Self {
                sn_size: 12,
                discard_timer_ms: Some(100),
                t_reordering_ms: 80,
                integrity_protection: false,
                ciphering: true,
            },
        }
    }

    /// Stretch t-Reordering by a round trip and round up to an enumerated value
    pub fn inflate(&self, rtt_ms: u32) -> Self {
        if rtt_ms == 0 {
            return *self;
        }
        Self {
            t_reordering_ms: round_up_to(t_reordering_values(), self.t_reordering_ms + rtt_ms),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reordering_values() {
        let values: Vec<u32> = t_reordering_values().collect();
        assert_eq!(values.len(), 36);
        assert_eq!(values.last(), Some(&3000));
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_inflate() {
        assert_eq!(PdcpConfig::srb().inflate(26).t_reordering_ms, 80);
        assert_eq!(PdcpConfig::drb(RlcMode::Am).inflate(150).t_reordering_ms, 240);
        assert_eq!(PdcpConfig::drb(RlcMode::Am).inflate(5000).t_reordering_ms, 3000);
        assert_eq!(PdcpConfig::drb(RlcMode::Um).inflate(0), PdcpConfig::drb(RlcMode::Um));
    }
}
