//! Radio Link Control (RLC) Bearer Configuration
//!
//! RLC-AM and RLC-UM parameters of TS 38.331 RLC-Config and the enumerated
//! timer values of TS 38.322.

use serde::{Deserialize, Serialize};

/// RLC operating modes used by radio bearers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RlcMode {
    /// Unacknowledged Mode
    Um,
    /// Acknowledged Mode
    Am,
}

/// t-PollRetransmit values in ms
pub fn t_poll_retransmit_values() -> impl Iterator<Item = u32> + Clone {
    (5..=250).step_by(5).chain([300, 350, 400, 450, 500, 800, 1000, 2000, 4000])
}

/// t-Reassembly values in ms
pub fn t_reassembly_values() -> impl Iterator<Item = u32> + Clone {
    (0..=100).step_by(5).chain((110..=200).step_by(10))
}

/// t-StatusProhibit values in ms
pub fn t_status_prohibit_values() -> impl Iterator<Item = u32> + Clone {
    (0..=250)
        .step_by(5)
        .chain([300, 350, 400, 450, 500, 800, 1000, 1200, 1600, 2000, 2400])
}

/// Smallest enumerated value at or above `target`, the largest one past the end
pub fn round_up_to(values: impl Iterator<Item = u32> + Clone, target: u32) -> u32 {
    values
        .clone()
        .find(|v| *v >= target)
        .or_else(|| values.last())
        .unwrap_or(target)
}

/// RLC-AM parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RlcAmConfig {
    /// SN field length in bits (12 or 18)
    pub sn_field_length: u8,
    pub t_poll_retransmit_ms: u32,
    /// Poll PDU trigger, infinite when absent
    pub poll_pdu: Option<u32>,
    /// Poll byte trigger in kB, infinite when absent
    pub poll_byte_kb: Option<u32>,
    pub max_retx_threshold: u32,
    pub t_reassembly_ms: u32,
    pub t_status_prohibit_ms: u32,
}

/// RLC-UM parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RlcUmConfig {
    /// SN field length in bits (6 or 12)
    pub sn_field_length: u8,
    pub t_reassembly_ms: u32,
}

/// RLC configuration of one bearer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RlcConfig {
    Am(RlcAmConfig),
    Um(RlcUmConfig),
}

impl RlcConfig {
    /// Signalling radio bearer
    pub fn srb() -> Self {
        Self::Am(RlcAmConfig {
            sn_field_length: 12,
            t_poll_retransmit_ms: 45,
            poll_pdu: None,
            poll_byte_kb: None,
            max_retx_threshold: 8,
            t_reassembly_ms: 35,
            t_status_prohibit_ms: 0,
        })
    }

    /// Data radio bearer of a mode
    pub fn drb(mode: RlcMode) -> Self {
        match mode {
            RlcMode::Am => Self::Am(RlcAmConfig {
                sn_field_length: 18,
                t_poll_retransmit_ms: 20,
                poll_pdu: Some(16),
                poll_byte_kb: None,
                max_retx_threshold: 32,
                t_reassembly_ms: 20,
                t_status_prohibit_ms: 0,
            }),
            RlcMode::Um => Self::Um(RlcUmConfig {
                sn_field_length: 12,
                t_reassembly_ms: 50,
            }),
        }
    }

    pub fn mode(&self) -> RlcMode {
        match self {
            Self::Am(_) => RlcMode::Am,
            Self::Um(_) => RlcMode::Um,
        }
    }

    /// Stretch the timers by a round trip and round up to enumerated values
    pub fn inflate(&self, rtt_ms: u32) -> Self {
        if rtt_ms == 0 {
            return *self;
        }
        match self {
            Self::Am(am) => Self::Am(RlcAmConfig {
                t_poll_retransmit_ms: round_up_to(t_poll_retransmit_values(), am.t_poll_retransmit_ms + rtt_ms),
                t_reassembly_ms: round_up_to(t_reassembly_values(), am.t_reassembly_ms + rtt_ms),
                t_status_prohibit_ms: round_up_to(t_status_prohibit_values(), am.t_status_prohibit_ms + rtt_ms),
                ..*am
            }),
            Self::Um(um) => Self::Um(RlcUmConfig {
                t_reassembly_ms: round_up_to(t_reassembly_values(), um.t_reassembly_ms + rtt_ms),
                ..*um
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up() {
        assert_eq!(round_up_to(t_reassembly_values(), 0), 0);
        assert_eq!(round_up_to(t_reassembly_values(), 37), 40);
        assert_eq!(round_up_to(t_reassembly_values(), 101), 110);
        // Clamped at the largest value
        assert_eq!(round_up_to(t_reassembly_values(), 500), 200);
        assert_eq!(round_up_to(t_poll_retransmit_values(), 251), 300);
        assert_eq!(round_up_to(t_status_prohibit_values(), 2401), 2400);
    }

    #[test]
    fn test_inflate_am() {
        let inflated = RlcConfig::drb(RlcMode::Am).inflate(26);
        let RlcConfig::Am(am) = inflated else {
            panic!("mode changed");
        };
        assert_eq!(am.t_poll_retransmit_ms, 50);
        assert_eq!(am.t_reassembly_ms, 50);
        assert_eq!(am.t_status_prohibit_ms, 30);
        assert_eq!(am.sn_field_length, 18);
    }

    #[test]
    fn test_inflate_terrestrial_is_identity() {
        let srb = RlcConfig::srb();
        assert_eq!(srb.inflate(0), srb);
        assert_eq!(RlcConfig::drb(RlcMode::Um).mode(), RlcMode::Um);
    }
}
