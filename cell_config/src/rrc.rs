//! Radio Resource Control (RRC) Radio Bearers
//!
//! Maps signalling radio bearers and QoS flows to RLC/PDCP configurations
//! (TS 38.331 RadioBearerConfig, TS 23.501 Table 5.7.4-1 for the 5QI).

use crate::intent::QosIntent;
use crate::pdcp::PdcpConfig;
use crate::rlc::{RlcConfig, RlcMode};
use common::types::FiveQi;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Maximum number of DRBs (maxDRB)
pub const MAX_NOF_DRBS: usize = 29;

/// Bearer configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BearerError {
    #[error("5QI {0} has no default RLC mode and no override")]
    UnknownFiveQi(u16),

    #[error("5QI {0} is configured twice")]
    DuplicateFiveQi(u16),

    #[error("{0} DRBs exceed the maximum of 29")]
    TooManyDrbs(usize),
}

/// Default RLC mode of the standardized 5QIs
pub fn default_rlc_mode(five_qi: FiveQi) -> Option<RlcMode> {
    match five_qi {
        FiveQi::VOICE | FiveQi::VIDEO | FiveQi::INTERACTIVE => Some(RlcMode::Um),
        FiveQi::IMS_SIGNALLING | FiveQi::DEFAULT => Some(RlcMode::Am),
        FiveQi(6) | FiveQi(8) => Some(RlcMode::Am),
        _ => None,
    }
}

fn rlc_mode(qos: &QosIntent) -> Result<RlcMode, BearerError> {
    qos.rlc_mode
        .or_else(|| default_rlc_mode(qos.five_qi))
        .ok_or(BearerError::UnknownFiveQi(qos.five_qi.0))
}

/// Check the QoS flow list of a cell
pub fn validate(qos: &[QosIntent]) -> Result<(), BearerError> {
    if qos.len() > MAX_NOF_DRBS {
        return Err(BearerError::TooManyDrbs(qos.len()));
    }
    let mut seen = BTreeSet::new();
    qos.iter().try_for_each(|flow| {
        if !seen.insert(flow.five_qi) {
            return Err(BearerError::DuplicateFiveQi(flow.five_qi.0));
        }
        rlc_mode(flow).map(|_| ())
    })
}

/// Signalling radio bearer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SrbConfig {
    pub srb_id: u8,
    pub rlc: RlcConfig,
    pub pdcp: PdcpConfig,
}

/// Data radio bearer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrbConfig {
    pub drb_id: u8,
    pub five_qi: FiveQi,
    pub rlc: RlcConfig,
    pub pdcp: PdcpConfig,
}

/// Radio bearers of a cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BearerSet {
    pub srbs: Vec<SrbConfig>,
    pub drbs: Vec<DrbConfig>,
}

/// Build SRB1, SRB2 and one DRB per QoS flow
///
/// A non-zero round trip inflates every reordering and retransmission timer.
pub fn build_bearers(qos: &[QosIntent], rtt_ms: u32) -> Result<BearerSet, BearerError> {
    validate(qos)?;
    let srbs = [1, 2]
        .into_iter()
        .map(|srb_id| SrbConfig {
            srb_id,
            rlc: RlcConfig::srb().inflate(rtt_ms),
            pdcp: PdcpConfig::srb().inflate(rtt_ms),
        })
        .collect();
    let drbs = qos
        .iter()
        .zip(1u8..)
        .map(|(flow, drb_id)| {
            let mode = rlc_mode(flow)?;
            Ok(DrbConfig {
                drb_id,
                five_qi: flow.five_qi,
                rlc: RlcConfig::drb(mode).inflate(rtt_ms),
                pdcp: PdcpConfig::drb(mode).inflate(rtt_ms),
            })
        })
        .collect::<Result<Vec<_>, BearerError>>()?;

    let bearers = BearerSet { srbs, drbs };
    debug!(
        "Bearers: {} SRBs, DRB modes {:?}",
        bearers.srbs.len(),
        bearers.drbs.iter().map(|d| (d.five_qi.0, d.rlc.mode())).collect::<Vec<_>>()
    );
    Ok(bearers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(five_qi: u16, rlc_mode: Option<RlcMode>) -> QosIntent {
        QosIntent {
            five_qi: FiveQi(five_qi),
            rlc_mode,
        }
    }

    #[test]
    fn test_default_modes() {
        let bearers = build_bearers(&[flow(1, None), flow(9, None), flow(7, None)], 0).unwrap();
        assert_eq!(bearers.srbs.len(), 2);
        assert!(bearers.srbs.iter().all(|s| s.rlc.mode() == RlcMode::Am));
        let modes: Vec<_> = bearers.drbs.iter().map(|d| (d.drb_id, d.rlc.mode())).collect();
        assert_eq!(modes, vec![(1, RlcMode::Um), (2, RlcMode::Am), (3, RlcMode::Um)]);
    }

    #[test]
    fn test_unknown_five_qi() {
        assert_eq!(validate(&[flow(83, None)]), Err(BearerError::UnknownFiveQi(83)));
        assert!(validate(&[flow(83, Some(RlcMode::Am))]).is_ok());
        assert_eq!(
            validate(&[flow(9, None), flow(9, Some(RlcMode::Um))]),
            Err(BearerError::DuplicateFiveQi(9))
        );
    }

    #[test]
    fn test_ntn_inflation() {
        let bearers = build_bearers(&[flow(9, None)], 26).unwrap();
        let RlcConfig::Am(am) = bearers.drbs[0].rlc else {
            panic!("5QI 9 is AM");
        };
        assert_eq!(am.t_reassembly_ms, 50);
        assert_eq!(bearers.drbs[0].pdcp.t_reordering_ms, 120);
        assert_eq!(bearers.srbs[0].pdcp.t_reordering_ms, 80);
    }
}
