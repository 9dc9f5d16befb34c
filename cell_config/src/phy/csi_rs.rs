//! CSI-RS Slot Offset Derivation
//!
//! Places the periodic NZP CSI-RS resources used for measurement (TS 38.214
//! §5.2.2.3.1), tracking (TRS, TS 38.214 §5.1.6.1.1) and the CSI-IM /
//! ZP CSI-RS interference resources so that they never collide with the
//! SSB burst, the SIB1 PDCCH/PDSCH or uplink symbols.

use super::tdd::TddSlotMap;
use common::utils::lcm;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Allowed CSI-RS periodicities in slots (CSI-ResourcePeriodicityAndOffset)
pub const ALLOWED_PERIODS_SLOTS: [u32; 13] = [4, 5, 8, 10, 16, 20, 32, 40, 64, 80, 160, 320, 640];

/// OFDM symbols used by the two tracking resources in each TRS slot
pub const TRACKING_SYMBOLS: [u8; 2] = [4, 8];

/// CSI-RS offset derivation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsiRsOffsetError {
    #[error("No pair of consecutive slots can carry the tracking CSI-RS")]
    NoTrackingSlot,

    #[error("No slot can carry the measurement CSI-RS")]
    NoMeasurementSlot,

    #[error("Fixed {kind} CSI-RS slot offset {offset} collides with SSB, SIB1, UL symbols or another CSI-RS")]
    InvalidFixedOffset { kind: &'static str, offset: u32 },

    #[error("CSI-RS period of {0} slots is not allowed")]
    InvalidPeriod(u32),
}

/// Signals a CSI-RS occasion must avoid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsiRsParams {
    /// CSI-RS period in slots
    pub period_slots: u32,
    /// Slots carrying SSBs, relative to the start of the SSB period
    pub ssb_slots: Vec<u32>,
    /// Slots carrying SIB1, relative to the start of the SIB1 period
    pub sib1_slots: Vec<u32>,
    /// SIB1 period in slots
    pub sib1_period_slots: u32,
}

/// Operator-fixed slot offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedOffsets {
    pub measurement: Option<u32>,
    pub tracking: Option<u32>,
    pub interference: Option<u32>,
}

/// Slot offsets of the CSI-RS resources within the CSI-RS period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedOffsets {
    pub measurement: u32,
    /// First of the two consecutive tracking slots
    pub tracking: u32,
    pub interference: u32,
}

struct OffsetRules<'a> {
    params: &'a CsiRsParams,
    tdd: Option<&'a TddSlotMap>,
    max_symbol_index: u8,
    ssb_period_slots: u32,
    horizon: u32,
}

impl OffsetRules<'_> {
    /// An offset is legal when none of its occurrences over the common horizon
    /// hits an SSB slot, a SIB1 slot or lacks the needed DL symbols
    fn is_legal(&self, offset: u32) -> bool {
        let period = self.params.period_slots;
        (0..self.horizon / period).map(|n| offset + n * period).all(|slot| {
            let ssb_free = !self.params.ssb_slots.contains(&(slot % self.ssb_period_slots));
            let sib1_free = !self.params.sib1_slots.contains(&(slot % self.params.sib1_period_slots));
            let dl_ok = self.tdd.map(|tdd| tdd.dl_symbols(slot) > self.max_symbol_index).unwrap_or(true);
            ssb_free && sib1_free && dl_ok
        })
    }

    fn is_legal_pair(&self, offset: u32) -> bool {
        offset + 1 < self.params.period_slots && self.is_legal(offset) && self.is_legal(offset + 1)
    }
}

/// Resolve the measurement, tracking and interference slot offsets
///
/// Fixed offsets are only checked. Free offsets are searched over one CSI-RS
/// period: first the tracking pair, then a measurement slot outside the pair.
/// The interference resources share the measurement slot unless fixed.
pub fn derive_offsets(
    params: &CsiRsParams,
    fixed: &FixedOffsets,
    tdd: Option<&TddSlotMap>,
    max_symbol_index: u8,
    ssb_period_slots: u32,
) -> Result<ResolvedOffsets, CsiRsOffsetError> {
    if !ALLOWED_PERIODS_SLOTS.contains(&params.period_slots) {
        return Err(CsiRsOffsetError::InvalidPeriod(params.period_slots));
    }
    let tdd_period = tdd.map(|t| t.period()).unwrap_or(1);
    let horizon = [ssb_period_slots, params.sib1_period_slots, tdd_period]
        .into_iter()
        .fold(params.period_slots, lcm);
    let rules = OffsetRules {
        params,
        tdd,
        max_symbol_index,
        ssb_period_slots,
        horizon,
    };

    let tracking = match fixed.tracking {
        Some(offset) if rules.is_legal_pair(offset) => offset,
        Some(offset) => return Err(CsiRsOffsetError::InvalidFixedOffset { kind: "tracking", offset }),
        None => (0..params.period_slots)
            .find(|o| rules.is_legal_pair(*o))
            .ok_or(CsiRsOffsetError::NoTrackingSlot)?,
    };
    let outside_tracking = |o: &u32| *o != tracking && *o != tracking + 1;

    let measurement = match fixed.measurement {
        Some(offset) if outside_tracking(&offset) && rules.is_legal(offset) => offset,
        Some(offset) => return Err(CsiRsOffsetError::InvalidFixedOffset { kind: "measurement", offset }),
        None => (0..params.period_slots)
            .filter(outside_tracking)
            .find(|o| rules.is_legal(*o))
            .ok_or(CsiRsOffsetError::NoMeasurementSlot)?,
    };

    let interference = match fixed.interference {
        None => measurement,
        Some(offset) if outside_tracking(&offset) && rules.is_legal(offset) => offset,
        Some(offset) => return Err(CsiRsOffsetError::InvalidFixedOffset { kind: "interference", offset }),
    };

    let offsets = ResolvedOffsets {
        measurement,
        tracking,
        interference,
    };
    debug!("CSI-RS slot offsets: {:?}", offsets);
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::tdd::TddConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn n78_params() -> CsiRsParams {
        CsiRsParams {
            period_slots: 40,
            ssb_slots: vec![0],
            sib1_slots: vec![0],
            sib1_period_slots: 40,
        }
    }

    #[test]
    fn test_default_tdd_offsets() {
        let tdd = TddSlotMap::new(&TddConfig::default());
        let offsets = derive_offsets(&n78_params(), &FixedOffsets::default(), Some(&tdd), 8, 20).unwrap();
        assert_eq!(offsets.tracking, 1);
        assert_eq!(offsets.measurement, 3);
        assert_eq!(offsets.interference, 3);
    }

    #[test]
    fn test_fixed_offsets() {
        let tdd = TddSlotMap::new(&TddConfig::default());
        let fixed = FixedOffsets {
            measurement: Some(2),
            tracking: Some(11),
            interference: None,
        };
        let offsets = derive_offsets(&n78_params(), &fixed, Some(&tdd), 8, 20).unwrap();
        assert_eq!((offsets.tracking, offsets.measurement, offsets.interference), (11, 2, 2));

        // Slot 20 is an SSB slot of the second SSB period
        let fixed = FixedOffsets {
            measurement: Some(20),
            ..Default::default()
        };
        assert_eq!(
            derive_offsets(&n78_params(), &fixed, Some(&tdd), 8, 20),
            Err(CsiRsOffsetError::InvalidFixedOffset { kind: "measurement", offset: 20 })
        );

        // Slot 6 carries only 8 DL symbols
        let fixed = FixedOffsets {
            tracking: Some(5),
            ..Default::default()
        };
        assert!(derive_offsets(&n78_params(), &fixed, Some(&tdd), 8, 20).is_err());
    }

    #[test]
    fn test_no_tracking_pair() {
        // DSUU: DL slots never come in pairs
        let cfg = TddConfig {
            pattern1: crate::phy::tdd::TddPattern {
                period_slots: 4,
                nof_dl_slots: 1,
                nof_dl_symbols: 0,
                nof_ul_slots: 2,
                nof_ul_symbols: 0,
            },
            pattern2: None,
        };
        let tdd = TddSlotMap::new(&cfg);
        let params = CsiRsParams {
            period_slots: 20,
            ssb_slots: vec![0],
            sib1_slots: vec![0],
            sib1_period_slots: 40,
        };
        assert_eq!(
            derive_offsets(&params, &FixedOffsets::default(), Some(&tdd), 8, 20),
            Err(CsiRsOffsetError::NoTrackingSlot)
        );
    }

    #[test]
    fn test_tracking_pair_properties_random_ssb() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let tdd = TddSlotMap::new(&TddConfig::default());
        for _ in 0..200 {
            let period = [20u32, 40, 80][rng.gen_range(0..3)];
            let ssb_slots: Vec<u32> = (0..rng.gen_range(1..4)).map(|_| rng.gen_range(0..6)).collect();
            let sib1_slots = vec![rng.gen_range(0..6)];
            let params = CsiRsParams {
                period_slots: period,
                ssb_slots: ssb_slots.clone(),
                sib1_slots: sib1_slots.clone(),
                sib1_period_slots: 40,
            };
            let Ok(offsets) = derive_offsets(&params, &FixedOffsets::default(), Some(&tdd), 8, 20) else {
                continue;
            };
            for slot in [offsets.tracking, offsets.tracking + 1] {
                assert!(!ssb_slots.contains(&(slot % 20)));
                assert!(!sib1_slots.contains(&(slot % 40)));
                assert!(tdd.dl_symbols(slot) > 8);
            }
            assert!(offsets.measurement != offsets.tracking && offsets.measurement != offsets.tracking + 1);
        }
    }

    #[test]
    fn test_fdd_offsets() {
        let params = CsiRsParams {
            period_slots: 10,
            ssb_slots: vec![0, 1],
            sib1_slots: vec![0],
            sib1_period_slots: 20,
        };
        let offsets = derive_offsets(&params, &FixedOffsets::default(), None, 8, 20).unwrap();
        assert_eq!(offsets.tracking, 2);
        assert_eq!(offsets.measurement, 4);
    }
}
