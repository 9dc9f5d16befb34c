//! Carrier Numerology Resolution
//!
//! Resolves the band, duplex mode, grid size and SSB pattern of a cell from
//! its intent. Every check past the carrier check starts from this value.

use crate::intent::CellIntent;
use crate::phy::tdd::{TddConfig, TddSlotMap};
use crate::ValidationError;
use common::band::{self, SsbCase};
use common::types::{Bandwidth, CyclicPrefix, DuplexMode, FrequencyRange, SubcarrierSpacing};
use common::utils::{nof_crbs, time};
use tracing::trace;

/// Carrier parameters shared by the validator and the builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellNumerology {
    pub band: u16,
    pub duplex: DuplexMode,
    pub fr: FrequencyRange,
    pub bandwidth: Bandwidth,
    pub common_scs: SubcarrierSpacing,
    pub ssb_scs: SubcarrierSpacing,
    pub cp: CyclicPrefix,
    /// Carrier width in CRBs, also the initial BWP width
    pub nof_crbs: u32,
    pub ssb_case: SsbCase,
    pub l_max: u32,
    pub dl_arfcn: u32,
    pub ul_arfcn: u32,
    /// TDD configuration, the default pattern when a TDD cell has none
    pub tdd: Option<TddConfig>,
    pub ssb_period_slots: u32,
}

fn carrier(msg: impl Into<String>) -> ValidationError {
    ValidationError::Carrier(msg.into())
}

impl CellNumerology {
    /// Resolve the carrier of a cell, rejecting unsupported combinations
    pub fn resolve(intent: &CellIntent) -> Result<Self, ValidationError> {
        let band = intent
            .band()
            .ok_or_else(|| carrier(format!("no supported band contains DL ARFCN {}", intent.dl_arfcn)))?;
        let info = band::band_info(band).ok_or_else(|| carrier(format!("band n{} is not supported", band)))?;
        if !band::is_dl_arfcn_in_band(band, intent.dl_arfcn) {
            return Err(carrier(format!("DL ARFCN {} is outside band n{}", intent.dl_arfcn, band)));
        }
        let scs = intent.common_scs;
        if !info.scs.contains(&scs) {
            return Err(carrier(format!("{} kHz is not supported in band n{}", scs.khz(), band)));
        }

        let fr = band::freq_range(band).ok_or_else(|| carrier(format!("band n{} has no frequency range", band)))?;
        let floor = band::min_channel_bandwidth(band, scs)
            .ok_or_else(|| carrier(format!("band n{} has no bandwidth floor at {} kHz", band, scs.khz())))?;
        let bandwidth = intent.channel_bandwidth;
        if bandwidth < floor {
            return Err(carrier(format!(
                "{} MHz is below the {} MHz floor of band n{} at {} kHz",
                bandwidth.mhz(),
                floor.mhz(),
                band,
                scs.khz()
            )));
        }
        if bandwidth > info.max_bw {
            return Err(carrier(format!(
                "{} MHz exceeds the {} MHz maximum of band n{}",
                bandwidth.mhz(),
                info.max_bw.mhz(),
                band
            )));
        }
        let nof_crbs = nof_crbs(bandwidth, scs, fr)
            .ok_or_else(|| carrier(format!("{} MHz is not defined at {} kHz", bandwidth.mhz(), scs.khz())))?;

        let ssb_scs = band::ssb_scs_for(band, scs)
            .ok_or_else(|| carrier(format!("no SSB subcarrier spacing for band n{}", band)))?;
        let ssb_case = band::ssb_case(band, ssb_scs)
            .ok_or_else(|| carrier(format!("no SSB case for band n{} at {} kHz", band, ssb_scs.khz())))?;
        let l_max = band::ssb_l_max(band, intent.dl_arfcn, ssb_case);
        let ul_arfcn = band::ul_arfcn(band, intent.dl_arfcn)
            .ok_or_else(|| carrier(format!("no UL ARFCN for band n{}", band)))?;

        let tdd = match (info.duplex, intent.tdd_ul_dl_cfg) {
            (DuplexMode::Tdd, cfg) => Some(cfg.unwrap_or_default()),
            (DuplexMode::Fdd, None) => None,
            (DuplexMode::Fdd, Some(_)) => {
                return Err(carrier(format!("band n{} is FDD but a TDD pattern is configured", band)))
            }
        };

        let numerology = Self {
            band,
            duplex: info.duplex,
            fr,
            bandwidth,
            common_scs: scs,
            ssb_scs,
            cp: CyclicPrefix::default(),
            nof_crbs,
            ssb_case,
            l_max,
            dl_arfcn: intent.dl_arfcn,
            ul_arfcn,
            tdd,
            ssb_period_slots: time::ms_to_slots(intent.ssb.period_ms, scs),
        };
        trace!("Resolved numerology: {:?}", numerology);
        Ok(numerology)
    }

    /// Slot map of the TDD pattern, `None` for FDD
    pub fn tdd_map(&self) -> Option<TddSlotMap> {
        self.tdd.as_ref().map(TddSlotMap::new)
    }

    /// Transmitted SSB bitmap, only the first SSB when the operator gives none
    pub fn ssb_bitmap(&self, configured: Option<u64>) -> u64 {
        configured.unwrap_or(1)
    }

    pub fn slots_per_frame(&self) -> u32 {
        self.common_scs.slots_per_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n78_cell() -> CellIntent {
        CellIntent {
            band: Some(78),
            ..CellIntent::new(1, 632_628)
        }
    }

    #[test]
    fn test_resolve_n78() {
        let numerology = CellNumerology::resolve(&n78_cell()).unwrap();
        assert_eq!(numerology.band, 78);
        assert_eq!(numerology.duplex, DuplexMode::Tdd);
        assert_eq!(numerology.nof_crbs, 51);
        assert_eq!(numerology.ssb_case, SsbCase::C);
        assert_eq!(numerology.l_max, 8);
        assert_eq!(numerology.tdd, Some(TddConfig::default()));
        assert_eq!(numerology.ssb_period_slots, 20);
    }

    #[test]
    fn test_resolve_fdd() {
        let intent = CellIntent {
            common_scs: SubcarrierSpacing::Scs15,
            channel_bandwidth: Bandwidth::Bw10,
            ..CellIntent::new(1, 368_500)
        };
        let numerology = CellNumerology::resolve(&intent).unwrap();
        assert_eq!(numerology.band, 3);
        assert_eq!(numerology.duplex, DuplexMode::Fdd);
        assert_eq!(numerology.ul_arfcn, 349_500);
        assert_eq!(numerology.nof_crbs, 52);
        assert!(numerology.tdd_map().is_none());

        let with_pattern = CellIntent {
            tdd_ul_dl_cfg: Some(TddConfig::default()),
            ..intent
        };
        assert!(matches!(CellNumerology::resolve(&with_pattern), Err(ValidationError::Carrier(_))));
    }

    #[test]
    fn test_band_floor() {
        let at_floor = CellIntent {
            band: Some(79),
            channel_bandwidth: Bandwidth::Bw40,
            ..CellIntent::new(1, 720_000)
        };
        assert!(CellNumerology::resolve(&at_floor).is_ok());

        let below = CellIntent {
            channel_bandwidth: Bandwidth::Bw30,
            ..at_floor
        };
        assert!(matches!(CellNumerology::resolve(&below), Err(ValidationError::Carrier(_))));
    }

    #[test]
    fn test_unsupported_carrier() {
        let outside = CellIntent {
            band: Some(78),
            ..CellIntent::new(1, 660_000)
        };
        assert!(CellNumerology::resolve(&outside).is_err());

        let no_band = CellIntent::new(1, 10);
        assert!(CellNumerology::resolve(&no_band).is_err());

        let wide = CellIntent {
            channel_bandwidth: Bandwidth::Bw200,
            ..n78_cell()
        };
        assert!(CellNumerology::resolve(&wide).is_err());
    }
}
