//! NR Operating Bands and Frequency Rasters
//!
//! Band table (TS 38.104 Table 5.2-1/5.2-2), minimum channel bandwidths
//! (TS 38.101-1 Table 5.3.5-1), NR-ARFCN global raster (TS 38.104 §5.4.2.1)
//! and the synchronization raster (TS 38.104 §5.4.3.1).

use crate::types::{Bandwidth, DuplexMode, FrequencyRange, SubcarrierSpacing};
use serde::{Deserialize, Serialize};

use Bandwidth::*;
use SubcarrierSpacing::*;

/// Static description of one NR operating band
#[derive(Debug, Clone, Copy)]
pub struct BandInfo {
    /// Band number (nX)
    pub band: u16,
    /// Duplex mode of the band
    pub duplex: DuplexMode,
    /// First DL NR-ARFCN of the band
    pub dl_arfcn_first: u32,
    /// Last DL NR-ARFCN of the band
    pub dl_arfcn_last: u32,
    /// UL NR-ARFCN matching `dl_arfcn_first` (paired bands only)
    pub ul_arfcn_first: Option<u32>,
    /// Supported common subcarrier spacings
    pub scs: &'static [SubcarrierSpacing],
    /// Supported SSB subcarrier spacings
    pub ssb_scs: &'static [SubcarrierSpacing],
    /// Minimum channel bandwidth per subcarrier spacing
    pub min_bw: &'static [(SubcarrierSpacing, Bandwidth)],
    /// Maximum channel bandwidth of the band
    pub max_bw: Bandwidth,
}

const FR1_LOW_MIN_BW: &[(SubcarrierSpacing, Bandwidth)] = &[(Scs15, Bw5), (Scs30, Bw10), (Scs60, Bw10)];
const FR1_MID_MIN_BW: &[(SubcarrierSpacing, Bandwidth)] = &[(Scs15, Bw10), (Scs30, Bw10), (Scs60, Bw10)];
const FR2_MIN_BW: &[(SubcarrierSpacing, Bandwidth)] = &[(Scs60, Bw50), (Scs120, Bw50)];

const SCS_15_30: &[SubcarrierSpacing] = &[Scs15, Scs30];
const SCS_15_30_60: &[SubcarrierSpacing] = &[Scs15, Scs30, Scs60];
const SCS_60_120: &[SubcarrierSpacing] = &[Scs60, Scs120];

const fn fdd(
    band: u16,
    dl: (u32, u32),
    ul_first: u32,
    scs: &'static [SubcarrierSpacing],
    ssb_scs: &'static [SubcarrierSpacing],
    max_bw: Bandwidth,
) -> BandInfo {
    BandInfo {
        band,
        duplex: DuplexMode::Fdd,
        dl_arfcn_first: dl.0,
        dl_arfcn_last: dl.1,
        ul_arfcn_first: Some(ul_first),
        scs,
        ssb_scs,
        min_bw: FR1_LOW_MIN_BW,
        max_bw,
    }
}

const fn tdd(
    band: u16,
    dl: (u32, u32),
    scs: &'static [SubcarrierSpacing],
    ssb_scs: &'static [SubcarrierSpacing],
    min_bw: &'static [(SubcarrierSpacing, Bandwidth)],
    max_bw: Bandwidth,
) -> BandInfo {
    BandInfo {
        band,
        duplex: DuplexMode::Tdd,
        dl_arfcn_first: dl.0,
        dl_arfcn_last: dl.1,
        ul_arfcn_first: None,
        scs,
        ssb_scs,
        min_bw,
        max_bw,
    }
}

/// Supported NR bands, ordered by band number
pub const BAND_TABLE: &[BandInfo] = &[
    fdd(1, (422_000, 434_000), 384_000, SCS_15_30_60, &[Scs15], Bw50),
    fdd(2, (386_000, 398_000), 370_000, SCS_15_30_60, &[Scs15], Bw40),
    fdd(3, (361_000, 376_000), 342_000, SCS_15_30_60, &[Scs15], Bw50),
    fdd(5, (173_800, 178_800), 164_800, SCS_15_30, &[Scs15, Scs30], Bw25),
    fdd(7, (524_000, 538_000), 500_000, SCS_15_30_60, &[Scs15], Bw50),
    fdd(8, (185_000, 192_000), 176_000, SCS_15_30, &[Scs15], Bw30),
    fdd(20, (158_200, 164_200), 166_400, SCS_15_30, &[Scs15], Bw20),
    fdd(28, (151_600, 160_600), 140_600, SCS_15_30, &[Scs15], Bw30),
    tdd(38, (514_000, 524_000), SCS_15_30_60, &[Scs15], FR1_LOW_MIN_BW, Bw40),
    tdd(39, (376_000, 384_000), SCS_15_30_60, &[Scs15], FR1_LOW_MIN_BW, Bw50),
    tdd(40, (460_000, 480_000), SCS_15_30_60, &[Scs15], FR1_LOW_MIN_BW, Bw80),
    tdd(41, (499_200, 537_999), SCS_15_30_60, &[Scs15, Scs30], FR1_MID_MIN_BW, Bw100),
    fdd(66, (422_000, 440_000), 342_000, SCS_15_30_60, &[Scs15, Scs30], Bw40),
    fdd(71, (123_400, 130_400), 132_600, SCS_15_30, &[Scs15], Bw20),
    tdd(77, (620_000, 680_000), SCS_15_30_60, &[Scs30], FR1_MID_MIN_BW, Bw100),
    tdd(78, (620_000, 653_333), SCS_15_30_60, &[Scs30], FR1_MID_MIN_BW, Bw100),
    tdd(
        79,
        (693_334, 733_333),
        SCS_15_30_60,
        &[Scs30],
        &[(Scs15, Bw40), (Scs30, Bw40), (Scs60, Bw40)],
        Bw100,
    ),
    tdd(257, (2_054_166, 2_104_165), SCS_60_120, &[Scs120, Scs240], FR2_MIN_BW, Bw400),
    tdd(258, (2_016_667, 2_070_832), SCS_60_120, &[Scs120, Scs240], FR2_MIN_BW, Bw400),
    tdd(260, (2_229_166, 2_279_165), SCS_60_120, &[Scs120], FR2_MIN_BW, Bw400),
    tdd(261, (2_070_833, 2_084_999), SCS_60_120, &[Scs120], FR2_MIN_BW, Bw400),
];

/// Look up a band
pub fn band_info(band: u16) -> Option<&'static BandInfo> {
    BAND_TABLE.iter().find(|info| info.band == band)
}

/// Infer the band from a DL NR-ARFCN, preferring the lowest band number
pub fn band_from_dl_arfcn(dl_arfcn: u32) -> Option<u16> {
    BAND_TABLE
        .iter()
        .find(|info| (info.dl_arfcn_first..=info.dl_arfcn_last).contains(&dl_arfcn))
        .map(|info| info.band)
}

/// Check whether a DL NR-ARFCN belongs to a band
pub fn is_dl_arfcn_in_band(band: u16, dl_arfcn: u32) -> bool {
    band_info(band)
        .map(|info| (info.dl_arfcn_first..=info.dl_arfcn_last).contains(&dl_arfcn))
        .unwrap_or(false)
}

/// Duplex mode of a band
pub fn duplex_mode(band: u16) -> Option<DuplexMode> {
    band_info(band).map(|info| info.duplex)
}

/// Frequency range of a band
pub fn freq_range(band: u16) -> Option<FrequencyRange> {
    band_info(band).map(|info| {
        if info.dl_arfcn_first >= FR2_ARFCN_OFFSET {
            FrequencyRange::Fr2
        } else {
            FrequencyRange::Fr1
        }
    })
}

/// Minimum channel bandwidth of a band for a given subcarrier spacing
pub fn min_channel_bandwidth(band: u16, scs: SubcarrierSpacing) -> Option<Bandwidth> {
    band_info(band)?
        .min_bw
        .iter()
        .find(|(s, _)| *s == scs)
        .map(|(_, bw)| *bw)
}

/// UL NR-ARFCN paired with a DL NR-ARFCN. TDD bands share the DL carrier.
pub fn ul_arfcn(band: u16, dl_arfcn: u32) -> Option<u32> {
    let info = band_info(band)?;
    match info.ul_arfcn_first {
        Some(ul_first) => Some(dl_arfcn - info.dl_arfcn_first + ul_first),
        None => Some(dl_arfcn),
    }
}

/// Pick the SSB subcarrier spacing for a band: the common SCS when the band
/// allows it, otherwise the lowest supported SSB SCS.
pub fn ssb_scs_for(band: u16, common_scs: SubcarrierSpacing) -> Option<SubcarrierSpacing> {
    let info = band_info(band)?;
    if info.ssb_scs.contains(&common_scs) {
        Some(common_scs)
    } else {
        info.ssb_scs.first().copied()
    }
}

// NR-ARFCN global raster segments (TS 38.104 Table 5.4.2.1-1)
const FR1_MID_ARFCN_OFFSET: u32 = 600_000;
const FR2_ARFCN_OFFSET: u32 = 2_016_667;
const FR1_MID_FREQ_OFFSET_HZ: u64 = 3_000_000_000;
const FR2_FREQ_OFFSET_HZ: u64 = 24_250_080_000;

/// Convert an NR-ARFCN to its reference frequency in Hz
pub fn arfcn_to_freq_hz(arfcn: u32) -> u64 {
    if arfcn < FR1_MID_ARFCN_OFFSET {
        arfcn as u64 * 5_000
    } else if arfcn < FR2_ARFCN_OFFSET {
        FR1_MID_FREQ_OFFSET_HZ + (arfcn - FR1_MID_ARFCN_OFFSET) as u64 * 15_000
    } else {
        FR2_FREQ_OFFSET_HZ + (arfcn - FR2_ARFCN_OFFSET) as u64 * 60_000
    }
}

/// Convert a frequency in Hz to the NR-ARFCN at or below it
pub fn freq_hz_to_arfcn(freq_hz: u64) -> u32 {
    if freq_hz < FR1_MID_FREQ_OFFSET_HZ {
        (freq_hz / 5_000) as u32
    } else if freq_hz < FR2_FREQ_OFFSET_HZ {
        FR1_MID_ARFCN_OFFSET + ((freq_hz - FR1_MID_FREQ_OFFSET_HZ) / 15_000) as u32
    } else {
        FR2_ARFCN_OFFSET + ((freq_hz - FR2_FREQ_OFFSET_HZ) / 60_000) as u32
    }
}

// Synchronization raster segments (TS 38.104 Table 5.4.3.1-1)
const GSCN_FIRST: u32 = 2;
const GSCN_MID_FIRST: u32 = 7_499;
const GSCN_FR2_FIRST: u32 = 22_256;
const GSCN_LAST: u32 = 26_639;

/// SS_REF frequency in Hz of a GSCN
pub fn gscn_to_ss_ref_hz(gscn: u32) -> Option<u64> {
    match gscn {
        g if g < GSCN_FIRST || g > GSCN_LAST => None,
        g if g < GSCN_MID_FIRST => {
            // GSCN = 3N + (M - 3) / 2, M in {1, 3, 5}
            let (n, m) = match g % 3 {
                2 => ((g + 1) / 3, 1),
                0 => (g / 3, 3),
                _ => ((g - 1) / 3, 5),
            };
            Some(n as u64 * 1_200_000 + m * 50_000)
        }
        g if g < GSCN_FR2_FIRST => {
            Some(FR1_MID_FREQ_OFFSET_HZ + (g - GSCN_MID_FIRST) as u64 * 1_440_000)
        }
        g => Some(FR2_FREQ_OFFSET_HZ + (g - GSCN_FR2_FIRST) as u64 * 17_280_000),
    }
}

fn gscn_floor(freq_hz: u64) -> u32 {
    if freq_hz < FR1_MID_FREQ_OFFSET_HZ {
        (3 * (freq_hz / 1_200_000) as u32).saturating_sub(1).max(GSCN_FIRST)
    } else if freq_hz < FR2_FREQ_OFFSET_HZ {
        GSCN_MID_FIRST + ((freq_hz - FR1_MID_FREQ_OFFSET_HZ) / 1_440_000) as u32
    } else {
        GSCN_FR2_FIRST + ((freq_hz - FR2_FREQ_OFFSET_HZ) / 17_280_000) as u32
    }
}

/// GSCNs whose SS_REF lies in `[low_hz, high_hz]`, ascending
pub fn gscns_in_range(low_hz: u64, high_hz: u64) -> impl Iterator<Item = (u32, u64)> {
    let start = gscn_floor(low_hz).saturating_sub(1).max(GSCN_FIRST);
    (start..=GSCN_LAST)
        .filter_map(|gscn| gscn_to_ss_ref_hz(gscn).map(|f| (gscn, f)))
        .skip_while(move |(_, f)| *f < low_hz)
        .take_while(move |(_, f)| *f <= high_hz)
}

/// SSB transmission pattern (TS 38.213 §4.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SsbCase {
    /// 15 kHz, symbols {2, 8} + 14n
    A,
    /// 30 kHz, symbols {4, 8, 16, 20} + 28n
    B,
    /// 30 kHz, symbols {2, 8} + 14n
    C,
    /// 120 kHz, symbols {4, 8, 16, 20} + 28n
    D,
    /// 240 kHz, symbols {8, 12, 16, 20, 32, 36, 40, 44} + 56n
    E,
}

impl SsbCase {
    /// Number of SSBs transmitted per group of slots, and the group length in slots
    pub fn ssbs_per_slot_group(&self) -> (u32, u32) {
        match self {
            SsbCase::A | SsbCase::C => (2, 1),
            SsbCase::B | SsbCase::D => (4, 2),
            SsbCase::E => (8, 4),
        }
    }

    /// Slot, relative to the start of the half frame, carrying SSB index `ssb_index`
    pub fn slot_of_ssb(&self, ssb_index: u32) -> u32 {
        let (per_group, group_slots) = self.ssbs_per_slot_group();
        let group = ssb_index / per_group;
        let within = ssb_index % per_group;
        group * group_slots + within / 2
    }
}

/// SSB case for a band and SSB subcarrier spacing
pub fn ssb_case(band: u16, ssb_scs: SubcarrierSpacing) -> Option<SsbCase> {
    let info = band_info(band)?;
    if !info.ssb_scs.contains(&ssb_scs) {
        return None;
    }
    match ssb_scs {
        Scs15 => Some(SsbCase::A),
        Scs30 if matches!(band, 5 | 66) => Some(SsbCase::B),
        Scs30 => Some(SsbCase::C),
        Scs120 => Some(SsbCase::D),
        Scs240 => Some(SsbCase::E),
        Scs60 => None,
    }
}

/// Maximum number of SSB beams L_max (TS 38.213 §4.1)
pub fn ssb_l_max(band: u16, dl_arfcn: u32, case: SsbCase) -> u32 {
    if freq_range(band) == Some(FrequencyRange::Fr2) {
        return 64;
    }
    let freq_hz = arfcn_to_freq_hz(dl_arfcn);
    let threshold_hz = if case == SsbCase::C && duplex_mode(band) == Some(DuplexMode::Tdd) {
        1_880_000_000
    } else {
        3_000_000_000
    };
    if freq_hz <= threshold_hz {
        4
    } else {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_lookup() {
        assert_eq!(band_from_dl_arfcn(368_500), Some(3));
        assert_eq!(band_from_dl_arfcn(632_628), Some(77));
        assert_eq!(band_from_dl_arfcn(2_079_167), Some(257));
        assert_eq!(band_from_dl_arfcn(10), None);
        assert!(is_dl_arfcn_in_band(78, 632_628));
        assert!(!is_dl_arfcn_in_band(79, 632_628));
    }

    #[test]
    fn test_duplex_and_range() {
        assert_eq!(duplex_mode(3), Some(DuplexMode::Fdd));
        assert_eq!(duplex_mode(78), Some(DuplexMode::Tdd));
        assert_eq!(freq_range(78), Some(FrequencyRange::Fr1));
        assert_eq!(freq_range(257), Some(FrequencyRange::Fr2));
        assert_eq!(duplex_mode(999), None);
    }

    #[test]
    fn test_arfcn_conversion() {
        assert_eq!(arfcn_to_freq_hz(368_500), 1_842_500_000);
        assert_eq!(arfcn_to_freq_hz(632_628), 3_489_420_000);
        assert_eq!(freq_hz_to_arfcn(1_842_500_000), 368_500);
        assert_eq!(freq_hz_to_arfcn(3_489_420_000), 632_628);
        assert_eq!(arfcn_to_freq_hz(2_016_667), 24_250_080_000);
    }

    #[test]
    fn test_ul_arfcn() {
        // Band 3 duplex spacing is 95 MHz
        assert_eq!(ul_arfcn(3, 368_500), Some(349_500));
        assert_eq!(ul_arfcn(78, 632_628), Some(632_628));
    }

    #[test]
    fn test_gscn_raster() {
        assert_eq!(gscn_to_ss_ref_hz(2), Some(1_250_000));
        assert_eq!(gscn_to_ss_ref_hz(3), Some(1_350_000));
        assert_eq!(gscn_to_ss_ref_hz(4), Some(1_450_000));
        assert_eq!(gscn_to_ss_ref_hz(7_499), Some(3_000_000_000));
        assert_eq!(gscn_to_ss_ref_hz(7_835), Some(3_483_840_000));
        assert_eq!(gscn_to_ss_ref_hz(1), None);

        let gscns: Vec<_> = gscns_in_range(3_480_000_000, 3_490_000_000).collect();
        assert_eq!(gscns.first().map(|(g, _)| *g), Some(7_833));
        assert!(gscns.windows(2).all(|w| w[0].1 < w[1].1));
        assert!(gscns.iter().all(|(_, f)| (3_480_000_000..=3_490_000_000).contains(f)));
    }

    #[test]
    fn test_min_bandwidth() {
        assert_eq!(min_channel_bandwidth(3, Scs15), Some(Bw5));
        assert_eq!(min_channel_bandwidth(78, Scs30), Some(Bw10));
        assert_eq!(min_channel_bandwidth(79, Scs30), Some(Bw40));
        assert_eq!(min_channel_bandwidth(257, Scs120), Some(Bw50));
        assert_eq!(min_channel_bandwidth(3, Scs120), None);
    }

    #[test]
    fn test_ssb_case_and_lmax() {
        assert_eq!(ssb_case(3, Scs15), Some(SsbCase::A));
        assert_eq!(ssb_case(66, Scs30), Some(SsbCase::B));
        assert_eq!(ssb_case(78, Scs30), Some(SsbCase::C));
        assert_eq!(ssb_case(78, Scs15), None);
        assert_eq!(ssb_l_max(3, 368_500, SsbCase::A), 4);
        assert_eq!(ssb_l_max(78, 632_628, SsbCase::C), 8);
        assert_eq!(ssb_l_max(257, 2_079_167, SsbCase::D), 64);
        assert_eq!(SsbCase::A.slot_of_ssb(3), 1);
        assert_eq!(SsbCase::B.slot_of_ssb(5), 2);
    }
}
