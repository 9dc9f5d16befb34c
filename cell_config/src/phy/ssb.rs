//! SSB and CORESET#0 Placement
//!
//! Searches the synchronization raster for an SSB position whose CORESET#0
//! (TS 38.213 §13, multiplexing pattern 1) fits inside the carrier, and
//! derives the SSB and Type0-PDCCH (SIB1) slots of a cell.

use common::band::{self, SsbCase};
use common::types::{Bandwidth, FrequencyRange, SubcarrierSpacing, NOF_SUBCARRIERS_PER_RB};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Number of subcarriers of an SS/PBCH block
pub const SSB_NOF_SUBCARRIERS: u64 = 240;
/// Number of OFDM symbols of an SS/PBCH block
pub const SSB_NOF_SYMBOLS: u8 = 4;
/// DL symbols a slot needs to carry SSBs starting at symbol 2 or 8
pub const SSB_MIN_DL_SYMBOLS: u8 = 12;
/// Allowed SSB periodicities in ms
pub const SSB_PERIODS_MS: [u32; 6] = [5, 10, 20, 40, 80, 160];
/// SIB1 repetition period in ms for multiplexing pattern 1
pub const SIB1_PERIOD_MS: u32 = 20;

/// One row of a CORESET#0 table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Coreset0Entry {
    pub index: u8,
    pub nof_rbs: u32,
    pub nof_symbols: u8,
    /// Offset in RBs from the lowest CORESET#0 RB to the first CRB overlapping the SSB
    pub offset_rbs: u32,
}

const fn c0(index: u8, nof_rbs: u32, nof_symbols: u8, offset_rbs: u32) -> Coreset0Entry {
    Coreset0Entry {
        index,
        nof_rbs,
        nof_symbols,
        offset_rbs,
    }
}

/// Table 13-1: {SSB, PDCCH} SCS {15, 15} kHz
static TABLE_13_1: [Coreset0Entry; 15] = [
    c0(0, 24, 2, 0),
    c0(1, 24, 2, 2),
    c0(2, 24, 2, 4),
    c0(3, 24, 3, 0),
    c0(4, 24, 3, 2),
    c0(5, 24, 3, 4),
    c0(6, 48, 1, 12),
    c0(7, 48, 1, 16),
    c0(8, 48, 2, 12),
    c0(9, 48, 2, 16),
    c0(10, 48, 3, 12),
    c0(11, 48, 3, 16),
    c0(12, 96, 1, 38),
    c0(13, 96, 2, 38),
    c0(14, 96, 3, 38),
];

/// Table 13-2: {15, 30} kHz
static TABLE_13_2: [Coreset0Entry; 14] = [
    c0(0, 24, 2, 5),
    c0(1, 24, 2, 6),
    c0(2, 24, 2, 7),
    c0(3, 24, 2, 8),
    c0(4, 24, 3, 5),
    c0(5, 24, 3, 6),
    c0(6, 24, 3, 7),
    c0(7, 24, 3, 8),
    c0(8, 48, 1, 18),
    c0(9, 48, 1, 20),
    c0(10, 48, 2, 18),
    c0(11, 48, 2, 20),
    c0(12, 48, 3, 18),
    c0(13, 48, 3, 20),
];

/// Table 13-3: {30, 15} kHz
static TABLE_13_3: [Coreset0Entry; 9] = [
    c0(0, 48, 1, 2),
    c0(1, 48, 1, 6),
    c0(2, 48, 2, 2),
    c0(3, 48, 2, 6),
    c0(4, 48, 3, 2),
    c0(5, 48, 3, 6),
    c0(6, 96, 1, 28),
    c0(7, 96, 2, 28),
    c0(8, 96, 3, 28),
];

/// Table 13-4: {30, 30} kHz
static TABLE_13_4: [Coreset0Entry; 16] = [
    c0(0, 24, 2, 0),
    c0(1, 24, 2, 1),
    c0(2, 24, 2, 2),
    c0(3, 24, 2, 3),
    c0(4, 24, 2, 4),
    c0(5, 24, 3, 0),
    c0(6, 24, 3, 1),
    c0(7, 24, 3, 2),
    c0(8, 24, 3, 3),
    c0(9, 24, 3, 4),
    c0(10, 48, 1, 12),
    c0(11, 48, 1, 14),
    c0(12, 48, 1, 16),
    c0(13, 48, 2, 12),
    c0(14, 48, 2, 14),
    c0(15, 48, 2, 16),
];

/// Table 13-5: {30, 15} kHz, 40 MHz minimum channel bandwidth
static TABLE_13_5: [Coreset0Entry; 3] = [c0(0, 48, 1, 4), c0(1, 48, 2, 4), c0(2, 48, 3, 4)];

/// Table 13-6: {30, 30} kHz, 40 MHz minimum channel bandwidth
static TABLE_13_6: [Coreset0Entry; 10] = [
    c0(0, 24, 2, 0),
    c0(1, 24, 2, 4),
    c0(2, 24, 3, 0),
    c0(3, 24, 3, 4),
    c0(4, 48, 1, 0),
    c0(5, 48, 1, 28),
    c0(6, 48, 2, 0),
    c0(7, 48, 2, 28),
    c0(8, 48, 3, 0),
    c0(9, 48, 3, 28),
];

/// Table 13-7: {120, 60} kHz, multiplexing pattern 1 rows
static TABLE_13_7: [Coreset0Entry; 8] = [
    c0(0, 48, 1, 0),
    c0(1, 48, 1, 8),
    c0(2, 48, 2, 0),
    c0(3, 48, 2, 8),
    c0(4, 48, 3, 0),
    c0(5, 48, 3, 8),
    c0(6, 96, 1, 28),
    c0(7, 96, 2, 28),
];

/// Table 13-8: {120, 120} kHz, multiplexing pattern 1 rows
static TABLE_13_8: [Coreset0Entry; 4] = [c0(0, 24, 2, 0), c0(1, 24, 2, 4), c0(2, 48, 1, 14), c0(3, 48, 2, 14)];

/// CORESET#0 table for an SSB/PDCCH SCS pair
pub fn coreset0_table(
    ssb_scs: SubcarrierSpacing,
    pdcch_scs: SubcarrierSpacing,
    min_bw: Bandwidth,
) -> Option<&'static [Coreset0Entry]> {
    use SubcarrierSpacing::*;
    let wide = min_bw == Bandwidth::Bw40;
    match (ssb_scs, pdcch_scs, wide) {
        (Scs15, Scs15, false) => Some(&TABLE_13_1),
        (Scs15, Scs30, false) => Some(&TABLE_13_2),
        (Scs30, Scs15, false) => Some(&TABLE_13_3),
        (Scs30, Scs30, false) => Some(&TABLE_13_4),
        (Scs30, Scs15, true) => Some(&TABLE_13_5),
        (Scs30, Scs30, true) => Some(&TABLE_13_6),
        (Scs120, Scs60, _) => Some(&TABLE_13_7),
        (Scs120, Scs120, _) => Some(&TABLE_13_8),
        _ => None,
    }
}

/// Look up one CORESET#0 row
pub fn coreset0_entry(
    ssb_scs: SubcarrierSpacing,
    pdcch_scs: SubcarrierSpacing,
    min_bw: Bandwidth,
    index: u8,
) -> Option<&'static Coreset0Entry> {
    coreset0_table(ssb_scs, pdcch_scs, min_bw)?.iter().find(|e| e.index == index)
}

/// Carrier and SSB parameters of a placement search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementQuery {
    pub band: u16,
    pub dl_arfcn: u32,
    pub nof_crbs: u32,
    pub common_scs: SubcarrierSpacing,
    pub ssb_scs: SubcarrierSpacing,
    /// Operator-fixed CORESET#0 index
    pub coreset0_index: Option<u8>,
}

/// A compliant SSB/CORESET#0 position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SsbPlacement {
    pub gscn: u32,
    pub ss_ref_hz: u64,
    pub point_a_hz: u64,
    /// offsetToPointA in 15 kHz (FR1) or 60 kHz (FR2) RBs
    pub offset_to_point_a: u32,
    pub k_ssb: u32,
    /// First CRB overlapping the SSB
    pub ssb_crb: u32,
    pub coreset0: Coreset0Entry,
    /// First CRB of CORESET#0
    pub coreset0_start_crb: u32,
}

/// Try one (CORESET#0 row, GSCN) pair
fn place(
    query: &PlacementQuery,
    fr: FrequencyRange,
    point_a_hz: u64,
    entry: &Coreset0Entry,
    gscn: u32,
    ss_ref_hz: u64,
) -> Option<SsbPlacement> {
    let crb_hz = query.common_scs.hz() * NOF_SUBCARRIERS_PER_RB as u64;
    let ssb_low_hz = ss_ref_hz - SSB_NOF_SUBCARRIERS / 2 * query.ssb_scs.hz();
    let delta_hz = ssb_low_hz.checked_sub(point_a_hz)?;
    let ssb_crb = (delta_hz / crb_hz) as u32;
    let remainder_hz = delta_hz % crb_hz;

    let (k_ssb_unit_hz, k_ssb_max, offset_unit_khz) = match fr {
        FrequencyRange::Fr1 => (15_000, 23, 15),
        FrequencyRange::Fr2 => (query.common_scs.hz(), 11, 60),
    };
    if remainder_hz % k_ssb_unit_hz != 0 {
        return None;
    }
    let k_ssb = (remainder_hz / k_ssb_unit_hz) as u32;
    if k_ssb > k_ssb_max {
        return None;
    }

    let coreset0_start_crb = ssb_crb.checked_sub(entry.offset_rbs)?;
    if coreset0_start_crb + entry.nof_rbs > query.nof_crbs {
        return None;
    }
    Some(SsbPlacement {
        gscn,
        ss_ref_hz,
        point_a_hz,
        offset_to_point_a: ssb_crb * query.common_scs.khz() / offset_unit_khz,
        k_ssb,
        ssb_crb,
        coreset0: *entry,
        coreset0_start_crb,
    })
}

/// Find the first compliant SSB/CORESET#0 placement
///
/// CORESET#0 rows are tried from the highest index down (or only the fixed
/// one), GSCNs from the lowest up. The SSB must lie inside the carrier.
pub fn find_placement(query: &PlacementQuery) -> Option<SsbPlacement> {
    let fr = band::freq_range(query.band)?;
    let min_bw = band::min_channel_bandwidth(query.band, query.common_scs)?;
    let table = coreset0_table(query.ssb_scs, query.common_scs, min_bw)?;

    let center_hz = band::arfcn_to_freq_hz(query.dl_arfcn);
    let half_carrier_hz = query.nof_crbs as u64 * NOF_SUBCARRIERS_PER_RB as u64 * query.common_scs.hz() / 2;
    let point_a_hz = center_hz.checked_sub(half_carrier_hz)?;
    let half_ssb_hz = SSB_NOF_SUBCARRIERS / 2 * query.ssb_scs.hz();
    let low_hz = point_a_hz + half_ssb_hz;
    let high_hz = (center_hz + half_carrier_hz).checked_sub(half_ssb_hz)?;

    let placement = table
        .iter()
        .rev()
        .filter(|e| query.coreset0_index.map_or(true, |i| i == e.index))
        .flat_map(|entry| band::gscns_in_range(low_hz, high_hz).map(move |(gscn, f)| (entry, gscn, f)))
        .find_map(|(entry, gscn, ss_ref_hz)| {
            trace!("Trying CORESET#0 index {} at GSCN {}", entry.index, gscn);
            place(query, fr, point_a_hz, entry, gscn, ss_ref_hz)
        });

    debug!(
        "SSB placement for n{} ARFCN {} ({} CRBs): {:?}",
        query.band, query.dl_arfcn, query.nof_crbs, placement
    );
    placement
}

/// Slots carrying transmitted SSBs within the half frame, in common-SCS slots
///
/// Bit `i` of `bitmap` enables SSB index `i`.
pub fn ssb_slots(case: SsbCase, bitmap: u64, ssb_scs: SubcarrierSpacing, common_scs: SubcarrierSpacing) -> Vec<u32> {
    let ssb_slots_per_sf = ssb_scs.slots_per_subframe();
    let common_slots_per_sf = common_scs.slots_per_subframe();
    let slots: BTreeSet<u32> = transmitted_ssbs(bitmap)
        .map(|i| case.slot_of_ssb(i) * common_slots_per_sf / ssb_slots_per_sf)
        .collect();
    slots.into_iter().collect()
}

/// Indexes of the transmitted SSBs
pub fn transmitted_ssbs(bitmap: u64) -> impl Iterator<Item = u32> {
    (0..64).filter(move |i| bitmap & (1 << i) != 0)
}

/// Type0-PDCCH monitoring occasion parameters (TS 38.213 Tables 13-11/13-12)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchSpace0Entry {
    pub index: u8,
    /// O in half slots of 15 kHz
    pub o2: u32,
    pub sets_per_slot: u8,
    /// M doubled
    pub m2: u32,
    pub first_symbol: u8,
}

const fn ss0(index: u8, o2: u32, sets_per_slot: u8, m2: u32, first_symbol: u8) -> SearchSpace0Entry {
    SearchSpace0Entry {
        index,
        o2,
        sets_per_slot,
        m2,
        first_symbol,
    }
}

static TABLE_13_11: [SearchSpace0Entry; 16] = [
    ss0(0, 0, 1, 2, 0),
    ss0(1, 0, 2, 1, 0),
    ss0(2, 4, 1, 2, 0),
    ss0(3, 4, 2, 1, 0),
    ss0(4, 10, 1, 2, 0),
    ss0(5, 10, 2, 1, 0),
    ss0(6, 14, 1, 2, 0),
    ss0(7, 14, 2, 1, 0),
    ss0(8, 0, 1, 4, 0),
    ss0(9, 10, 1, 4, 0),
    ss0(10, 0, 1, 2, 1),
    ss0(11, 0, 1, 2, 2),
    ss0(12, 4, 1, 2, 1),
    ss0(13, 4, 1, 2, 2),
    ss0(14, 10, 1, 2, 1),
    ss0(15, 10, 1, 2, 2),
];

static TABLE_13_12: [SearchSpace0Entry; 14] = [
    ss0(0, 0, 1, 2, 0),
    ss0(1, 0, 2, 1, 0),
    ss0(2, 5, 1, 2, 0),
    ss0(3, 5, 2, 1, 0),
    ss0(4, 10, 1, 2, 0),
    ss0(5, 10, 2, 1, 0),
    ss0(6, 0, 2, 1, 0),
    ss0(7, 5, 2, 1, 0),
    ss0(8, 10, 2, 1, 0),
    ss0(9, 15, 1, 2, 0),
    ss0(10, 15, 2, 1, 0),
    ss0(11, 15, 2, 1, 0),
    ss0(12, 0, 1, 4, 0),
    ss0(13, 10, 1, 4, 0),
];

/// Look up a SearchSpace#0 row
pub fn search_space0(index: u8, fr: FrequencyRange) -> Option<&'static SearchSpace0Entry> {
    let table: &[SearchSpace0Entry] = match fr {
        FrequencyRange::Fr1 => &TABLE_13_11,
        FrequencyRange::Fr2 => &TABLE_13_12,
    };
    table.get(index as usize)
}

/// Slot n0 of the Type0-PDCCH occasion of each transmitted SSB, within the SIB1 period
///
/// The occasion of SSB `i` is `O * 2^mu + floor(i * M)`, taken over two frames.
pub fn sib1_slots(entry: &SearchSpace0Entry, bitmap: u64, common_scs: SubcarrierSpacing) -> Vec<u32> {
    let two_frames = 2 * common_scs.slots_per_frame();
    let offset = entry.o2 * common_scs.slots_per_subframe() / 2;
    let slots: BTreeSet<u32> = transmitted_ssbs(bitmap)
        .map(|i| (offset + i * entry.m2 / 2) % two_frames)
        .collect();
    slots.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::SubcarrierSpacing::*;

    fn n78_query() -> PlacementQuery {
        PlacementQuery {
            band: 78,
            dl_arfcn: 632_628,
            nof_crbs: 51,
            common_scs: Scs30,
            ssb_scs: Scs30,
            coreset0_index: None,
        }
    }

    #[test]
    fn test_n78_placement() {
        let placement = find_placement(&n78_query()).unwrap();
        assert_eq!(placement.coreset0.index, 15);
        assert_eq!(placement.gscn, 7839);
        assert_eq!(placement.ss_ref_hz, 3_489_600_000);
        assert_eq!(placement.k_ssb, 0);
        assert_eq!(placement.coreset0_start_crb, 0);
        assert_eq!(placement.offset_to_point_a, 32);
    }

    #[test]
    fn test_n3_placement() {
        let query = PlacementQuery {
            band: 3,
            dl_arfcn: 368_500,
            nof_crbs: 52,
            common_scs: Scs15,
            ssb_scs: Scs15,
            coreset0_index: None,
        };
        let placement = find_placement(&query).unwrap();
        assert_eq!(placement.coreset0.index, 11);
        assert_eq!(placement.ss_ref_hz, 1_843_250_000);
        assert_eq!(placement.k_ssb, 2);
        assert_eq!(placement.coreset0_start_crb, 4);
    }

    #[test]
    fn test_n79_uses_wide_table() {
        let query = PlacementQuery {
            band: 79,
            dl_arfcn: 720_000,
            nof_crbs: 106,
            common_scs: Scs30,
            ssb_scs: Scs30,
            coreset0_index: None,
        };
        let placement = find_placement(&query).unwrap();
        assert_eq!(placement.coreset0.index, 9);
        assert_eq!(placement.gscn, 8746);
        assert_eq!(placement.coreset0_start_crb, 3);
    }

    #[test]
    fn test_fr2_placement() {
        let query = PlacementQuery {
            band: 257,
            dl_arfcn: 2_079_167,
            nof_crbs: 66,
            common_scs: Scs120,
            ssb_scs: Scs120,
            coreset0_index: None,
        };
        let placement = find_placement(&query).unwrap();
        assert_eq!(placement.coreset0.index, 3);
        assert!(placement.k_ssb <= 11);
        assert!(placement.coreset0_start_crb + placement.coreset0.nof_rbs <= 66);
    }

    #[test]
    fn test_fixed_index() {
        let query = PlacementQuery {
            coreset0_index: Some(6),
            ..n78_query()
        };
        let placement = find_placement(&query).unwrap();
        assert_eq!(placement.coreset0.index, 6);

        // Table 13-4 stops at index 15
        let query = PlacementQuery {
            coreset0_index: Some(16),
            ..n78_query()
        };
        assert!(find_placement(&query).is_none());
    }

    #[test]
    fn test_carrier_too_narrow() {
        let query = PlacementQuery {
            nof_crbs: 11,
            ..n78_query()
        };
        assert!(find_placement(&query).is_none());
    }

    #[test]
    fn test_ssb_slots() {
        assert_eq!(ssb_slots(SsbCase::C, 0b1, Scs30, Scs30), vec![0]);
        assert_eq!(ssb_slots(SsbCase::C, 0b1111, Scs30, Scs30), vec![0, 1]);
        assert_eq!(ssb_slots(SsbCase::A, 0b1111, Scs15, Scs30), vec![0, 2]);
        assert_eq!(ssb_slots(SsbCase::B, 0b1111_0000, Scs30, Scs30), vec![2, 3]);
    }

    #[test]
    fn test_sib1_slots() {
        let ss0 = search_space0(0, FrequencyRange::Fr1).unwrap();
        assert_eq!(sib1_slots(ss0, 0b1, Scs30), vec![0]);
        assert_eq!(sib1_slots(ss0, 0b11, Scs30), vec![0, 1]);

        let ss0 = search_space0(4, FrequencyRange::Fr1).unwrap();
        assert_eq!(sib1_slots(ss0, 0b1, Scs30), vec![10]);
        assert_eq!(sib1_slots(ss0, 0b1, Scs15), vec![5]);

        assert!(search_space0(16, FrequencyRange::Fr1).is_none());
        assert!(search_space0(14, FrequencyRange::Fr2).is_none());
    }
}
