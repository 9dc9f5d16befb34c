//! Common Utilities
//!
//! Provides grid sizing and slot timing helpers used across the cell configuration crates

use crate::types::{Bandwidth, FrequencyRange, SubcarrierSpacing};
use tracing::trace;

/// Transmission bandwidth N_RB per (SCS, channel bandwidth)
/// (TS 38.101-1 Table 5.3.2-1, TS 38.101-2 Table 5.3.2-1)
const FR1_NRB_TABLE: &[(SubcarrierSpacing, &[(u32, u32)])] = &[
    (
        SubcarrierSpacing::Scs15,
        &[(5, 25), (10, 52), (15, 79), (20, 106), (25, 133), (30, 160), (40, 216), (50, 270)],
    ),
    (
        SubcarrierSpacing::Scs30,
        &[
            (5, 11), (10, 24), (15, 38), (20, 51), (25, 65), (30, 78), (40, 106),
            (50, 133), (60, 162), (70, 189), (80, 217), (90, 245), (100, 273),
        ],
    ),
    (
        SubcarrierSpacing::Scs60,
        &[
            (10, 11), (15, 18), (20, 24), (25, 31), (30, 38), (40, 51), (50, 65),
            (60, 79), (70, 93), (80, 107), (90, 121), (100, 135),
        ],
    ),
];

const FR2_NRB_TABLE: &[(SubcarrierSpacing, &[(u32, u32)])] = &[
    (SubcarrierSpacing::Scs60, &[(50, 66), (100, 132), (200, 264)]),
    (SubcarrierSpacing::Scs120, &[(50, 32), (100, 66), (200, 132), (400, 264)]),
];

/// Number of CRBs of a carrier, or `None` when the combination is not defined
pub fn nof_crbs(bw: Bandwidth, scs: SubcarrierSpacing, fr: FrequencyRange) -> Option<u32> {
    let table = match fr {
        FrequencyRange::Fr1 => FR1_NRB_TABLE,
        FrequencyRange::Fr2 => FR2_NRB_TABLE,
    };
    let nrb = table
        .iter()
        .find(|(s, _)| *s == scs)
        .and_then(|(_, rows)| rows.iter().find(|(mhz, _)| *mhz == bw.mhz()))
        .map(|(_, nrb)| *nrb);
    trace!("N_RB for {} MHz at {} kHz ({:?}): {:?}", bw.mhz(), scs.khz(), fr, nrb);
    nrb
}

/// Greatest common divisor
pub fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Least common multiple
pub fn lcm(a: u32, b: u32) -> u32 {
    if a == 0 || b == 0 {
        return 0;
    }
    a / gcd(a, b) * b
}

/// Integer division rounding up
pub fn div_ceil(num: u32, den: u32) -> u32 {
    (num + den - 1) / den
}

/// Time utilities for slot/frame calculations
pub mod time {
    use crate::types::SubcarrierSpacing;

    /// Slot duration in nanoseconds
    pub fn slot_duration_ns(scs: SubcarrierSpacing) -> u64 {
        1_000_000 / scs.slots_per_subframe() as u64
    }

    /// Slot duration in microseconds, rounded down
    pub fn slot_duration_us(scs: SubcarrierSpacing) -> u32 {
        (slot_duration_ns(scs) / 1000) as u32
    }

    /// Number of whole slots covering `ms` milliseconds
    pub fn ms_to_slots(ms: u32, scs: SubcarrierSpacing) -> u32 {
        ms * scs.slots_per_subframe()
    }

    /// Number of slots spanning `us` microseconds, rounded up
    pub fn us_to_slots_ceil(us: u64, scs: SubcarrierSpacing) -> u32 {
        let slot_ns = slot_duration_ns(scs);
        ((us * 1000 + slot_ns - 1) / slot_ns) as u32
    }
}
