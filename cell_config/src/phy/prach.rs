//! PRACH (Physical Random Access Channel) Compliance
//!
//! Validates and derives PRACH configuration according to 3GPP TS 38.211
//! §6.3.3: configuration index tables, zero correlation zone, root
//! sequences, occasion placement inside a TDD pattern and RB usage.

use super::tdd::TddSlotMap;
use common::types::{DuplexMode, FrequencyRange, SubcarrierSpacing};
use common::utils::{div_ceil, lcm};
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::{debug, trace};

/// PRACH constants according to 3GPP
pub mod constants {
    /// Long sequence length (for formats 0-3)
    pub const LONG_SEQUENCE_LENGTH: u32 = 839;
    /// Short sequence length (for formats A1-C2)
    pub const SHORT_SEQUENCE_LENGTH: u32 = 139;
    /// Number of preambles per PRACH occasion
    pub const NOF_PREAMBLES: u32 = 64;
    /// Largest logical root sequence index for long sequences
    pub const MAX_LONG_ROOT_SEQUENCE: u16 = 837;
    /// Largest logical root sequence index for short sequences
    pub const MAX_SHORT_ROOT_SEQUENCE: u16 = 137;
}

/// PRACH preamble format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrachFormat {
    /// Format 0: 839 sequence length, 1 ms
    Format0,
    /// Format 1: 839 sequence length, 3 ms
    Format1,
    /// Format 2: 839 sequence length, 3.5 ms
    Format2,
    /// Format 3: 839 sequence length, 5 kHz spacing, 1 ms
    Format3,
    /// Format A1: 139 sequence length, 2 symbols
    FormatA1,
    /// Format B4: 139 sequence length, 12 symbols
    FormatB4,
}

impl PrachFormat {
    /// Check if this is a long preamble format
    pub fn is_long(&self) -> bool {
        matches!(self, Self::Format0 | Self::Format1 | Self::Format2 | Self::Format3)
    }

    /// Get sequence length for this format
    pub fn sequence_length(&self) -> u32 {
        if self.is_long() {
            constants::LONG_SEQUENCE_LENGTH
        } else {
            constants::SHORT_SEQUENCE_LENGTH
        }
    }

    /// Largest valid logical root sequence index
    pub fn max_root_sequence(&self) -> u16 {
        if self.is_long() {
            constants::MAX_LONG_ROOT_SEQUENCE
        } else {
            constants::MAX_SHORT_ROOT_SEQUENCE
        }
    }

    /// Subframes covered by one long-format occasion
    fn nof_subframes(&self) -> u32 {
        match self {
            Self::Format1 => 3,
            Self::Format2 => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for PrachFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Format0 => "0",
            Self::Format1 => "1",
            Self::Format2 => "2",
            Self::Format3 => "3",
            Self::FormatA1 => "A1",
            Self::FormatB4 => "B4",
        };
        f.write_str(name)
    }
}

/// Restricted set configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RestrictedSetConfig {
    #[default]
    UnrestrictedSet,
    RestrictedSetTypeA,
    RestrictedSetTypeB,
}

/// PRACH configuration index entry from 3GPP tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrachConfigurationIndex {
    /// PRACH format
    pub format: PrachFormat,
    /// System frame period (x)
    pub x: u32,
    /// System frame offsets (y)
    pub y: &'static [u32],
    /// Subframe numbers (FR1) or 60 kHz slot numbers (FR2) within a radio frame
    pub subframe_numbers: &'static [u32],
    /// Starting symbol
    pub starting_symbol: u8,
    /// Number of PRACH slots within a subframe (FR1) or 60 kHz slot (FR2)
    pub num_prach_slots_within_subframe: u8,
    /// Number of time-domain PRACH occasions within a PRACH slot
    pub num_occasions_within_slot: u8,
    /// PRACH duration in symbols (short formats)
    pub duration: u8,
}

const fn long(format: PrachFormat, x: u32, y: &'static [u32], subframes: &'static [u32]) -> PrachConfigurationIndex {
    PrachConfigurationIndex {
        format,
        x,
        y,
        subframe_numbers: subframes,
        starting_symbol: 0,
        num_prach_slots_within_subframe: 1,
        num_occasions_within_slot: 1,
        duration: 0,
    }
}

const fn short(
    format: PrachFormat,
    x: u32,
    y: &'static [u32],
    subframes: &'static [u32],
    starting_symbol: u8,
    nof_slots: u8,
    nof_occasions: u8,
) -> PrachConfigurationIndex {
    let duration = match format {
        PrachFormat::FormatB4 => 12,
        _ => 2,
    };
    PrachConfigurationIndex {
        format,
        x,
        y,
        subframe_numbers: subframes,
        starting_symbol,
        num_prach_slots_within_subframe: nof_slots,
        num_occasions_within_slot: nof_occasions,
        duration,
    }
}

use PrachFormat::*;

const Y0: &[u32] = &[0];
const Y1: &[u32] = &[1];
const Y12: &[u32] = &[1, 2];
const ALL_SF: &[u32] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
const EVEN_SF: &[u32] = &[0, 2, 4, 6, 8];
const ODD_SF: &[u32] = &[1, 3, 5, 7, 9];

/// TS 38.211 Table 6.3.3.2-2, FR1 paired spectrum, indices 0..=107
static FR1_FDD_TABLE: [PrachConfigurationIndex; 108] = [
    long(Format0, 16, Y1, &[1]),
    long(Format0, 16, Y1, &[4]),
    long(Format0, 16, Y1, &[7]),
    long(Format0, 16, Y1, &[9]),
    long(Format0, 8, Y1, &[1]),
    long(Format0, 8, Y1, &[4]),
    long(Format0, 8, Y1, &[7]),
    long(Format0, 8, Y1, &[9]),
    long(Format0, 4, Y1, &[1]),
    long(Format0, 4, Y1, &[4]),
    long(Format0, 4, Y1, &[7]),
    long(Format0, 4, Y1, &[9]),
    long(Format0, 2, Y1, &[1]),
    long(Format0, 2, Y1, &[4]),
    long(Format0, 2, Y1, &[7]),
    long(Format0, 2, Y1, &[9]),
    long(Format0, 1, Y0, &[1]),
    long(Format0, 1, Y0, &[4]),
    long(Format0, 1, Y0, &[7]),
    long(Format0, 1, Y0, &[1, 6]),
    long(Format0, 1, Y0, &[2, 7]),
    long(Format0, 1, Y0, &[3, 8]),
    long(Format0, 1, Y0, &[1, 4, 7]),
    long(Format0, 1, Y0, &[2, 5, 8]),
    long(Format0, 1, Y0, &[3, 6, 9]),
    long(Format0, 1, Y0, EVEN_SF),
    long(Format0, 1, Y0, ODD_SF),
    long(Format0, 1, Y0, ALL_SF),
    // 28
    long(Format1, 16, Y1, &[1]),
    long(Format1, 16, Y1, &[4]),
    long(Format1, 16, Y1, &[7]),
    long(Format1, 16, Y1, &[9]),
    long(Format1, 8, Y1, &[1]),
    long(Format1, 8, Y1, &[4]),
    long(Format1, 8, Y1, &[7]),
    long(Format1, 8, Y1, &[9]),
    long(Format1, 4, Y1, &[1]),
    long(Format1, 4, Y1, &[4]),
    long(Format1, 4, Y1, &[7]),
    long(Format1, 4, Y1, &[9]),
    long(Format1, 2, Y1, &[1]),
    long(Format1, 2, Y1, &[4]),
    long(Format1, 2, Y1, &[7]),
    long(Format1, 2, Y1, &[9]),
    long(Format1, 1, Y0, &[1]),
    long(Format1, 1, Y0, &[4]),
    long(Format1, 1, Y0, &[7]),
    long(Format1, 1, Y0, &[1, 6]),
    long(Format1, 1, Y0, &[2, 7]),
    long(Format1, 1, Y0, &[3, 8]),
    long(Format1, 1, Y0, &[1, 4, 7]),
    long(Format1, 1, Y0, &[2, 5, 8]),
    long(Format1, 1, Y0, &[3, 6, 9]),
    // 53
    long(Format2, 16, Y1, &[1]),
    long(Format2, 8, Y1, &[1]),
    long(Format2, 4, Y0, &[1]),
    long(Format2, 2, Y0, &[1]),
    long(Format2, 2, Y0, &[5]),
    long(Format2, 1, Y0, &[1]),
    long(Format2, 1, Y0, &[5]),
    // 60
    long(Format3, 16, Y1, &[1]),
    long(Format3, 16, Y1, &[4]),
    long(Format3, 16, Y1, &[7]),
    long(Format3, 16, Y1, &[9]),
    long(Format3, 8, Y1, &[1]),
    long(Format3, 8, Y1, &[4]),
    long(Format3, 8, Y1, &[7]),
    long(Format3, 4, Y1, &[1]),
    long(Format3, 4, Y1, &[4]),
    long(Format3, 4, Y1, &[7]),
    long(Format3, 2, Y1, &[1]),
    long(Format3, 2, Y1, &[4]),
    long(Format3, 2, Y1, &[7]),
    long(Format3, 1, Y0, &[1]),
    long(Format3, 1, Y0, &[4]),
    long(Format3, 1, Y0, &[7]),
    long(Format3, 1, Y0, &[1, 6]),
    long(Format3, 1, Y0, &[2, 7]),
    long(Format3, 1, Y0, &[3, 8]),
    long(Format3, 1, Y0, &[1, 4, 7]),
    long(Format3, 1, Y0, &[2, 5, 8]),
    long(Format3, 1, Y0, &[3, 6, 9]),
    long(Format3, 1, Y0, EVEN_SF),
    long(Format3, 1, Y0, ODD_SF),
    long(Format3, 1, Y0, ALL_SF),
    long(Format3, 2, Y1, &[9]),
    long(Format3, 1, Y0, &[9]),
    // 87
    short(FormatA1, 16, Y0, &[4, 9], 0, 1, 6),
    short(FormatA1, 16, Y1, &[4], 0, 2, 6),
    short(FormatA1, 8, Y0, &[4, 9], 0, 1, 6),
    short(FormatA1, 8, Y1, &[4], 0, 2, 6),
    short(FormatA1, 4, Y0, &[4, 9], 0, 1, 6),
    short(FormatA1, 4, Y1, &[4, 9], 0, 1, 6),
    short(FormatA1, 4, Y0, &[4], 0, 2, 6),
    short(FormatA1, 2, Y1, &[4, 9], 0, 1, 6),
    short(FormatA1, 2, Y0, &[1], 0, 2, 6),
    short(FormatA1, 2, Y0, &[4], 0, 2, 6),
    short(FormatA1, 2, Y0, &[7], 0, 2, 6),
    short(FormatA1, 2, Y0, &[9], 0, 2, 6),
    short(FormatA1, 1, Y0, &[4], 0, 2, 6),
    short(FormatA1, 1, Y0, &[1, 6], 0, 1, 6),
    short(FormatA1, 1, Y0, &[4, 9], 0, 1, 6),
    short(FormatA1, 1, Y0, &[2, 7], 0, 2, 6),
    short(FormatA1, 1, Y0, &[1, 4, 7], 0, 1, 6),
    short(FormatA1, 1, Y0, &[2, 5, 8], 0, 1, 6),
    short(FormatA1, 1, Y0, &[3, 6, 9], 0, 2, 6),
    short(FormatA1, 1, Y0, EVEN_SF, 0, 1, 6),
    short(FormatA1, 1, Y0, ODD_SF, 0, 1, 6),
];

/// TS 38.211 Table 6.3.3.2-2, FR1 paired spectrum, indices 198..=218
static FR1_FDD_B4_TABLE: [PrachConfigurationIndex; 21] = [
    short(FormatB4, 16, Y0, &[4, 9], 0, 1, 1),
    short(FormatB4, 16, Y1, &[4], 0, 2, 1),
    short(FormatB4, 8, Y0, &[4, 9], 0, 1, 1),
    short(FormatB4, 8, Y1, &[4], 0, 2, 1),
    short(FormatB4, 4, Y0, &[4, 9], 0, 1, 1),
    short(FormatB4, 4, Y1, &[4, 9], 0, 1, 1),
    short(FormatB4, 4, Y0, &[4], 0, 2, 1),
    short(FormatB4, 2, Y1, &[4, 9], 0, 1, 1),
    short(FormatB4, 2, Y0, &[1], 0, 2, 1),
    short(FormatB4, 2, Y0, &[4], 0, 2, 1),
    short(FormatB4, 2, Y0, &[7], 0, 2, 1),
    short(FormatB4, 2, Y0, &[9], 0, 2, 1),
    short(FormatB4, 1, Y0, &[4], 0, 2, 1),
    short(FormatB4, 1, Y0, &[1, 6], 0, 1, 1),
    short(FormatB4, 1, Y0, &[4, 9], 0, 1, 1),
    short(FormatB4, 1, Y0, &[2, 7], 0, 2, 1),
    short(FormatB4, 1, Y0, &[1, 4, 7], 0, 1, 1),
    short(FormatB4, 1, Y0, &[2, 5, 8], 0, 1, 1),
    short(FormatB4, 1, Y0, &[3, 6, 9], 0, 2, 1),
    short(FormatB4, 1, Y0, EVEN_SF, 0, 1, 1),
    short(FormatB4, 1, Y0, ODD_SF, 0, 1, 1),
];

/// TS 38.211 Table 6.3.3.2-3, FR1 unpaired spectrum, indices 0..=86
static FR1_TDD_TABLE: [PrachConfigurationIndex; 87] = [
    long(Format0, 16, Y1, &[9]),
    long(Format0, 8, Y1, &[9]),
    long(Format0, 4, Y1, &[9]),
    long(Format0, 2, Y0, &[9]),
    long(Format0, 2, Y1, &[9]),
    long(Format0, 2, Y0, &[4]),
    long(Format0, 2, Y1, &[4]),
    long(Format0, 1, Y0, &[9]),
    long(Format0, 1, Y0, &[8]),
    long(Format0, 1, Y0, &[7]),
    long(Format0, 1, Y0, &[6]),
    long(Format0, 1, Y0, &[5]),
    long(Format0, 1, Y0, &[4]),
    long(Format0, 1, Y0, &[3]),
    long(Format0, 1, Y0, &[2]),
    long(Format0, 1, Y0, &[1, 6]),
    long(Format0, 1, Y0, &[1, 6]),
    long(Format0, 1, Y0, &[4, 9]),
    long(Format0, 1, Y0, &[3, 8]),
    long(Format0, 1, Y0, &[2, 7]),
    long(Format0, 1, Y0, &[8, 9]),
    long(Format0, 1, Y0, &[4, 8, 9]),
    long(Format0, 1, Y0, &[3, 4, 9]),
    long(Format0, 1, Y0, &[7, 8, 9]),
    long(Format0, 1, Y0, &[3, 4, 8, 9]),
    long(Format0, 1, Y0, &[6, 7, 8, 9]),
    long(Format0, 1, Y0, &[1, 4, 6, 9]),
    long(Format0, 1, Y0, ODD_SF),
    // 28
    long(Format1, 16, Y1, &[7]),
    long(Format1, 8, Y1, &[7]),
    long(Format1, 4, Y1, &[7]),
    long(Format1, 2, Y0, &[7]),
    long(Format1, 2, Y1, &[7]),
    long(Format1, 1, Y0, &[7]),
    // 34
    long(Format2, 16, Y1, &[6]),
    long(Format2, 8, Y1, &[6]),
    long(Format2, 4, Y1, &[6]),
    long(Format2, 2, Y0, &[6]),
    long(Format2, 2, Y1, &[6]),
    long(Format2, 1, Y0, &[6]),
    // 40
    long(Format3, 16, Y1, &[9]),
    long(Format3, 8, Y1, &[9]),
    long(Format3, 4, Y1, &[9]),
    long(Format3, 2, Y0, &[9]),
    long(Format3, 2, Y1, &[9]),
    long(Format3, 2, Y0, &[4]),
    long(Format3, 2, Y1, &[4]),
    long(Format3, 1, Y0, &[9]),
    long(Format3, 1, Y0, &[8]),
    long(Format3, 1, Y0, &[7]),
    long(Format3, 1, Y0, &[6]),
    long(Format3, 1, Y0, &[5]),
    long(Format3, 1, Y0, &[4]),
    long(Format3, 1, Y0, &[3]),
    long(Format3, 1, Y0, &[2]),
    long(Format3, 1, Y0, &[1, 6]),
    long(Format3, 1, Y0, &[1, 6]),
    long(Format3, 1, Y0, &[4, 9]),
    long(Format3, 1, Y0, &[3, 8]),
    long(Format3, 1, Y0, &[2, 7]),
    long(Format3, 1, Y0, &[8, 9]),
    long(Format3, 1, Y0, &[4, 8, 9]),
    long(Format3, 1, Y0, &[3, 4, 9]),
    long(Format3, 1, Y0, &[7, 8, 9]),
    long(Format3, 1, Y0, &[3, 4, 8, 9]),
    long(Format3, 1, Y0, &[1, 4, 6, 9]),
    long(Format3, 1, Y0, ODD_SF),
    // 67
    short(FormatA1, 16, Y1, &[9], 0, 2, 6),
    short(FormatA1, 8, Y1, &[9], 0, 2, 6),
    short(FormatA1, 4, Y1, &[9], 0, 1, 6),
    short(FormatA1, 2, Y1, &[9], 0, 1, 6),
    short(FormatA1, 2, Y1, &[4, 9], 7, 1, 3),
    short(FormatA1, 2, Y1, &[4, 9], 0, 1, 6),
    short(FormatA1, 2, Y1, &[9], 0, 2, 6),
    short(FormatA1, 1, Y0, &[9], 0, 2, 6),
    short(FormatA1, 1, Y0, &[9], 7, 1, 3),
    short(FormatA1, 1, Y0, &[9], 0, 1, 6),
    short(FormatA1, 1, Y0, &[8, 9], 0, 2, 6),
    short(FormatA1, 1, Y0, &[4, 9], 0, 1, 6),
    short(FormatA1, 1, Y0, &[7, 9], 7, 1, 3),
    short(FormatA1, 1, Y0, &[3, 4, 8, 9], 0, 1, 6),
    short(FormatA1, 1, Y0, &[3, 4, 8, 9], 7, 1, 3),
    short(FormatA1, 1, Y0, ODD_SF, 7, 1, 3),
    short(FormatA1, 1, Y0, ALL_SF, 7, 1, 3),
    short(FormatA1, 1, Y0, ODD_SF, 0, 1, 6),
    short(FormatA1, 1, Y0, ALL_SF, 0, 1, 6),
    short(FormatA1, 1, Y0, &[7, 9], 0, 1, 6),
];

/// TS 38.211 Table 6.3.3.2-3, FR1 unpaired spectrum, indices 145..=168
static FR1_TDD_B4_TABLE: [PrachConfigurationIndex; 24] = [
    short(FormatB4, 16, Y1, &[9], 0, 2, 1),
    short(FormatB4, 8, Y1, &[9], 0, 2, 1),
    short(FormatB4, 4, Y1, &[9], 2, 1, 1),
    short(FormatB4, 2, Y1, &[9], 0, 2, 1),
    short(FormatB4, 2, Y1, &[9], 2, 1, 1),
    short(FormatB4, 2, Y1, &[4, 9], 2, 1, 1),
    short(FormatB4, 1, Y0, &[9], 0, 2, 1),
    short(FormatB4, 1, Y0, &[9], 2, 1, 1),
    short(FormatB4, 1, Y0, &[4, 9], 2, 1, 1),
    short(FormatB4, 1, Y0, &[4, 9], 0, 1, 1),
    short(FormatB4, 1, Y0, &[8, 9], 0, 2, 1),
    short(FormatB4, 1, Y0, &[3, 4, 8, 9], 2, 1, 1),
    short(FormatB4, 1, Y0, ODD_SF, 2, 1, 1),
    short(FormatB4, 1, Y0, ALL_SF, 0, 2, 1),
    short(FormatB4, 1, Y0, ALL_SF, 2, 1, 1),
    short(FormatB4, 1, Y0, &[6, 7, 8, 9], 2, 1, 1),
    short(FormatB4, 1, Y0, &[7, 9], 2, 1, 1),
    short(FormatB4, 1, Y0, &[2, 3, 4, 7, 8, 9], 2, 1, 1),
    short(FormatB4, 1, Y0, &[8, 9], 2, 1, 1),
    short(FormatB4, 1, Y0, &[4, 9], 0, 2, 1),
    short(FormatB4, 2, Y1, &[4, 9], 0, 2, 1),
    short(FormatB4, 1, Y0, &[3, 8], 2, 1, 1),
    short(FormatB4, 1, Y0, &[5, 6, 7, 8, 9], 2, 1, 1),
    short(FormatB4, 1, Y0, &[2, 7], 2, 1, 1),
];

const FR2_S1: &[u32] = &[4, 9, 14, 19, 24, 29, 34, 39];
const FR2_S2: &[u32] = &[3, 7, 11, 15, 19, 23, 27, 31, 35, 39];
const FR2_S3: &[u32] = &[9, 19, 29, 39];
const FR2_S4: &[u32] = &[7, 15, 23, 31, 39];
const FR2_S5: &[u32] = &[23, 39];
const FR2_S6: &[u32] = &[19, 39];
const FR2_S7: &[u32] = &[39];
const FR2_S8: &[u32] = &[24, 29, 34, 39];

/// TS 38.211 Table 6.3.3.2-4, FR2 unpaired spectrum, indices 0..=27
static FR2_TDD_TABLE: [PrachConfigurationIndex; 28] = [
    short(FormatA1, 16, Y1, FR2_S1, 0, 2, 6),
    short(FormatA1, 8, Y12, FR2_S1, 0, 2, 6),
    short(FormatA1, 8, Y12, FR2_S2, 0, 1, 6),
    short(FormatA1, 4, Y1, FR2_S1, 0, 1, 6),
    short(FormatA1, 4, Y1, FR2_S2, 0, 1, 6),
    short(FormatA1, 4, Y1, FR2_S3, 0, 1, 6),
    short(FormatA1, 4, Y1, FR2_S4, 0, 1, 6),
    short(FormatA1, 2, Y1, FR2_S5, 7, 1, 3),
    short(FormatA1, 2, Y1, FR2_S6, 0, 2, 6),
    short(FormatA1, 2, Y1, FR2_S7, 0, 2, 6),
    short(FormatA1, 1, Y0, FR2_S1, 0, 1, 6),
    short(FormatA1, 1, Y0, FR2_S1, 7, 1, 3),
    short(FormatA1, 1, Y0, FR2_S2, 0, 1, 6),
    short(FormatA1, 1, Y0, FR2_S3, 0, 2, 6),
    short(FormatA1, 1, Y0, FR2_S3, 7, 1, 3),
    short(FormatA1, 1, Y0, FR2_S4, 0, 1, 6),
    short(FormatA1, 1, Y0, FR2_S5, 0, 2, 6),
    short(FormatA1, 1, Y0, FR2_S6, 0, 2, 6),
    short(FormatA1, 1, Y0, FR2_S7, 0, 2, 6),
    short(FormatA1, 1, Y0, FR2_S7, 7, 1, 3),
    short(FormatA1, 1, Y0, FR2_S8, 0, 1, 6),
    short(FormatA1, 1, Y0, FR2_S8, 7, 2, 3),
    short(FormatA1, 1, Y0, FR2_S5, 7, 1, 3),
    short(FormatA1, 1, Y0, FR2_S6, 7, 1, 3),
    short(FormatA1, 1, Y0, FR2_S4, 7, 2, 3),
    short(FormatA1, 1, Y0, FR2_S2, 7, 1, 3),
    short(FormatA1, 1, Y0, FR2_S1, 0, 2, 6),
    short(FormatA1, 1, Y0, FR2_S3, 0, 1, 6),
];

/// TS 38.211 Table 6.3.3.2-4, FR2 unpaired spectrum, indices 112..=143
static FR2_TDD_B4_TABLE: [PrachConfigurationIndex; 32] = [
    short(FormatB4, 16, Y1, FR2_S1, 2, 2, 1),
    short(FormatB4, 8, Y12, FR2_S1, 2, 2, 1),
    short(FormatB4, 8, Y12, FR2_S2, 2, 1, 1),
    short(FormatB4, 4, Y1, FR2_S1, 2, 1, 1),
    short(FormatB4, 4, Y1, FR2_S2, 2, 1, 1),
    short(FormatB4, 4, Y1, FR2_S3, 0, 2, 1),
    short(FormatB4, 4, Y1, FR2_S4, 2, 2, 1),
    short(FormatB4, 2, Y1, FR2_S1, 2, 1, 1),
    short(FormatB4, 2, Y1, FR2_S2, 0, 1, 1),
    short(FormatB4, 2, Y1, FR2_S3, 2, 2, 1),
    short(FormatB4, 2, Y1, FR2_S4, 2, 1, 1),
    short(FormatB4, 2, Y1, FR2_S5, 2, 1, 1),
    short(FormatB4, 2, Y1, FR2_S6, 0, 2, 1),
    short(FormatB4, 2, Y1, FR2_S7, 0, 2, 1),
    short(FormatB4, 2, Y1, FR2_S8, 2, 1, 1),
    short(FormatB4, 1, Y0, FR2_S1, 2, 1, 1),
    short(FormatB4, 1, Y0, FR2_S1, 0, 2, 1),
    short(FormatB4, 1, Y0, FR2_S2, 2, 1, 1),
    short(FormatB4, 1, Y0, FR2_S2, 0, 2, 1),
    short(FormatB4, 1, Y0, FR2_S3, 2, 1, 1),
    short(FormatB4, 1, Y0, FR2_S3, 0, 2, 1),
    short(FormatB4, 1, Y0, FR2_S4, 2, 1, 1),
    short(FormatB4, 1, Y0, FR2_S4, 0, 2, 1),
    short(FormatB4, 1, Y0, FR2_S5, 2, 1, 1),
    short(FormatB4, 1, Y0, FR2_S5, 0, 2, 1),
    short(FormatB4, 1, Y0, FR2_S6, 2, 1, 1),
    short(FormatB4, 1, Y0, FR2_S6, 0, 2, 1),
    short(FormatB4, 1, Y0, FR2_S7, 2, 1, 1),
    short(FormatB4, 1, Y0, FR2_S7, 0, 2, 1),
    short(FormatB4, 1, Y0, FR2_S8, 2, 1, 1),
    short(FormatB4, 1, Y0, FR2_S8, 0, 2, 1),
    short(FormatB4, 2, Y1, FR2_S1, 0, 2, 1),
];

/// Configuration index intervals supported per (frequency range, duplex mode)
static SUPPORTED_INDEXES: [(FrequencyRange, DuplexMode, &[RangeInclusive<u8>]); 3] = [
    (FrequencyRange::Fr1, DuplexMode::Fdd, &[0..=107, 198..=218]),
    (FrequencyRange::Fr1, DuplexMode::Tdd, &[0..=86, 145..=168]),
    (FrequencyRange::Fr2, DuplexMode::Tdd, &[0..=27, 112..=143]),
];

/// Supported configuration index intervals for a (frequency range, duplex mode) pair
pub fn supported_index_ranges(fr: FrequencyRange, duplex: DuplexMode) -> &'static [RangeInclusive<u8>] {
    SUPPORTED_INDEXES
        .iter()
        .find(|(f, d, _)| *f == fr && *d == duplex)
        .map(|(_, _, ranges)| *ranges)
        .unwrap_or(&[])
}

/// Look up a configuration index row
pub fn prach_config(index: u8, fr: FrequencyRange, duplex: DuplexMode) -> Option<&'static PrachConfigurationIndex> {
    let i = index as usize;
    match (fr, duplex, index) {
        (FrequencyRange::Fr1, DuplexMode::Fdd, 0..=107) => FR1_FDD_TABLE.get(i),
        (FrequencyRange::Fr1, DuplexMode::Fdd, 198..=218) => FR1_FDD_B4_TABLE.get(i - 198),
        (FrequencyRange::Fr1, DuplexMode::Tdd, 0..=86) => FR1_TDD_TABLE.get(i),
        (FrequencyRange::Fr1, DuplexMode::Tdd, 145..=168) => FR1_TDD_B4_TABLE.get(i - 145),
        (FrequencyRange::Fr2, DuplexMode::Tdd, 0..=27) => FR2_TDD_TABLE.get(i),
        (FrequencyRange::Fr2, DuplexMode::Tdd, 112..=143) => FR2_TDD_B4_TABLE.get(i - 112),
        _ => None,
    }
}

/// Slots `[start, end)` of a PRACH occasion that are not all uplink
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("PRACH occasion in slots [{start}, {end}) is not fully uplink")]
pub struct SlotRange {
    pub start: u32,
    pub end: u32,
}

/// PRACH compliance errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrachError {
    #[error("Configuration index {index} is not supported for {fr:?} {duplex:?}")]
    UnsupportedConfigIndex { index: u8, fr: FrequencyRange, duplex: DuplexMode },

    #[error("Zero correlation zone {zcz} is not valid for format {format} in {duplex:?}")]
    InvalidZeroCorrelationZone { zcz: u8, format: PrachFormat, duplex: DuplexMode },

    #[error("Root sequence index {root} exceeds {max} for format {format}")]
    InvalidRootSequence { root: u16, max: u16, format: PrachFormat },

    #[error("Configuration index {index}: {range}")]
    NotInUplink { index: u8, range: SlotRange },

    #[error("No configuration index fits the TDD pattern")]
    NoValidConfigIndex,

    #[error("Invalid msg1-FDM value {0}")]
    InvalidMsg1Fdm(u8),

    #[error("PRACH RBs [{start}, {end}) exceed the UL BWP of {bwp_rbs} RBs")]
    FrequencyOutOfBwp { start: u32, end: u32, bwp_rbs: u32 },

    #[error("PRACH RBs [{start}, {end}) overlap PUCCH resources")]
    FrequencyOverlapsPucch { start: u32, end: u32 },

    #[error("Invalid preamble split: {total} total, {cb_per_ssb} contention based")]
    InvalidPreambleCount { total: u32, cb_per_ssb: u32 },

    #[error("Invalid number of SSBs per RACH occasion {0}")]
    InvalidSsbPerRo(u32),

    #[error("No PRACH frequency start avoids the PUCCH resources")]
    NoFreeFrequency,

    #[error("Format {format} is not defined for a {scs_khz} kHz UL BWP")]
    UnsupportedScs { format: PrachFormat, scs_khz: u32 },

    #[error("RA response window of {slots} slots is not allowed (maximum {max_slots})")]
    InvalidRaResponseWindow { slots: u32, max_slots: u32 },
}

/// Frequency range assumed when only the subcarrier spacing is known
pub fn freq_range_of(scs: SubcarrierSpacing) -> FrequencyRange {
    if scs >= SubcarrierSpacing::Scs120 {
        FrequencyRange::Fr2
    } else {
        FrequencyRange::Fr1
    }
}

/// Check that a configuration index belongs to the supported interval set
pub fn config_index_valid(index: u8, fr: FrequencyRange, duplex: DuplexMode) -> Result<(), PrachError> {
    let supported = supported_index_ranges(fr, duplex).iter().any(|r| r.contains(&index));
    if supported && prach_config(index, fr, duplex).is_some() {
        Ok(())
    } else {
        Err(PrachError::UnsupportedConfigIndex { index, fr, duplex })
    }
}

/// Check the zero correlation zone for the format of a configuration index
///
/// Format B4 accepts only 0 and one duplex-specific value, every other
/// format accepts the whole 0..=15 range.
pub fn zero_correlation_zone_valid(
    zcz: u8,
    index: u8,
    fr: FrequencyRange,
    duplex: DuplexMode,
) -> Result<(), PrachError> {
    let config = prach_config(index, fr, duplex).ok_or(PrachError::UnsupportedConfigIndex { index, fr, duplex })?;
    let valid = match config.format {
        FormatB4 => {
            let allowed = match duplex {
                DuplexMode::Fdd => 11,
                DuplexMode::Tdd => 14,
            };
            zcz == 0 || zcz == allowed
        }
        _ => zcz <= 15,
    };
    if valid {
        Ok(())
    } else {
        Err(PrachError::InvalidZeroCorrelationZone {
            zcz,
            format: config.format,
            duplex,
        })
    }
}

/// Check a logical root sequence index against the sequence length of the format
pub fn root_sequence_valid(root_index: u16, format: PrachFormat) -> Result<(), PrachError> {
    let max = format.max_root_sequence();
    if root_index <= max {
        Ok(())
    } else {
        Err(PrachError::InvalidRootSequence {
            root: root_index,
            max,
            format,
        })
    }
}

/// Slot ranges `[start, start + len)` within one frame occupied by the occasions of a row
fn occasion_slots(config: &PrachConfigurationIndex, scs: SubcarrierSpacing, fr: FrequencyRange) -> Vec<(u32, u32)> {
    let nof_prach_slots = config.num_prach_slots_within_subframe.max(1) as u32;
    config
        .subframe_numbers
        .iter()
        .map(|&n| {
            if config.format.is_long() {
                let sps = scs.slots_per_subframe();
                (n * sps, config.format.nof_subframes() * sps)
            } else {
                // Reference slots are subframes in FR1 and 60 kHz slots in FR2
                let per_ref = match fr {
                    FrequencyRange::Fr1 => scs.slots_per_subframe(),
                    FrequencyRange::Fr2 => (scs.khz() / 60).max(1),
                };
                let len = nof_prach_slots.min(per_ref);
                (n * per_ref + per_ref - len, len)
            }
        })
        .collect()
}

/// Check that every occasion of a TDD configuration index falls in fully uplink slots
pub fn fits_in_tdd_pattern(scs: SubcarrierSpacing, index: u8, tdd: &TddSlotMap) -> Result<(), SlotRange> {
    fits_in_tdd_pattern_in(freq_range_of(scs), scs, index, tdd)
}

/// [`fits_in_tdd_pattern`] with an explicit frequency range
///
/// Unknown configuration indexes report an empty slot range.
pub fn fits_in_tdd_pattern_in(
    fr: FrequencyRange,
    scs: SubcarrierSpacing,
    index: u8,
    tdd: &TddSlotMap,
) -> Result<(), SlotRange> {
    let config = prach_config(index, fr, DuplexMode::Tdd).ok_or(SlotRange { start: 0, end: 0 })?;
    let occasions = occasion_slots(config, scs, fr);
    let slots_per_frame = scs.slots_per_frame();
    // Every allowed TDD period divides 20 ms
    let nof_frames = lcm(config.x, 2);

    let bad = (0..nof_frames)
        .filter(|sfn| config.y.contains(&(sfn % config.x)))
        .flat_map(|sfn| {
            occasions
                .iter()
                .map(move |(start, len)| (sfn * slots_per_frame + start, sfn * slots_per_frame + start + len))
        })
        .find(|(start, end)| !(*start..*end).all(|slot| tdd.is_full_ul(slot)));

    match bad {
        Some((start, end)) => {
            trace!("PRACH index {} collides with non-UL slots [{}, {})", index, start, end);
            Err(SlotRange { start, end })
        }
        None => Ok(()),
    }
}

/// Find the first TDD configuration index that is supported, accepts `zcz` and fits the pattern
pub fn find_valid_index(scs: SubcarrierSpacing, zcz: u8, tdd: &TddSlotMap) -> Option<u8> {
    find_valid_index_in(freq_range_of(scs), scs, zcz, tdd)
}

/// [`find_valid_index`] with an explicit frequency range
pub fn find_valid_index_in(fr: FrequencyRange, scs: SubcarrierSpacing, zcz: u8, tdd: &TddSlotMap) -> Option<u8> {
    let found = (0..=u8::MAX)
        .filter(|&i| config_index_valid(i, fr, DuplexMode::Tdd).is_ok())
        .filter(|&i| zero_correlation_zone_valid(zcz, i, fr, DuplexMode::Tdd).is_ok())
        .find(|&i| fits_in_tdd_pattern_in(fr, scs, i, tdd).is_ok());
    debug!("PRACH configuration index search for {} kHz, zcz {}: {:?}", scs.khz(), zcz, found);
    found
}

/// Number of RBs per occasion in units of PUSCH RBs (TS 38.211 Table 6.3.3.2-1)
pub fn nof_prach_rbs(format: PrachFormat, msg1_scs: SubcarrierSpacing, pusch_scs: SubcarrierSpacing) -> Option<u32> {
    use SubcarrierSpacing::*;
    match format {
        Format0 | Format1 | Format2 => match pusch_scs {
            Scs15 => Some(6),
            Scs30 => Some(3),
            Scs60 => Some(2),
            _ => None,
        },
        Format3 => match pusch_scs {
            Scs15 => Some(24),
            Scs30 => Some(12),
            Scs60 => Some(6),
            _ => None,
        },
        FormatA1 | FormatB4 => match (msg1_scs, pusch_scs) {
            (Scs15, Scs15) => Some(12),
            (Scs15, Scs30) => Some(6),
            (Scs15, Scs60) => Some(3),
            (Scs30, Scs15) => Some(24),
            (Scs30, Scs30) => Some(12),
            (Scs30, Scs60) => Some(6),
            (Scs60, Scs60) => Some(12),
            (Scs60, Scs120) => Some(6),
            (Scs120, Scs60) => Some(24),
            (Scs120, Scs120) => Some(12),
            _ => None,
        },
    }
}

/// N_CS for 1.25 kHz long preambles, unrestricted set (TS 38.211 Table 6.3.3.1-5)
const NCS_LONG_1_25: [u32; 16] = [0, 13, 15, 18, 22, 26, 32, 38, 46, 59, 76, 93, 119, 167, 279, 419];
/// N_CS for 5 kHz long preambles, unrestricted set (TS 38.211 Table 6.3.3.1-6)
const NCS_LONG_5: [u32; 16] = [0, 13, 26, 33, 38, 41, 49, 55, 64, 76, 93, 119, 139, 209, 279, 419];
/// N_CS for short preambles (TS 38.211 Table 6.3.3.1-7)
const NCS_SHORT: [u32; 16] = [0, 2, 4, 6, 8, 10, 12, 13, 15, 17, 19, 23, 27, 34, 46, 69];

/// Cyclic shift N_CS for a format and zero correlation zone
pub fn cyclic_shift(format: PrachFormat, zcz: u8) -> Option<u32> {
    let table = match format {
        Format0 | Format1 | Format2 => &NCS_LONG_1_25,
        Format3 => &NCS_LONG_5,
        FormatA1 | FormatB4 => &NCS_SHORT,
    };
    table.get(zcz as usize).copied()
}

/// Number of consecutive root sequences needed to generate all 64 preambles
pub fn nof_root_sequences(format: PrachFormat, zcz: u8) -> Option<u32> {
    let ncs = cyclic_shift(format, zcz)?;
    if ncs == 0 {
        return Some(constants::NOF_PREAMBLES);
    }
    let preambles_per_root = format.sequence_length() / ncs;
    Some(div_ceil(constants::NOF_PREAMBLES, preambles_per_root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::tdd::{TddConfig, TddPattern};

    fn default_tdd() -> TddSlotMap {
        TddSlotMap::new(&TddConfig::default())
    }

    #[test]
    fn test_prach_config_lookup() {
        let config = prach_config(0, FrequencyRange::Fr1, DuplexMode::Tdd).unwrap();
        assert_eq!(config.format, PrachFormat::Format0);
        assert_eq!(config.x, 16);
        assert_eq!(config.y, &[1]);
        assert_eq!(config.subframe_numbers, &[9]);

        let config = prach_config(16, FrequencyRange::Fr1, DuplexMode::Fdd).unwrap();
        assert_eq!((config.x, config.y), (1, &[0u32][..]));
        assert_eq!(prach_config(159, FrequencyRange::Fr1, DuplexMode::Tdd).unwrap().format, FormatB4);
        assert!(prach_config(100, FrequencyRange::Fr1, DuplexMode::Tdd).is_none());
    }

    #[test]
    fn test_index_intervals_accept_and_reject() {
        let pairs = [
            (FrequencyRange::Fr1, DuplexMode::Fdd),
            (FrequencyRange::Fr1, DuplexMode::Tdd),
            (FrequencyRange::Fr2, DuplexMode::Tdd),
        ];
        for (fr, duplex) in pairs {
            let ranges = supported_index_ranges(fr, duplex);
            for index in 0..=u8::MAX {
                let inside = ranges.iter().any(|r| r.contains(&index));
                assert_eq!(
                    config_index_valid(index, fr, duplex).is_ok(),
                    inside,
                    "index {} for {:?} {:?}",
                    index,
                    fr,
                    duplex
                );
            }
        }
        assert!(config_index_valid(0, FrequencyRange::Fr2, DuplexMode::Fdd).is_err());
    }

    #[test]
    fn test_zero_correlation_zone_b4() {
        let (fr, tdd, fdd) = (FrequencyRange::Fr1, DuplexMode::Tdd, DuplexMode::Fdd);
        assert!(zero_correlation_zone_valid(0, 159, fr, tdd).is_ok());
        assert!(zero_correlation_zone_valid(14, 159, fr, tdd).is_ok());
        assert!(zero_correlation_zone_valid(11, 159, fr, tdd).is_err());
        assert!(zero_correlation_zone_valid(11, 210, fr, fdd).is_ok());
        assert!(zero_correlation_zone_valid(14, 210, fr, fdd).is_err());
        // Long formats accept the whole range
        assert!(zero_correlation_zone_valid(11, 0, fr, tdd).is_ok());
        assert!(zero_correlation_zone_valid(16, 0, fr, tdd).is_err());
    }

    #[test]
    fn test_root_sequence_ranges() {
        assert!(root_sequence_valid(837, Format0).is_ok());
        assert!(root_sequence_valid(838, Format0).is_err());
        assert!(root_sequence_valid(137, FormatB4).is_ok());
        assert!(root_sequence_valid(138, FormatA1).is_err());
    }

    #[test]
    fn test_fits_in_default_tdd_pattern() {
        let tdd = default_tdd();
        // Subframe 9 maps to slots 18 and 19, both uplink
        assert!(fits_in_tdd_pattern(SubcarrierSpacing::Scs30, 0, &tdd).is_ok());
        // Subframe 4 maps to slots 8 and 9
        assert!(fits_in_tdd_pattern(SubcarrierSpacing::Scs30, 5, &tdd).is_ok());
        // Subframe 8 contains the DL slot 16
        assert_eq!(
            fits_in_tdd_pattern(SubcarrierSpacing::Scs30, 8, &tdd),
            Err(SlotRange { start: 16, end: 18 })
        );
        // Format 1 spans subframes 7 to 9
        assert!(fits_in_tdd_pattern(SubcarrierSpacing::Scs30, 33, &tdd).is_err());
    }

    #[test]
    fn test_find_valid_index_first_match() {
        let tdd = default_tdd();
        let index = find_valid_index(SubcarrierSpacing::Scs30, 0, &tdd).unwrap();
        assert_eq!(index, 0);
        assert!(config_index_valid(index, FrequencyRange::Fr1, DuplexMode::Tdd).is_ok());

        // zcz 14 is only valid for B4 in TDD besides the long formats
        let index = find_valid_index(SubcarrierSpacing::Scs30, 14, &tdd).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_find_valid_index_none() {
        // Only the mixed slot has uplink symbols
        let cfg = TddConfig {
            pattern1: TddPattern {
                period_slots: 10,
                nof_dl_slots: 9,
                nof_dl_symbols: 0,
                nof_ul_slots: 0,
                nof_ul_symbols: 4,
            },
            pattern2: None,
        };
        let tdd = TddSlotMap::new(&cfg);
        assert_eq!(find_valid_index(SubcarrierSpacing::Scs30, 0, &tdd), None);
    }

    #[test]
    fn test_fr2_reference_slots() {
        // 120 kHz: 60 kHz slot 39 maps to slots 78 and 79
        let cfg = TddConfig {
            pattern1: TddPattern {
                period_slots: 10,
                nof_dl_slots: 7,
                nof_dl_symbols: 0,
                nof_ul_slots: 2,
                nof_ul_symbols: 0,
            },
            pattern2: None,
        };
        let tdd = TddSlotMap::new(&cfg);
        // Index 9 uses both 120 kHz slots of 60 kHz slot 39
        assert!(fits_in_tdd_pattern(SubcarrierSpacing::Scs120, 9, &tdd).is_ok());
        // Index 0 uses 60 kHz slot 4, i.e. slots 8 and 9 which are UL too
        assert!(fits_in_tdd_pattern(SubcarrierSpacing::Scs120, 0, &tdd).is_ok());
        // Index 2 uses 60 kHz slot 3 (slot 7, DL)
        assert!(fits_in_tdd_pattern(SubcarrierSpacing::Scs120, 2, &tdd).is_err());
    }

    #[test]
    fn test_rbs_and_roots() {
        assert_eq!(nof_prach_rbs(Format0, SubcarrierSpacing::Scs30, SubcarrierSpacing::Scs30), Some(3));
        assert_eq!(nof_prach_rbs(FormatB4, SubcarrierSpacing::Scs30, SubcarrierSpacing::Scs30), Some(12));
        assert_eq!(nof_prach_rbs(Format3, SubcarrierSpacing::Scs15, SubcarrierSpacing::Scs15), Some(24));
        // N_CS 0 uses one root per preamble
        assert_eq!(nof_root_sequences(Format0, 0), Some(64));
        // N_CS 13: floor(839 / 13) = 64 preambles per root
        assert_eq!(nof_root_sequences(Format0, 1), Some(1));
        // N_CS 419: 2 preambles per root
        assert_eq!(nof_root_sequences(Format0, 15), Some(32));
        // Short N_CS 69: 2 preambles per root
        assert_eq!(nof_root_sequences(FormatB4, 15), Some(32));
    }
}
