//! Common Types for 5G NR Cell Configuration
//!
//! Defines the fundamental radio parameter types shared by the validator and
//! the builder: cell identities, numerology, channel bandwidth and duplexing.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when converting raw operator values into numerology types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumerologyError {
    #[error("Invalid subcarrier spacing: {0} kHz")]
    InvalidScs(u32),

    #[error("Invalid channel bandwidth: {0} MHz")]
    InvalidBandwidth(u32),
}

/// Physical Cell Identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pci(pub u16);

impl Pci {
    /// Maximum valid PCI value (0-1007)
    pub const MAX: u16 = 1007;

    /// Create a new PCI with validation
    pub fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }
}

/// NR Cell Identity (36 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NrCellId(pub u64);

impl NrCellId {
    /// Maximum valid NCI value
    pub const MAX: u64 = (1 << 36) - 1;

    /// Create a new NCI with validation
    pub fn new(value: u64) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }
}

/// Tracking Area Code (24 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tac(pub u32);

impl Tac {
    /// Maximum valid TAC value
    pub const MAX: u32 = 0xFF_FFFF;
}

/// 5G QoS Identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FiveQi(pub u16);

impl FiveQi {
    /// Conversational voice
    pub const VOICE: Self = Self(1);
    /// Conversational video
    pub const VIDEO: Self = Self(2);
    /// IMS signalling
    pub const IMS_SIGNALLING: Self = Self(5);
    /// Voice, video (live streaming), interactive gaming
    pub const INTERACTIVE: Self = Self(7);
    /// Default non-GBR bearer
    pub const DEFAULT: Self = Self(9);
}

/// Subcarrier spacing values in kHz
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    FromPrimitive, ToPrimitive, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum SubcarrierSpacing {
    /// 15 kHz
    Scs15 = 15,
    /// 30 kHz
    Scs30 = 30,
    /// 60 kHz
    Scs60 = 60,
    /// 120 kHz
    Scs120 = 120,
    /// 240 kHz
    Scs240 = 240,
}

impl SubcarrierSpacing {
    /// Spacing in kHz
    pub fn khz(&self) -> u32 {
        *self as u32
    }

    /// Spacing in Hz
    pub fn hz(&self) -> u64 {
        self.khz() as u64 * 1000
    }

    /// Numerology index mu (TS 38.211 Table 4.2-1)
    pub fn numerology(&self) -> u8 {
        match self {
            Self::Scs15 => 0,
            Self::Scs30 => 1,
            Self::Scs60 => 2,
            Self::Scs120 => 3,
            Self::Scs240 => 4,
        }
    }

    /// Number of slots per 1 ms subframe
    pub fn slots_per_subframe(&self) -> u32 {
        1 << self.numerology()
    }

    /// Number of slots per 10 ms frame
    pub fn slots_per_frame(&self) -> u32 {
        10 * self.slots_per_subframe()
    }

    /// Build from a value in kHz
    pub fn from_khz(khz: u32) -> Option<Self> {
        Self::from_u32(khz)
    }
}

impl TryFrom<u32> for SubcarrierSpacing {
    type Error = NumerologyError;

    fn try_from(khz: u32) -> Result<Self, Self::Error> {
        Self::from_khz(khz).ok_or(NumerologyError::InvalidScs(khz))
    }
}

impl From<SubcarrierSpacing> for u32 {
    fn from(scs: SubcarrierSpacing) -> Self {
        scs.khz()
    }
}

/// Channel bandwidth values in MHz
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    FromPrimitive, ToPrimitive, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum Bandwidth {
    /// 5 MHz
    Bw5 = 5,
    /// 10 MHz
    Bw10 = 10,
    /// 15 MHz
    Bw15 = 15,
    /// 20 MHz
    Bw20 = 20,
    /// 25 MHz
    Bw25 = 25,
    /// 30 MHz
    Bw30 = 30,
    /// 40 MHz
    Bw40 = 40,
    /// 50 MHz
    Bw50 = 50,
    /// 60 MHz
    Bw60 = 60,
    /// 70 MHz
    Bw70 = 70,
    /// 80 MHz
    Bw80 = 80,
    /// 90 MHz
    Bw90 = 90,
    /// 100 MHz
    Bw100 = 100,
    /// 200 MHz
    Bw200 = 200,
    /// 400 MHz
    Bw400 = 400,
}

impl Bandwidth {
    /// All bandwidths in ascending order
    pub const ALL: [Bandwidth; 15] = [
        Self::Bw5, Self::Bw10, Self::Bw15, Self::Bw20, Self::Bw25,
        Self::Bw30, Self::Bw40, Self::Bw50, Self::Bw60, Self::Bw70,
        Self::Bw80, Self::Bw90, Self::Bw100, Self::Bw200, Self::Bw400,
    ];

    /// Get bandwidth in MHz
    pub fn mhz(&self) -> u32 {
        *self as u32
    }

    /// Get bandwidth in Hz
    pub fn as_hz(&self) -> u64 {
        self.mhz() as u64 * 1_000_000
    }

    /// The next smaller standard bandwidth, if any
    pub fn step_down(&self) -> Option<Self> {
        let pos = Self::ALL.iter().position(|bw| bw == self)?;
        pos.checked_sub(1).map(|p| Self::ALL[p])
    }
}

impl TryFrom<u32> for Bandwidth {
    type Error = NumerologyError;

    fn try_from(mhz: u32) -> Result<Self, Self::Error> {
        Self::from_u32(mhz).ok_or(NumerologyError::InvalidBandwidth(mhz))
    }
}

impl From<Bandwidth> for u32 {
    fn from(bw: Bandwidth) -> Self {
        bw.mhz()
    }
}

/// Duplex mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplexMode {
    /// Frequency Division Duplex
    Fdd,
    /// Time Division Duplex
    Tdd,
}

/// Frequency range (TS 38.104 Table 5.1-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrequencyRange {
    /// 410 MHz - 7125 MHz
    Fr1,
    /// 24250 MHz - 52600 MHz
    Fr2,
}

/// Cyclic prefix type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclicPrefix {
    #[default]
    Normal,
    Extended,
}

impl CyclicPrefix {
    /// Number of OFDM symbols per slot
    pub fn symbols_per_slot(&self) -> u8 {
        match self {
            Self::Normal => 14,
            Self::Extended => 12,
        }
    }
}

/// Number of OFDM symbols per slot with normal cyclic prefix
pub const NOF_SYMBOLS_PER_SLOT: u8 = 14;

/// Number of subcarriers per resource block
pub const NOF_SUBCARRIERS_PER_RB: u32 = 12;
