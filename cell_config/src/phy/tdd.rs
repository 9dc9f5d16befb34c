//! TDD UL/DL Pattern and Slot Map
//!
//! Implements the tdd-UL-DL-ConfigurationCommon patterns of 3GPP TS 38.213
//! §11.1 and classifies every slot of the combined period.

use common::types::{SubcarrierSpacing, NOF_SYMBOLS_PER_SLOT};
use common::utils::time;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed pattern periodicities in microseconds (dl-UL-TransmissionPeriodicity)
pub const ALLOWED_PERIODS_US: [u32; 10] = [500, 625, 1000, 1250, 2000, 2500, 3000, 4000, 5000, 10000];

/// TDD pattern errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TddError {
    #[error("Pattern period of {period_slots} slots ({period_ns} ns) is not an allowed periodicity")]
    InvalidPeriod { period_slots: u32, period_ns: u64 },

    #[error("Combined period of {0} us does not divide 20 ms")]
    PeriodNotDividing20ms(u64),

    #[error("{dl_slots} DL slots and {ul_slots} UL slots exceed the period of {period_slots} slots")]
    TooManySlots { dl_slots: u32, ul_slots: u32, period_slots: u32 },

    #[error("Invalid symbol split: {dl_symbols} DL and {ul_symbols} UL symbols")]
    InvalidSymbols { dl_symbols: u8, ul_symbols: u8 },

    #[error("Pattern has no slot with uplink symbols")]
    NoUplink,

    #[error("Pattern has no slot with downlink symbols")]
    NoDownlink,
}

/// One TDD pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TddPattern {
    /// Pattern periodicity in slots
    #[serde(rename = "dl_ul_tx_period")]
    pub period_slots: u32,
    /// Full DL slots at the start of the period
    pub nof_dl_slots: u32,
    /// DL symbols in the slot following the last full DL slot
    pub nof_dl_symbols: u8,
    /// Full UL slots at the end of the period
    pub nof_ul_slots: u32,
    /// UL symbols in the slot preceding the first full UL slot
    pub nof_ul_symbols: u8,
}

impl Default for TddPattern {
    fn default() -> Self {
        Self {
            period_slots: 10,
            nof_dl_slots: 6,
            nof_dl_symbols: 8,
            nof_ul_slots: 3,
            nof_ul_symbols: 0,
        }
    }
}

impl TddPattern {
    /// Check the slot and symbol counts of the pattern
    pub fn validate(&self, scs: SubcarrierSpacing) -> Result<(), TddError> {
        let period_ns = self.period_slots as u64 * time::slot_duration_ns(scs);
        if !ALLOWED_PERIODS_US.iter().any(|p| *p as u64 * 1000 == period_ns) {
            return Err(TddError::InvalidPeriod {
                period_slots: self.period_slots,
                period_ns,
            });
        }
        if self.nof_dl_slots + self.nof_ul_slots > self.period_slots {
            return Err(TddError::TooManySlots {
                dl_slots: self.nof_dl_slots,
                ul_slots: self.nof_ul_slots,
                period_slots: self.period_slots,
            });
        }

        let symbols_invalid = || TddError::InvalidSymbols {
            dl_symbols: self.nof_dl_symbols,
            ul_symbols: self.nof_ul_symbols,
        };
        if self.nof_dl_symbols >= NOF_SYMBOLS_PER_SLOT || self.nof_ul_symbols >= NOF_SYMBOLS_PER_SLOT {
            return Err(symbols_invalid());
        }
        let free_slots = self.period_slots - self.nof_dl_slots - self.nof_ul_slots;
        let has_symbols = self.nof_dl_symbols > 0 || self.nof_ul_symbols > 0;
        if has_symbols && free_slots == 0 {
            return Err(symbols_invalid());
        }
        // A single flexible slot carries both splits
        if free_slots == 1 && self.nof_dl_symbols + self.nof_ul_symbols > NOF_SYMBOLS_PER_SLOT {
            return Err(symbols_invalid());
        }
        Ok(())
    }
}

/// TDD UL/DL configuration with one or two patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TddConfig {
    pub pattern1: TddPattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern2: Option<TddPattern>,
}

impl TddConfig {
    /// Total period in slots
    pub fn period_slots(&self) -> u32 {
        self.pattern1.period_slots + self.pattern2.map(|p| p.period_slots).unwrap_or(0)
    }

    /// Validate both patterns and the combined periodicity
    pub fn validate(&self, scs: SubcarrierSpacing) -> Result<(), TddError> {
        self.pattern1.validate(scs)?;
        if let Some(pattern2) = &self.pattern2 {
            pattern2.validate(scs)?;
        }
        let period_ns = self.period_slots() as u64 * time::slot_duration_ns(scs);
        if period_ns == 0 || 20_000_000 % period_ns != 0 {
            return Err(TddError::PeriodNotDividing20ms(period_ns / 1000));
        }
        let map = TddSlotMap::new(self);
        if !map.slots().any(|s| map.ul_symbols(s) > 0) {
            return Err(TddError::NoUplink);
        }
        if !map.slots().any(|s| map.dl_symbols(s) > 0) {
            return Err(TddError::NoDownlink);
        }
        Ok(())
    }
}

/// Classification of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SlotKind {
    FullDl,
    FullUl,
    /// Flexible slot with leading DL and trailing UL symbols
    Mixed { dl_symbols: u8, ul_symbols: u8 },
}

/// Per-slot classification of one TDD period
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TddSlotMap {
    kinds: Vec<SlotKind>,
}

impl TddSlotMap {
    /// Expand a TDD configuration into its slot map
    pub fn new(cfg: &TddConfig) -> Self {
        let mut kinds = expand_pattern(&cfg.pattern1);
        if let Some(pattern2) = &cfg.pattern2 {
            kinds.extend(expand_pattern(pattern2));
        }
        Self { kinds }
    }

    /// Period in slots
    pub fn period(&self) -> u32 {
        self.kinds.len() as u32
    }

    /// Slot indexes of one period
    pub fn slots(&self) -> impl Iterator<Item = u32> {
        0..self.period()
    }

    /// Kind of an absolute slot index
    pub fn kind(&self, slot: u32) -> SlotKind {
        match self.kinds.len() {
            0 => SlotKind::FullDl,
            len => self.kinds[slot as usize % len],
        }
    }

    pub fn is_full_ul(&self, slot: u32) -> bool {
        self.kind(slot) == SlotKind::FullUl
    }

    pub fn is_full_dl(&self, slot: u32) -> bool {
        self.kind(slot) == SlotKind::FullDl
    }

    /// Number of leading DL symbols of a slot
    pub fn dl_symbols(&self, slot: u32) -> u8 {
        match self.kind(slot) {
            SlotKind::FullDl => NOF_SYMBOLS_PER_SLOT,
            SlotKind::FullUl => 0,
            SlotKind::Mixed { dl_symbols, .. } => dl_symbols,
        }
    }

    /// Number of trailing UL symbols of a slot
    pub fn ul_symbols(&self, slot: u32) -> u8 {
        match self.kind(slot) {
            SlotKind::FullDl => 0,
            SlotKind::FullUl => NOF_SYMBOLS_PER_SLOT,
            SlotKind::Mixed { ul_symbols, .. } => ul_symbols,
        }
    }

    /// Slots of one period carrying DL symbols
    pub fn dl_slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots().filter(|s| self.dl_symbols(*s) > 0)
    }

    /// Number of full UL slots in one period
    pub fn nof_full_ul_slots(&self) -> u32 {
        self.slots().filter(|s| self.is_full_ul(*s)).count() as u32
    }
}

fn expand_pattern(pattern: &TddPattern) -> Vec<SlotKind> {
    let mut kinds = vec![SlotKind::Mixed { dl_symbols: 0, ul_symbols: 0 }; pattern.period_slots as usize];
    let ul_start = pattern.period_slots.saturating_sub(pattern.nof_ul_slots);
    for (slot, kind) in kinds.iter_mut().enumerate() {
        let slot = slot as u32;
        if slot < pattern.nof_dl_slots {
            *kind = SlotKind::FullDl;
        } else if slot >= ul_start {
            *kind = SlotKind::FullUl;
        }
    }
    if pattern.nof_dl_symbols > 0 {
        if let Some(SlotKind::Mixed { dl_symbols, .. }) = kinds.get_mut(pattern.nof_dl_slots as usize) {
            *dl_symbols = pattern.nof_dl_symbols;
        }
    }
    if pattern.nof_ul_symbols > 0 {
        if let Some(SlotKind::Mixed { ul_symbols, .. }) = ul_start.checked_sub(1).and_then(|s| kinds.get_mut(s as usize)) {
            *ul_symbols = pattern.nof_ul_symbols;
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pattern_slot_map() {
        let map = TddSlotMap::new(&TddConfig::default());
        assert_eq!(map.period(), 10);
        assert!(map.is_full_dl(0));
        assert!(map.is_full_dl(5));
        assert_eq!(map.kind(6), SlotKind::Mixed { dl_symbols: 8, ul_symbols: 0 });
        assert!(map.is_full_ul(7));
        assert!(map.is_full_ul(9));
        assert!(map.is_full_ul(19));
        assert_eq!(map.dl_slots().count(), 7);
        assert_eq!(map.nof_full_ul_slots(), 3);
    }

    #[test]
    fn test_mixed_slot_with_both_splits() {
        let cfg = TddConfig {
            pattern1: TddPattern {
                period_slots: 5,
                nof_dl_slots: 3,
                nof_dl_symbols: 6,
                nof_ul_slots: 1,
                nof_ul_symbols: 4,
            },
            pattern2: None,
        };
        assert!(cfg.validate(SubcarrierSpacing::Scs30).is_ok());
        let map = TddSlotMap::new(&cfg);
        assert_eq!(map.kind(3), SlotKind::Mixed { dl_symbols: 6, ul_symbols: 4 });
        assert_eq!(map.dl_symbols(3), 6);
        assert_eq!(map.ul_symbols(3), 4);
    }

    #[test]
    fn test_period_validation() {
        let mut cfg = TddConfig::default();
        assert!(cfg.validate(SubcarrierSpacing::Scs30).is_ok());

        // 7 slots at 30 kHz is 3.5 ms
        cfg.pattern1.period_slots = 7;
        cfg.pattern1.nof_dl_slots = 4;
        assert!(matches!(cfg.validate(SubcarrierSpacing::Scs30), Err(TddError::InvalidPeriod { .. })));

        // 3 ms + 2 ms = 5 ms divides 20 ms
        let cfg = TddConfig {
            pattern1: TddPattern { period_slots: 6, nof_dl_slots: 3, nof_dl_symbols: 0, nof_ul_slots: 2, nof_ul_symbols: 0 },
            pattern2: Some(TddPattern { period_slots: 4, nof_dl_slots: 2, nof_dl_symbols: 0, nof_ul_slots: 2, nof_ul_symbols: 0 }),
        };
        assert!(cfg.validate(SubcarrierSpacing::Scs30).is_ok());

        // 3 ms + 3 ms = 6 ms does not
        let cfg = TddConfig {
            pattern1: TddPattern { period_slots: 6, nof_dl_slots: 3, nof_dl_symbols: 0, nof_ul_slots: 2, nof_ul_symbols: 0 },
            pattern2: Some(TddPattern { period_slots: 6, nof_dl_slots: 3, nof_dl_symbols: 0, nof_ul_slots: 2, nof_ul_symbols: 0 }),
        };
        assert_eq!(cfg.validate(SubcarrierSpacing::Scs30), Err(TddError::PeriodNotDividing20ms(6000)));
    }

    #[test]
    fn test_slot_count_validation() {
        let cfg = TddConfig {
            pattern1: TddPattern { period_slots: 10, nof_dl_slots: 8, nof_dl_symbols: 4, nof_ul_slots: 2, nof_ul_symbols: 0 },
            pattern2: None,
        };
        assert!(matches!(cfg.validate(SubcarrierSpacing::Scs30), Err(TddError::InvalidSymbols { .. })));

        let cfg = TddConfig {
            pattern1: TddPattern { period_slots: 10, nof_dl_slots: 10, nof_dl_symbols: 0, nof_ul_slots: 0, nof_ul_symbols: 0 },
            pattern2: None,
        };
        assert_eq!(cfg.validate(SubcarrierSpacing::Scs30), Err(TddError::NoUplink));
    }

    #[test]
    fn test_serde_field_names() {
        let pattern: TddPattern = serde_json::from_str(
            r#"{"dl_ul_tx_period": 5, "nof_dl_slots": 3, "nof_dl_symbols": 0, "nof_ul_slots": 2, "nof_ul_symbols": 0}"#,
        )
        .unwrap();
        assert_eq!(pattern.period_slots, 5);
    }
}
