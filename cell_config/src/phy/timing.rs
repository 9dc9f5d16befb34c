//! HARQ and PUSCH Timing Candidates
//!
//! Derives the dl-DataToUL-ACK (k1) list, the PUSCH time-domain allocation
//! list (k2) of TS 38.213 §9.2.3 and TS 38.214 §6.1.2.1 and the PDSCH
//! time-domain allocation list from a TDD slot map.

use super::tdd::TddSlotMap;
use common::types::CyclicPrefix;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// PDSCH/PUSCH mapping type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MappingType {
    TypeA,
    TypeB,
}

/// Entry of the PUSCH time-domain resource allocation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PuschTimeDomainResource {
    /// Slot delay between the UL grant and the PUSCH
    pub k2: u8,
    pub mapping: MappingType,
    pub start_symbol: u8,
    pub nof_symbols: u8,
}

/// Entry of the PDSCH time-domain resource allocation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PdschTimeDomainResource {
    pub k0: u8,
    pub mapping: MappingType,
    pub start_symbol: u8,
    pub nof_symbols: u8,
}

/// Search bounds for the candidate generators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingLimits {
    pub max_k: u8,
    pub max_candidates: usize,
}

/// First delay in `[min_k, max_k]` that reaches a fully uplink slot from `dl_slot`
fn first_ul_delay(tdd: &TddSlotMap, dl_slot: u32, min_k: u8, max_k: u8) -> Option<u8> {
    (min_k..=max_k).find(|k| tdd.is_full_ul(dl_slot + *k as u32))
}

/// Generate the ascending k1 candidate list
///
/// Each DL slot of the period contributes the smallest delay reaching a fully
/// uplink slot. The smallest `max_candidates` delays are kept. FDD cells use
/// `min_k1` alone.
pub fn generate_k1(tdd: Option<&TddSlotMap>, min_k1: u8, limits: TimingLimits) -> Vec<u8> {
    let Some(tdd) = tdd else {
        return vec![min_k1];
    };
    let k1s: BTreeSet<u8> = tdd
        .dl_slots()
        .filter_map(|dl_slot| first_ul_delay(tdd, dl_slot, min_k1, limits.max_k))
        .collect();
    let k1s: Vec<u8> = k1s.into_iter().take(limits.max_candidates).collect();
    debug!("k1 candidates: {:?}", k1s);
    k1s
}

/// Generate the PUSCH time-domain resource list
///
/// When the period has more full UL slots than DL slots, every DL slot
/// schedules only its nearest UL slot. Otherwise each DL slot schedules every
/// UL slot of one period, nearest first. The ascending union is capped at
/// `max_candidates`.
pub fn generate_k2(
    cp: CyclicPrefix,
    tdd: Option<&TddSlotMap>,
    min_k2: u8,
    limits: TimingLimits,
) -> Vec<PuschTimeDomainResource> {
    let full_slot = |k2| PuschTimeDomainResource {
        k2,
        mapping: MappingType::TypeA,
        start_symbol: 0,
        nof_symbols: cp.symbols_per_slot(),
    };
    let Some(tdd) = tdd else {
        return vec![full_slot(min_k2)];
    };

    let nof_dl_slots = tdd.dl_slots().count() as u32;
    let nof_ul_slots = tdd.nof_full_ul_slots();
    let per_dl_slot = if nof_ul_slots > nof_dl_slots {
        1
    } else {
        nof_ul_slots as usize
    };

    let k2s: BTreeSet<PuschTimeDomainResource> = tdd
        .dl_slots()
        .flat_map(|dl_slot| {
            (min_k2..=limits.max_k)
                .filter(move |k| tdd.is_full_ul(dl_slot + *k as u32))
                .take(per_dl_slot)
        })
        .map(full_slot)
        .collect();
    let k2s: Vec<_> = k2s.into_iter().take(limits.max_candidates).collect();
    debug!("k2 candidates: {:?}", k2s.iter().map(|r| r.k2).collect::<Vec<_>>());
    k2s
}

/// Generate the PDSCH time-domain resource list
///
/// The full slot comes first, then one entry per distinct partial DL slot
/// length, longest first. Every entry starts after the PDCCH symbols.
pub fn generate_pdsch_td(cp: CyclicPrefix, tdd: Option<&TddSlotMap>, pdcch_symbols: u8) -> Vec<PdschTimeDomainResource> {
    let nof_symbols = cp.symbols_per_slot();
    let entry = |dl_symbols: u8| PdschTimeDomainResource {
        k0: 0,
        mapping: MappingType::TypeA,
        start_symbol: pdcch_symbols,
        nof_symbols: dl_symbols - pdcch_symbols,
    };
    let partial: BTreeSet<u8> = tdd
        .into_iter()
        .flat_map(|tdd| tdd.slots().map(move |slot| tdd.dl_symbols(slot)))
        .filter(|dl| *dl > pdcch_symbols && *dl < nof_symbols)
        .collect();
    let td: Vec<_> = std::iter::once(entry(nof_symbols))
        .chain(partial.into_iter().rev().map(entry))
        .collect();
    debug!("PDSCH time-domain resources: {:?}", td);
    td
}
