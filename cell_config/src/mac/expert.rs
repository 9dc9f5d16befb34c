//! Scheduler Expert Configuration
//!
//! MCS ranges, HARQ limits and retry timeouts handed to the slot scheduler,
//! plus the NTN round trip that stretches them.

use crate::intent::{NtnIntent, PdschIntent, PuschIntent};
use crate::phy::mcs::McsTable;
use crate::phy::timing::PuschTimeDomainResource;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Maximum HARQ retransmissions the scheduler supports
pub const MAX_HARQ_RETXS: u8 = 4;
/// Largest number of PDSCHs or PUSCHs per slot
pub const MAX_GRANTS_PER_SLOT: u32 = 16;
/// HARQ retry timeout of a terrestrial cell
pub const HARQ_RETX_TIMEOUT_MS: u32 = 100;

/// Upper bound of cellSpecificKoffset-r17
pub const MAX_NTN_KOFFSET: u32 = 1023;
/// Upper bound of ta-Common-r17, in 4.072 ns units
pub const MAX_TA_COMMON: u64 = 66_485_757;
/// Bound of ta-CommonDrift-r17
pub const MAX_TA_COMMON_DRIFT: i32 = 257_303;
/// Upper bound of ta-CommonDriftVariant-r17
pub const MAX_TA_COMMON_DRIFT_VARIANT: u32 = 28_949;

/// Expert parameter errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpertError {
    #[error("MCS range [{min}, {max}] is outside table {table:?} (max {table_max})")]
    InvalidMcsRange { table: McsTable, min: u8, max: u8, table_max: u8 },

    #[error("Redundancy version sequence {0:?} must be non-empty, start with 0 and hold values 0..=3")]
    InvalidRvSequence(Vec<u8>),

    #[error("{0} HARQ retransmissions exceed the maximum of 4")]
    TooManyRetransmissions(u8),

    #[error("{0} grants per slot is not in 1..=16")]
    InvalidGrantsPerSlot(u32),

    #[error("{field} value {value} is out of range")]
    NtnOutOfRange { field: &'static str, value: i64 },
}

/// Check that an MCS range lies inside its table
pub fn mcs_range_valid(table: McsTable, min: u8, max: u8) -> Result<(), ExpertError> {
    if min <= max && max <= table.max_mcs() {
        Ok(())
    } else {
        Err(ExpertError::InvalidMcsRange {
            table,
            min,
            max,
            table_max: table.max_mcs(),
        })
    }
}

/// Check a redundancy version sequence
pub fn rv_sequence_valid(rv: &[u8]) -> Result<(), ExpertError> {
    match rv.first() {
        Some(0) if rv.iter().all(|v| *v <= 3) => Ok(()),
        _ => Err(ExpertError::InvalidRvSequence(rv.to_vec())),
    }
}

fn harq_valid(max_retxs: u8, per_slot: u32) -> Result<(), ExpertError> {
    if max_retxs > MAX_HARQ_RETXS {
        return Err(ExpertError::TooManyRetransmissions(max_retxs));
    }
    if !(1..=MAX_GRANTS_PER_SLOT).contains(&per_slot) {
        return Err(ExpertError::InvalidGrantsPerSlot(per_slot));
    }
    Ok(())
}

/// Validate the PDSCH expert parameters
pub fn validate_pdsch(pdsch: &PdschIntent) -> Result<(), ExpertError> {
    mcs_range_valid(pdsch.mcs_table, pdsch.min_ue_mcs, pdsch.max_ue_mcs)?;
    rv_sequence_valid(&pdsch.rv_sequence)?;
    harq_valid(pdsch.max_nof_harq_retxs, pdsch.max_pdschs_per_slot)
}

/// Validate the PUSCH expert parameters
pub fn validate_pusch(pusch: &PuschIntent) -> Result<(), ExpertError> {
    mcs_range_valid(pusch.mcs_table, pusch.min_ue_mcs, pusch.max_ue_mcs)?;
    rv_sequence_valid(&pusch.rv_sequence)?;
    harq_valid(pusch.max_nof_harq_retxs, pusch.max_puschs_per_slot)
}

/// Check the NTN parameters against their ASN.1 ranges
pub fn validate_ntn(ntn: &NtnIntent) -> Result<(), ExpertError> {
    let out_of_range = |field, value: i64| ExpertError::NtnOutOfRange { field, value };
    if !(1..=MAX_NTN_KOFFSET).contains(&ntn.cell_specific_koffset) {
        return Err(out_of_range("cell_specific_koffset", ntn.cell_specific_koffset as i64));
    }
    if ntn.ta_common > MAX_TA_COMMON {
        return Err(out_of_range("ta_common", ntn.ta_common as i64));
    }
    if ntn.ta_common_drift.abs() > MAX_TA_COMMON_DRIFT {
        return Err(out_of_range("ta_common_drift", ntn.ta_common_drift as i64));
    }
    if ntn.ta_common_drift_variant > MAX_TA_COMMON_DRIFT_VARIANT {
        return Err(out_of_range("ta_common_drift_variant", ntn.ta_common_drift_variant as i64));
    }
    Ok(())
}

/// Round trip of the feeder and service links in microseconds, rounded up
pub fn ntn_round_trip_us(ntn: Option<&NtnIntent>) -> u64 {
    ntn.map(|n| (n.ta_common * 4072).div_ceil(1_000_000)).unwrap_or(0)
}

/// Per-channel scheduler limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataChannelExpert {
    pub mcs_table: McsTable,
    pub min_mcs: u8,
    pub max_mcs: u8,
    pub max_nof_harq_retxs: u8,
    pub rv_sequence: Vec<u8>,
    pub max_grants_per_slot: u32,
    /// Time before an unanswered HARQ process is retried
    pub harq_retx_timeout_ms: u32,
}

/// Scheduler-facing expert configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerExpertConfig {
    pub pdsch: DataChannelExpert,
    pub pusch: DataChannelExpert,
    pub k1_candidates: Vec<u8>,
    pub k2_candidates: Vec<u8>,
    /// Extra scheduling offset of NTN cells, in slots
    pub ntn_koffset: u32,
}

impl SchedulerExpertConfig {
    /// Assemble the expert configuration of an accepted cell
    pub fn new(
        pdsch: &PdschIntent,
        pusch: &PuschIntent,
        ntn: Option<&NtnIntent>,
        k1_candidates: Vec<u8>,
        pusch_td: &[PuschTimeDomainResource],
    ) -> Self {
        let timeout_ms = HARQ_RETX_TIMEOUT_MS + ntn_round_trip_us(ntn).div_ceil(1000) as u32;
        let mut k2_candidates: Vec<u8> = pusch_td.iter().map(|r| r.k2).collect();
        k2_candidates.dedup();

        let config = Self {
            pdsch: DataChannelExpert {
                mcs_table: pdsch.mcs_table,
                min_mcs: pdsch.min_ue_mcs,
                max_mcs: pdsch.max_ue_mcs,
                max_nof_harq_retxs: pdsch.max_nof_harq_retxs,
                rv_sequence: pdsch.rv_sequence.clone(),
                max_grants_per_slot: pdsch.max_pdschs_per_slot,
                harq_retx_timeout_ms: timeout_ms,
            },
            pusch: DataChannelExpert {
                mcs_table: pusch.mcs_table,
                min_mcs: pusch.min_ue_mcs,
                max_mcs: pusch.max_ue_mcs,
                max_nof_harq_retxs: pusch.max_nof_harq_retxs,
                rv_sequence: pusch.rv_sequence.clone(),
                max_grants_per_slot: pusch.max_puschs_per_slot,
                harq_retx_timeout_ms: timeout_ms,
            },
            k1_candidates,
            k2_candidates,
            ntn_koffset: ntn.map(|n| n.cell_specific_koffset).unwrap_or(0),
        };
        debug!("Scheduler expert config: {:?}", config);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::timing::MappingType;

    fn ntn(ta_common: u64) -> NtnIntent {
        NtnIntent {
            cell_specific_koffset: 40,
            ta_common,
            ta_common_drift: 0,
            ta_common_drift_variant: 0,
        }
    }

    #[test]
    fn test_mcs_range() {
        assert!(mcs_range_valid(McsTable::Qam64, 0, 28).is_ok());
        assert!(mcs_range_valid(McsTable::Qam256, 0, 28).is_err());
        assert!(mcs_range_valid(McsTable::Qam64, 10, 5).is_err());
    }

    #[test]
    fn test_rv_sequence() {
        assert!(rv_sequence_valid(&[0, 2, 3, 1]).is_ok());
        assert!(rv_sequence_valid(&[0]).is_ok());
        assert!(rv_sequence_valid(&[]).is_err());
        assert!(rv_sequence_valid(&[2, 0]).is_err());
        assert!(rv_sequence_valid(&[0, 4]).is_err());
    }

    #[test]
    fn test_harq_limits() {
        let pdsch = PdschIntent {
            max_nof_harq_retxs: 5,
            ..Default::default()
        };
        assert_eq!(validate_pdsch(&pdsch), Err(ExpertError::TooManyRetransmissions(5)));
        let pusch = PuschIntent {
            max_puschs_per_slot: 0,
            ..Default::default()
        };
        assert_eq!(validate_pusch(&pusch), Err(ExpertError::InvalidGrantsPerSlot(0)));
    }

    #[test]
    fn test_ntn_bounds() {
        assert!(validate_ntn(&ntn(1_000_000)).is_ok());
        assert!(validate_ntn(&ntn(MAX_TA_COMMON + 1)).is_err());
        let no_koffset = NtnIntent {
            cell_specific_koffset: 0,
            ..ntn(0)
        };
        assert!(validate_ntn(&no_koffset).is_err());
    }

    #[test]
    fn test_ntn_timeout_inflation() {
        // 6_000_000 x 4.072 ns = 24.432 ms
        assert_eq!(ntn_round_trip_us(Some(&ntn(6_000_000))), 24_432);
        let td = [PuschTimeDomainResource {
            k2: 4,
            mapping: MappingType::TypeA,
            start_symbol: 0,
            nof_symbols: 14,
        }];
        let config = SchedulerExpertConfig::new(
            &PdschIntent::default(),
            &PuschIntent::default(),
            Some(&ntn(6_000_000)),
            vec![4],
            &td,
        );
        assert_eq!(config.pdsch.harq_retx_timeout_ms, 125);
        assert_eq!(config.ntn_koffset, 40);

        let terrestrial =
            SchedulerExpertConfig::new(&PdschIntent::default(), &PuschIntent::default(), None, vec![4], &td);
        assert_eq!(terrestrial.pusch.harq_retx_timeout_ms, HARQ_RETX_TIMEOUT_MS);
        assert_eq!(terrestrial.k2_candidates, vec![4]);
    }
}
