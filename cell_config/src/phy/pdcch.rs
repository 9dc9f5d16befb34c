/// PDCCH (Physical Downlink Control Channel) resources
/// Based on 3GPP TS 38.211 §7.3.2, TS 38.213 §10.1 and TS 38.331 ControlResourceSet/SearchSpace

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// RBs per CORESET frequency-domain resource group
pub const RBS_PER_GROUP: u32 = 6;
/// REGs per CCE
pub const REGS_PER_CCE: u32 = 6;
/// Bits of frequencyDomainResources
pub const MAX_FREQ_GROUPS: u32 = 45;
/// Aggregation levels, index 0 is AL1
pub const AGGREGATION_LEVELS: [u32; 5] = [1, 2, 4, 8, 16];
/// Candidate counts allowed per aggregation level
const ALLOWED_CANDIDATES: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 8];

/// Monitored PDCCH candidates per slot, per numerology (TS 38.213 Table 10.1-2)
const MAX_CANDIDATES_PER_SLOT: [u32; 4] = [44, 36, 22, 20];
/// Non-overlapped CCEs per slot, per numerology (TS 38.213 Table 10.1-3)
const MAX_CCES_PER_SLOT: [u32; 4] = [56, 56, 48, 32];

/// Type0-PDCCH CSS candidates {AL4: 4, AL8: 2, AL16: 1} (TS 38.213 Table 10.1-1)
pub const SS0_CANDIDATES: [u8; 5] = [0, 0, 4, 2, 1];

/// PDCCH resource errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PdcchError {
    #[error("CORESET#{id} of {nof_rbs} RBs starting at CRB {start_crb} exceeds {limit} RBs")]
    CoresetOutOfBounds { id: u8, start_crb: u32, nof_rbs: u32, limit: u32 },

    #[error("CORESET#{id} needs at least one 6-RB group")]
    EmptyCoreset { id: u8 },

    #[error("CORESET duration {0} is not in 1..=3")]
    InvalidDuration(u8),

    #[error("Candidate count {count} at AL{al} is not allowed")]
    InvalidCandidates { al: u32, count: u8 },

    #[error("SearchSpace#{id} has no candidate fitting its CORESET")]
    NoCandidates { id: u8 },

    #[error("{candidates} monitored candidates exceed the limit of {limit}")]
    TooManyCandidates { candidates: u32, limit: u32 },

    #[error("{cces} non-overlapped CCEs exceed the limit of {limit}")]
    TooManyCces { cces: u32, limit: u32 },
}

/// Control resource set with contiguous RB groups
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Coreset {
    pub id: u8,
    pub start_crb: u32,
    pub nof_rbs: u32,
    pub duration: u8,
}

impl Coreset {
    /// Number of CCEs of the CORESET
    pub fn nof_cces(&self) -> u32 {
        self.nof_rbs * self.duration as u32 / REGS_PER_CCE
    }

    /// frequencyDomainResources bitmap, bit 0 being the first group of the BWP
    pub fn freq_domain_resources(&self, bwp_start_crb: u32) -> Vec<bool> {
        let first = self.start_crb.saturating_sub(bwp_start_crb) / RBS_PER_GROUP;
        let nof_groups = self.nof_rbs / RBS_PER_GROUP;
        (0..MAX_FREQ_GROUPS)
            .map(|g| (first..first + nof_groups).contains(&g))
            .collect()
    }
}

/// Build CORESET#1 inside a BWP
///
/// Without an operator RB count every whole 6-RB group of the BWP is used.
pub fn coreset1(
    bwp_start_crb: u32,
    bwp_rbs: u32,
    nof_rbs: Option<u32>,
    duration: u8,
) -> Result<Coreset, PdcchError> {
    if !(1..=3).contains(&duration) {
        return Err(PdcchError::InvalidDuration(duration));
    }
    let requested = nof_rbs.unwrap_or(bwp_rbs);
    if requested > bwp_rbs {
        return Err(PdcchError::CoresetOutOfBounds {
            id: 1,
            start_crb: bwp_start_crb,
            nof_rbs: requested,
            limit: bwp_rbs,
        });
    }
    let nof_groups = (requested / RBS_PER_GROUP).min(MAX_FREQ_GROUPS);
    if nof_groups == 0 {
        return Err(PdcchError::EmptyCoreset { id: 1 });
    }
    let coreset = Coreset {
        id: 1,
        start_crb: bwp_start_crb,
        nof_rbs: nof_groups * RBS_PER_GROUP,
        duration,
    };
    debug!("CORESET#1: {:?}", coreset);
    Ok(coreset)
}

/// Search space type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSpaceType {
    Common,
    #[default]
    UeDedicated,
}

/// Search space with candidates per aggregation level
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SearchSpace {
    pub id: u8,
    pub coreset_id: u8,
    pub kind: SearchSpaceType,
    /// Candidates for AL1, AL2, AL4, AL8 and AL16
    pub candidates: [u8; 5],
}

impl SearchSpace {
    pub fn nof_candidates(&self) -> u32 {
        self.candidates.iter().map(|c| *c as u32).sum()
    }

    /// CCEs spanned by all candidates if none overlapped
    pub fn nof_candidate_cces(&self) -> u32 {
        self.candidates.iter().zip(AGGREGATION_LEVELS).map(|(c, al)| *c as u32 * al).sum()
    }
}

/// Check that requested counts are encodable in nrofCandidates
pub fn candidates_valid(candidates: &[u8; 5]) -> Result<(), PdcchError> {
    AGGREGATION_LEVELS
        .iter()
        .zip(candidates)
        .try_for_each(|(al, count)| {
            if ALLOWED_CANDIDATES.contains(count) {
                Ok(())
            } else {
                Err(PdcchError::InvalidCandidates { al: *al, count: *count })
            }
        })
}

/// Clamp candidates to the CCE capacity of the CORESET
pub fn clamp_candidates(requested: &[u8; 5], nof_cces: u32) -> [u8; 5] {
    let mut clamped = [0u8; 5];
    for ((out, req), al) in clamped.iter_mut().zip(requested).zip(AGGREGATION_LEVELS) {
        let fit = (nof_cces / al).min(*req as u32) as u8;
        *out = ALLOWED_CANDIDATES.iter().rev().copied().find(|c| *c <= fit).unwrap_or(0);
    }
    clamped
}

/// Build a search space, clamping its candidates to the CORESET
pub fn search_space(
    id: u8,
    coreset: &Coreset,
    kind: SearchSpaceType,
    requested: &[u8; 5],
) -> Result<SearchSpace, PdcchError> {
    let candidates = clamp_candidates(requested, coreset.nof_cces());
    if candidates.iter().all(|c| *c == 0) {
        return Err(PdcchError::NoCandidates { id });
    }
    Ok(SearchSpace {
        id,
        coreset_id: coreset.id,
        kind,
        candidates,
    })
}

/// Monitored candidate and CCE totals for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PdcchBudget {
    pub candidates: u32,
    pub cces: u32,
}

impl PdcchBudget {
    /// Worst case: every search space monitored in the same slot
    ///
    /// The CCEs of a CORESET are those covered by its candidates, at most the
    /// whole CORESET.
    pub fn count(coresets: &[&Coreset], search_spaces: &[&SearchSpace]) -> Self {
        let cces = coresets
            .iter()
            .map(|coreset| {
                let spanned: u32 = search_spaces
                    .iter()
                    .filter(|ss| ss.coreset_id == coreset.id)
                    .map(|ss| ss.nof_candidate_cces())
                    .sum();
                spanned.min(coreset.nof_cces())
            })
            .sum();
        Self {
            candidates: search_spaces.iter().map(|ss| ss.nof_candidates()).sum(),
            cces,
        }
    }

    /// Check the totals against TS 38.213 Tables 10.1-2 and 10.1-3
    pub fn check(&self, numerology: u8) -> Result<(), PdcchError> {
        let mu = (numerology as usize).min(MAX_CANDIDATES_PER_SLOT.len() - 1);
        let candidate_limit = MAX_CANDIDATES_PER_SLOT[mu];
        let cce_limit = MAX_CCES_PER_SLOT[mu];
        if self.candidates > candidate_limit {
            return Err(PdcchError::TooManyCandidates {
                candidates: self.candidates,
                limit: candidate_limit,
            });
        }
        if self.cces > cce_limit {
            return Err(PdcchError::TooManyCces {
                cces: self.cces,
                limit: cce_limit,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coreset1_default_groups() {
        let coreset = coreset1(0, 51, None, 2).unwrap();
        assert_eq!(coreset.nof_rbs, 48);
        assert_eq!(coreset.nof_cces(), 16);
        let bitmap = coreset.freq_domain_resources(0);
        assert_eq!(bitmap.len(), 45);
        assert_eq!(bitmap.iter().filter(|b| **b).count(), 8);
        assert!(bitmap[0] && bitmap[7] && !bitmap[8]);
    }

    #[test]
    fn test_coreset1_limits() {
        assert_eq!(coreset1(0, 273, None, 1).unwrap().nof_rbs, 270);
        assert_eq!(coreset1(0, 51, Some(5), 1), Err(PdcchError::EmptyCoreset { id: 1 }));
        assert!(coreset1(0, 51, Some(60), 1).is_err());
        assert_eq!(coreset1(0, 51, None, 4), Err(PdcchError::InvalidDuration(4)));
    }

    #[test]
    fn test_clamp_candidates() {
        // 24 RBs x 2 symbols = 8 CCEs
        assert_eq!(clamp_candidates(&SS0_CANDIDATES, 8), [0, 0, 2, 1, 0]);
        assert_eq!(clamp_candidates(&SS0_CANDIDATES, 16), [0, 0, 4, 2, 1]);
        // 7 fits 6, the largest allowed value below it
        assert_eq!(clamp_candidates(&[8, 8, 0, 0, 0], 14), [8, 6, 0, 0, 0]);
    }

    #[test]
    fn test_search_space_without_room() {
        let coreset = Coreset {
            id: 0,
            start_crb: 0,
            nof_rbs: 24,
            duration: 1,
        };
        assert_eq!(
            search_space(1, &coreset, SearchSpaceType::Common, &[0, 0, 0, 0, 1]),
            Err(PdcchError::NoCandidates { id: 1 })
        );
    }

    #[test]
    fn test_budget() {
        let coreset0 = Coreset {
            id: 0,
            start_crb: 0,
            nof_rbs: 48,
            duration: 2,
        };
        let cs1 = coreset1(0, 51, None, 2).unwrap();
        let ss0 = search_space(0, &coreset0, SearchSpaceType::Common, &SS0_CANDIDATES).unwrap();
        let ss2 = search_space(2, &cs1, SearchSpaceType::UeDedicated, &[0, 2, 2, 1, 0]).unwrap();
        let budget = PdcchBudget::count(&[&coreset0, &cs1], &[&ss0, &ss2]);
        assert_eq!(budget, PdcchBudget { candidates: 12, cces: 32 });
        assert!(budget.check(1).is_ok());

        // A wide CORESET#1 only counts the CCEs its candidates span
        let wide = coreset1(0, 273, None, 3).unwrap();
        let ss2 = search_space(2, &wide, SearchSpaceType::UeDedicated, &[0, 2, 2, 1, 0]).unwrap();
        assert_eq!(PdcchBudget::count(&[&wide], &[&ss2]).cces, 20);

        let heavy = PdcchBudget { candidates: 37, cces: 10 };
        assert!(heavy.check(1).is_err());
        assert!(heavy.check(0).is_ok());
    }

    #[test]
    fn test_candidates_valid() {
        assert!(candidates_valid(&[0, 0, 4, 2, 1]).is_ok());
        assert_eq!(
            candidates_valid(&[7, 0, 0, 0, 0]),
            Err(PdcchError::InvalidCandidates { al: 1, count: 7 })
        );
    }
}
