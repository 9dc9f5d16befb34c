//! Cross-cell checks
//!
//! Run once every cell of a DU passed its own checks: a single tracking area,
//! distinct cell identities, no PCI reuse on one carrier and disjoint PRACH
//! root sequences between cells sharing a carrier.

use super::checks;
use crate::derived::CellGrid;
use crate::intent::CellIntent;
use crate::policy::CellPolicy;
use crate::ValidationError;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// What the cross-cell checks need to know about one accepted cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSummary {
    pub index: usize,
    pub pci: u16,
    pub nci: u64,
    pub tac: u32,
    pub dl_arfcn: u32,
    /// Long (839) or short (139) preamble sequences
    pub long_format: bool,
    /// Logical root sequence indexes, wrapped at the last root of the format
    pub roots: BTreeSet<u32>,
}

impl CellSummary {
    pub fn new(index: usize, intent: &CellIntent, policy: &CellPolicy) -> Result<Self, ValidationError> {
        let grid = CellGrid::resolve(intent)?;
        let prach = checks::prach_of(intent, policy, &grid)?;
        let nof_roots = prach.format.max_root_sequence() as u32 + 1;
        Ok(Self {
            index,
            pci: intent.pci,
            nci: intent.nci().0,
            tac: intent.tac,
            dl_arfcn: intent.dl_arfcn,
            long_format: prach.format.is_long(),
            roots: prach.root_sequence_range().map(|root| root % nof_roots).collect(),
        })
    }
}

fn conflict(msg: String) -> ValidationError {
    ValidationError::CrossCell(msg)
}

/// Check the accepted cells of one DU against each other
pub fn check(cells: &[CellSummary]) -> Result<(), ValidationError> {
    if let Some((first, other)) = cells.first().and_then(|f| cells.iter().find(|c| c.tac != f.tac).map(|c| (f, c))) {
        return Err(conflict(format!(
            "cells {} and {} use TACs {} and {}, a DU serves one tracking area",
            first.index, other.index, first.tac, other.tac
        )));
    }

    let mut ncis = BTreeMap::new();
    let mut pcis = BTreeMap::new();
    for cell in cells {
        if let Some(prev) = ncis.insert(cell.nci, cell.index) {
            return Err(conflict(format!(
                "cells {} and {} share NR cell identity {:#x}",
                prev, cell.index, cell.nci
            )));
        }
        if let Some(prev) = pcis.insert((cell.pci, cell.dl_arfcn), cell.index) {
            return Err(conflict(format!(
                "cells {} and {} share PCI {} on ARFCN {}",
                prev, cell.index, cell.pci, cell.dl_arfcn
            )));
        }
    }

    for (i, a) in cells.iter().enumerate() {
        let clash = cells[i + 1..]
            .iter()
            .filter(|b| b.dl_arfcn == a.dl_arfcn && b.long_format == a.long_format)
            .find_map(|b| a.roots.intersection(&b.roots).next().map(|root| (b, *root)));
        if let Some((b, root)) = clash {
            return Err(conflict(format!(
                "cells {} and {} both use PRACH root sequence {} on ARFCN {}",
                a.index, b.index, root, a.dl_arfcn
            )));
        }
    }
    debug!("{} cells passed the cross-cell checks", cells.len());
    Ok(())
}
