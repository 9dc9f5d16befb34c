//! Cell Configuration Validator
//!
//! An ordered list of independent checks folded with short-circuit: the
//! first failing check decides the verdict. Cross-cell checks run once every
//! cell passed on its own.

pub mod checks;
pub mod cross_cell;

use crate::intent::CellIntent;
use crate::policy::CellPolicy;
use crate::ValidationError;
use tracing::{info, trace};

/// One independently testable rule of the validator
pub trait CellCheck {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Check one cell intent
    fn check(&self, intent: &CellIntent, policy: &CellPolicy) -> Result<(), ValidationError>;
}

/// Validator of cell intents under one policy
pub struct CellValidator {
    policy: CellPolicy,
    checks: Vec<Box<dyn CellCheck + Send + Sync>>,
}

impl CellValidator {
    /// Validator running every check in order
    pub fn new(policy: CellPolicy) -> Self {
        Self {
            policy,
            checks: checks::all(),
        }
    }

    pub fn policy(&self) -> &CellPolicy {
        &self.policy
    }

    /// Names of the checks in evaluation order
    pub fn check_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.checks.iter().map(|c| c.name())
    }

    /// Validate one cell, stopping at the first failing check
    pub fn validate(&self, intent: &CellIntent) -> Result<(), ValidationError> {
        self.checks.iter().try_for_each(|check| {
            trace!("PCI {}: running {} check", intent.pci, check.name());
            check.check(intent, &self.policy)
        })?;
        info!("Cell PCI {} on ARFCN {} accepted", intent.pci, intent.dl_arfcn);
        Ok(())
    }

    /// Validate several cells, then check them against each other
    ///
    /// Per-cell failures carry the index of the cell.
    pub fn validate_all(&self, intents: &[CellIntent]) -> Result<(), ValidationError> {
        intents
            .iter()
            .enumerate()
            .try_for_each(|(index, intent)| self.validate(intent).map_err(|e| e.in_cell(index)))?;
        self.validate_cross_cell(intents)
    }

    /// Cross-cell checks of cells that already passed on their own
    pub fn validate_cross_cell(&self, intents: &[CellIntent]) -> Result<(), ValidationError> {
        let summaries = intents
            .iter()
            .enumerate()
            .map(|(index, intent)| cross_cell::CellSummary::new(index, intent, &self.policy))
            .collect::<Result<Vec<_>, _>>()?;
        cross_cell::check(&summaries)
    }
}

impl Default for CellValidator {
    fn default() -> Self {
        Self::new(CellPolicy::default())
    }
}

/// Validate cells under the default policy
pub fn validate_cells(intents: &[CellIntent]) -> Result<(), ValidationError> {
    CellValidator::default().validate_all(intents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n78_cell(pci: u16) -> CellIntent {
        CellIntent {
            band: Some(78),
            ..CellIntent::new(pci, 632_628)
        }
    }

    #[test]
    fn test_check_order() {
        let validator = CellValidator::default();
        let names: Vec<_> = validator.check_names().collect();
        assert_eq!(names.len(), 17);
        assert_eq!(names.first(), Some(&"antennas"));
        assert_eq!(names.last(), Some(&"pcap"));
    }

    #[test]
    fn test_default_cell_accepted() {
        assert!(CellValidator::default().validate(&n78_cell(1)).is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        // Both the antenna count and the PCI are wrong, antennas come first
        let mut intent = n78_cell(1500);
        intent.nof_antennas_dl = 0;
        assert!(matches!(
            CellValidator::default().validate(&intent),
            Err(ValidationError::Antennas(_))
        ));
        intent.nof_antennas_dl = 1;
        assert_eq!(CellValidator::default().validate(&intent), Err(ValidationError::Pci(1500)));
    }

    #[test]
    fn test_cell_index_attached() {
        let mut bad = n78_cell(2);
        bad.nof_antennas_ul = 3;
        match validate_cells(&[n78_cell(1), bad]) {
            Err(ValidationError::Cell { index, source }) => {
                assert_eq!(index, 1);
                assert!(matches!(*source, ValidationError::Antennas(_)));
            }
            other => panic!("unexpected verdict {:?}", other),
        }
    }
}
