//! Per-cell checks, in evaluation order
//!
//! Each check resolves what it needs from the intent itself. Checks that
//! depend on derived resources run the same derivation steps as the builder.

use super::CellCheck;
use crate::derived::{
    self, CellGrid, CsiConfig, PdcchConfig, PrachConfig, PucchConfig, SrsConfig, SsbConfig,
};
use crate::intent::{CellIntent, RlmPolicy};
use crate::mac::expert;
use crate::mac::sib::PlmnId;
use crate::numerology::CellNumerology;
use crate::phy::prach::PrachError;
use crate::policy::CellPolicy;
use crate::{BuildError, ValidationError};
use common::types::{DuplexMode, NrCellId, Pci, Tac};
use tracing::warn;

/// Every check in evaluation order
pub fn all() -> Vec<Box<dyn CellCheck + Send + Sync>> {
    vec![
        Box::new(AntennaCheck),
        Box::new(IdentityCheck),
        Box::new(CarrierCheck),
        Box::new(TddCheck),
        Box::new(SsbCheck),
        Box::new(PdcchCheck),
        Box::new(PdschCheck),
        Box::new(PuschCheck),
        Box::new(PucchCheck),
        Box::new(PrachCheck),
        Box::new(SrsCheck),
        Box::new(CsiCheck),
        Box::new(RlmCheck),
        Box::new(SibCheck),
        Box::new(NtnCheck),
        Box::new(BearerCheck),
        Box::new(PcapCheck),
    ]
}

/// Cause of a failed derivation step
///
/// Intent problems keep their own cause, anything else is reported against
/// `area`.
fn cause(area: fn(String) -> ValidationError) -> impl Fn(BuildError) -> ValidationError {
    move |err| match err {
        BuildError::Invalid(e) => e,
        other => area(other.to_string()),
    }
}

fn ssb_of(intent: &CellIntent, grid: &CellGrid) -> Result<SsbConfig, ValidationError> {
    SsbConfig::derive(intent, grid).map_err(cause(ValidationError::Ssb))
}

fn pdcch_of(intent: &CellIntent, grid: &CellGrid, ssb: &SsbConfig) -> Result<PdcchConfig, ValidationError> {
    PdcchConfig::derive(intent, grid, ssb).map_err(cause(ValidationError::Pdcch))
}

fn pucch_of(intent: &CellIntent, policy: &CellPolicy, grid: &CellGrid) -> Result<PucchConfig, ValidationError> {
    PucchConfig::derive(intent, policy, grid).map_err(cause(ValidationError::Pucch))
}

/// PRACH of a cell, a missing free frequency being a PRACH failure
pub(crate) fn prach_of(
    intent: &CellIntent,
    policy: &CellPolicy,
    grid: &CellGrid,
) -> Result<PrachConfig, ValidationError> {
    let pucch = pucch_of(intent, policy, grid)?;
    PrachConfig::derive(intent, policy, grid, &pucch.layout).map_err(|err| match err {
        BuildError::NoPrachFrequency => ValidationError::Prach(PrachError::NoFreeFrequency),
        other => cause(ValidationError::Carrier)(other),
    })
}

fn csi_of(intent: &CellIntent, policy: &CellPolicy, grid: &CellGrid) -> Result<Option<CsiConfig>, ValidationError> {
    let ssb = ssb_of(intent, grid)?;
    let pdcch = pdcch_of(intent, grid, &ssb)?;
    let pucch = pucch_of(intent, policy, grid)?;
    CsiConfig::derive(intent, policy, grid, &ssb, &pdcch, &pucch.layout).map_err(cause(ValidationError::Csi))
}

/// Antenna counts of both directions
pub struct AntennaCheck;

impl CellCheck for AntennaCheck {
    fn name(&self) -> &'static str {
        "antennas"
    }

    fn check(&self, intent: &CellIntent, policy: &CellPolicy) -> Result<(), ValidationError> {
        let antennas = [("DL", intent.nof_antennas_dl), ("UL", intent.nof_antennas_ul)];
        if let Some((direction, _)) = antennas.iter().find(|(_, n)| *n == 0) {
            return Err(ValidationError::Antennas(format!("no {} antenna configured", direction)));
        }
        antennas
            .into_iter()
            .find(|(_, n)| !policy.supported_antennas.contains(n))
            .map_or(Ok(()), |(direction, n)| {
                Err(ValidationError::Antennas(format!(
                    "{} {} antennas, expected one of {:?}",
                    n, direction, policy.supported_antennas
                )))
            })
    }
}

/// PCI, NR cell identity, TAC and PLMN
pub struct IdentityCheck;

impl CellCheck for IdentityCheck {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn check(&self, intent: &CellIntent, _policy: &CellPolicy) -> Result<(), ValidationError> {
        Pci::new(intent.pci).ok_or(ValidationError::Pci(intent.pci))?;
        if let Some(nci) = intent.nci {
            NrCellId::new(nci)
                .ok_or_else(|| ValidationError::Identity(format!("NCI {:#x} exceeds 36 bits", nci)))?;
        }
        if intent.tac > Tac::MAX {
            return Err(ValidationError::Identity(format!("TAC {:#x} exceeds 24 bits", intent.tac)));
        }
        PlmnId::parse(&intent.plmn).map_err(|e| ValidationError::Identity(e.to_string()))?;
        Ok(())
    }
}

/// Band, bandwidth and subcarrier spacing
pub struct CarrierCheck;

impl CellCheck for CarrierCheck {
    fn name(&self) -> &'static str {
        "carrier"
    }

    fn check(&self, intent: &CellIntent, _policy: &CellPolicy) -> Result<(), ValidationError> {
        let num = CellNumerology::resolve(intent)?;
        if num.duplex == DuplexMode::Tdd && intent.tdd_ul_dl_cfg.is_none() {
            warn!(
                "PCI {}: band n{} is TDD and no pattern is configured, using the default pattern",
                intent.pci, num.band
            );
        }
        Ok(())
    }
}

/// TDD pattern periodicity and slot/symbol counts
pub struct TddCheck;

impl CellCheck for TddCheck {
    fn name(&self) -> &'static str {
        "tdd"
    }

    fn check(&self, intent: &CellIntent, _policy: &CellPolicy) -> Result<(), ValidationError> {
        CellGrid::resolve(intent).map(|_| ())
    }
}

/// SSB period, bitmap, TDD fit and SSB/CORESET#0 placement
pub struct SsbCheck;

impl CellCheck for SsbCheck {
    fn name(&self) -> &'static str {
        "ssb"
    }

    fn check(&self, intent: &CellIntent, _policy: &CellPolicy) -> Result<(), ValidationError> {
        let grid = CellGrid::resolve(intent)?;
        ssb_of(intent, &grid).map(|_| ())
    }
}

/// CORESETs, search spaces and the PDCCH budget
pub struct PdcchCheck;

impl CellCheck for PdcchCheck {
    fn name(&self) -> &'static str {
        "pdcch"
    }

    fn check(&self, intent: &CellIntent, _policy: &CellPolicy) -> Result<(), ValidationError> {
        let grid = CellGrid::resolve(intent)?;
        let ssb = ssb_of(intent, &grid)?;
        pdcch_of(intent, &grid, &ssb).map(|_| ())
    }
}

/// PDSCH MCS range, RV sequence, limits and k1 candidates
pub struct PdschCheck;

impl CellCheck for PdschCheck {
    fn name(&self) -> &'static str {
        "pdsch"
    }

    fn check(&self, intent: &CellIntent, policy: &CellPolicy) -> Result<(), ValidationError> {
        expert::validate_pdsch(&intent.pdsch).map_err(|e| ValidationError::Pdsch(e.to_string()))?;
        let grid = CellGrid::resolve(intent)?;
        derived::derive_k1(intent, policy, &grid)
            .map(|_| ())
            .map_err(cause(ValidationError::Pdsch))
    }
}

/// PUSCH MCS range, RV sequence, limits and k2 candidates
pub struct PuschCheck;

impl CellCheck for PuschCheck {
    fn name(&self) -> &'static str {
        "pusch"
    }

    fn check(&self, intent: &CellIntent, policy: &CellPolicy) -> Result<(), ValidationError> {
        expert::validate_pusch(&intent.pusch).map_err(|e| ValidationError::Pusch(e.to_string()))?;
        let grid = CellGrid::resolve(intent)?;
        derived::derive_pusch_td(intent, policy, &grid)
            .map(|_| ())
            .map_err(cause(ValidationError::Pusch))
    }
}

/// PUCCH layout, payload and RB ceiling
pub struct PucchCheck;

impl CellCheck for PucchCheck {
    fn name(&self) -> &'static str {
        "pucch"
    }

    fn check(&self, intent: &CellIntent, policy: &CellPolicy) -> Result<(), ValidationError> {
        let grid = CellGrid::resolve(intent)?;
        pucch_of(intent, policy, &grid).map(|_| ())
    }
}

/// PRACH index, zero correlation zone, root sequence, TDD fit and frequency
pub struct PrachCheck;

impl CellCheck for PrachCheck {
    fn name(&self) -> &'static str {
        "prach"
    }

    fn check(&self, intent: &CellIntent, policy: &CellPolicy) -> Result<(), ValidationError> {
        let grid = CellGrid::resolve(intent)?;
        prach_of(intent, policy, &grid).map(|_| ())
    }
}

/// SRS periodicity and symbols
pub struct SrsCheck;

impl CellCheck for SrsCheck {
    fn name(&self) -> &'static str {
        "srs"
    }

    fn check(&self, intent: &CellIntent, _policy: &CellPolicy) -> Result<(), ValidationError> {
        let grid = CellGrid::resolve(intent)?;
        SrsConfig::derive(intent, &grid)
            .map(|_| ())
            .map_err(cause(ValidationError::Srs))
    }
}

/// CSI-RS period, slot offsets and report occasion
pub struct CsiCheck;

impl CellCheck for CsiCheck {
    fn name(&self) -> &'static str {
        "csi"
    }

    fn check(&self, intent: &CellIntent, policy: &CellPolicy) -> Result<(), ValidationError> {
        let grid = CellGrid::resolve(intent)?;
        csi_of(intent, policy, &grid).map(|_| ())
    }
}

/// RLM resources against the CSI configuration
pub struct RlmCheck;

impl CellCheck for RlmCheck {
    fn name(&self) -> &'static str {
        "rlm"
    }

    fn check(&self, intent: &CellIntent, policy: &CellPolicy) -> Result<(), ValidationError> {
        if intent.rlm == RlmPolicy::Default {
            return Ok(());
        }
        let grid = CellGrid::resolve(intent)?;
        let ssb = ssb_of(intent, &grid)?;
        let csi = csi_of(intent, policy, &grid)?;
        derived::derive_rlm(intent.rlm, &ssb, csi.as_ref())
            .map(|_| ())
            .map_err(cause(ValidationError::Rlm))
    }
}

/// SI scheduling and SIB payloads
pub struct SibCheck;

impl CellCheck for SibCheck {
    fn name(&self) -> &'static str {
        "sib"
    }

    fn check(&self, intent: &CellIntent, _policy: &CellPolicy) -> Result<(), ValidationError> {
        let grid = CellGrid::resolve(intent)?;
        let ssb = ssb_of(intent, &grid)?;
        let pdcch = pdcch_of(intent, &grid, &ssb)?;
        derived::derive_sib(intent, &grid, &pdcch)
            .map(|_| ())
            .map_err(cause(ValidationError::Sib))
    }
}

/// NTN timing advance and koffset bounds
pub struct NtnCheck;

impl CellCheck for NtnCheck {
    fn name(&self) -> &'static str {
        "ntn"
    }

    fn check(&self, intent: &CellIntent, _policy: &CellPolicy) -> Result<(), ValidationError> {
        intent.ntn.as_ref().map_or(Ok(()), |ntn| {
            expert::validate_ntn(ntn).map_err(|e| ValidationError::Ntn(e.to_string()))
        })
    }
}

/// QoS flow to bearer mapping
pub struct BearerCheck;

impl CellCheck for BearerCheck {
    fn name(&self) -> &'static str {
        "bearers"
    }

    fn check(&self, intent: &CellIntent, _policy: &CellPolicy) -> Result<(), ValidationError> {
        derived::derive_bearers(intent)
            .map(|_| ())
            .map_err(cause(ValidationError::Bearer))
    }
}

/// Largest MAC PDUs against the capture format
pub struct PcapCheck;

impl CellCheck for PcapCheck {
    fn name(&self) -> &'static str {
        "pcap"
    }

    fn check(&self, intent: &CellIntent, _policy: &CellPolicy) -> Result<(), ValidationError> {
        let num = CellNumerology::resolve(intent)?;
        derived::derive_pdu_sizes(intent, &num)
            .map(|_| ())
            .map_err(cause(ValidationError::Pcap))
    }
}
