//! Cell Configuration Library
//!
//! Turns operator cell intents into validated, fully derived 5G NR cell
//! configurations according to 3GPP TS 38.211, TS 38.213 and TS 38.331.
//!
//! Validation runs first and reports a structured [`ValidationError`]. The
//! builder then derives every resource of the cell and treats any failure
//! as an internal inconsistency ([`BuildError`]).

pub mod builder;
pub mod derived;
pub mod intent;
pub mod mac;
pub mod numerology;
pub mod pcap;
pub mod pdcp;
pub mod phy;
pub mod policy;
pub mod rlc;
pub mod rrc;
pub mod validator;

pub use builder::{build_cell_config, try_build_cell_config};
pub use derived::DerivedCellConfig;
pub use intent::CellIntent;
pub use policy::CellPolicy;
pub use validator::{validate_cells, CellValidator};

use phy::csi_rs::CsiRsOffsetError;
use phy::prach::PrachError;
use phy::tdd::TddError;
use thiserror::Error;

/// Cause of a rejected cell intent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid antenna configuration: {0}")]
    Antennas(String),

    #[error("Invalid PCI: {0}")]
    Pci(u16),

    #[error("Invalid cell identity: {0}")]
    Identity(String),

    #[error("Invalid carrier: {0}")]
    Carrier(String),

    #[error("Invalid TDD pattern: {0}")]
    Tdd(#[from] TddError),

    #[error("Invalid SSB configuration: {0}")]
    Ssb(String),

    #[error("Invalid PDCCH configuration: {0}")]
    Pdcch(String),

    #[error("Invalid PDSCH configuration: {0}")]
    Pdsch(String),

    #[error("Invalid PUSCH configuration: {0}")]
    Pusch(String),

    #[error("Invalid PUCCH configuration: {0}")]
    Pucch(String),

    #[error("Invalid PRACH configuration: {0}")]
    Prach(#[from] PrachError),

    #[error("Invalid SRS configuration: {0}")]
    Srs(String),

    #[error("Invalid CSI configuration: {0}")]
    Csi(String),

    #[error("Invalid CSI-RS slot offsets: {0}")]
    CsiRsOffset(#[from] CsiRsOffsetError),

    #[error("Invalid radio link monitoring configuration: {0}")]
    Rlm(String),

    #[error("Invalid SIB scheduling: {0}")]
    Sib(String),

    #[error("Invalid NTN configuration: {0}")]
    Ntn(String),

    #[error("Invalid bearer configuration: {0}")]
    Bearer(String),

    #[error("Capture incompatible: {0}")]
    Pcap(String),

    #[error("Cross-cell conflict: {0}")]
    CrossCell(String),

    #[error("Cell {index}: {source}")]
    Cell {
        index: usize,
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Attach the index of the offending cell
    pub fn in_cell(self, index: usize) -> Self {
        Self::Cell {
            index,
            source: Box::new(self),
        }
    }
}

/// Internal inconsistency found while deriving an accepted cell
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Derivation rejected the cell intent: {0}")]
    Invalid(#[from] ValidationError),

    #[error("No compliant SSB/CORESET#0 placement for band n{band} at ARFCN {dl_arfcn}")]
    NoSsbPlacement { band: u16, dl_arfcn: u32 },

    #[error("No PRACH frequency start free of PUCCH resources")]
    NoPrachFrequency,

    #[error("Internal inconsistency: {0}")]
    Inconsistent(String),
}
