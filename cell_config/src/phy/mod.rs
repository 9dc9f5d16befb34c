//! Physical Layer (PHY) Resource Derivation
//!
//! Standard tables and first-match solvers for the physical layer resources
//! of a cell, according to 3GPP TS 38.211, TS 38.213 and TS 38.214.

pub mod csi_rs;
pub mod mcs;
pub mod pdcch;
pub mod prach;
pub mod pucch;
pub mod ssb;
pub mod tdd;
pub mod timing;

// Re-export commonly used types
pub use csi_rs::{derive_offsets, CsiRsOffsetError, ResolvedOffsets};
pub use prach::{find_valid_index, PrachError, PrachFormat, SlotRange};
pub use tdd::{TddConfig, TddPattern, TddSlotMap};
pub use timing::{generate_k1, generate_k2, generate_pdsch_td, PdschTimeDomainResource, PuschTimeDomainResource};
