//! Common Utilities and Types Library
//!
//! This crate provides the radio parameter types, band tables and utilities
//! shared by the cell configuration crates.

pub mod band;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use band::*;
pub use types::*;
pub use utils::*;
