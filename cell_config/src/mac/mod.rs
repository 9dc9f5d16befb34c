//! Medium Access Control (MAC) Configuration
//!
//! Scheduler expert parameters (TS 38.321 HARQ, TS 38.214 MCS) and the
//! broadcast system information set (TS 38.331 SIB1, SI messages).

pub mod expert;
pub mod sib;

pub use expert::{ExpertError, SchedulerExpertConfig};
pub use sib::{PlmnId, SibError, SibSet};
