//! System Information Set
//!
//! SIB1 descriptor and SI message scheduling (TS 38.331 SI-SchedulingInfo,
//! TS 38.331 §5.2.2.3.2 for the SI-window position).

use crate::intent::{NtnIntent, SibIntent};
use common::types::{NrCellId, Tac};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Allowed si-Periodicity values in radio frames
pub const SI_PERIODS_RF: [u32; 7] = [8, 16, 32, 64, 128, 256, 512];
/// Allowed si-WindowLength values in slots
pub const SI_WINDOW_LENGTHS_SLOTS: [u32; 9] = [5, 10, 20, 40, 80, 160, 320, 640, 1280];
/// Maximum number of SI messages (maxSI-Message)
pub const MAX_SI_MESSAGES: usize = 32;
/// SIB types that can be scheduled
pub const SUPPORTED_SIBS: [u8; 9] = [2, 3, 4, 5, 6, 7, 8, 9, 19];
/// NTN system information
pub const SIB19: u8 = 19;
/// SIB1 transmission time interval, over which SIB1 content is fixed and repeated
pub const SIB1_TTI_MS: u32 = 160;

/// SIB scheduling errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SibError {
    #[error("SI period of {0} radio frames is not allowed")]
    InvalidPeriod(u32),

    #[error("SI window of {0} slots is not allowed")]
    InvalidWindow(u32),

    #[error("{0} SI messages exceed the maximum of 32")]
    TooManyMessages(usize),

    #[error("SI message {0} carries no SIB")]
    EmptyMessage(usize),

    #[error("SIB{0} is not supported")]
    UnsupportedSib(u8),

    #[error("SIB{0} is scheduled more than once")]
    DuplicateSib(u8),

    #[error("SIB19 must be the only SIB of its SI message")]
    Sib19NotAlone,

    #[error("SIB19 requires NTN parameters")]
    Sib19WithoutNtn,

    #[error("{nof_messages} SI windows of {window_slots} slots exceed the shortest SI period of {period_slots} slots")]
    WindowsExceedPeriod { nof_messages: u32, window_slots: u32, period_slots: u32 },

    #[error("q-RxLevMin {0} is not in -70..=-22")]
    InvalidQRxLevMin(i32),

    #[error("t-Reselection {0} is not in 0..=7")]
    InvalidTReselection(u32),

    #[error("Invalid PLMN {0}")]
    InvalidPlmn(String),
}

/// PLMN identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PlmnId {
    /// Mobile Country Code (3 digits)
    pub mcc: [u8; 3],
    /// Mobile Network Code (2 or 3 digits)
    pub mnc: Vec<u8>,
}

impl PlmnId {
    /// Parse a 5 or 6 digit PLMN string such as "00101"
    pub fn parse(plmn: &str) -> Result<Self, SibError> {
        let invalid = || SibError::InvalidPlmn(plmn.to_string());
        if !(5..=6).contains(&plmn.len()) {
            return Err(invalid());
        }
        let digits = plmn
            .chars()
            .map(|c| c.to_digit(10).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(invalid)?;
        Ok(Self {
            mcc: [digits[0], digits[1], digits[2]],
            mnc: digits[3..].to_vec(),
        })
    }

    /// Encode to the 3 octets of TS 24.501 §9.11.3.4
    pub fn encode(&self) -> [u8; 3] {
        let mnc3 = self.mnc.get(2).copied().unwrap_or(0xF);
        [
            (self.mcc[1] << 4) | self.mcc[0],
            (mnc3 << 4) | self.mcc[2],
            (self.mnc[1] << 4) | self.mnc[0],
        ]
    }
}

/// SIB1 content relevant to the cell configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sib1Descriptor {
    pub plmn: PlmnId,
    pub tac: Tac,
    pub nci: NrCellId,
    pub q_rx_lev_min: i32,
    /// Transmission time interval of the SIB1 content
    pub tti_ms: u32,
    /// Slots of the Type0-PDCCH occasions within two frames
    pub pdcch_slots: Vec<u32>,
}

/// One scheduled SI message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiMessage {
    pub sibs: Vec<u8>,
    pub period_rf: u32,
    /// First slot of the SI window within the SI period
    pub window_start_slot: u32,
}

/// SIB2 cell reselection parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sib2 {
    pub q_rx_lev_min: i32,
    pub t_reselection: u32,
}

/// SIB19 NTN parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sib19 {
    pub cell_specific_koffset: u32,
    pub ta_common: u64,
    pub ta_common_drift: i32,
    pub ta_common_drift_variant: u32,
}

/// Broadcast system information of a cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SibSet {
    pub sib1: Sib1Descriptor,
    pub si_window_len_slots: u32,
    pub si_messages: Vec<SiMessage>,
    pub sib2: Option<Sib2>,
    pub sib19: Option<Sib19>,
}

/// Check the SI scheduling of a cell
///
/// The SI windows of consecutive messages follow each other, so all windows
/// must fit in the shortest SI period.
pub fn validate(sib: &SibIntent, ntn: Option<&NtnIntent>, slots_per_frame: u32) -> Result<(), SibError> {
    if !SI_WINDOW_LENGTHS_SLOTS.contains(&sib.si_window_len_slots) {
        return Err(SibError::InvalidWindow(sib.si_window_len_slots));
    }
    if sib.si_sched_info.len() > MAX_SI_MESSAGES {
        return Err(SibError::TooManyMessages(sib.si_sched_info.len()));
    }
    if !(-70..=-22).contains(&sib.q_rx_lev_min) {
        return Err(SibError::InvalidQRxLevMin(sib.q_rx_lev_min));
    }
    if sib.t_reselection > 7 {
        return Err(SibError::InvalidTReselection(sib.t_reselection));
    }

    let mut seen = BTreeSet::new();
    for (i, msg) in sib.si_sched_info.iter().enumerate() {
        if !SI_PERIODS_RF.contains(&msg.si_period_rf) {
            return Err(SibError::InvalidPeriod(msg.si_period_rf));
        }
        if msg.sib_mapping.is_empty() {
            return Err(SibError::EmptyMessage(i));
        }
        if msg.sib_mapping.contains(&SIB19) {
            if msg.sib_mapping.len() > 1 {
                return Err(SibError::Sib19NotAlone);
            }
            if ntn.is_none() {
                return Err(SibError::Sib19WithoutNtn);
            }
        }
        for sib_type in &msg.sib_mapping {
            if !SUPPORTED_SIBS.contains(sib_type) {
                return Err(SibError::UnsupportedSib(*sib_type));
            }
            if !seen.insert(*sib_type) {
                return Err(SibError::DuplicateSib(*sib_type));
            }
        }
    }

    if let Some(min_period_rf) = sib.si_sched_info.iter().map(|m| m.si_period_rf).min() {
        let nof_messages = sib.si_sched_info.len() as u32;
        let period_slots = min_period_rf * slots_per_frame;
        if nof_messages * sib.si_window_len_slots > period_slots {
            return Err(SibError::WindowsExceedPeriod {
                nof_messages,
                window_slots: sib.si_window_len_slots,
                period_slots,
            });
        }
    }
    Ok(())
}

/// Assemble the SIB set of an accepted cell
pub fn build(sib: &SibIntent, ntn: Option<&NtnIntent>, sib1: Sib1Descriptor) -> SibSet {
    let si_messages: Vec<SiMessage> = sib
        .si_sched_info
        .iter()
        .enumerate()
        .map(|(i, msg)| SiMessage {
            sibs: msg.sib_mapping.clone(),
            period_rf: msg.si_period_rf,
            window_start_slot: i as u32 * sib.si_window_len_slots,
        })
        .collect();
    let scheduled = |t: u8| si_messages.iter().any(|m| m.sibs.contains(&t));

    let set = SibSet {
        sib2: scheduled(2).then_some(Sib2 {
            q_rx_lev_min: sib.q_rx_lev_min,
            t_reselection: sib.t_reselection,
        }),
        sib19: ntn.filter(|_| scheduled(SIB19)).map(|n| Sib19 {
            cell_specific_koffset: n.cell_specific_koffset,
            ta_common: n.ta_common,
            ta_common_drift: n.ta_common_drift,
            ta_common_drift_variant: n.ta_common_drift_variant,
        }),
        sib1,
        si_window_len_slots: sib.si_window_len_slots,
        si_messages,
    };
    debug!("SIB set: {} SI messages", set.si_messages.len());
    set
}
