//! MAC Capture Compatibility
//!
//! A MAC-NR capture frames each PDU with a fixed context header, either as a
//! pcap record of a user DLT or inside a UDP datagram. The largest MAC PDU of
//! the cell must fit the record.

use crate::intent::{PcapFormat, PcapIntent};
use crate::phy::mcs::{tbs, McsTable, TbsParams};
use common::types::NOF_SYMBOLS_PER_SLOT;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Largest pcap record of a DLT capture
pub const DLT_MAX_RECORD_BYTES: u32 = 65_535;
/// Largest UDP payload over IPv4
pub const UDP_MAX_PAYLOAD_BYTES: u32 = 65_507;
/// "mac-nr" start string of the UDP framing
pub const MAC_NR_START_STRING_BYTES: u32 = 6;
/// Fixed MAC-NR context: radio type, direction, RNTI type, RNTI, UE id, payload tag
pub const MAC_NR_CONTEXT_BYTES: u32 = 16;

/// DM-RS REs per PRB of a single-symbol type A DM-RS
const DMRS_RES_PER_PRB: u32 = 12;

/// Capture errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PcapError {
    #[error("{direction} MAC PDUs of up to {pdu_bytes} bytes exceed the {limit} byte {format:?} capture record")]
    PduTooLarge {
        direction: &'static str,
        format: PcapFormat,
        pdu_bytes: u32,
        limit: u32,
    },

    #[error("MCS {mcs} is reserved in table {table:?}")]
    ReservedMcs { table: McsTable, mcs: u8 },
}

/// Largest PDU a capture format can carry
pub fn max_pdu_bytes(format: PcapFormat) -> u32 {
    match format {
        PcapFormat::Dlt => DLT_MAX_RECORD_BYTES - MAC_NR_CONTEXT_BYTES,
        PcapFormat::Udp => UDP_MAX_PAYLOAD_BYTES - MAC_NR_START_STRING_BYTES - MAC_NR_CONTEXT_BYTES,
    }
}

/// Largest MAC PDU in bytes for a full-BWP, full-slot grant
pub fn largest_mac_pdu(table: McsTable, max_mcs: u8, nof_prbs: u32, nof_layers: u32) -> Result<u32, PcapError> {
    let params = TbsParams {
        table,
        mcs: max_mcs,
        nof_prbs,
        nof_symbols: NOF_SYMBOLS_PER_SLOT,
        nof_dmrs_per_prb: DMRS_RES_PER_PRB,
        nof_oh_per_prb: 0,
        nof_layers,
    };
    tbs(&params)
        .map(|bits| bits.div_ceil(8))
        .ok_or(PcapError::ReservedMcs { table, mcs: max_mcs })
}

/// Largest DL and UL MAC PDUs of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PduSizes {
    pub dl_bytes: u32,
    pub ul_bytes: u32,
}

/// Check both directions against the configured capture, if any
pub fn check(pcap: Option<&PcapIntent>, sizes: PduSizes) -> Result<(), PcapError> {
    let Some(pcap) = pcap else {
        return Ok(());
    };
    let limit = max_pdu_bytes(pcap.format);
    debug!("Capture limit {} bytes, PDUs up to {:?}", limit, sizes);
    [("DL", sizes.dl_bytes), ("UL", sizes.ul_bytes)]
        .into_iter()
        .find(|(_, bytes)| *bytes > limit)
        .map_or(Ok(()), |(direction, pdu_bytes)| {
            Err(PcapError::PduTooLarge {
                direction,
                format: pcap.format,
                pdu_bytes,
                limit,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        assert_eq!(max_pdu_bytes(PcapFormat::Dlt), 65_519);
        assert_eq!(max_pdu_bytes(PcapFormat::Udp), 65_485);
    }

    #[test]
    fn test_narrow_cell_fits() {
        let dl = largest_mac_pdu(McsTable::Qam64, 28, 51, 4).unwrap();
        let ul = largest_mac_pdu(McsTable::Qam64, 28, 51, 1).unwrap();
        assert!(dl > ul);
        let sizes = PduSizes { dl_bytes: dl, ul_bytes: ul };
        assert!(check(Some(&PcapIntent { format: PcapFormat::Udp }), sizes).is_ok());
    }

    #[test]
    fn test_wide_mimo_cell_overflows() {
        let dl = largest_mac_pdu(McsTable::Qam256, 27, 273, 4).unwrap();
        let sizes = PduSizes { dl_bytes: dl, ul_bytes: 1000 };
        assert!(matches!(
            check(Some(&PcapIntent { format: PcapFormat::Dlt }), sizes),
            Err(PcapError::PduTooLarge { direction: "DL", .. })
        ));
        // Nothing to check without a capture
        assert!(check(None, sizes).is_ok());
    }

    #[test]
    fn test_reserved_mcs() {
        assert_eq!(
            largest_mac_pdu(McsTable::Qam256, 28, 51, 1),
            Err(PcapError::ReservedMcs { table: McsTable::Qam256, mcs: 28 })
        );
    }
}
