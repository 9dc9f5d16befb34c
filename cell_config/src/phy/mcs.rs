//! MCS Tables and Transport Block Size
//!
//! PDSCH/PUSCH MCS index tables of TS 38.214 §5.1.3.1 and the TBS
//! determination of TS 38.214 §5.1.3.2.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// MCS table selected by RRC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum McsTable {
    #[default]
    #[serde(rename = "qam64")]
    Qam64,
    #[serde(rename = "qam256")]
    Qam256,
    #[serde(rename = "qam64LowSe")]
    Qam64LowSe,
}

/// Modulation order and target code rate (x1024) of one MCS index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McsEntry {
    pub modulation_order: u8,
    pub code_rate_x1024: f64,
}

const fn m(modulation_order: u8, code_rate_x1024: f64) -> McsEntry {
    McsEntry {
        modulation_order,
        code_rate_x1024,
    }
}

/// Table 5.1.3.1-1
static QAM64_TABLE: [McsEntry; 29] = [
    m(2, 120.0), m(2, 157.0), m(2, 193.0), m(2, 251.0), m(2, 308.0),
    m(2, 379.0), m(2, 449.0), m(2, 526.0), m(2, 602.0), m(2, 679.0),
    m(4, 340.0), m(4, 378.0), m(4, 434.0), m(4, 490.0), m(4, 553.0),
    m(4, 616.0), m(4, 658.0), m(6, 438.0), m(6, 466.0), m(6, 517.0),
    m(6, 567.0), m(6, 616.0), m(6, 666.0), m(6, 719.0), m(6, 772.0),
    m(6, 822.0), m(6, 873.0), m(6, 910.0), m(6, 948.0),
];

/// Table 5.1.3.1-2
static QAM256_TABLE: [McsEntry; 28] = [
    m(2, 120.0), m(2, 193.0), m(2, 308.0), m(2, 449.0), m(2, 602.0),
    m(4, 378.0), m(4, 434.0), m(4, 490.0), m(4, 553.0), m(4, 616.0),
    m(4, 658.0), m(6, 466.0), m(6, 517.0), m(6, 567.0), m(6, 616.0),
    m(6, 666.0), m(6, 719.0), m(6, 772.0), m(6, 822.0), m(6, 873.0),
    m(8, 682.5), m(8, 711.0), m(8, 754.0), m(8, 797.0), m(8, 841.0),
    m(8, 885.0), m(8, 916.5), m(8, 948.0),
];

/// Table 5.1.3.1-3
static QAM64_LOW_SE_TABLE: [McsEntry; 29] = [
    m(2, 30.0), m(2, 40.0), m(2, 50.0), m(2, 64.0), m(2, 78.0),
    m(2, 99.0), m(2, 120.0), m(2, 157.0), m(2, 193.0), m(2, 251.0),
    m(2, 308.0), m(2, 379.0), m(2, 449.0), m(2, 526.0), m(2, 602.0),
    m(4, 340.0), m(4, 378.0), m(4, 434.0), m(4, 490.0), m(4, 553.0),
    m(4, 616.0), m(6, 438.0), m(6, 466.0), m(6, 517.0), m(6, 567.0),
    m(6, 616.0), m(6, 666.0), m(6, 719.0), m(6, 772.0),
];

impl McsTable {
    fn entries(&self) -> &'static [McsEntry] {
        match self {
            Self::Qam64 => &QAM64_TABLE,
            Self::Qam256 => &QAM256_TABLE,
            Self::Qam64LowSe => &QAM64_LOW_SE_TABLE,
        }
    }

    /// Highest non-reserved MCS index
    pub fn max_mcs(&self) -> u8 {
        (self.entries().len() - 1) as u8
    }

    pub fn entry(&self, mcs: u8) -> Option<McsEntry> {
        self.entries().get(mcs as usize).copied()
    }

    /// Highest modulation order of the table
    pub fn max_modulation_order(&self) -> u8 {
        self.entries().iter().map(|e| e.modulation_order).max().unwrap_or(2)
    }
}

/// Table 5.1.3.2-1: TBS for N_info <= 3824
static TBS_TABLE: [u32; 93] = [
    24, 32, 40, 48, 56, 64, 72, 80, 88, 96, 104, 112, 120, 128, 136, 144, 152, 160, 168, 176,
    184, 192, 208, 224, 240, 256, 272, 288, 304, 320, 336, 352, 368, 384, 408, 432, 456, 480,
    504, 528, 552, 576, 608, 640, 672, 704, 736, 768, 808, 848, 888, 928, 984, 1032, 1064, 1128,
    1160, 1192, 1224, 1256, 1288, 1320, 1352, 1416, 1480, 1544, 1608, 1672, 1736, 1800, 1864,
    1928, 2024, 2088, 2152, 2216, 2280, 2408, 2472, 2536, 2600, 2664, 2728, 2792, 2856, 2976,
    3104, 3240, 3368, 3496, 3624, 3752, 3824,
];

/// Inputs of the TBS computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TbsParams {
    pub table: McsTable,
    pub mcs: u8,
    pub nof_prbs: u32,
    pub nof_symbols: u8,
    /// DM-RS REs per PRB
    pub nof_dmrs_per_prb: u32,
    /// xOverhead per PRB
    pub nof_oh_per_prb: u32,
    pub nof_layers: u32,
}

/// Transport block size in bits, `None` for a reserved MCS or an empty allocation
pub fn tbs(params: &TbsParams) -> Option<u32> {
    let entry = params.table.entry(params.mcs)?;
    let re_per_prb = (12 * params.nof_symbols as u32)
        .checked_sub(params.nof_dmrs_per_prb + params.nof_oh_per_prb)?
        .min(156);
    let nof_re = re_per_prb * params.nof_prbs;
    let rate = entry.code_rate_x1024 / 1024.0;
    let n_info = nof_re as f64 * rate * entry.modulation_order as f64 * params.nof_layers as f64;
    if n_info <= 0.0 {
        return None;
    }

    let tbs = if n_info <= 3824.0 {
        let n = (n_info.log2().floor() as i32 - 6).max(3);
        let step = 2f64.powi(n);
        let n_info_q = (step * (n_info / step).floor()).max(24.0) as u32;
        TBS_TABLE.iter().copied().find(|t| *t >= n_info_q).unwrap_or(3824)
    } else {
        let n = (n_info - 24.0).log2().floor() as i32 - 5;
        let step = 2f64.powi(n);
        let n_info_q = (step * ((n_info - 24.0) / step).round()).max(3840.0) as u32;
        let segments = if rate <= 0.25 {
            (n_info_q + 24).div_ceil(3816)
        } else if n_info_q > 8424 {
            (n_info_q + 24).div_ceil(8424)
        } else {
            1
        };
        8 * segments * (n_info_q + 24).div_ceil(8 * segments) - 24
    };
    trace!("TBS for {:?}: N_info {:.1}, {} bits", params, n_info, tbs);
    Some(tbs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(table: McsTable, mcs: u8, nof_prbs: u32, nof_layers: u32) -> TbsParams {
        TbsParams {
            table,
            mcs,
            nof_prbs,
            nof_symbols: 14,
            nof_dmrs_per_prb: 12,
            nof_oh_per_prb: 0,
            nof_layers,
        }
    }

    #[test]
    fn test_table_limits() {
        assert_eq!(McsTable::Qam64.max_mcs(), 28);
        assert_eq!(McsTable::Qam256.max_mcs(), 27);
        assert_eq!(McsTable::Qam64LowSe.max_mcs(), 28);
        assert_eq!(McsTable::Qam256.max_modulation_order(), 8);
        assert!(McsTable::Qam64.entry(29).is_none());
    }

    #[test]
    fn test_small_tbs() {
        assert_eq!(tbs(&params(McsTable::Qam64, 0, 1, 1)), Some(32));
    }

    #[test]
    fn test_large_tbs() {
        assert_eq!(tbs(&params(McsTable::Qam64, 27, 51, 1)), Some(42016));
    }

    #[test]
    fn test_tbs_over_table() {
        let sizes: Vec<u32> = (0..=McsTable::Qam64.max_mcs())
            .filter_map(|mcs| tbs(&params(McsTable::Qam64, mcs, 51, 1)))
            .collect();
        assert_eq!(sizes.len(), 29);
        assert!(sizes[0] < sizes[10] && sizes[10] < sizes[28]);
        assert!(sizes.iter().all(|t| (t + 24) % 8 == 0));
    }

    #[test]
    fn test_reserved_and_empty() {
        assert_eq!(tbs(&params(McsTable::Qam256, 28, 51, 1)), None);
        assert_eq!(tbs(&params(McsTable::Qam64, 0, 0, 1)), None);
    }

    #[test]
    fn test_table_serde() {
        let table: McsTable = serde_json::from_str("\"qam64LowSe\"").unwrap();
        assert_eq!(table, McsTable::Qam64LowSe);
    }
}
