//! Cell Intent
//!
//! Operator-facing description of one radio cell, in the layout of an
//! srsRAN-compatible `cell_cfg` section. Every optional knob carries a
//! serde default so that a minimal YAML cell only names its carrier.

use crate::phy::mcs::McsTable;
use crate::phy::pdcch::SearchSpaceType;
use crate::phy::pucch::{MaxCodeRate, PucchFormat};
use crate::phy::tdd::TddConfig;
use crate::policy;
use crate::rlc::RlcMode;
use common::band;
use common::types::{Bandwidth, FiveQi, NrCellId, Pci, SubcarrierSpacing, Tac};
use serde::{Deserialize, Serialize};

/// Cell configuration intent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CellIntent {
    /// Physical Cell ID
    pub pci: u16,
    /// Downlink ARFCN
    pub dl_arfcn: u32,
    /// Band number, inferred from the DL ARFCN when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<u16>,
    /// Channel bandwidth in MHz
    #[serde(rename = "channel_bandwidth_MHz", default = "default_bandwidth")]
    pub channel_bandwidth: Bandwidth,
    /// Common subcarrier spacing in kHz
    #[serde(default = "default_common_scs")]
    pub common_scs: SubcarrierSpacing,
    /// Number of DL antennas
    #[serde(default = "default_nof_antennas")]
    pub nof_antennas_dl: u32,
    /// Number of UL antennas
    #[serde(default = "default_nof_antennas")]
    pub nof_antennas_ul: u32,
    /// NR Cell Identity, the PCI when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nci: Option<u64>,
    /// Tracking area code
    #[serde(default = "default_tac")]
    pub tac: u32,
    /// PLMN
    #[serde(default = "default_plmn")]
    pub plmn: String,
    /// TDD UL/DL pattern (TDD bands only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tdd_ul_dl_cfg: Option<TddConfig>,
    #[serde(default)]
    pub ssb: SsbIntent,
    #[serde(default)]
    pub pdcch: PdcchIntent,
    #[serde(default)]
    pub pdsch: PdschIntent,
    #[serde(default)]
    pub pusch: PuschIntent,
    #[serde(default)]
    pub pucch: PucchIntent,
    #[serde(default)]
    pub prach: PrachIntent,
    #[serde(default)]
    pub srs: SrsIntent,
    #[serde(default)]
    pub csi: CsiIntent,
    #[serde(default)]
    pub sib: SibIntent,
    /// Non-terrestrial network parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntn: Option<NtnIntent>,
    /// Radio link monitoring resource policy
    #[serde(default)]
    pub rlm: RlmPolicy,
    /// QoS flows mapped to DRBs
    #[serde(default = "default_qos")]
    pub qos: Vec<QosIntent>,
    /// MAC capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcap: Option<PcapIntent>,
}

fn default_bandwidth() -> Bandwidth {
    Bandwidth::Bw20
}

fn default_common_scs() -> SubcarrierSpacing {
    SubcarrierSpacing::Scs30
}

fn default_nof_antennas() -> u32 {
    1
}

fn default_tac() -> u32 {
    7
}

fn default_plmn() -> String {
    "00101".to_string()
}

fn default_qos() -> Vec<QosIntent> {
    vec![QosIntent {
        five_qi: FiveQi::DEFAULT,
        rlc_mode: None,
    }]
}

impl CellIntent {
    /// Minimal cell on a carrier, every other field at its default
    pub fn new(pci: u16, dl_arfcn: u32) -> Self {
        Self {
            pci,
            dl_arfcn,
            band: None,
            channel_bandwidth: default_bandwidth(),
            common_scs: default_common_scs(),
            nof_antennas_dl: default_nof_antennas(),
            nof_antennas_ul: default_nof_antennas(),
            nci: None,
            tac: default_tac(),
            plmn: default_plmn(),
            tdd_ul_dl_cfg: None,
            ssb: SsbIntent::default(),
            pdcch: PdcchIntent::default(),
            pdsch: PdschIntent::default(),
            pusch: PuschIntent::default(),
            pucch: PucchIntent::default(),
            prach: PrachIntent::default(),
            srs: SrsIntent::default(),
            csi: CsiIntent::default(),
            sib: SibIntent::default(),
            ntn: None,
            rlm: RlmPolicy::default(),
            qos: default_qos(),
            pcap: None,
        }
    }

    /// Configured band, or the one containing the DL ARFCN
    pub fn band(&self) -> Option<u16> {
        self.band.or_else(|| band::band_from_dl_arfcn(self.dl_arfcn))
    }

    pub fn pci(&self) -> Pci {
        Pci(self.pci)
    }

    pub fn nci(&self) -> NrCellId {
        NrCellId(self.nci.unwrap_or(self.pci as u64))
    }

    pub fn tac(&self) -> Tac {
        Tac(self.tac)
    }
}

/// SSB configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SsbIntent {
    /// SSB period in ms
    #[serde(default = "default_ssb_period_ms")]
    pub period_ms: u32,
    /// Transmitted SSBs, bit i enabling SSB index i. Only the first SSB when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitmap: Option<u64>,
}

fn default_ssb_period_ms() -> u32 {
    10
}

impl Default for SsbIntent {
    fn default() -> Self {
        Self {
            period_ms: default_ssb_period_ms(),
            bitmap: None,
        }
    }
}

/// PDCCH configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PdcchIntent {
    /// CORESET#0 index, searched when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coreset0_index: Option<u8>,
    /// Search space 0 index
    #[serde(default)]
    pub ss0_index: u8,
    /// CORESET#1 width in RBs, the whole BWP when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coreset1_rbs: Option<u32>,
    /// CORESET#1 duration, the CORESET#0 duration when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coreset1_duration: Option<u8>,
    /// SearchSpace#1 candidates for AL1..AL16
    #[serde(default = "default_ss1_candidates")]
    pub ss1_candidates: [u8; 5],
    /// SearchSpace#2 candidates for AL1..AL16
    #[serde(default = "default_ss2_candidates")]
    pub ss2_candidates: [u8; 5],
    /// Search space 2 type
    #[serde(default)]
    pub ss2_type: SearchSpaceType,
    /// DCI format 0_1 and 1_1 enabled
    #[serde(default = "default_true")]
    pub dci_format_0_1_and_1_1: bool,
}

fn default_ss1_candidates() -> [u8; 5] {
    [0, 0, 1, 1, 0]
}

fn default_ss2_candidates() -> [u8; 5] {
    [0, 2, 2, 1, 0]
}

fn default_true() -> bool {
    true
}

impl Default for PdcchIntent {
    fn default() -> Self {
        Self {
            coreset0_index: None,
            ss0_index: 0,
            coreset1_rbs: None,
            coreset1_duration: None,
            ss1_candidates: default_ss1_candidates(),
            ss2_candidates: default_ss2_candidates(),
            ss2_type: SearchSpaceType::default(),
            dci_format_0_1_and_1_1: true,
        }
    }
}

/// PDSCH configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PdschIntent {
    /// MCS table
    #[serde(default)]
    pub mcs_table: McsTable,
    #[serde(default)]
    pub min_ue_mcs: u8,
    #[serde(default = "default_max_ue_mcs")]
    pub max_ue_mcs: u8,
    #[serde(default = "default_max_harq_retx")]
    pub max_nof_harq_retxs: u8,
    /// Redundancy version sequence
    #[serde(default = "default_pdsch_rv_sequence")]
    pub rv_sequence: Vec<u8>,
    #[serde(default = "default_max_per_slot")]
    pub max_pdschs_per_slot: u32,
    /// Smallest HARQ-ACK delay in slots
    #[serde(default = "default_min_k")]
    pub min_k1: u8,
}

fn default_max_ue_mcs() -> u8 {
    28
}

fn default_max_harq_retx() -> u8 {
    4
}

fn default_pdsch_rv_sequence() -> Vec<u8> {
    vec![0, 2, 3, 1]
}

fn default_max_per_slot() -> u32 {
    8
}

fn default_min_k() -> u8 {
    4
}

impl Default for PdschIntent {
    fn default() -> Self {
        Self {
            mcs_table: McsTable::default(),
            min_ue_mcs: 0,
            max_ue_mcs: default_max_ue_mcs(),
            max_nof_harq_retxs: default_max_harq_retx(),
            rv_sequence: default_pdsch_rv_sequence(),
            max_pdschs_per_slot: default_max_per_slot(),
            min_k1: default_min_k(),
        }
    }
}

/// PUSCH configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PuschIntent {
    /// MCS table
    #[serde(default)]
    pub mcs_table: McsTable,
    #[serde(default)]
    pub min_ue_mcs: u8,
    #[serde(default = "default_max_ue_mcs")]
    pub max_ue_mcs: u8,
    #[serde(default = "default_max_harq_retx")]
    pub max_nof_harq_retxs: u8,
    /// Redundancy version sequence
    #[serde(default = "default_pusch_rv_sequence")]
    pub rv_sequence: Vec<u8>,
    #[serde(default = "default_max_per_slot")]
    pub max_puschs_per_slot: u32,
    /// Smallest UL grant delay in slots
    #[serde(default = "default_min_k")]
    pub min_k2: u8,
}

fn default_pusch_rv_sequence() -> Vec<u8> {
    vec![0]
}

impl Default for PuschIntent {
    fn default() -> Self {
        Self {
            mcs_table: McsTable::default(),
            min_ue_mcs: 0,
            max_ue_mcs: default_max_ue_mcs(),
            max_nof_harq_retxs: default_max_harq_retx(),
            rv_sequence: default_pusch_rv_sequence(),
            max_puschs_per_slot: default_max_per_slot(),
            min_k2: default_min_k(),
        }
    }
}

/// PUCCH configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PucchIntent {
    /// Format of HARQ-ACK set 0 and SR resources
    #[serde(default)]
    pub harq_format: PucchFormat,
    /// Symbols of the HARQ/SR resources, 14 for Format 1 and 2 for Format 0 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harq_nof_symbols: Option<u8>,
    #[serde(default = "default_f1_cyclic_shifts")]
    pub f1_nof_cyclic_shifts: u8,
    #[serde(default = "default_true")]
    pub f1_enable_occ: bool,
    #[serde(default = "default_f2_nof_symbols")]
    pub f2_nof_symbols: u8,
    /// Fixed Format 2 PRB count, sized from the UCI payload when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f2_nof_prbs: Option<u32>,
    #[serde(default)]
    pub f2_max_code_rate: MaxCodeRate,
    #[serde(default = "default_res_per_set")]
    pub nof_res_set0: u32,
    #[serde(default = "default_res_per_set")]
    pub nof_res_set1: u32,
    #[serde(default = "default_nof_cell_sets")]
    pub nof_cell_res_sets: u32,
    #[serde(default = "default_nof_sr")]
    pub nof_cell_sr_resources: u32,
    #[serde(default = "default_nof_csi")]
    pub nof_cell_csi_resources: u32,
    #[serde(default)]
    pub intraslot_freq_hopping: bool,
    /// SR period in ms
    #[serde(default = "default_sr_period_ms")]
    pub sr_period_ms: u32,
}

fn default_f1_cyclic_shifts() -> u8 {
    1
}

fn default_f2_nof_symbols() -> u8 {
    2
}

fn default_res_per_set() -> u32 {
    policy::DEFAULT_PUCCH_RES_PER_SET
}

fn default_nof_cell_sets() -> u32 {
    policy::DEFAULT_NOF_PUCCH_RES_SETS
}

fn default_nof_sr() -> u32 {
    policy::DEFAULT_NOF_SR_RESOURCES
}

fn default_nof_csi() -> u32 {
    policy::DEFAULT_NOF_CSI_RESOURCES
}

fn default_sr_period_ms() -> u32 {
    20
}

impl Default for PucchIntent {
    fn default() -> Self {
        Self {
            harq_format: PucchFormat::default(),
            harq_nof_symbols: None,
            f1_nof_cyclic_shifts: default_f1_cyclic_shifts(),
            f1_enable_occ: true,
            f2_nof_symbols: default_f2_nof_symbols(),
            f2_nof_prbs: None,
            f2_max_code_rate: MaxCodeRate::default(),
            nof_res_set0: default_res_per_set(),
            nof_res_set1: default_res_per_set(),
            nof_cell_res_sets: default_nof_cell_sets(),
            nof_cell_sr_resources: default_nof_sr(),
            nof_cell_csi_resources: default_nof_csi(),
            intraslot_freq_hopping: false,
            sr_period_ms: default_sr_period_ms(),
        }
    }
}

impl PucchIntent {
    /// HARQ/SR resource length for the chosen format
    pub fn harq_symbols(&self) -> u8 {
        self.harq_nof_symbols.unwrap_or(match self.harq_format {
            PucchFormat::Format1 => 14,
            _ => 2,
        })
    }
}

/// PRACH configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PrachIntent {
    /// PRACH configuration index, derived when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prach_config_index: Option<u8>,
    /// PRACH root sequence index
    #[serde(default = "default_root_sequence_index")]
    pub prach_root_sequence_index: u16,
    /// Zero correlation zone
    #[serde(default)]
    pub zero_correlation_zone: u8,
    /// PRACH frequency start, first RB free of PUCCH when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prach_frequency_start: Option<u32>,
    /// Number of frequency-multiplexed occasions
    #[serde(default = "default_msg1_fdm")]
    pub msg1_fdm: u8,
    /// Total number of RA preambles
    #[serde(default = "default_total_nof_ra_preambles")]
    pub total_nof_ra_preambles: u32,
    /// Number of SSB per RACH occasion
    #[serde(default = "default_nof_ssb_per_ro")]
    pub nof_ssb_per_ro: u32,
    /// Number of CB preambles per SSB
    #[serde(default = "default_nof_cb_preambles_per_ssb")]
    pub nof_cb_preambles_per_ssb: u32,
    /// RA response window in slots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ra_resp_window: Option<u32>,
}

fn default_root_sequence_index() -> u16 {
    1
}

fn default_msg1_fdm() -> u8 {
    1
}

fn default_total_nof_ra_preambles() -> u32 {
    64 // Standard value for PRACH
}

fn default_nof_ssb_per_ro() -> u32 {
    1 // One SSB per RACH occasion
}

fn default_nof_cb_preambles_per_ssb() -> u32 {
    64 // All preambles are CB preambles by default
}

impl Default for PrachIntent {
    fn default() -> Self {
        Self {
            prach_config_index: None,
            prach_root_sequence_index: default_root_sequence_index(),
            zero_correlation_zone: 0,
            prach_frequency_start: None,
            msg1_fdm: default_msg1_fdm(),
            total_nof_ra_preambles: default_total_nof_ra_preambles(),
            nof_ssb_per_ro: default_nof_ssb_per_ro(),
            nof_cb_preambles_per_ssb: default_nof_cb_preambles_per_ssb(),
            ra_resp_window: None,
        }
    }
}

/// SRS configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SrsIntent {
    #[serde(default)]
    pub enabled: bool,
    /// SRS period in slots
    #[serde(default = "default_srs_period_slots")]
    pub period_slots: u32,
    /// Symbols per SRS resource
    #[serde(default = "default_srs_nof_symbols")]
    pub nof_symbols: u8,
}

fn default_srs_period_slots() -> u32 {
    40
}

fn default_srs_nof_symbols() -> u8 {
    1
}

impl Default for SrsIntent {
    fn default() -> Self {
        Self {
            enabled: false,
            period_slots: default_srs_period_slots(),
            nof_symbols: default_srs_nof_symbols(),
        }
    }
}

/// CSI-RS and CSI report configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CsiIntent {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// CSI-RS period in ms
    #[serde(default = "default_csi_rs_period_ms")]
    pub csi_rs_period_ms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meas_csi_rs_slot_offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_csi_rs_slot_offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zp_csi_rs_slot_offset: Option<u32>,
}

fn default_csi_rs_period_ms() -> u32 {
    20
}

impl Default for CsiIntent {
    fn default() -> Self {
        Self {
            enabled: true,
            csi_rs_period_ms: default_csi_rs_period_ms(),
            meas_csi_rs_slot_offset: None,
            tracking_csi_rs_slot_offset: None,
            zp_csi_rs_slot_offset: None,
        }
    }
}

/// SIB scheduling
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SibIntent {
    /// SI window length in slots
    #[serde(default = "default_si_window_len_slots")]
    pub si_window_len_slots: u32,
    /// SI messages
    #[serde(default = "default_si_sched_info")]
    pub si_sched_info: Vec<SiMessageIntent>,
    /// Cell reselection threshold q-RxLevMin in dBm
    #[serde(default = "default_q_rx_lev_min")]
    pub q_rx_lev_min: i32,
    /// Cell reselection timer in seconds
    #[serde(default = "default_t_reselection")]
    pub t_reselection: u32,
}

/// One SI message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SiMessageIntent {
    /// SIB types carried by the message
    pub sib_mapping: Vec<u8>,
    /// SI message period in radio frames
    pub si_period_rf: u32,
}

fn default_si_window_len_slots() -> u32 {
    20
}

fn default_si_sched_info() -> Vec<SiMessageIntent> {
    vec![SiMessageIntent {
        sib_mapping: vec![2],
        si_period_rf: 16,
    }]
}

fn default_q_rx_lev_min() -> i32 {
    -70
}

fn default_t_reselection() -> u32 {
    1
}

impl Default for SibIntent {
    fn default() -> Self {
        Self {
            si_window_len_slots: default_si_window_len_slots(),
            si_sched_info: default_si_sched_info(),
            q_rx_lev_min: default_q_rx_lev_min(),
            t_reselection: default_t_reselection(),
        }
    }
}

/// Non-terrestrial network parameters (TS 38.331 NTN-Config)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NtnIntent {
    /// Scheduling offset K_offset in slots
    #[serde(default)]
    pub cell_specific_koffset: u32,
    /// Common TA in units of 4.072 ns
    #[serde(default)]
    pub ta_common: u64,
    /// Common TA drift in units of 0.2e-3 us/s
    #[serde(default)]
    pub ta_common_drift: i32,
    /// Common TA drift variation in units of 0.2e-4 us/s^2
    #[serde(default)]
    pub ta_common_drift_variant: u32,
}

/// Radio link monitoring resource policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RlmPolicy {
    /// No explicit resources, the UE monitors the SSB of its SpCell
    #[default]
    Default,
    Ssb,
    CsiRs,
    SsbAndCsiRs,
}

/// QoS flow to DRB mapping
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QosIntent {
    pub five_qi: FiveQi,
    /// RLC mode override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rlc_mode: Option<RlcMode>,
}

/// MAC capture wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PcapFormat {
    /// Link-layer type with MAC-NR context
    #[default]
    Dlt,
    /// MAC-NR framing over UDP
    Udp,
}

/// MAC capture configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PcapIntent {
    #[serde(default)]
    pub format: PcapFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_yaml_cell() {
        let yaml = "pci: 1\ndl_arfcn: 632628\n";
        let intent: CellIntent = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(intent, CellIntent::new(1, 632_628));
        assert_eq!(intent.band(), Some(77));
        assert_eq!(intent.nci(), NrCellId(1));
        assert_eq!(intent.pucch.harq_symbols(), 14);
    }

    #[test]
    fn test_full_yaml_cell() {
        let yaml = r#"
pci: 500
dl_arfcn: 632628
band: 78
channel_bandwidth_MHz: 40
common_scs: 30
nof_antennas_dl: 4
nof_antennas_ul: 4
tdd_ul_dl_cfg:
  pattern1:
    dl_ul_tx_period: 5
    nof_dl_slots: 3
    nof_dl_symbols: 6
    nof_ul_slots: 1
    nof_ul_symbols: 4
pdcch:
  coreset0_index: 12
  ss2_type: common
pdsch:
  mcs_table: qam256
pucch:
  harq_format: format0
  f2_max_code_rate: dot35
prach:
  prach_config_index: 159
  zero_correlation_zone: 14
ntn:
  cell_specific_koffset: 40
  ta_common: 1000
rlm: ssb_and_csi_rs
qos:
  - five_qi: 1
  - five_qi: 9
    rlc_mode: am
pcap:
  format: udp
"#;
        let intent: CellIntent = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(intent.channel_bandwidth, Bandwidth::Bw40);
        assert_eq!(intent.tdd_ul_dl_cfg.unwrap().pattern1.period_slots, 5);
        assert_eq!(intent.pdcch.ss2_type, SearchSpaceType::Common);
        assert_eq!(intent.pdsch.mcs_table, McsTable::Qam256);
        assert_eq!(intent.pucch.harq_symbols(), 2);
        assert_eq!(intent.prach.prach_config_index, Some(159));
        assert_eq!(intent.rlm, RlmPolicy::SsbAndCsiRs);
        assert_eq!(intent.qos[1].rlc_mode, Some(RlcMode::Am));
        assert_eq!(intent.pcap.unwrap().format, PcapFormat::Udp);
    }

    #[test]
    fn test_invalid_bandwidth_rejected() {
        let yaml = "pci: 1\ndl_arfcn: 632628\nchannel_bandwidth_MHz: 35\n";
        assert!(serde_yaml::from_str::<CellIntent>(yaml).is_err());
    }
}
