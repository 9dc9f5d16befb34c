//! Derived Cell Configuration
//!
//! Every derivation step is a pure function of the intent, the policy and
//! the values derived before it. The builder merges the steps into a
//! [`DerivedCellConfig`]. The validator runs the same steps, so every intent
//! it accepts derives.
//!
//! A step reports intent problems as [`BuildError::Invalid`] and anything the
//! tables should have ruled out as one of the other [`BuildError`] variants.

use crate::intent::{CellIntent, RlmPolicy};
use crate::mac::expert::{self, SchedulerExpertConfig};
use crate::mac::sib::{self, PlmnId, Sib1Descriptor, SibSet};
use crate::numerology::CellNumerology;
use crate::pcap::{self, PduSizes};
use crate::phy::csi_rs::{self, CsiRsParams, FixedOffsets, ResolvedOffsets, TRACKING_SYMBOLS};
use crate::phy::pdcch::{self, Coreset, PdcchBudget, PdcchError, SearchSpace, SearchSpaceType, SS0_CANDIDATES};
use crate::phy::prach::{self, PrachError, PrachFormat, RestrictedSetConfig};
use crate::phy::pucch::{self, PucchError, PucchLayout, PucchParams};
use crate::phy::ssb::{self, PlacementQuery, SearchSpace0Entry, SsbPlacement, SSB_MIN_DL_SYMBOLS, SSB_PERIODS_MS};
use crate::phy::tdd::{TddConfig, TddSlotMap};
use crate::phy::timing::{self, PdschTimeDomainResource, PuschTimeDomainResource, TimingLimits};
use crate::policy::CellPolicy;
use crate::rrc::{self, BearerSet};
use crate::{BuildError, ValidationError};
use common::band::SsbCase;
use common::types::{Bandwidth, CyclicPrefix, DuplexMode, FrequencyRange, NrCellId, Pci, SubcarrierSpacing, Tac};
use common::utils::{lcm, time};
use serde::Serialize;
use tracing::{debug, trace};

/// SR periodicities in slots (SchedulingRequestResourceConfig)
pub const SR_PERIODS_SLOTS: [u32; 13] = [1, 2, 4, 5, 8, 10, 16, 20, 40, 80, 160, 320, 640];
/// Periodic CSI report periodicities in slots (CSI-ReportPeriodicityAndOffset)
pub const CSI_REPORT_PERIODS_SLOTS: [u32; 10] = [4, 5, 8, 10, 16, 20, 40, 80, 160, 320];
/// SRS periodicities in slots (SRS-PeriodicityAndOffset)
pub const SRS_PERIODS_SLOTS: [u32; 17] = [1, 2, 4, 5, 8, 10, 16, 20, 32, 40, 64, 80, 160, 320, 640, 1280, 2560];
/// RA response window lengths in slots
pub const RA_RESP_WINDOWS_SLOTS: [u32; 8] = [1, 2, 4, 8, 10, 20, 40, 80];

/// First symbol of the measurement NZP CSI-RS
const CSI_MEAS_SYMBOL: u8 = 4;
/// Symbol of the CSI-IM (pattern 1) and ZP CSI-RS resources
const CSI_IM_SYMBOL: u8 = 8;

fn invalid(err: ValidationError) -> BuildError {
    BuildError::Invalid(err)
}

fn pdcch_err(err: PdcchError) -> BuildError {
    invalid(ValidationError::Pdcch(err.to_string()))
}

fn pucch_err(err: PucchError) -> BuildError {
    invalid(ValidationError::Pucch(err.to_string()))
}

fn prach_err(err: PrachError) -> BuildError {
    invalid(ValidationError::Prach(err))
}

/// First slot of a period that is fully uplink in every repetition of the period
fn first_ul_slot(period: u32, tdd: Option<&TddSlotMap>) -> Option<u32> {
    let Some(tdd) = tdd else {
        return Some(0);
    };
    let repetitions = lcm(period, tdd.period()) / period;
    (0..period).find(|slot| (0..repetitions).all(|n| tdd.is_full_ul(slot + n * period)))
}

/// Carrier numerology plus the slot map of its validated TDD pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellGrid {
    pub num: CellNumerology,
    pub tdd: Option<TddSlotMap>,
}

impl CellGrid {
    /// Resolve the carrier and check its TDD pattern before expanding it
    pub fn resolve(intent: &CellIntent) -> Result<Self, ValidationError> {
        let num = CellNumerology::resolve(intent)?;
        if let Some(cfg) = &num.tdd {
            cfg.validate(num.common_scs)?;
        }
        let tdd = num.tdd_map();
        Ok(Self { num, tdd })
    }

    pub fn tdd(&self) -> Option<&TddSlotMap> {
        self.tdd.as_ref()
    }
}

/// Carrier of the cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarrierConfig {
    pub band: u16,
    pub duplex: DuplexMode,
    pub freq_range: FrequencyRange,
    pub dl_arfcn: u32,
    pub ul_arfcn: u32,
    pub channel_bandwidth_mhz: Bandwidth,
    pub common_scs: SubcarrierSpacing,
    pub cp: CyclicPrefix,
    pub nof_crbs: u32,
    pub nof_antennas_dl: u32,
    pub nof_antennas_ul: u32,
}

impl CarrierConfig {
    pub fn derive(intent: &CellIntent, num: &CellNumerology) -> Self {
        Self {
            band: num.band,
            duplex: num.duplex,
            freq_range: num.fr,
            dl_arfcn: num.dl_arfcn,
            ul_arfcn: num.ul_arfcn,
            channel_bandwidth_mhz: num.bandwidth,
            common_scs: num.common_scs,
            cp: num.cp,
            nof_crbs: num.nof_crbs,
            nof_antennas_dl: intent.nof_antennas_dl,
            nof_antennas_ul: intent.nof_antennas_ul,
        }
    }
}

/// SSB burst and its position on the carrier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SsbConfig {
    pub placement: SsbPlacement,
    pub ssb_scs: SubcarrierSpacing,
    pub period_ms: u32,
    pub period_slots: u32,
    /// In-burst bitmap, bit `i` enables SSB index `i`
    pub bitmap: u64,
    pub case: SsbCase,
    pub l_max: u32,
    /// Common-SCS slots carrying SSBs within the SSB period
    pub slots: Vec<u32>,
}

impl SsbConfig {
    /// Check the SSB period and bitmap, then place the SSB and CORESET#0
    ///
    /// A missing placement is [`BuildError::NoSsbPlacement`].
    pub fn derive(intent: &CellIntent, grid: &CellGrid) -> Result<Self, BuildError> {
        let num = &grid.num;
        let period_ms = intent.ssb.period_ms;
        if !SSB_PERIODS_MS.contains(&period_ms) {
            return Err(invalid(ValidationError::Ssb(format!(
                "SSB period of {} ms is not allowed",
                period_ms
            ))));
        }
        let bitmap = num.ssb_bitmap(intent.ssb.bitmap);
        let beyond_l_max = num.l_max < 64 && bitmap >> num.l_max != 0;
        if bitmap == 0 || beyond_l_max {
            return Err(invalid(ValidationError::Ssb(format!(
                "SSB bitmap {:#x} does not fit L_max {}",
                bitmap, num.l_max
            ))));
        }

        let query = PlacementQuery {
            band: num.band,
            dl_arfcn: num.dl_arfcn,
            nof_crbs: num.nof_crbs,
            common_scs: num.common_scs,
            ssb_scs: num.ssb_scs,
            coreset0_index: intent.pdcch.coreset0_index,
        };
        let placement = ssb::find_placement(&query).ok_or(BuildError::NoSsbPlacement {
            band: num.band,
            dl_arfcn: num.dl_arfcn,
        })?;

        let slots = ssb::ssb_slots(num.ssb_case, bitmap, num.ssb_scs, num.common_scs);
        if let Some(tdd) = grid.tdd() {
            let period = num.ssb_period_slots;
            let repetitions = lcm(period, tdd.period()) / period;
            let short = slots
                .iter()
                .flat_map(|slot| (0..repetitions).map(move |n| slot + n * period))
                .find(|slot| tdd.dl_symbols(*slot) < SSB_MIN_DL_SYMBOLS);
            if let Some(slot) = short {
                return Err(invalid(ValidationError::Ssb(format!(
                    "SSB slot {} has fewer than {} DL symbols",
                    slot, SSB_MIN_DL_SYMBOLS
                ))));
            }
        }

        let config = Self {
            placement,
            ssb_scs: num.ssb_scs,
            period_ms,
            period_slots: num.ssb_period_slots,
            bitmap,
            case: num.ssb_case,
            l_max: num.l_max,
            slots,
        };
        debug!("SSB: GSCN {}, slots {:?}", config.placement.gscn, config.slots);
        Ok(config)
    }
}

/// CORESETs, search spaces and the per-slot PDCCH budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdcchConfig {
    pub coreset0: Coreset,
    pub coreset1: Coreset,
    /// frequencyDomainResources of CORESET#1
    pub coreset1_freq_domain: Vec<bool>,
    pub search_space0: SearchSpace0Entry,
    /// SearchSpace#0, #1 and #2
    pub search_spaces: Vec<SearchSpace>,
    pub budget: PdcchBudget,
    /// Slots of the Type0-PDCCH occasions within the SIB1 period
    pub sib1_slots: Vec<u32>,
    pub dci_format_0_1_and_1_1: bool,
}

impl PdcchConfig {
    pub fn derive(intent: &CellIntent, grid: &CellGrid, ssb: &SsbConfig) -> Result<Self, BuildError> {
        let num = &grid.num;
        let entry = ssb.placement.coreset0;
        let coreset0 = Coreset {
            id: 0,
            start_crb: ssb.placement.coreset0_start_crb,
            nof_rbs: entry.nof_rbs,
            duration: entry.nof_symbols,
        };
        if coreset0.start_crb + coreset0.nof_rbs > num.nof_crbs {
            return Err(BuildError::Inconsistent(format!(
                "CORESET#0 index {} ends past CRB {}",
                entry.index, num.nof_crbs
            )));
        }

        let ss0_index = intent.pdcch.ss0_index;
        let search_space0 = *ssb::search_space0(ss0_index, num.fr).ok_or_else(|| {
            invalid(ValidationError::Pdcch(format!(
                "SearchSpace#0 index {} is not defined",
                ss0_index
            )))
        })?;
        let sib1_slots = ssb::sib1_slots(&search_space0, ssb.bitmap, num.common_scs);
        if let Some(slot) = grid.tdd().and_then(|tdd| sib1_slots.iter().find(|s| !tdd.is_full_dl(**s))) {
            return Err(invalid(ValidationError::Pdcch(format!(
                "SIB1 PDCCH slot {} is not fully downlink",
                slot
            ))));
        }

        let duration = intent.pdcch.coreset1_duration.unwrap_or(coreset0.duration);
        let coreset1 = pdcch::coreset1(0, num.nof_crbs, intent.pdcch.coreset1_rbs, duration).map_err(pdcch_err)?;

        pdcch::candidates_valid(&intent.pdcch.ss1_candidates).map_err(pdcch_err)?;
        pdcch::candidates_valid(&intent.pdcch.ss2_candidates).map_err(pdcch_err)?;
        let search_spaces = [
            pdcch::search_space(0, &coreset0, SearchSpaceType::Common, &SS0_CANDIDATES),
            pdcch::search_space(1, &coreset0, SearchSpaceType::Common, &intent.pdcch.ss1_candidates),
            pdcch::search_space(2, &coreset1, intent.pdcch.ss2_type, &intent.pdcch.ss2_candidates),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(pdcch_err)?;

        let monitored: Vec<&SearchSpace> = search_spaces.iter().collect();
        let budget = PdcchBudget::count(&[&coreset0, &coreset1], &monitored);
        budget.check(num.common_scs.numerology()).map_err(pdcch_err)?;

        let config = Self {
            coreset1_freq_domain: coreset1.freq_domain_resources(0),
            coreset0,
            coreset1,
            search_space0,
            search_spaces,
            budget,
            sib1_slots,
            dci_format_0_1_and_1_1: intent.pdcch.dci_format_0_1_and_1_1,
        };
        debug!(
            "PDCCH: CORESET#1 {} RBs x {} symbols, budget {:?}",
            config.coreset1.nof_rbs, config.coreset1.duration, config.budget
        );
        Ok(config)
    }

    /// OFDM symbols reserved for PDCCH at the start of a slot
    pub fn nof_symbols(&self) -> u8 {
        self.coreset0.duration.max(self.coreset1.duration)
    }
}

/// dl-DataToUL-ACK candidates
pub fn derive_k1(intent: &CellIntent, policy: &CellPolicy, grid: &CellGrid) -> Result<Vec<u8>, BuildError> {
    let min_k1 = intent.pdsch.min_k1;
    if min_k1 == 0 || min_k1 > policy.max_k1 {
        return Err(invalid(ValidationError::Pdsch(format!(
            "min k1 {} is not in 1..={}",
            min_k1, policy.max_k1
        ))));
    }
    let limits = TimingLimits {
        max_k: policy.max_k1,
        max_candidates: policy.max_nof_k1,
    };
    let k1 = timing::generate_k1(grid.tdd(), min_k1, limits);
    if k1.is_empty() {
        return Err(invalid(ValidationError::Pdsch(format!(
            "no k1 in {}..={} reaches a fully uplink slot",
            min_k1, policy.max_k1
        ))));
    }
    Ok(k1)
}

/// PUSCH time-domain resources
pub fn derive_pusch_td(
    intent: &CellIntent,
    policy: &CellPolicy,
    grid: &CellGrid,
) -> Result<Vec<PuschTimeDomainResource>, BuildError> {
    let min_k2 = intent.pusch.min_k2;
    if min_k2 == 0 || min_k2 > policy.max_k2 {
        return Err(invalid(ValidationError::Pusch(format!(
            "min k2 {} is not in 1..={}",
            min_k2, policy.max_k2
        ))));
    }
    let limits = TimingLimits {
        max_k: policy.max_k2,
        max_candidates: policy.max_nof_k2,
    };
    let td = timing::generate_k2(grid.num.cp, grid.tdd(), min_k2, limits);
    if td.is_empty() {
        return Err(invalid(ValidationError::Pusch(format!(
            "no k2 in {}..={} reaches a fully uplink slot",
            min_k2, policy.max_k2
        ))));
    }
    Ok(td)
}

/// Cell-wide PUCCH resources and the SR occasion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PucchConfig {
    pub layout: PucchLayout,
    /// Policy ceiling the layout was checked against
    pub rb_ceiling: u32,
    pub sr_period_slots: u32,
    pub sr_offset: u32,
}

impl PucchConfig {
    pub fn derive(intent: &CellIntent, policy: &CellPolicy, grid: &CellGrid) -> Result<Self, BuildError> {
        let num = &grid.num;
        let p = &intent.pucch;
        let params = PucchParams {
            harq_format: p.harq_format,
            harq_nof_symbols: p.harq_symbols(),
            f1_nof_cyclic_shifts: p.f1_nof_cyclic_shifts,
            f1_occ: p.f1_enable_occ,
            f2_nof_symbols: p.f2_nof_symbols,
            f2_nof_prbs: p.f2_nof_prbs,
            f2_max_code_rate: p.f2_max_code_rate,
            nof_res_set0: p.nof_res_set0,
            nof_res_set1: p.nof_res_set1,
            nof_cell_sets: p.nof_cell_res_sets,
            nof_sr: p.nof_cell_sr_resources,
            nof_csi: p.nof_cell_csi_resources,
            intraslot_hopping: p.intraslot_freq_hopping,
        };
        let layout = pucch::build_layout(&params, num.nof_crbs, intent.nof_antennas_dl, policy.max_pucch_f2_prbs)
            .map_err(pucch_err)?;
        let rb_ceiling = policy.pucch_rb_ceiling(num.nof_crbs);
        pucch::check_rb_usage(&layout, rb_ceiling).map_err(pucch_err)?;

        let sr_period_slots = time::ms_to_slots(p.sr_period_ms, num.common_scs);
        if !SR_PERIODS_SLOTS.contains(&sr_period_slots) {
            return Err(invalid(ValidationError::Pucch(format!(
                "SR period of {} ms ({} slots) is not allowed",
                p.sr_period_ms, sr_period_slots
            ))));
        }
        let sr_offset = first_ul_slot(sr_period_slots, grid.tdd()).ok_or_else(|| {
            invalid(ValidationError::Pucch(format!(
                "no fully uplink slot for an SR period of {} slots",
                sr_period_slots
            )))
        })?;

        Ok(Self {
            layout,
            rb_ceiling,
            sr_period_slots,
            sr_offset,
        })
    }
}

/// PRACH generic parameters and RACH common configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrachConfig {
    pub config_index: u8,
    pub format: PrachFormat,
    pub root_sequence_index: u16,
    pub zero_correlation_zone: u8,
    /// Preamble subcarrier spacing in Hz
    pub subcarrier_spacing_hz: u64,
    pub msg1_fdm: u8,
    /// First PRB of the lowest occasion in the UL BWP
    pub frequency_start: u32,
    pub nof_rbs_per_occasion: u32,
    pub total_nof_ra_preambles: u32,
    pub nof_ssb_per_ro: u32,
    pub nof_cb_preambles_per_ssb: u32,
    pub ra_resp_window_slots: u32,
    /// Consecutive logical root sequences consumed by the 64 preambles
    pub nof_root_sequences: u32,
    pub restricted_set: RestrictedSetConfig,
}

impl PrachConfig {
    /// Resolve the PRACH of a cell whose PUCCH layout is known
    ///
    /// A free frequency start that cannot be found is
    /// [`BuildError::NoPrachFrequency`].
    pub fn derive(
        intent: &CellIntent,
        policy: &CellPolicy,
        grid: &CellGrid,
        pucch: &PucchLayout,
    ) -> Result<Self, BuildError> {
        let num = &grid.num;
        let p = &intent.prach;
        let zcz = p.zero_correlation_zone;

        let config_index = match (p.prach_config_index, grid.tdd()) {
            (Some(index), _) => index,
            (None, None) => policy.fdd_prach_config_index,
            (None, Some(tdd)) => {
                let index = prach::find_valid_index_in(num.fr, num.common_scs, zcz, tdd)
                    .ok_or(PrachError::NoValidConfigIndex)
                    .map_err(prach_err)?;
                debug!("PRACH configuration index {} selected for the TDD pattern", index);
                index
            }
        };
        prach::config_index_valid(config_index, num.fr, num.duplex).map_err(prach_err)?;
        prach::zero_correlation_zone_valid(zcz, config_index, num.fr, num.duplex).map_err(prach_err)?;
        let row = prach::prach_config(config_index, num.fr, num.duplex).ok_or_else(|| {
            BuildError::Inconsistent(format!("PRACH configuration index {} has no table row", config_index))
        })?;
        let format = row.format;
        prach::root_sequence_valid(p.prach_root_sequence_index, format).map_err(prach_err)?;
        if let Some(tdd) = grid.tdd() {
            prach::fits_in_tdd_pattern_in(num.fr, num.common_scs, config_index, tdd)
                .map_err(|range| prach_err(PrachError::NotInUplink { index: config_index, range }))?;
        }

        if ![1, 2, 4, 8].contains(&p.msg1_fdm) {
            return Err(prach_err(PrachError::InvalidMsg1Fdm(p.msg1_fdm)));
        }
        let nof_rbs_per_occasion = prach::nof_prach_rbs(format, num.common_scs, num.common_scs).ok_or(
            prach_err(PrachError::UnsupportedScs {
                format,
                scs_khz: num.common_scs.khz(),
            }),
        )?;
        let width = nof_rbs_per_occasion * p.msg1_fdm as u32;
        let bwp_rbs = num.nof_crbs;
        if width > bwp_rbs {
            return Err(prach_err(PrachError::FrequencyOutOfBwp {
                start: p.prach_frequency_start.unwrap_or(0),
                end: p.prach_frequency_start.unwrap_or(0) + width,
                bwp_rbs,
            }));
        }
        let occupied = pucch.occupied_rbs();
        let free = |start: u32| (start..start + width).all(|rb| !occupied.contains(&rb));
        let frequency_start = match p.prach_frequency_start {
            Some(start) if start + width > bwp_rbs => {
                return Err(prach_err(PrachError::FrequencyOutOfBwp {
                    start,
                    end: start + width,
                    bwp_rbs,
                }))
            }
            Some(start) if !free(start) => {
                return Err(prach_err(PrachError::FrequencyOverlapsPucch {
                    start,
                    end: start + width,
                }))
            }
            Some(start) => start,
            None => (0..=bwp_rbs - width)
                .find(|start| free(*start))
                .ok_or(BuildError::NoPrachFrequency)?,
        };

        let total = p.total_nof_ra_preambles;
        let cb_per_ssb = p.nof_cb_preambles_per_ssb;
        if ![1, 2, 4, 8, 16].contains(&p.nof_ssb_per_ro) {
            return Err(prach_err(PrachError::InvalidSsbPerRo(p.nof_ssb_per_ro)));
        }
        if !(1..=64).contains(&total) || cb_per_ssb == 0 || cb_per_ssb * p.nof_ssb_per_ro > total {
            return Err(prach_err(PrachError::InvalidPreambleCount { total, cb_per_ssb }));
        }

        let max_window = policy.max_ra_resp_window_ms * num.common_scs.slots_per_subframe();
        let ra_resp_window_slots = match p.ra_resp_window {
            Some(slots) if RA_RESP_WINDOWS_SLOTS.contains(&slots) && slots <= max_window => slots,
            Some(slots) => {
                return Err(prach_err(PrachError::InvalidRaResponseWindow {
                    slots,
                    max_slots: max_window,
                }))
            }
            None => RA_RESP_WINDOWS_SLOTS
                .iter()
                .rev()
                .copied()
                .find(|w| *w <= max_window)
                .ok_or(prach_err(PrachError::InvalidRaResponseWindow {
                    slots: 0,
                    max_slots: max_window,
                }))?,
        };

        let nof_root_sequences = prach::nof_root_sequences(format, zcz).ok_or_else(|| {
            BuildError::Inconsistent(format!("no cyclic shift for format {} and zcz {}", format, zcz))
        })?;
        let subcarrier_spacing_hz = match format {
            PrachFormat::Format0 | PrachFormat::Format1 | PrachFormat::Format2 => 1_250,
            PrachFormat::Format3 => 5_000,
            PrachFormat::FormatA1 | PrachFormat::FormatB4 => num.common_scs.hz(),
        };

        let config = Self {
            config_index,
            format,
            root_sequence_index: p.prach_root_sequence_index,
            zero_correlation_zone: zcz,
            subcarrier_spacing_hz,
            msg1_fdm: p.msg1_fdm,
            frequency_start,
            nof_rbs_per_occasion,
            total_nof_ra_preambles: total,
            nof_ssb_per_ro: p.nof_ssb_per_ro,
            nof_cb_preambles_per_ssb: cb_per_ssb,
            ra_resp_window_slots,
            nof_root_sequences,
            restricted_set: RestrictedSetConfig::default(),
        };
        debug!(
            "PRACH: index {} format {}, RBs [{}, {}), {} root sequences",
            config.config_index,
            config.format,
            frequency_start,
            frequency_start + width,
            nof_root_sequences
        );
        Ok(config)
    }

    /// Logical root sequence indexes `[first, last)` used by the cell
    pub fn root_sequence_range(&self) -> std::ops::Range<u32> {
        let first = self.root_sequence_index as u32;
        first..first + self.nof_root_sequences
    }
}

/// Periodic NZP CSI-RS resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NzpCsiRsResource {
    pub id: u8,
    pub slot_offset: u32,
    pub first_symbol: u8,
    pub nof_ports: u32,
}

/// CSI-IM or ZP CSI-RS resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InterferenceResource {
    pub id: u8,
    pub slot_offset: u32,
    pub symbol: u8,
}

/// Periodic CSI report on PUCCH
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CsiReportConfig {
    pub period_slots: u32,
    pub slot_offset: u32,
    pub pucch_resource: u32,
}

/// CSI-RS resources and the CSI report of a cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsiConfig {
    pub period_slots: u32,
    pub offsets: ResolvedOffsets,
    pub measurement: NzpCsiRsResource,
    /// Two consecutive slots, two symbols each
    pub tracking: Vec<NzpCsiRsResource>,
    pub csi_im: InterferenceResource,
    pub zp_csi_rs: InterferenceResource,
    pub report: CsiReportConfig,
}

impl CsiConfig {
    /// CSI resources, `None` when CSI is disabled
    pub fn derive(
        intent: &CellIntent,
        policy: &CellPolicy,
        grid: &CellGrid,
        ssb: &SsbConfig,
        pdcch: &PdcchConfig,
        pucch: &PucchLayout,
    ) -> Result<Option<Self>, BuildError> {
        let csi = &intent.csi;
        if !csi.enabled {
            return Ok(None);
        }
        let num = &grid.num;
        let csi_err = |msg: String| invalid(ValidationError::Csi(msg));
        let period_slots = time::ms_to_slots(csi.csi_rs_period_ms, num.common_scs);
        if !CSI_REPORT_PERIODS_SLOTS.contains(&period_slots) {
            return Err(csi_err(format!("no CSI report period of {} slots", period_slots)));
        }
        if let Some(tdd) = grid.tdd() {
            if period_slots % tdd.period() != 0 {
                return Err(csi_err(format!(
                    "CSI-RS period of {} slots is not a multiple of the TDD period of {} slots",
                    period_slots,
                    tdd.period()
                )));
            }
        }
        let pucch_resource = *pucch
            .csi
            .first()
            .ok_or_else(|| csi_err("no cell-wide PUCCH resource for CSI reports".to_string()))?;

        let params = CsiRsParams {
            period_slots,
            ssb_slots: ssb.slots.clone(),
            sib1_slots: pdcch.sib1_slots.clone(),
            sib1_period_slots: time::ms_to_slots(ssb::SIB1_PERIOD_MS, num.common_scs),
        };
        let fixed = FixedOffsets {
            measurement: csi.meas_csi_rs_slot_offset,
            tracking: csi.tracking_csi_rs_slot_offset,
            interference: csi.zp_csi_rs_slot_offset,
        };
        let max_symbol_index = TRACKING_SYMBOLS.iter().copied().chain([CSI_MEAS_SYMBOL, CSI_IM_SYMBOL]).max().unwrap_or(0);
        let offsets = csi_rs::derive_offsets(&params, &fixed, grid.tdd(), max_symbol_index, ssb.period_slots)
            .map_err(|e| invalid(e.into()))?;

        let report_start = offsets.measurement + policy.csi_report_delay_slots;
        let report_offset = (0..period_slots)
            .map(|d| (report_start + d) % period_slots)
            .find(|slot| grid.tdd().map_or(true, |tdd| tdd.is_full_ul(*slot)))
            .ok_or_else(|| csi_err("no fully uplink slot for the CSI report".to_string()))?;

        let nzp = |id: u8, slot_offset: u32, first_symbol: u8, nof_ports: u32| NzpCsiRsResource {
            id,
            slot_offset,
            first_symbol,
            nof_ports,
        };
        let tracking = [offsets.tracking, offsets.tracking + 1]
            .into_iter()
            .flat_map(|slot| TRACKING_SYMBOLS.into_iter().map(move |symbol| (slot, symbol)))
            .zip(1u8..)
            .map(|((slot, symbol), id)| nzp(id, slot, symbol, 1))
            .collect();

        let config = Self {
            period_slots,
            offsets,
            measurement: nzp(0, offsets.measurement, CSI_MEAS_SYMBOL, intent.nof_antennas_dl),
            tracking,
            csi_im: InterferenceResource {
                id: 0,
                slot_offset: offsets.interference,
                symbol: CSI_IM_SYMBOL,
            },
            zp_csi_rs: InterferenceResource {
                id: 0,
                slot_offset: offsets.interference,
                symbol: CSI_IM_SYMBOL,
            },
            report: CsiReportConfig {
                period_slots,
                slot_offset: report_offset,
                pucch_resource,
            },
        };
        debug!("CSI: period {} slots, report offset {}", period_slots, report_offset);
        Ok(Some(config))
    }
}

/// Periodic SRS resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SrsConfig {
    pub period_slots: u32,
    pub slot_offset: u32,
    pub start_symbol: u8,
    pub nof_symbols: u8,
}

impl SrsConfig {
    /// SRS resource, `None` when SRS is disabled
    pub fn derive(intent: &CellIntent, grid: &CellGrid) -> Result<Option<Self>, BuildError> {
        let srs = &intent.srs;
        if !srs.enabled {
            return Ok(None);
        }
        let srs_err = |msg: String| invalid(ValidationError::Srs(msg));
        if !SRS_PERIODS_SLOTS.contains(&srs.period_slots) {
            return Err(srs_err(format!("SRS period of {} slots is not allowed", srs.period_slots)));
        }
        if ![1, 2, 4].contains(&srs.nof_symbols) {
            return Err(srs_err(format!("SRS cannot span {} symbols", srs.nof_symbols)));
        }
        let slot_offset = first_ul_slot(srs.period_slots, grid.tdd())
            .ok_or_else(|| srs_err(format!("no fully uplink slot for an SRS period of {} slots", srs.period_slots)))?;
        Ok(Some(Self {
            period_slots: srs.period_slots,
            slot_offset,
            start_symbol: grid.num.cp.symbols_per_slot() - srs.nof_symbols,
            nof_symbols: srs.nof_symbols,
        }))
    }
}

/// Radio link monitoring resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RlmResource {
    Ssb { ssb_index: u32 },
    CsiRs { nzp_resource_id: u8 },
}

/// Maximum RLM resources for an SSB burst size (TS 38.213 §5)
pub fn max_rlm_resources(l_max: u32) -> usize {
    match l_max {
        0..=4 => 2,
        5..=8 => 4,
        _ => 8,
    }
}

/// RLM resources of the policy, bounded by L_max
pub fn derive_rlm(policy: RlmPolicy, ssb: &SsbConfig, csi: Option<&CsiConfig>) -> Result<Vec<RlmResource>, BuildError> {
    let ssbs = || ssb::transmitted_ssbs(ssb.bitmap).map(|ssb_index| RlmResource::Ssb { ssb_index });
    let csi_rs = || {
        csi.map(|c| RlmResource::CsiRs {
            nzp_resource_id: c.measurement.id,
        })
        .ok_or_else(|| invalid(ValidationError::Rlm(format!("{:?} monitoring needs CSI-RS enabled", policy))))
    };
    let resources: Vec<RlmResource> = match policy {
        RlmPolicy::Default => Vec::new(),
        RlmPolicy::Ssb => ssbs().collect(),
        RlmPolicy::CsiRs => vec![csi_rs()?],
        RlmPolicy::SsbAndCsiRs => std::iter::once(csi_rs()?).chain(ssbs()).collect(),
    };
    let resources: Vec<_> = resources.into_iter().take(max_rlm_resources(ssb.l_max)).collect();
    trace!("RLM resources: {:?}", resources);
    Ok(resources)
}

/// SIB1 descriptor and SI messages
pub fn derive_sib(intent: &CellIntent, grid: &CellGrid, pdcch: &PdcchConfig) -> Result<SibSet, BuildError> {
    let ntn = intent.ntn.as_ref();
    sib::validate(&intent.sib, ntn, grid.num.slots_per_frame())
        .map_err(|e| invalid(ValidationError::Sib(e.to_string())))?;
    let plmn = PlmnId::parse(&intent.plmn).map_err(|e| invalid(ValidationError::Identity(e.to_string())))?;
    let sib1 = Sib1Descriptor {
        plmn,
        tac: intent.tac(),
        nci: intent.nci(),
        q_rx_lev_min: intent.sib.q_rx_lev_min,
        tti_ms: sib::SIB1_TTI_MS,
        pdcch_slots: pdcch.sib1_slots.clone(),
    };
    Ok(sib::build(&intent.sib, ntn, sib1))
}

/// Scheduler expert configuration
pub fn derive_expert(
    intent: &CellIntent,
    k1: &[u8],
    pusch_td: &[PuschTimeDomainResource],
) -> Result<SchedulerExpertConfig, BuildError> {
    expert::validate_pdsch(&intent.pdsch).map_err(|e| invalid(ValidationError::Pdsch(e.to_string())))?;
    expert::validate_pusch(&intent.pusch).map_err(|e| invalid(ValidationError::Pusch(e.to_string())))?;
    if let Some(ntn) = &intent.ntn {
        expert::validate_ntn(ntn).map_err(|e| invalid(ValidationError::Ntn(e.to_string())))?;
    }
    Ok(SchedulerExpertConfig::new(
        &intent.pdsch,
        &intent.pusch,
        intent.ntn.as_ref(),
        k1.to_vec(),
        pusch_td,
    ))
}

/// Radio bearers, timers inflated by the NTN round trip
pub fn derive_bearers(intent: &CellIntent) -> Result<BearerSet, BuildError> {
    let rtt_ms = expert::ntn_round_trip_us(intent.ntn.as_ref()).div_ceil(1000) as u32;
    rrc::build_bearers(&intent.qos, rtt_ms).map_err(|e| invalid(ValidationError::Bearer(e.to_string())))
}

/// Largest MAC PDUs, checked against the capture format when capture is on
pub fn derive_pdu_sizes(intent: &CellIntent, num: &CellNumerology) -> Result<PduSizes, BuildError> {
    let pcap_err = |msg: String| invalid(ValidationError::Pcap(msg));
    let dl_layers = intent.nof_antennas_dl.min(4);
    let ul_layers = intent.nof_antennas_ul.min(4);
    let dl_bytes = pcap::largest_mac_pdu(intent.pdsch.mcs_table, intent.pdsch.max_ue_mcs, num.nof_crbs, dl_layers)
        .map_err(|e| pcap_err(e.to_string()))?;
    let ul_bytes = pcap::largest_mac_pdu(intent.pusch.mcs_table, intent.pusch.max_ue_mcs, num.nof_crbs, ul_layers)
        .map_err(|e| pcap_err(e.to_string()))?;
    let sizes = PduSizes { dl_bytes, ul_bytes };
    pcap::check(intent.pcap.as_ref(), sizes).map_err(|e| pcap_err(e.to_string()))?;
    Ok(sizes)
}

/// Fully derived configuration of one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedCellConfig {
    pub pci: Pci,
    pub nci: NrCellId,
    pub tac: Tac,
    pub carrier: CarrierConfig,
    pub tdd: Option<TddConfig>,
    pub ssb: SsbConfig,
    pub pdcch: PdcchConfig,
    pub pdsch_time_domain: Vec<PdschTimeDomainResource>,
    pub pusch_time_domain: Vec<PuschTimeDomainResource>,
    pub pucch: PucchConfig,
    pub prach: PrachConfig,
    pub csi: Option<CsiConfig>,
    pub srs: Option<SrsConfig>,
    pub rlm_resources: Vec<RlmResource>,
    pub sib: SibSet,
    pub expert: SchedulerExpertConfig,
    pub bearers: BearerSet,
    pub max_pdu_sizes: PduSizes,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n78_cell() -> CellIntent {
        CellIntent {
            band: Some(78),
            ..CellIntent::new(1, 632_628)
        }
    }

    #[test]
    fn test_first_ul_slot() {
        let tdd = TddSlotMap::new(&TddConfig::default());
        assert_eq!(first_ul_slot(40, Some(&tdd)), Some(7));
        // A period of 5 slots alternates between slot 2 and slot 7 of the pattern
        assert_eq!(first_ul_slot(5, Some(&tdd)), None);
        assert_eq!(first_ul_slot(20, None), Some(0));
    }

    #[test]
    fn test_n78_pucch_and_prach() {
        let intent = n78_cell();
        let policy = CellPolicy::default();
        let grid = CellGrid::resolve(&intent).unwrap();
        let pucch = PucchConfig::derive(&intent, &policy, &grid).unwrap();
        assert_eq!(pucch.layout.rb_usage(), 4);
        assert_eq!((pucch.sr_period_slots, pucch.sr_offset), (40, 7));

        let prach = PrachConfig::derive(&intent, &policy, &grid, &pucch.layout).unwrap();
        assert_eq!(prach.config_index, 0);
        assert_eq!(prach.format, PrachFormat::Format0);
        assert_eq!(prach.nof_rbs_per_occasion, 3);
        // First RB after the PUCCH resources
        assert_eq!(prach.frequency_start, 4);
        assert_eq!(prach.ra_resp_window_slots, 20);
        assert_eq!(prach.root_sequence_range(), 1..65);
    }

    #[test]
    fn test_prach_fixed_start_on_pucch() {
        let mut intent = n78_cell();
        intent.prach.prach_frequency_start = Some(2);
        let policy = CellPolicy::default();
        let grid = CellGrid::resolve(&intent).unwrap();
        let pucch = PucchConfig::derive(&intent, &policy, &grid).unwrap();
        assert_eq!(
            PrachConfig::derive(&intent, &policy, &grid, &pucch.layout),
            Err(BuildError::Invalid(ValidationError::Prach(PrachError::FrequencyOverlapsPucch {
                start: 2,
                end: 5
            })))
        );
    }

    #[test]
    fn test_n78_csi_and_rlm() {
        let mut intent = n78_cell();
        intent.rlm = RlmPolicy::SsbAndCsiRs;
        let policy = CellPolicy::default();
        let grid = CellGrid::resolve(&intent).unwrap();
        let ssb = SsbConfig::derive(&intent, &grid).unwrap();
        assert_eq!(ssb.slots, vec![0]);
        let pdcch = PdcchConfig::derive(&intent, &grid, &ssb).unwrap();
        assert_eq!(pdcch.sib1_slots, vec![0]);
        let pucch = PucchConfig::derive(&intent, &policy, &grid).unwrap();

        let csi = CsiConfig::derive(&intent, &policy, &grid, &ssb, &pdcch, &pucch.layout)
            .unwrap()
            .unwrap();
        assert_eq!(csi.offsets.tracking, 1);
        assert_eq!(csi.offsets.measurement, 3);
        assert_eq!(csi.report.slot_offset, 7);
        assert_eq!(csi.tracking.len(), 4);
        assert!(csi.tracking.iter().all(|r| r.slot_offset == 1 || r.slot_offset == 2));

        let rlm = derive_rlm(intent.rlm, &ssb, Some(&csi)).unwrap();
        assert_eq!(
            rlm,
            vec![RlmResource::CsiRs { nzp_resource_id: 0 }, RlmResource::Ssb { ssb_index: 0 }]
        );
        assert!(derive_rlm(RlmPolicy::CsiRs, &ssb, None).is_err());
    }

    #[test]
    fn test_rlm_bound() {
        assert_eq!(max_rlm_resources(4), 2);
        assert_eq!(max_rlm_resources(8), 4);
        assert_eq!(max_rlm_resources(64), 8);
    }

    #[test]
    fn test_ssb_bitmap_beyond_l_max() {
        let mut intent = n78_cell();
        intent.ssb.bitmap = Some(1 << 8);
        let grid = CellGrid::resolve(&intent).unwrap();
        assert!(matches!(
            SsbConfig::derive(&intent, &grid),
            Err(BuildError::Invalid(ValidationError::Ssb(_)))
        ));
    }

    #[test]
    fn test_srs_offset() {
        let mut intent = n78_cell();
        intent.srs.enabled = true;
        let grid = CellGrid::resolve(&intent).unwrap();
        let srs = SrsConfig::derive(&intent, &grid).unwrap().unwrap();
        assert_eq!((srs.slot_offset, srs.start_symbol), (7, 13));

        intent.srs.nof_symbols = 3;
        assert!(SrsConfig::derive(&intent, &grid).is_err());
    }
}
