//! PUCCH Resource Layout
//!
//! Lays out the cell-wide PUCCH resources (TS 38.213 §9.2, TS 38.331
//! PUCCH-Config): Format 0/1 resources for HARQ-ACK resource set 0 and SR,
//! Format 2 resources for resource set 1 and periodic CSI. Also sizes Format 2
//! from the UCI payload of the DL antenna count.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Upper bound of the cell-wide (set 0, set 1) groups
pub const MAX_CELL_SETS: u32 = 10;

/// PUCCH errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PucchError {
    #[error("Format {format:?} cannot span {nof_symbols} symbols")]
    InvalidSymbols { format: PucchFormat, nof_symbols: u8 },

    #[error("Invalid number of Format 1 cyclic shifts {0}")]
    InvalidCyclicShifts(u8),

    #[error("PUCCH resource set size {0} is not in 1..=8")]
    InvalidSetSize(u32),

    #[error("Number of cell-wide PUCCH resource set groups {0} is not in 1..=10")]
    InvalidCellSets(u32),

    #[error("At least one SR resource is required")]
    NoSrResource,

    #[error("Format 2 with {nof_prbs} PRBs carries {capacity} bits, {required} needed")]
    PayloadTooLarge { nof_prbs: u32, capacity: u32, required: u32 },

    #[error("PUCCH resources use {used} RBs, above the ceiling of {ceiling}")]
    TooManyRbs { used: u32, ceiling: u32 },

    #[error("PUCCH resources need {needed} RBs but the BWP has {bwp_rbs}")]
    ExceedsBwp { needed: u32, bwp_rbs: u32 },
}

/// PUCCH format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PucchFormat {
    Format0,
    #[default]
    Format1,
    Format2,
}

/// Format 2 maxCodeRate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxCodeRate {
    Dot08,
    Dot15,
    #[default]
    Dot25,
    Dot35,
    Dot45,
    Dot60,
    Dot80,
}

impl MaxCodeRate {
    /// Code rate times 100
    pub fn percent(&self) -> u32 {
        match self {
            Self::Dot08 => 8,
            Self::Dot15 => 15,
            Self::Dot25 => 25,
            Self::Dot35 => 35,
            Self::Dot45 => 45,
            Self::Dot60 => 60,
            Self::Dot80 => 80,
        }
    }
}

/// Input of the layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PucchParams {
    /// Format of HARQ-ACK set 0 and SR resources
    pub harq_format: PucchFormat,
    pub harq_nof_symbols: u8,
    pub f1_nof_cyclic_shifts: u8,
    pub f1_occ: bool,
    pub f2_nof_symbols: u8,
    /// Fixed Format 2 PRB count, auto-sized when absent
    pub f2_nof_prbs: Option<u32>,
    pub f2_max_code_rate: MaxCodeRate,
    pub nof_res_set0: u32,
    pub nof_res_set1: u32,
    /// Number of cell-wide (set 0, set 1) groups
    pub nof_cell_sets: u32,
    pub nof_sr: u32,
    pub nof_csi: u32,
    pub intraslot_hopping: bool,
}

/// One PUCCH resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PucchResource {
    pub id: u32,
    pub format: PucchFormat,
    pub start_prb: u32,
    /// PRB of the second hop with intra-slot hopping
    pub second_hop_prb: Option<u32>,
    pub nof_prbs: u32,
    pub start_symbol: u8,
    pub nof_symbols: u8,
    pub initial_cyclic_shift: u8,
    pub time_domain_occ: u8,
}

/// Cell-wide PUCCH resources
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PucchLayout {
    pub resources: Vec<PucchResource>,
    /// Resource ids of each set 0, one vector per cell-wide group
    pub set0: Vec<Vec<u32>>,
    pub set1: Vec<Vec<u32>>,
    pub sr: Vec<u32>,
    pub csi: Vec<u32>,
    pub f2_nof_prbs: u32,
    pub uci_bits: u32,
}

impl PucchLayout {
    /// PRBs occupied by any resource, both hops included
    pub fn occupied_rbs(&self) -> BTreeSet<u32> {
        self.resources
            .iter()
            .flat_map(|r| {
                let first = r.start_prb..r.start_prb + r.nof_prbs;
                let second = r.second_hop_prb.map(|p| p..p + r.nof_prbs).unwrap_or(0..0);
                first.chain(second)
            })
            .collect()
    }

    /// Number of occupied PRBs
    pub fn rb_usage(&self) -> u32 {
        self.occupied_rbs().len() as u32
    }
}

/// CSI part 1 payload for a number of CSI-RS ports (CQI, RI and PMI)
pub fn csi_report_bits(nof_ports: u32) -> u32 {
    match nof_ports {
        0 | 1 => 4,
        2 => 7,
        _ => 11,
    }
}

/// CRC attached to a UCI payload on PUCCH Format 2 (TS 38.212 §6.3.1.2.1)
fn uci_crc_bits(payload: u32) -> u32 {
    match payload {
        0..=11 => 0,
        12..=19 => 6,
        _ => 11,
    }
}

/// UCI bits carried by a set 1 resource: 2 HARQ-ACK, 1 SR and one CSI report
pub fn required_uci_bits(nof_dl_ports: u32) -> u32 {
    let payload = 2 + 1 + csi_report_bits(nof_dl_ports);
    payload + uci_crc_bits(payload)
}

/// Format 2 capacity in bits: 8 data REs per PRB and symbol, QPSK, scaled by the code rate
pub fn f2_capacity_bits(nof_prbs: u32, nof_symbols: u8, rate: MaxCodeRate) -> u32 {
    nof_prbs * 8 * nof_symbols as u32 * 2 * rate.percent() / 100
}

/// Resources that share one PRB for the HARQ/SR format
fn harq_per_prb(params: &PucchParams) -> u32 {
    let time_positions = 14 / params.harq_nof_symbols.max(1) as u32;
    let code_positions = match params.harq_format {
        PucchFormat::Format1 => {
            let occ = if params.f1_occ {
                (params.harq_nof_symbols as u32 / 2).clamp(1, 7)
            } else {
                1
            };
            params.f1_nof_cyclic_shifts as u32 * occ
        }
        _ => params.f1_nof_cyclic_shifts as u32,
    };
    time_positions * code_positions
}

fn validate(params: &PucchParams) -> Result<(), PucchError> {
    let harq_symbols_ok = match params.harq_format {
        PucchFormat::Format1 => (4..=14).contains(&params.harq_nof_symbols),
        _ => (1..=2).contains(&params.harq_nof_symbols),
    };
    if !harq_symbols_ok {
        return Err(PucchError::InvalidSymbols {
            format: params.harq_format,
            nof_symbols: params.harq_nof_symbols,
        });
    }
    if !(1..=2).contains(&params.f2_nof_symbols) {
        return Err(PucchError::InvalidSymbols {
            format: PucchFormat::Format2,
            nof_symbols: params.f2_nof_symbols,
        });
    }
    if ![1, 2, 3, 4, 6, 12].contains(&params.f1_nof_cyclic_shifts) {
        return Err(PucchError::InvalidCyclicShifts(params.f1_nof_cyclic_shifts));
    }
    [params.nof_res_set0, params.nof_res_set1]
        .into_iter()
        .find(|n| !(1..=8).contains(n))
        .map_or(Ok(()), |n| Err(PucchError::InvalidSetSize(n)))?;
    if !(1..=MAX_CELL_SETS).contains(&params.nof_cell_sets) {
        return Err(PucchError::InvalidCellSets(params.nof_cell_sets));
    }
    if params.nof_sr == 0 {
        return Err(PucchError::NoSrResource);
    }
    Ok(())
}

/// Pick the Format 2 PRB count
///
/// A fixed count must carry the payload, otherwise the smallest count up to
/// `max_prbs` that does is used.
pub fn size_f2(params: &PucchParams, nof_dl_ports: u32, max_prbs: u32) -> Result<u32, PucchError> {
    let required = required_uci_bits(nof_dl_ports);
    let capacity = |prbs| f2_capacity_bits(prbs, params.f2_nof_symbols, params.f2_max_code_rate);
    match params.f2_nof_prbs {
        Some(prbs) if capacity(prbs) >= required => Ok(prbs),
        Some(prbs) => Err(PucchError::PayloadTooLarge {
            nof_prbs: prbs,
            capacity: capacity(prbs),
            required,
        }),
        None => (1..=max_prbs).find(|p| capacity(*p) >= required).ok_or(PucchError::PayloadTooLarge {
            nof_prbs: max_prbs,
            capacity: capacity(max_prbs),
            required,
        }),
    }
}

/// Lay out every cell-wide PUCCH resource from the lower BWP edge
///
/// HARQ/SR resources fill PRBs first (time, cyclic shift, OCC), then Format 2
/// blocks follow. With intra-slot hopping each resource is mirrored on the
/// upper edge for its second hop.
pub fn build_layout(
    params: &PucchParams,
    bwp_rbs: u32,
    nof_dl_ports: u32,
    max_f2_prbs: u32,
) -> Result<PucchLayout, PucchError> {
    validate(params)?;
    let f2_nof_prbs = size_f2(params, nof_dl_ports, max_f2_prbs)?;

    let nof_harq = params.nof_res_set0 * params.nof_cell_sets + params.nof_sr;
    let nof_f2 = params.nof_res_set1 * params.nof_cell_sets + params.nof_csi;
    let per_prb = harq_per_prb(params);
    let cs_step = 12 / params.f1_nof_cyclic_shifts as u32;
    let time_positions = 14 / params.harq_nof_symbols as u32;
    let codes_per_time = per_prb / time_positions;

    let mirror = |prb: u32, width: u32| params.intraslot_hopping.then(|| bwp_rbs - prb - width);

    let harq = (0..nof_harq).map(|n| {
        let prb = n / per_prb;
        let within = n % per_prb;
        let time = within / codes_per_time;
        let code = within % codes_per_time;
        let cs = code % params.f1_nof_cyclic_shifts as u32;
        let occ = code / params.f1_nof_cyclic_shifts as u32;
        PucchResource {
            id: n,
            format: params.harq_format,
            start_prb: prb,
            second_hop_prb: mirror(prb, 1),
            nof_prbs: 1,
            start_symbol: (14 - time_positions * params.harq_nof_symbols as u32 + time * params.harq_nof_symbols as u32) as u8,
            nof_symbols: params.harq_nof_symbols,
            initial_cyclic_shift: (cs * cs_step) as u8,
            time_domain_occ: occ as u8,
        }
    });
    let harq_prbs = nof_harq.div_ceil(per_prb);

    let f2_per_block = 14 / params.f2_nof_symbols as u32;
    let f2 = (0..nof_f2).map(|n| {
        let block = n / f2_per_block;
        let time = n % f2_per_block;
        let prb = harq_prbs + block * f2_nof_prbs;
        PucchResource {
            id: nof_harq + n,
            format: PucchFormat::Format2,
            start_prb: prb,
            second_hop_prb: mirror(prb, f2_nof_prbs),
            nof_prbs: f2_nof_prbs,
            start_symbol: (time * params.f2_nof_symbols as u32) as u8,
            nof_symbols: params.f2_nof_symbols,
            initial_cyclic_shift: 0,
            time_domain_occ: 0,
        }
    });

    let needed = harq_prbs + nof_f2.div_ceil(f2_per_block) * f2_nof_prbs;
    let needed = if params.intraslot_hopping { 2 * needed } else { needed };
    if needed > bwp_rbs {
        return Err(PucchError::ExceedsBwp { needed, bwp_rbs });
    }

    let resources: Vec<PucchResource> = harq.chain(f2).collect();
    let set_ids = |base: u32, size: u32| -> Vec<Vec<u32>> {
        (0..params.nof_cell_sets)
            .map(|s| (base + s * size..base + (s + 1) * size).collect())
            .collect()
    };
    let set0_end = params.nof_res_set0 * params.nof_cell_sets;
    let set1_end = nof_harq + params.nof_res_set1 * params.nof_cell_sets;

    let layout = PucchLayout {
        set0: set_ids(0, params.nof_res_set0),
        set1: set_ids(nof_harq, params.nof_res_set1),
        sr: (set0_end..nof_harq).collect(),
        csi: (set1_end..nof_harq + nof_f2).collect(),
        resources,
        f2_nof_prbs,
        uci_bits: required_uci_bits(nof_dl_ports),
    };
    debug!(
        "PUCCH layout: {} resources, {} RBs, Format 2 with {} PRBs",
        layout.resources.len(),
        layout.rb_usage(),
        f2_nof_prbs
    );
    Ok(layout)
}

/// Check the RB usage against the policy ceiling
pub fn check_rb_usage(layout: &PucchLayout, ceiling: u32) -> Result<(), PucchError> {
    let used = layout.rb_usage();
    if used > ceiling {
        return Err(PucchError::TooManyRbs { used, ceiling });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_params() -> PucchParams {
        PucchParams {
            harq_format: PucchFormat::Format1,
            harq_nof_symbols: 14,
            f1_nof_cyclic_shifts: 1,
            f1_occ: true,
            f2_nof_symbols: 2,
            f2_nof_prbs: None,
            f2_max_code_rate: MaxCodeRate::Dot25,
            nof_res_set0: 6,
            nof_res_set1: 6,
            nof_cell_sets: 2,
            nof_sr: 2,
            nof_csi: 2,
            intraslot_hopping: false,
        }
    }

    #[test]
    fn test_uci_bits() {
        assert_eq!(required_uci_bits(1), 7);
        assert_eq!(required_uci_bits(2), 10);
        assert_eq!(required_uci_bits(4), 20);
    }

    #[test]
    fn test_f2_auto_size() {
        let params = default_params();
        // 3 PRBs x 8 x 2 symbols x 2 bits x 0.25 = 24 bits
        assert_eq!(size_f2(&params, 4, 16), Ok(3));
        assert_eq!(size_f2(&params, 1, 16), Ok(1));

        let fixed = PucchParams {
            f2_nof_prbs: Some(1),
            ..default_params()
        };
        assert_eq!(
            size_f2(&fixed, 4, 16),
            Err(PucchError::PayloadTooLarge { nof_prbs: 1, capacity: 8, required: 20 })
        );
    }

    #[test]
    fn test_default_layout_four_antennas() {
        let layout = build_layout(&default_params(), 51, 4, 16).unwrap();
        assert_eq!(layout.resources.len(), 28);
        // 14 Format 1 resources with 7 OCCs per PRB, then two 3-PRB Format 2 blocks
        assert_eq!(layout.rb_usage(), 8);
        assert!(check_rb_usage(&layout, 25).is_ok());
        assert_eq!(layout.set0, vec![vec![0, 1, 2, 3, 4, 5], vec![6, 7, 8, 9, 10, 11]]);
        assert_eq!(layout.sr, vec![12, 13]);
        assert_eq!(layout.set1[0], vec![14, 15, 16, 17, 18, 19]);
        assert_eq!(layout.csi, vec![26, 27]);

        let first = &layout.resources[0];
        let eighth = &layout.resources[7];
        assert_eq!((first.start_prb, first.time_domain_occ), (0, 0));
        assert_eq!((eighth.start_prb, eighth.time_domain_occ), (1, 0));
    }

    #[test]
    fn test_hopping_mirrors() {
        let params = PucchParams {
            intraslot_hopping: true,
            ..default_params()
        };
        let layout = build_layout(&params, 51, 4, 16).unwrap();
        assert_eq!(layout.resources[0].second_hop_prb, Some(50));
        let f2 = layout.resources.iter().find(|r| r.format == PucchFormat::Format2).unwrap();
        assert_eq!(f2.start_prb, 2);
        assert_eq!(f2.second_hop_prb, Some(46));
        assert_eq!(layout.rb_usage(), 16);
    }

    #[test]
    fn test_rb_ceiling_boundary() {
        // One Format 1 resource per PRB, two single-PRB Format 2 blocks
        let base = PucchParams {
            f1_occ: false,
            f2_nof_prbs: Some(1),
            f2_max_code_rate: MaxCodeRate::Dot80,
            ..default_params()
        };
        let ceiling = 53;
        let at_ceiling = PucchParams { nof_sr: 39, ..base.clone() };
        let layout = build_layout(&at_ceiling, 106, 4, 16).unwrap();
        assert_eq!(layout.rb_usage(), 53);
        assert!(check_rb_usage(&layout, ceiling).is_ok());

        let above = PucchParams { nof_sr: 40, ..base };
        let layout = build_layout(&above, 106, 4, 16).unwrap();
        assert_eq!(
            check_rb_usage(&layout, ceiling),
            Err(PucchError::TooManyRbs { used: 54, ceiling: 53 })
        );
    }

    #[test]
    fn test_cell_set_groups() {
        for nof_cell_sets in [0, MAX_CELL_SETS + 1, u32::MAX] {
            let params = PucchParams {
                nof_cell_sets,
                ..default_params()
            };
            assert_eq!(
                build_layout(&params, 51, 1, 16),
                Err(PucchError::InvalidCellSets(nof_cell_sets))
            );
        }
        let single = PucchParams {
            nof_cell_sets: 1,
            ..default_params()
        };
        let layout = build_layout(&single, 51, 1, 16).unwrap();
        assert_eq!(layout.set0.len(), 1);
        assert_eq!(layout.set1.len(), 1);
    }

    #[test]
    fn test_format0_layout() {
        let params = PucchParams {
            harq_format: PucchFormat::Format0,
            harq_nof_symbols: 2,
            f1_nof_cyclic_shifts: 2,
            ..default_params()
        };
        let layout = build_layout(&params, 51, 1, 16).unwrap();
        // 7 time positions x 2 cyclic shifts per PRB
        assert_eq!(layout.resources.iter().filter(|r| r.start_prb == 0).count(), 14);
        assert_eq!(layout.resources[1].initial_cyclic_shift, 6);
        assert_eq!(layout.resources[2].start_symbol, 2);
    }

    #[test]
    fn test_invalid_params() {
        let params = PucchParams {
            harq_nof_symbols: 3,
            ..default_params()
        };
        assert!(matches!(build_layout(&params, 51, 1, 16), Err(PucchError::InvalidSymbols { .. })));
        let params = PucchParams {
            nof_res_set0: 9,
            ..default_params()
        };
        assert_eq!(build_layout(&params, 51, 1, 16), Err(PucchError::InvalidSetSize(9)));
        let params = PucchParams {
            f1_nof_cyclic_shifts: 5,
            ..default_params()
        };
        assert_eq!(build_layout(&params, 51, 1, 16), Err(PucchError::InvalidCyclicShifts(5)));
    }

    #[test]
    fn test_code_rate_serde() {
        let rate: MaxCodeRate = serde_json::from_str("\"dot35\"").unwrap();
        assert_eq!(rate, MaxCodeRate::Dot35);
    }
}
