//! Cell Configuration Builder
//!
//! Derives the complete configuration of a validated cell. The steps are the
//! ones the validator runs, in dependency order, so a failure here means the
//! tables and the checks disagree.

use crate::derived::{
    self, CarrierConfig, CellGrid, CsiConfig, DerivedCellConfig, PdcchConfig, PrachConfig, PucchConfig, SrsConfig,
    SsbConfig,
};
use crate::intent::CellIntent;
use crate::phy::timing;
use crate::policy::CellPolicy;
use crate::BuildError;
use tracing::{error, info};

/// Derive every resource of a cell
pub fn try_build_cell_config(intent: &CellIntent, policy: &CellPolicy) -> Result<DerivedCellConfig, BuildError> {
    let grid = CellGrid::resolve(intent)?;
    let carrier = CarrierConfig::derive(intent, &grid.num);
    let ssb = SsbConfig::derive(intent, &grid)?;
    let pdcch = PdcchConfig::derive(intent, &grid, &ssb)?;

    let k1 = derived::derive_k1(intent, policy, &grid)?;
    let pdsch_time_domain = timing::generate_pdsch_td(grid.num.cp, grid.tdd(), pdcch.nof_symbols());
    let pusch_time_domain = derived::derive_pusch_td(intent, policy, &grid)?;

    let pucch = PucchConfig::derive(intent, policy, &grid)?;
    let prach = PrachConfig::derive(intent, policy, &grid, &pucch.layout)?;
    let csi = CsiConfig::derive(intent, policy, &grid, &ssb, &pdcch, &pucch.layout)?;
    let srs = SrsConfig::derive(intent, &grid)?;
    let rlm_resources = derived::derive_rlm(intent.rlm, &ssb, csi.as_ref())?;

    let sib = derived::derive_sib(intent, &grid, &pdcch)?;
    let expert = derived::derive_expert(intent, &k1, &pusch_time_domain)?;
    let bearers = derived::derive_bearers(intent)?;
    let max_pdu_sizes = derived::derive_pdu_sizes(intent, &grid.num)?;

    let config = DerivedCellConfig {
        pci: intent.pci(),
        nci: intent.nci(),
        tac: intent.tac(),
        carrier,
        tdd: grid.num.tdd,
        ssb,
        pdcch,
        pdsch_time_domain,
        pusch_time_domain,
        pucch,
        prach,
        csi,
        srs,
        rlm_resources,
        sib,
        expert,
        bearers,
        max_pdu_sizes,
    };
    info!(
        "Built cell PCI {}: band n{}, {} MHz, {} CRBs, PRACH index {}",
        config.pci.0,
        config.carrier.band,
        config.carrier.channel_bandwidth_mhz.mhz(),
        config.carrier.nof_crbs,
        config.prach.config_index
    );
    Ok(config)
}

/// Derive every resource of a cell the validator accepted
///
/// # Panics
///
/// Panics when the derivation fails, which the validator rules out for the
/// intents it accepts. Use [`try_build_cell_config`] for unvalidated input.
pub fn build_cell_config(intent: &CellIntent, policy: &CellPolicy) -> DerivedCellConfig {
    match try_build_cell_config(intent, policy) {
        Ok(config) => config,
        Err(e) => {
            error!("Cell PCI {} passed validation but failed to build: {}", intent.pci, e);
            panic!("inconsistent derivation for PCI {}: {}", intent.pci, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::RlmPolicy;
    use crate::phy::prach;
    use crate::phy::tdd::{TddConfig, TddSlotMap};
    use crate::validator::CellValidator;
    use crate::ValidationError;
    use common::types::{Bandwidth, DuplexMode, FrequencyRange, SubcarrierSpacing};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn n78_cell() -> CellIntent {
        CellIntent {
            band: Some(78),
            ..CellIntent::new(1, 632_628)
        }
    }

    fn random_intent(rng: &mut StdRng) -> CellIntent {
        let mut intent = match rng.gen_range(0..3) {
            0 => n78_cell(),
            1 => CellIntent {
                common_scs: SubcarrierSpacing::Scs15,
                channel_bandwidth: Bandwidth::Bw10,
                ..CellIntent::new(1, 368_500)
            },
            _ => CellIntent {
                band: Some(79),
                channel_bandwidth: Bandwidth::Bw40,
                ..CellIntent::new(1, 720_000)
            },
        };
        let knob = |rng: &mut StdRng| rng.gen_bool(0.3);
        if knob(rng) {
            intent.channel_bandwidth = Bandwidth::ALL[rng.gen_range(0..13)];
        }
        if knob(rng) {
            intent.nof_antennas_dl = [1, 2, 4][rng.gen_range(0..3)];
            intent.nof_antennas_ul = [1, 2, 4][rng.gen_range(0..3)];
        }
        if knob(rng) {
            intent.ssb.period_ms = [5, 10, 20, 40, 80, 160][rng.gen_range(0..6)];
        }
        if knob(rng) {
            intent.prach.prach_config_index = Some(rng.gen_range(0..=255));
        }
        if knob(rng) {
            intent.prach.zero_correlation_zone = rng.gen_range(0..16);
        }
        if knob(rng) {
            intent.csi.enabled = rng.gen_bool(0.5);
            intent.srs.enabled = rng.gen_bool(0.5);
        }
        if knob(rng) {
            intent.rlm = [RlmPolicy::Default, RlmPolicy::Ssb, RlmPolicy::CsiRs, RlmPolicy::SsbAndCsiRs]
                [rng.gen_range(0..4)];
        }
        if knob(rng) {
            intent.pdsch.min_k1 = rng.gen_range(0..8);
            intent.pusch.min_k2 = rng.gen_range(0..8);
        }
        intent
    }

    #[test]
    fn test_accepted_intents_always_build() {
        let validator = CellValidator::default();
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let mut accepted = 0;
        for _ in 0..300 {
            let intent = random_intent(&mut rng);
            if validator.validate(&intent).is_ok() {
                accepted += 1;
                if let Err(e) = try_build_cell_config(&intent, validator.policy()) {
                    panic!("accepted intent {:?} failed to build: {}", intent, e);
                }
            }
        }
        assert!(accepted > 0);
    }

    #[test]
    fn test_build_is_idempotent() {
        let intent = n78_cell();
        let policy = CellPolicy::default();
        let first = build_cell_config(&intent, &policy);
        let second = build_cell_config(&intent, &policy);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_default_n78_cell() {
        let config = build_cell_config(&n78_cell(), &CellPolicy::default());
        assert_eq!(config.carrier.nof_crbs, 51);
        assert_eq!(config.carrier.duplex, DuplexMode::Tdd);
        assert_eq!(config.tdd, Some(TddConfig::default()));
        assert_eq!(config.prach.frequency_start, 4);
        assert!(config.csi.is_some());
        assert!(config.srs.is_none());
        assert!(config.rlm_resources.is_empty());
        assert_eq!(config.bearers.drbs.len(), 1);
        assert!(!config.pdsch_time_domain.is_empty());
        assert!(!config.pusch_time_domain.is_empty());
    }

    #[test]
    fn test_rejected_intent_fails_to_build() {
        let mut intent = n78_cell();
        intent.prach.prach_config_index = Some(100);
        assert!(matches!(
            try_build_cell_config(&intent, &CellPolicy::default()),
            Err(BuildError::Invalid(ValidationError::Prach(_)))
        ));
    }

    #[test]
    #[should_panic]
    fn test_build_panics_on_rejected_intent() {
        let mut intent = n78_cell();
        intent.nof_antennas_dl = 4;
        intent.pdsch.min_k1 = 0;
        build_cell_config(&intent, &CellPolicy::default());
    }

    #[test]
    fn test_four_antenna_tdd_cell_selects_prach_index() {
        let intent = CellIntent {
            band: Some(78),
            channel_bandwidth: Bandwidth::Bw20,
            common_scs: SubcarrierSpacing::Scs30,
            nof_antennas_dl: 4,
            nof_antennas_ul: 4,
            ..CellIntent::new(1, 632_628)
        };
        assert_eq!(intent.prach.prach_config_index, None);

        let tdd = TddSlotMap::new(&TddConfig::default());
        let index = prach::find_valid_index(SubcarrierSpacing::Scs30, 0, &tdd).unwrap();
        assert!(prach::fits_in_tdd_pattern(SubcarrierSpacing::Scs30, index, &tdd).is_ok());
        assert!(prach::config_index_valid(index, FrequencyRange::Fr1, DuplexMode::Tdd).is_ok());

        let validator = CellValidator::default();
        assert!(validator.validate(&intent).is_ok());
        let config = build_cell_config(&intent, validator.policy());
        assert_eq!(config.prach.config_index, index);
        assert_eq!(config.carrier.nof_antennas_dl, 4);
    }
}
