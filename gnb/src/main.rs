//! Albor Space 5G gNodeB Cell Configuration
//!
//! Loads the cells of a DU, validates them in parallel, checks them against
//! each other and derives the configuration handed to the scheduler.

mod config;

use anyhow::Result;
use cell_config::{try_build_cell_config, CellIntent, CellValidator, DerivedCellConfig};
use clap::Parser;
use config::GnbConfig;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Albor Space 5G gNodeB cell configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, default_value = "gnb.yml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write the derived configurations as JSON to this file, "-" for stdout
    #[arg(long)]
    dump: Option<PathBuf>,
}

/// Validate every cell, run the cross-cell checks, then build every cell
///
/// Per-cell work runs on the blocking pool, one task per cell.
async fn derive_cells(config: GnbConfig) -> Result<Vec<DerivedCellConfig>> {
    let validator = Arc::new(CellValidator::new(config.policy));
    let cells: Arc<[CellIntent]> = config.cells.into();

    let checks = (0..cells.len()).map(|index| {
        let validator = validator.clone();
        let cells = cells.clone();
        tokio::task::spawn_blocking(move || validator.validate(&cells[index]).map_err(|e| e.in_cell(index)))
    });
    for verdict in join_all(checks).await {
        verdict??;
    }
    validator.validate_cross_cell(&cells)?;
    info!("{} cells accepted", cells.len());

    let builds = (0..cells.len()).map(|index| {
        let validator = validator.clone();
        let cells = cells.clone();
        tokio::task::spawn_blocking(move || try_build_cell_config(&cells[index], validator.policy()))
    });
    let mut derived = Vec::with_capacity(cells.len());
    for built in join_all(builds).await {
        derived.push(built??);
    }
    Ok(derived)
}

fn log_summary(derived: &[DerivedCellConfig]) {
    for cell in derived {
        info!("Cell PCI {} (NCI {:#x}, TAC {}):", cell.pci.0, cell.nci.0, cell.tac.0);
        info!(
            "  Carrier: band n{}, DL ARFCN {}, {} MHz, {} kHz, {} CRBs",
            cell.carrier.band,
            cell.carrier.dl_arfcn,
            cell.carrier.channel_bandwidth_mhz.mhz(),
            cell.carrier.common_scs.khz(),
            cell.carrier.nof_crbs
        );
        info!(
            "  SSB: GSCN {}, period {} ms, CORESET#0 index {}, SearchSpace#0 index {}",
            cell.ssb.placement.gscn,
            cell.ssb.period_ms,
            cell.ssb.placement.coreset0.index,
            cell.pdcch.search_space0.index
        );
        info!(
            "  PRACH: index {}, format {}, root {}, RBs from {}",
            cell.prach.config_index, cell.prach.format, cell.prach.root_sequence_index, cell.prach.frequency_start
        );
        info!(
            "  PUCCH: {} RBs, k1 {:?}, {} PUSCH time-domain resources",
            cell.pucch.layout.rb_usage(),
            cell.expert.k1_candidates,
            cell.pusch_time_domain.len()
        );
        debug!("  Derived: {:?}", cell);
    }
}

fn dump(derived: &[DerivedCellConfig], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(derived)?;
    if path.as_os_str() == "-" {
        println!("{}", json);
    } else {
        std::fs::write(path, json)?;
        info!("Derived configuration written to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting Albor Space 5G gNodeB cell configuration");
    info!("Configuration file: {}", args.config.display());

    let config = GnbConfig::from_file(&args.config)?;
    for (index, affinity) in config.expert_execution.cell_affinities.iter().enumerate() {
        info!(
            "Cell {} executors: L1 DL CPUs {:?}, L2 CPUs {:?}",
            index, affinity.l1_dl_cpus, affinity.l2_cell_cpus
        );
    }
    let derived = derive_cells(config).await?;

    log_summary(&derived);
    if let Some(path) = &args.dump {
        dump(&derived, path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cell_config::ValidationError;

    const SAMPLE_YAML: &str = include_str!("../configs/gnb_n78_two_cells.yml");

    #[tokio::test]
    async fn test_derive_sample_cells() {
        let config = GnbConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        let derived = derive_cells(config).await.unwrap();
        assert_eq!(derived.len(), 2);
        assert_eq!(derived[0].pci.0, 1);
        assert_eq!(derived[1].prach.root_sequence_index, 100);
        assert!(derived[1].srs.is_some());
    }

    #[tokio::test]
    async fn test_per_cell_failure_carries_index() {
        let mut config = GnbConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        config.cells[1].nof_antennas_dl = 3;
        let err = derive_cells(config).await.unwrap_err();
        match err.downcast_ref::<ValidationError>() {
            Some(ValidationError::Cell { index, .. }) => assert_eq!(*index, 1),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cross_cell_conflict() {
        let mut config = GnbConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        config.cells[1].prach.prach_root_sequence_index = 10;
        let err = derive_cells(config).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::CrossCell(_))
        ));
    }
}
