//! `sim`: runs every entry of a configuration file end to end — geometry
//! setup, routing, edge aggregation, traffic allocation, link attack, and
//! zone attack — logging a banner per entry.
//!
//! Grounded on `crates/evaluation/src/bin/param-grid-search.rs`'s CLI
//! preamble and `original_source/main.py`'s per-configuration loop.

use std::path::PathBuf;

use clap::Parser;
use icarus_attack::link_phase::{LinkAttackPhase, LinkAttackProps};
use icarus_attack::zone_phase::{ZoneAttackPhase, ZoneAttackProps};
use icarus_config::registry;
use icarus_config::{expand_configs, RawConfig, RunConfig};
use icarus_core::phase::{Engine, Phase};
use icarus_core::types::{BwData, Coverage, EdgeData, GridPos, PathData, SatPos};
use icarus_edges::phase::{EdgePhase, EdgeProps};
use icarus_geometry::grid::build_grid;
use icarus_geometry::orbit::{Constellation, EpochOffset};
use icarus_routing::graph::build_isl_network;
use icarus_routing::phase::{RoutingPhase, RoutingProps};
use icarus_traffic::phase::{TrafficPhase, TrafficProps};

#[derive(Debug, Parser)]
#[command(name = "sim", about = "Run a LEO constellation attack-simulation configuration")]
struct CliArgs {
    /// Path to the nested `{phase_key: {parameter: [values]}}` configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Directory holding cached phase artifacts.
    #[arg(long = "results-dir")]
    results_dir: PathBuf,

    /// Worker thread count; defaults to the machine's available parallelism.
    #[arg(long)]
    cores: Option<usize>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let args = CliArgs::parse();
    let cores = args
        .cores
        .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(cores)
        .build_global()
        .ok();

    let raw: RawConfig = serde_json::from_str(&std::fs::read_to_string(&args.config)?)?;
    let runs = expand_configs(&raw);

    for (conf_id, run) in runs.iter().enumerate() {
        log::info!("Configuration number {conf_id}");
        if let Err(e) = run_configuration(&args.results_dir, run, cores) {
            log::error!("configuration {conf_id} failed: {e:#}");
            return Err(e);
        }
    }

    Ok(())
}

fn run_configuration(results_dir: &PathBuf, run: &RunConfig, cores: usize) -> color_eyre::Result<()> {
    let mut engine = Engine::new(results_dir.clone());

    let (sat_pos, isls) = build_geometry(run)?;
    let mut grid_pos: GridPos = build_grid(run.usize("grid", "repeats")? as u32);
    registry::weight_strategy(run, &[])?.compute(&mut grid_pos);
    let coverage: Coverage = registry::coverage_strategy(run)?.compute(&grid_pos, &sat_pos);
    let network = build_isl_network(&sat_pos, &isls);

    let num_workers = cores.max(1);
    let num_batches = (num_workers * 4).max(1);

    let routing_phase = RoutingPhase {
        strategy: registry::routing_strategy(run)?,
        num_workers,
        num_batches,
        read_persist: true,
        persist: true,
    };
    let mut routing_props = RoutingProps {
        sat_pos: sat_pos.clone(),
        grid_pos: grid_pos.clone(),
        coverage: coverage.clone(),
        network,
        path_data: PathData::new(),
    };
    engine.run_phase(&routing_phase, &mut routing_props)?;

    let edge_phase = EdgePhase {
        strategy: registry::edge_strategy(run)?,
        read_persist: true,
        persist: true,
    };
    let mut edge_props = EdgeProps {
        path_data: routing_props.path_data.clone(),
        grid_pos: grid_pos.clone(),
        sat_pos: sat_pos.clone(),
        isls: isls.clone(),
        edge_data: EdgeData::new(),
    };
    engine.run_phase(&edge_phase, &mut edge_props)?;

    let traffic_phase = TrafficPhase {
        select: registry::bw_select_strategy(run)?,
        assign: registry::bw_assign_strategy(run)?,
        read_persist: true,
        persist: true,
    };
    let mut traffic_props = TrafficProps {
        path_data: routing_props.path_data.clone(),
        grid_pos: grid_pos.clone(),
        sat_pos: sat_pos.clone(),
        isls: isls.clone(),
        bw_data: BwData::new(),
    };
    engine.run_phase(&traffic_phase, &mut traffic_props)?;

    let uplink_capacity_max = run.i64("atk_optim", "uplink_capacity_max").unwrap_or(1_000_000);

    let link_attack_phase = LinkAttackPhase {
        filter: registry::filter_strategy(run)?,
        feasibility: registry::feasibility_strategy(run)?,
        optim: registry::optim_strategy(run)?,
        geo_constraint: registry::geo_constraint_strategy(run, None)?,
        uplink_capacity_max,
        num_workers,
        num_batches,
        read_persist: true,
        persist: true,
    };
    let mut link_attack_props = LinkAttackProps {
        edge_data: edge_props.edge_data.clone(),
        path_data: routing_props.path_data.clone(),
        bw_data: traffic_props.bw_data.clone(),
        grid_pos: grid_pos.clone(),
        attack_data: Default::default(),
    };
    engine.run_phase(&link_attack_phase, &mut link_attack_props)?;

    let zone_attack_phase = ZoneAttackPhase {
        select: registry::zone_select_strategy(run)?,
        build: registry::zone_build_strategy(run)?,
        edge_strategy: registry::zone_edge_strategy(run)?,
        bottleneck: registry::zone_bottleneck_strategy(run)?,
        filter: registry::filter_strategy(run)?,
        feasibility: registry::feasibility_strategy(run)?,
        optim: registry::optim_strategy(run)?,
        geo_constraint: registry::geo_constraint_strategy(run, None)?,
        uplink_capacity_max,
        read_persist: true,
        persist: true,
    };
    let mut zone_attack_props = ZoneAttackProps {
        edge_data: edge_props.edge_data,
        path_data: routing_props.path_data,
        bw_data: traffic_props.bw_data,
        grid_pos,
        attack_data: link_attack_props.attack_data,
        zone_attack_data: Default::default(),
    };
    engine.run_phase(&zone_attack_phase, &mut zone_attack_props)?;

    log::info!(
        "configuration done: {} attackable edges, {} zone pairs evaluated",
        zone_attack_props.attack_data.values().filter(|v| v.is_some()).count(),
        zone_attack_props.zone_attack_data.len()
    );
    Ok(())
}

/// Builds the Walker constellation and its ISL graph from the `lsn` phase
/// key (SPEC_FULL.md §6). The epoch offset selects the one static snapshot
/// this binary evaluates (see `icarus_geometry::orbit` module docs on why
/// satellite motion is not simulated dynamically).
fn build_geometry(run: &RunConfig) -> color_eyre::Result<(SatPos, Vec<icarus_core::types::IslInfo>)> {
    let sats_per_orbit = run.usize("lsn", "sats_per_orbit")? as u32;
    let orbits = run.usize("lsn", "orbits")? as u32;
    let inclination_deg = run.f64("lsn", "inclination")?;
    let elevation_m = run.f64("lsn", "elevation")?;
    let shift_algo = registry::orbit_shift_strategy(run)?;
    // The shift applied to the last orbital plane is what the seam-wrap
    // correction in `generate_isls` needs, not the inter-satellite spacing.
    let max_shift_deg = shift_algo.shift(orbits.saturating_sub(1));

    let constellation = Constellation::new(sats_per_orbit, orbits, inclination_deg, elevation_m, shift_algo);
    let offset = EpochOffset {
        hours: run.i64("lsn", "hrs").unwrap_or(0),
        minutes: run.i64("lsn", "mins").unwrap_or(0),
        seconds: run.i64("lsn", "secs").unwrap_or(0),
        millis: run.i64("lsn", "millis").unwrap_or(0),
    };
    let sat_pos = constellation.positions_at_offset(offset);

    // The default +grid ISL motif: within-orbit successor and cross-orbit peer.
    let motif = vec![(1, 0), (0, 1)];
    let isls = icarus_geometry::orbit::generate_isls(&sat_pos, sats_per_orbit, orbits, max_shift_deg, &motif);

    Ok((sat_pos, isls))
}
