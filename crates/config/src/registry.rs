//! Strategy registry: resolves the string tags recognized by each
//! configuration phase key (SPEC_FULL.md §6) into a concrete boxed strategy.
//!
//! Grounded on the donor's `Location` enum in
//! `crates/evaluation/src/lib.rs` (`strum::EnumString`/`strum::Display`
//! mapping a short string tag to a concrete variant); here each phase key
//! maps to its own small `EnumString` tag enum instead of one shared enum,
//! since every strategy trait in this workspace lives in its own crate.

use std::collections::HashSet;

use icarus_attack::direction::{DirectionalFilterStrat, FilterStrategy};
use icarus_attack::feasibility::{FeasibilityStrategy, LpFeasStrat, ProbFeasStrat};
use icarus_attack::geo_constraint::{GeoConstrStrat, GeoConstraintStrategy, GridConstrStrat, NoConstrStrat};
use icarus_attack::optim::{BinSearchOptimStrat, OptimStrategy};
use icarus_attack::zone::{
    BottleneckStrategy, DwlZoneStrat, GreedySetCoverBneckStrat, IslZoneStrat, KClosestZoneStrat,
    RandZoneSelectStrat, ZoneBuildStrategy, ZoneEdgeStrategy, ZoneSelectStrategy,
};
use icarus_edges::strategy::{BidirEdgeStrat, EdgeStrategy};
use icarus_geometry::coverage::{AngleCovStrat, CoverageStrategy};
use icarus_geometry::orbit::{NoShift, OrbitShiftAlgo, SimpleShift, WalkerShift};
use icarus_geometry::weight::{GdpCell, GdpWeightStrat, UniformWeightStrat, WeightStrategy};
use icarus_routing::strategy::{KdgRoutStrat, KloRoutStrat, KspRoutStrat, RoutingStrategy, SspRoutStrat};
use icarus_traffic::strategy::{
    BidirBwAssignStrat, BwAssignStrategy, BwSelectStrategy, SampledBwSelectStrat,
};
use strum::EnumString;

use crate::schema::RunConfig;

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum OrbitShiftTag {
    None,
    Simple,
    Walker,
}

/// Resolves the `lsn` phase key's `strategy` parameter (orbit-shift
/// algorithm). Unlike the capability traits above, [`OrbitShiftAlgo`] has
/// no `Strategy` supertrait (it has no configurable parameter description
/// worth recording in a cache key, since the constellation geometry itself
/// already appears in the `lsn` phase description built by the caller).
pub fn orbit_shift_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn OrbitShiftAlgo>> {
    let tag: OrbitShiftTag = run.str("lsn", "strategy")?.parse()?;
    Ok(match tag {
        OrbitShiftTag::None => Box::new(NoShift),
        OrbitShiftTag::Simple => Box::new(SimpleShift { sats_per_orbit: run.usize("lsn", "sats_per_orbit")? as u32 }),
        OrbitShiftTag::Walker => Box::new(WalkerShift::new(
            run.usize("lsn", "sats_per_orbit")? as u32,
            run.usize("lsn", "orbits")? as u32,
            run.usize("lsn", "F")? as u32,
        )),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum WeightTag {
    Uni,
    Gdp,
}

/// Resolves the `gweight` phase key. `Gdp` needs a pre-extracted raster
/// and is therefore built from cells passed in directly rather than from
/// `RunConfig`, mirroring how [`GdpWeightStrat`] takes `cells` instead of a
/// file path (SPEC_FULL.md §4.C: the raster itself is an external input).
pub fn weight_strategy(run: &RunConfig, gdp_cells: &[GdpCell]) -> color_eyre::Result<Box<dyn WeightStrategy>> {
    let tag: WeightTag = run.str("gweight", "strategy")?.parse()?;
    Ok(match tag {
        WeightTag::Uni => Box::new(UniformWeightStrat),
        WeightTag::Gdp => Box::new(GdpWeightStrat { cells: gdp_cells.to_vec() }),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum CoverTag {
    Ang,
}

pub fn coverage_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn CoverageStrategy>> {
    let tag: CoverTag = run.str("cover", "strategy")?.parse()?;
    Ok(match tag {
        CoverTag::Ang => Box::new(AngleCovStrat {
            min_elev_angle_deg: run.f64("cover", "min_elev_angle")?,
        }),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum RoutTag {
    Ssp,
    Ksp,
    Kdg,
    Klo,
}

pub fn routing_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn RoutingStrategy>> {
    let tag: RoutTag = run.str("rout", "strategy")?.parse()?;
    let stretch = run.f64("rout", "desirability_stretch")?;
    Ok(match tag {
        RoutTag::Ssp => Box::new(SspRoutStrat { stretch }),
        RoutTag::Ksp => Box::new(KspRoutStrat { stretch, k: run.usize("rout", "k")? }),
        RoutTag::Kdg => Box::new(KdgRoutStrat { stretch, k: run.usize("rout", "k")? }),
        RoutTag::Klo => Box::new(KloRoutStrat {
            stretch,
            k: run.usize("rout", "k")?,
            esx_theta: run.f64("rout", "esx_theta")?,
        }),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum EdgeTag {
    Bidir,
}

pub fn edge_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn EdgeStrategy>> {
    let tag: EdgeTag = run.str("edges", "strategy")?.parse()?;
    Ok(match tag {
        EdgeTag::Bidir => Box::new(BidirEdgeStrat),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum BwSelectTag {
    Sampled,
}

pub fn bw_select_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn BwSelectStrategy>> {
    let tag: BwSelectTag = run.str("bw_sel", "strategy")?.parse()?;
    Ok(match tag {
        BwSelectTag::Sampled => Box::new(SampledBwSelectStrat { quanta: run.usize("bw_sel", "sampled_quanta")? }),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum BwAssignTag {
    Bidir,
}

pub fn bw_assign_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn BwAssignStrategy>> {
    let tag: BwAssignTag = run.str("bw_asg", "strategy")?.parse()?;
    Ok(match tag {
        BwAssignTag::Bidir => Box::new(BidirBwAssignStrat {
            isl_bw: run.i64("bw_asg", "isl_bw")?,
            udl_bw: run.i64("bw_asg", "udl_bw")?,
            utilisation: run.f64("bw_asg", "utilisation")?,
        }),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum FilterTag {
    Dir,
}

pub fn filter_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn FilterStrategy>> {
    let tag: FilterTag = run.str("atk_filt", "strategy")?.parse()?;
    Ok(match tag {
        FilterTag::Dir => Box::new(DirectionalFilterStrat),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum FeasTag {
    Lp,
    Prob,
}

pub fn feasibility_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn FeasibilityStrategy>> {
    let tag: FeasTag = run.str("atk_feas", "strategy")?.parse()?;
    Ok(match tag {
        FeasTag::Lp => Box::new(LpFeasStrat),
        FeasTag::Prob => Box::new(ProbFeasStrat { beta: run.f64("atk_feas", "beta")? }),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum OptimTag {
    Bin,
}

pub fn optim_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn OptimStrategy>> {
    let tag: OptimTag = run.str("atk_optim", "strategy")?.parse()?;
    Ok(match tag {
        OptimTag::Bin => Box::new(BinSearchOptimStrat { rate: run.f64("atk_optim", "rate")? }),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum GeoConstrTag {
    None,
    Grid,
    Geo,
}

/// Resolves the `atk_constr` phase key. `Geo` needs a parsed GeoJSON
/// document and country name set, supplied by the caller rather than
/// carried in `RunConfig` (the document is typically tens of megabytes and
/// is loaded once per process, not once per run).
pub fn geo_constraint_strategy(
    run: &RunConfig,
    geojson: Option<&serde_json::Value>,
) -> color_eyre::Result<Box<dyn GeoConstraintStrategy>> {
    let tag: GeoConstrTag = run.str("atk_constr", "strategy")?.parse()?;
    Ok(match tag {
        GeoConstrTag::None => Box::new(NoConstrStrat),
        GeoConstrTag::Grid => {
            let ids: Vec<u32> = run
                .get("atk_constr", "grid_points")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_u64()).map(|v| v as u32).collect())
                .unwrap_or_default();
            Box::new(GridConstrStrat { grid_points: ids.into_iter().collect() })
        }
        GeoConstrTag::Geo => {
            let names: HashSet<String> = run
                .get("atk_constr", "geo_names")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
                .unwrap_or_default();
            match geojson {
                Some(doc) => Box::new(GeoConstrStrat::from_geojson(doc, &names)),
                None => Box::new(NoConstrStrat),
            }
        }
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum ZoneSelectTag {
    Rand,
}

pub fn zone_select_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn ZoneSelectStrategy>> {
    let tag: ZoneSelectTag = run.str("zone_select", "strategy")?.parse()?;
    Ok(match tag {
        ZoneSelectTag::Rand => Box::new(RandZoneSelectStrat { samples: run.usize("zone_select", "samples")? }),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum ZoneBuildTag {
    Kclosest,
}

pub fn zone_build_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn ZoneBuildStrategy>> {
    let tag: ZoneBuildTag = run.str("zone_build", "strategy")?.parse()?;
    Ok(match tag {
        ZoneBuildTag::Kclosest => Box::new(KClosestZoneStrat { size: run.usize("zone_build", "size")? }),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum ZoneEdgeTag {
    Isl,
    Dwl,
}

pub fn zone_edge_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn ZoneEdgeStrategy>> {
    let tag: ZoneEdgeTag = run.str("zone_edges", "strategy")?.parse()?;
    Ok(match tag {
        ZoneEdgeTag::Isl => Box::new(IslZoneStrat),
        ZoneEdgeTag::Dwl => Box::new(DwlZoneStrat),
    })
}

#[derive(Debug, EnumString)]
#[strum(serialize_all = "lowercase")]
enum ZoneBneckTag {
    Greedy,
}

pub fn zone_bottleneck_strategy(run: &RunConfig) -> color_eyre::Result<Box<dyn BottleneckStrategy>> {
    let tag: ZoneBneckTag = run.str("zone_bneck", "strategy")?.parse()?;
    Ok(match tag {
        ZoneBneckTag::Greedy => Box::new(GreedySetCoverBneckStrat),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{expand_configs, RawConfig, RawPhaseConfig};
    use icarus_core::strategy::Strategy;
    use serde_json::json;
    use std::collections::HashMap;

    fn run_with(phase: &str, params: Vec<(&str, serde_json::Value)>) -> RunConfig {
        let mut phases = RawPhaseConfig::new();
        let mut p = HashMap::new();
        for (k, v) in params {
            p.insert(k.to_string(), vec![v]);
        }
        phases.insert(phase.to_string(), p);
        expand_configs(&RawConfig(phases)).remove(0)
    }

    #[test]
    fn routing_strategy_resolves_ssp_tag() {
        let run = run_with(
            "rout",
            vec![("strategy", json!("ssp")), ("desirability_stretch", json!(1.3))],
        );
        let strat = routing_strategy(&run).unwrap();
        assert_eq!(strat.name(), "ssp");
    }

    #[test]
    fn routing_strategy_rejects_unknown_tag() {
        let run = run_with("rout", vec![("strategy", json!("bogus")), ("desirability_stretch", json!(1.0))]);
        assert!(routing_strategy(&run).is_err());
    }

    #[test]
    fn geo_constraint_none_needs_no_geojson() {
        let run = run_with("atk_constr", vec![("strategy", json!("none"))]);
        let strat = geo_constraint_strategy(&run, None).unwrap();
        assert_eq!(strat.name(), "none");
    }

    #[test]
    fn orbit_shift_resolves_walker_tag() {
        let run = run_with(
            "lsn",
            vec![
                ("strategy", json!("walker")),
                ("sats_per_orbit", json!(4)),
                ("orbits", json!(3)),
                ("F", json!(1)),
            ],
        );
        assert!(orbit_shift_strategy(&run).is_ok());
    }

    #[test]
    fn zone_bneck_resolves_greedy_tag() {
        let run = run_with("zone_bneck", vec![("strategy", json!("greedy"))]);
        let strat = zone_bottleneck_strategy(&run).unwrap();
        assert_eq!(strat.name(), "greedy");
    }
}
