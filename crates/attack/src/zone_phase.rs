//! Zone Attack Engine phase (component H, SPEC_FULL.md §4.H): samples pairs
//! of ground zones, concatenates the cross-zone routed traffic between them,
//! and enumerates cut sets that a botnet could flood to sever every
//! cross-zone path, reusing the link attack pipeline (§4.G) per candidate cut.
//!
//! Grounded on `phases/zone_atk_phase.py`.

use std::collections::HashSet;

use icarus_core::coords::great_circle_m;
use icarus_core::phase::Phase;
use icarus_core::types::{
    AttackData, BwData, Edge, EdgeData, GridPos, Path, PathData, ZoneAttackData, ZoneAttackInfo,
    ZoneKey,
};
use icarus_core::Result;

use crate::direction::FilterStrategy;
use crate::feasibility::FeasibilityStrategy;
use crate::geo_constraint::GeoConstraintStrategy;
use crate::link_phase::{attack_edge_set, LinkAttackParams};
use crate::optim::OptimStrategy;
use crate::zone::{candidate_cut_edges, zones_intersect, BottleneckStrategy, ZoneBuildStrategy, ZoneEdgeStrategy, ZoneSelectStrategy};

pub struct ZoneAttackProps {
    pub edge_data: EdgeData,
    pub path_data: PathData,
    pub bw_data: BwData,
    pub grid_pos: GridPos,
    pub attack_data: AttackData,
    pub zone_attack_data: ZoneAttackData,
}

pub struct ZoneAttackPhase {
    pub select: Box<dyn ZoneSelectStrategy>,
    pub build: Box<dyn ZoneBuildStrategy>,
    pub edge_strategy: Box<dyn ZoneEdgeStrategy>,
    pub bottleneck: Box<dyn BottleneckStrategy>,
    pub filter: Box<dyn FilterStrategy>,
    pub feasibility: Box<dyn FeasibilityStrategy>,
    pub optim: Box<dyn OptimStrategy>,
    pub geo_constraint: Box<dyn GeoConstraintStrategy>,
    pub uplink_capacity_max: i64,
    pub read_persist: bool,
    pub persist: bool,
}

impl Phase<ZoneAttackProps> for ZoneAttackPhase {
    type Output = ZoneAttackData;

    fn name(&self) -> &str {
        "zone_attack"
    }

    fn description(&self) -> String {
        format!(
            "zone_attack::{}+{}+{}+{}+{}+{}+{}+{}+{}",
            self.select.description(),
            self.build.description(),
            self.edge_strategy.description(),
            self.bottleneck.description(),
            self.filter.description(),
            self.feasibility.description(),
            self.optim.description(),
            self.geo_constraint.description(),
            self.uplink_capacity_max
        )
    }

    fn input_properties(&self) -> Vec<&'static str> {
        vec!["edge_data", "path_data", "bw_data", "grid_pos", "attack_data"]
    }

    fn output_properties(&self) -> Vec<&'static str> {
        vec!["zone_attack_data"]
    }

    fn read_persist(&self) -> bool {
        self.read_persist
    }

    fn persist(&self) -> bool {
        self.persist
    }

    fn compute(&self, props: &mut ZoneAttackProps) -> Result<()> {
        let allowed_sources = self.geo_constraint.allowed_sources(&props.grid_pos);
        let candidates = self.select.select(&props.grid_pos);

        let mut zone_attack_data = ZoneAttackData::new();

        for (c1, c2) in candidates {
            let zone1 = self.build.build(&props.grid_pos, c1);
            let zone2 = self.build.build(&props.grid_pos, c2);
            if zone1.is_empty() || zone2.is_empty() || zones_intersect(&zone1, &zone2) {
                continue;
            }

            let mut key1: ZoneKey = zone1.clone();
            let mut key2: ZoneKey = zone2.clone();
            key1.sort_unstable();
            key2.sort_unstable();
            let (key1, key2) = if key1 <= key2 { (key1, key2) } else { (key2, key1) };
            if zone_attack_data.contains_key(&(key1.clone(), key2.clone())) {
                continue;
            }

            let cross_zone_paths = collect_cross_zone_paths(&zone1, &zone2, &props.path_data);
            if cross_zone_paths.is_empty() {
                zone_attack_data.insert((key1, key2), None);
                continue;
            }

            let path_edge_data = candidate_cut_edges(
                &cross_zone_paths,
                self.edge_strategy.as_ref(),
                &props.attack_data,
            );
            let all_covered: HashSet<usize> = path_edge_data.values().flatten().copied().collect();
            if all_covered.len() < cross_zone_paths.len() {
                // No set of individually-attackable edges covers every
                // cross-zone path: this zone pair cannot be severed.
                zone_attack_data.insert((key1, key2), None);
                continue;
            }

            let cuts = self
                .bottleneck
                .enumerate(&path_edge_data, &props.attack_data, cross_zone_paths.len());

            let params = LinkAttackParams {
                edge_data: &props.edge_data,
                path_data: &props.path_data,
                bw_data: &props.bw_data,
                allowed_sources: &allowed_sources,
                filter: self.filter.as_ref(),
                feasibility: self.feasibility.as_ref(),
                optim: self.optim.as_ref(),
                uplink_capacity_max: self.uplink_capacity_max,
            };

            let mut best: Option<(Vec<Edge>, icarus_core::types::AttackInfo)> = None;
            for cut in cuts {
                if cut.is_empty() {
                    continue;
                }
                if let Some(info) = attack_edge_set(&cut, &params) {
                    let better = match &best {
                        None => true,
                        Some((_, cur)) => {
                            (info.detectability, info.flows_on_trg) < (cur.detectability, cur.flows_on_trg)
                        }
                    };
                    if better {
                        best = Some((cut, info));
                    }
                }
            }

            let distance = zone_min_distance(&zone1, &zone2, &props.grid_pos);
            let result = best.map(|(bottlenecks, base)| ZoneAttackInfo {
                base,
                cross_zone_paths: cross_zone_paths.clone(),
                bottlenecks,
                distance,
            });
            zone_attack_data.insert((key1, key2), result);
        }

        props.zone_attack_data = zone_attack_data;
        Ok(())
    }

    fn check_result(&self, props: &ZoneAttackProps) -> Result<()> {
        use color_eyre::eyre::ensure;
        for info in props.zone_attack_data.values().flatten() {
            ensure!(!info.bottlenecks.is_empty(), "a successful zone attack must name its bottlenecks");
            ensure!(!info.cross_zone_paths.is_empty(), "a successful zone attack must carry the paths it severs");
        }
        Ok(())
    }

    fn get_output(&self, props: &ZoneAttackProps) -> ZoneAttackData {
        props.zone_attack_data.clone()
    }

    fn set_output(&self, props: &mut ZoneAttackProps, output: ZoneAttackData) {
        props.zone_attack_data = output;
    }
}

/// Every routed path with one endpoint's ground id in `zone1` and the other
/// in `zone2`, deduplicated by node sequence (SPEC_FULL.md §4.H step 3).
fn collect_cross_zone_paths(
    zone1: &[u32],
    zone2: &[u32],
    path_data: &PathData,
) -> Vec<Path> {
    let set1: HashSet<u32> = zone1.iter().copied().collect();
    let set2: HashSet<u32> = zone2.iter().copied().collect();
    let mut seen: HashSet<Path> = HashSet::new();
    let mut out = Vec::new();

    for (&(src, dst), lbset) in path_data {
        let crosses = (set1.contains(&src) && set2.contains(&dst)) || (set2.contains(&src) && set1.contains(&dst));
        if !crosses {
            continue;
        }
        for (path, _) in lbset {
            if seen.insert(path.clone()) {
                out.push(path.clone());
            }
        }
    }
    out
}

/// Minimum great-circle distance between any point of `zone1` and any point
/// of `zone2` (SPEC_FULL.md §4.H step 7).
fn zone_min_distance(zone1: &[u32], zone2: &[u32], grid_pos: &GridPos) -> f64 {
    let mut min = f64::INFINITY;
    for g1 in zone1 {
        let Some(p1) = grid_pos.get(g1) else { continue };
        let p1 = p1.geo();
        for g2 in zone2 {
            let Some(p2) = grid_pos.get(g2) else { continue };
            let d = great_circle_m(&p1, &p2.geo());
            if d < min {
                min = d;
            }
        }
    }
    if min.is_finite() {
        min
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_cross_zone_paths_keeps_only_matching_pairs() {
        let mut path_data = PathData::new();
        path_data.insert((1, 2), vec![(vec![-1, 0, -2], 1.0)]);
        path_data.insert((3, 4), vec![(vec![-3, 0, -4], 1.0)]);
        let zone1 = vec![1u32];
        let zone2 = vec![2u32];
        let paths = collect_cross_zone_paths(&zone1, &zone2, &path_data);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0], vec![-1, 0, -2]);
    }

    #[test]
    fn collect_cross_zone_paths_dedups_identical_routes() {
        let mut path_data = PathData::new();
        path_data.insert((1, 2), vec![(vec![-1, 0, -2], 1.0), (vec![-1, 0, -2], 1.0)]);
        let paths = collect_cross_zone_paths(&[1], &[2], &path_data);
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn zone_min_distance_is_zero_for_coincident_zones() {
        let mut grid = GridPos::new();
        grid.insert(1, icarus_core::types::GridPoint { lat: 10.0, lon: 10.0, elev: 0.0, weight: 1.0, surface: 1.0 });
        let d = zone_min_distance(&[1], &[1], &grid);
        assert!(d < 1e-6);
    }
}
