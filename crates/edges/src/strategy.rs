//! Edge aggregation strategy (component E): inverts `PathData` into
//! per-edge indices (paths-through, centrality, coverage weight).
//!
//! Grounded on `strategies/edges/bidir_edge_strat.py`.

use icarus_core::types::{path_edges, Edge, EdgeData, EdgeInfo, GridId, GridPos, IslInfo, PathData, SatPos};
use std::collections::{HashMap, HashSet};

pub trait EdgeStrategy: icarus_core::strategy::Strategy {
    fn compute(&self, path_data: &PathData, grid_pos: &GridPos, sat_pos: &SatPos, isls: &[IslInfo]) -> EdgeData;
}

/// Per-edge accumulator built while folding over every path; `source_gridpoints`
/// feeds `cov_centr` at the end of reduction but is not itself persisted.
#[derive(Default, Clone)]
struct EdgeAcc {
    paths_through: Vec<(GridId, GridId, usize)>,
    centrality: f64,
    source_gridpoints: HashSet<GridId>,
}

/// Normalizes each path's ground endpoints to the generic `-1` sentinel
/// before folding its hops into the shared edge index, so uplink/downlink
/// capacity is tracked once per satellite rather than once per ground point.
pub struct BidirEdgeStrat;
impl icarus_core::strategy::Strategy for BidirEdgeStrat {
    fn name(&self) -> &'static str {
        "bidir"
    }
}

const GROUND_SENTINEL: i64 = -1;

fn normalize(path: &[i64]) -> Vec<i64> {
    let mut out = path.to_vec();
    if let Some(first) = out.first_mut() {
        *first = GROUND_SENTINEL;
    }
    if let Some(last) = out.last_mut() {
        *last = GROUND_SENTINEL;
    }
    out
}

impl EdgeStrategy for BidirEdgeStrat {
    fn compute(&self, path_data: &PathData, grid_pos: &GridPos, sat_pos: &SatPos, isls: &[IslInfo]) -> EdgeData {
        let mut acc: HashMap<Edge, EdgeAcc> = HashMap::new();
        let total_paths: usize = path_data.values().map(|lb| lb.len()).sum();

        for (&(src, dst), lb_set) in path_data {
            for (idx, (path, _)) in lb_set.iter().enumerate() {
                let path_id = (src, dst, idx);
                let normalized = normalize(path);
                for edge in path_edges(&normalized, 0, 0) {
                    let (u, v) = edge;
                    acc.entry((u, v)).or_default().paths_through.push(path_id);
                    acc.entry((u, v)).or_default().centrality += 1.0;
                    acc.entry((v, u)).or_default().centrality += 1.0;
                    acc.entry((u, v)).or_default().source_gridpoints.insert(src);
                    acc.entry((v, u)).or_default().source_gridpoints.insert(dst);
                }
            }
        }

        let mut edge_data: EdgeData = HashMap::new();
        for (edge, entry) in acc {
            let cov_centr: f64 = entry
                .source_gridpoints
                .iter()
                .filter_map(|g| grid_pos.get(g))
                .map(|p| p.surface)
                .sum();
            // Normalized by the distinct path count (`edge_phase.py:89`), not
            // the hop count: since every hop bumps both the edge and its
            // reverse, this yields twice the per-edge centrality a
            // unidirectional count would (SPEC_FULL.md §9 Open Question) —
            // an intentional both-directions convention, not an error.
            let centrality = if total_paths > 0 {
                entry.centrality / total_paths as f64
            } else {
                0.0
            };
            edge_data.insert(
                edge,
                EdgeInfo {
                    paths_through: entry.paths_through,
                    centrality,
                    cov_centr,
                },
            );
        }

        ensure_defaults(&mut edge_data, sat_pos, isls);
        edge_data
    }
}

/// Ensures every ISL direction and every `-1 <-> sat` stub exists, even when
/// no path ever touched it (invariant I1).
fn ensure_defaults(edge_data: &mut EdgeData, sat_pos: &SatPos, isls: &[IslInfo]) {
    for isl in isls {
        let a = isl.sat1 as i64;
        let b = isl.sat2 as i64;
        edge_data.entry((a, b)).or_default();
        edge_data.entry((b, a)).or_default();
    }
    for &sat in sat_pos.keys() {
        let s = sat as i64;
        edge_data.entry((GROUND_SENTINEL, s)).or_default();
        edge_data.entry((s, GROUND_SENTINEL)).or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icarus_core::types::GridPoint;

    fn grid() -> GridPos {
        let mut g = GridPos::new();
        g.insert(10, GridPoint { lat: 0.0, lon: 0.0, elev: 0.0, weight: 1.0, surface: 5.0 });
        g.insert(20, GridPoint { lat: 1.0, lon: 1.0, elev: 0.0, weight: 1.0, surface: 7.0 });
        g
    }

    #[test]
    fn every_isl_and_stub_gets_a_default_entry() {
        let sat_pos: SatPos = [(0u32, icarus_core::types::GeoPoint { lat: 0.0, lon: 0.0, elev: 550_000.0 })]
            .into_iter()
            .collect();
        let isls = vec![IslInfo { sat1: 0, sat2: 1, length: 1.0 }];
        let path_data = PathData::new();
        let strat = BidirEdgeStrat;
        let edges = strat.compute(&path_data, &grid(), &sat_pos, &isls);
        assert!(edges.contains_key(&(0, 1)));
        assert!(edges.contains_key(&(1, 0)));
        assert!(edges.contains_key(&(-1, 0)));
        assert!(edges.contains_key(&(0, -1)));
    }

    #[test]
    fn centrality_is_normalized_by_distinct_path_count() {
        let sat_pos: SatPos = [
            (0u32, icarus_core::types::GeoPoint { lat: 0.0, lon: 0.0, elev: 550_000.0 }),
            (1u32, icarus_core::types::GeoPoint { lat: 1.0, lon: 1.0, elev: 550_000.0 }),
        ]
        .into_iter()
        .collect();
        let isls = vec![IslInfo { sat1: 0, sat2: 1, length: 1.0 }];
        let mut path_data = PathData::new();
        // One distinct path, 3 hops: (-1,0), (0,1), (1,-1). Each hop bumps
        // both the edge and its reverse by 1.0, so with a single distinct
        // path every traversed direction ends up at centrality 1.0 and the
        // sum across all 6 touched directed edges is 2 * hop_count.
        path_data.insert((10, 20), vec![(vec![-10, 0, 1, -20], 3.0)]);
        let strat = BidirEdgeStrat;
        let edges = strat.compute(&path_data, &grid(), &sat_pos, &isls);
        for edge in [(-1, 0), (0, -1), (0, 1), (1, 0), (1, -1), (-1, 1)] {
            assert!((edges[&edge].centrality - 1.0).abs() < 1e-9, "edge {edge:?}");
        }
        let src_edge = &edges[&(-1, 0)];
        assert_eq!(src_edge.paths_through, vec![(10, 20, 0)]);
        assert!(src_edge.cov_centr > 0.0);
    }
}
