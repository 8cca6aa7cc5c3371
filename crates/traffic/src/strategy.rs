//! Traffic allocator (component F): weighted random sd-pair selection, then
//! greedy per-edge-capacity-respecting sequential flow assignment.
//!
//! Grounded on `strategies/bw_selection/sampled_bw_select_strat.py` and
//! `strategies/bw_assignment/bidir_bw_assign_strat.py`.

use icarus_core::rng::rng_from_seed_str;
use icarus_core::types::{path_edges, BwData, BwInfo, Edge, GridPos, IslInfo, PathData, PathId, SatPos};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub trait BwSelectStrategy: icarus_core::strategy::Strategy {
    fn select(&self, grid_pos: &GridPos, path_data: &PathData) -> Vec<PathId>;
}

/// Draws `2 * quanta` ground ids weighted by population, pairs them up,
/// drops pairs with no routed path, and picks one path uniformly at random
/// per surviving pair.
pub struct SampledBwSelectStrat {
    pub quanta: usize,
}
impl icarus_core::strategy::Strategy for SampledBwSelectStrat {
    fn name(&self) -> &'static str {
        "sampled"
    }
    fn param_description(&self) -> String {
        format!("{}", self.quanta)
    }
}
impl BwSelectStrategy for SampledBwSelectStrat {
    fn select(&self, grid_pos: &GridPos, path_data: &PathData) -> Vec<PathId> {
        let mut rng: ChaCha8Rng = rng_from_seed_str("ARN-traffic-selection");
        let ids: Vec<_> = grid_pos.keys().copied().collect();
        if ids.is_empty() {
            return Vec::new();
        }
        let weights: Vec<f64> = ids.iter().map(|id| grid_pos[id].weight.max(1e-12)).collect();
        let dist = match WeightedIndex::new(&weights) {
            Ok(d) => d,
            Err(_) => return Vec::new(),
        };

        let mut selected = Vec::with_capacity(self.quanta);
        for _ in 0..self.quanta {
            let a = ids[dist.sample(&mut rng)];
            let b = ids[dist.sample(&mut rng)];
            if a == b {
                continue;
            }
            let ((src, dst), _) = icarus_core::types::ordered_idx(a, b);
            let Some(lb_set) = path_data.get(&(src, dst)) else {
                continue;
            };
            if lb_set.is_empty() {
                continue;
            }
            let idx = rng.gen_range(0..lb_set.len());
            selected.push((src, dst, idx));
        }
        selected
    }
}

pub trait BwAssignStrategy: icarus_core::strategy::Strategy {
    fn assign(&self, selection: &[PathId], path_data: &PathData, sat_pos: &SatPos, isls: &[IslInfo]) -> BwData;
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

/// Initializes every ISL edge at `isl_bw` and every uplink/downlink stub at
/// `udl_bw`, then commits each selected path's unit of traffic to both
/// directions of its hops only if doing so keeps every hop within
/// `capacity * utilisation`.
pub struct BidirBwAssignStrat {
    pub isl_bw: i64,
    pub udl_bw: i64,
    pub utilisation: f64,
}
impl icarus_core::strategy::Strategy for BidirBwAssignStrat {
    fn name(&self) -> &'static str {
        "bidir"
    }
    fn param_description(&self) -> String {
        format!("{}-{}-{}", self.isl_bw, self.udl_bw, self.utilisation)
    }
}
impl BwAssignStrategy for BidirBwAssignStrat {
    fn assign(&self, selection: &[PathId], path_data: &PathData, sat_pos: &SatPos, isls: &[IslInfo]) -> BwData {
        let mut bw: BwData = BwData::new();
        for isl in isls {
            let a = isl.sat1 as i64;
            let b = isl.sat2 as i64;
            bw.insert((a, b), BwInfo { idle_bw: 0, capacity: self.isl_bw });
            bw.insert((b, a), BwInfo { idle_bw: 0, capacity: self.isl_bw });
        }
        for &sat in sat_pos.keys() {
            let s = sat as i64;
            bw.insert((GROUND_SENTINEL, s), BwInfo { idle_bw: 0, capacity: self.udl_bw });
            bw.insert((s, GROUND_SENTINEL), BwInfo { idle_bw: 0, capacity: self.udl_bw });
        }

        for &(src, dst, idx) in selection {
            let Some(lb_set) = path_data.get(&(src, dst)) else {
                continue;
            };
            let Some((path, _)) = lb_set.get(idx) else {
                continue;
            };
            let normalized = normalize(path);
            let edges: Vec<Edge> = path_edges(&normalized, 0, 0);
            if edges.is_empty() {
                continue;
            }
            let fits = edges.iter().all(|&(u, v)| {
                bw.get(&(u, v))
                    .map(|info| {
                        let limit = (info.capacity as f64 * self.utilisation).floor() as i64;
                        info.idle_bw + 1 <= limit
                    })
                    .unwrap_or(false)
            });
            if !fits {
                continue;
            }
            for &(u, v) in &edges {
                if let Some(info) = bw.get_mut(&(u, v)) {
                    info.idle_bw += 1;
                }
                if let Some(info) = bw.get_mut(&(v, u)) {
                    info.idle_bw += 1;
                }
            }
        }
        bw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icarus_core::types::{GeoPoint, GridPoint};

    fn grid() -> GridPos {
        let mut g = GridPos::new();
        g.insert(10, GridPoint { lat: 0.0, lon: 0.0, elev: 0.0, weight: 1.0, surface: 1.0 });
        g.insert(20, GridPoint { lat: 1.0, lon: 1.0, elev: 0.0, weight: 1.0, surface: 1.0 });
        g
    }

    #[test]
    fn selection_drops_pairs_with_no_path() {
        let strat = SampledBwSelectStrat { quanta: 20 };
        let selected = strat.select(&grid(), &PathData::new());
        assert!(selected.is_empty());
    }

    #[test]
    fn selection_picks_valid_path_ids() {
        let mut path_data = PathData::new();
        path_data.insert((10, 20), vec![(vec![-10, 0, -20], 2.0)]);
        let strat = SampledBwSelectStrat { quanta: 20 };
        let selected = strat.select(&grid(), &path_data);
        assert!(selected.iter().all(|&(s, d, i)| s == 10 && d == 20 && i == 0));
    }

    #[test]
    fn assignment_respects_utilisation_cap() {
        let sat_pos: SatPos = [(0u32, GeoPoint { lat: 0.0, lon: 0.0, elev: 550_000.0 })].into_iter().collect();
        let isls: Vec<IslInfo> = Vec::new();
        let mut path_data = PathData::new();
        path_data.insert((10, 20), vec![(vec![-10, 0, -20], 2.0)]);
        let selection = vec![(10, 20, 0); 10];
        let strat = BidirBwAssignStrat { isl_bw: 100, udl_bw: 2, utilisation: 1.0 };
        let bw = strat.assign(&selection, &path_data, &sat_pos, &isls);
        assert!(bw[&(-1, 0)].idle_bw <= 2);
        assert_eq!(bw[&(-1, 0)].idle_bw, bw[&(0, -1)].idle_bw);
    }
}
