//! Path filtering / direction synthesis (SPEC_FULL.md §4.G.1).
//!
//! Grounded on `strategies/atk_path_filtering/directional_filtering_strat.py`.
//! Turns routed `PathData` plus a set of target edges into `DirectionData`:
//! a mapping from a truncated path prefix ("direction") to the list of
//! ground pairs whose routed traffic realizes that direction, so the LP
//! feasibility engine (§4.G.2) can assign flow per-direction instead of
//! per-source.

use std::collections::{HashMap, HashSet};

use icarus_core::types::{Edge, EdgeData, GridId, NodeId, Path, PathData, PathId, SdPair};

pub const GROUND_SENTINEL: NodeId = -1;

/// A truncated path prefix: starts with the generic ground sentinel `-1`,
/// ends with the target edge's head (a satellite id, or `-1` again if the
/// target is a downlink stub).
pub type Direction = Path;

/// `direction -> list of originating (src, dst) pairs` (duplicates carry
/// probability mass: the more routed pairs realize a direction, the more
/// likely a botnet host lands on it).
pub type DirectionData = HashMap<Direction, Vec<SdPair>>;

pub trait FilterStrategy: icarus_core::strategy::Strategy {
    fn compute(
        &self,
        targets: &[Edge],
        edge_data: &EdgeData,
        path_data: &PathData,
        allowed_sources: &HashSet<GridId>,
    ) -> DirectionData;
}

/// The only filtering strategy in scope: directional truncation with
/// geographic source masking.
pub struct DirectionalFilterStrat;
impl icarus_core::strategy::Strategy for DirectionalFilterStrat {
    fn name(&self) -> &'static str {
        "dir"
    }
}

fn lookup_path(path_data: &PathData, pid: &PathId) -> Option<&(Path, f64)> {
    let (src, dst, idx) = *pid;
    path_data.get(&(src, dst)).and_then(|lb| lb.get(idx))
}

/// Find the first hop `(u, v)` in `path` and return the index of `u`.
fn find_hop(path: &[NodeId], u: NodeId, v: NodeId) -> Option<usize> {
    path.windows(2).position(|w| w[0] == u && w[1] == v)
}

impl FilterStrategy for DirectionalFilterStrat {
    fn compute(
        &self,
        targets: &[Edge],
        edge_data: &EdgeData,
        path_data: &PathData,
        allowed_sources: &HashSet<GridId>,
    ) -> DirectionData {
        let mut directions: DirectionData = DirectionData::new();

        for &(u, v) in targets {
            let forward: HashSet<PathId> = edge_data
                .get(&(u, v))
                .map(|info| info.paths_through.iter().copied().collect())
                .unwrap_or_default();
            let backward: HashSet<PathId> = edge_data
                .get(&(v, u))
                .map(|info| info.paths_through.iter().copied().collect())
                .unwrap_or_default();

            for &pid in &forward {
                self.process_one(pid, false, u, v, path_data, allowed_sources, &mut directions);
            }
            for &pid in backward.difference(&forward) {
                self.process_one(pid, true, u, v, path_data, allowed_sources, &mut directions);
            }
        }

        directions
    }
}

impl DirectionalFilterStrat {
    #[allow(clippy::too_many_arguments)]
    fn process_one(
        &self,
        pid: PathId,
        reversed: bool,
        u: NodeId,
        v: NodeId,
        path_data: &PathData,
        allowed_sources: &HashSet<GridId>,
        out: &mut DirectionData,
    ) {
        let Some((stored_path, _)) = lookup_path(path_data, &pid) else {
            return;
        };
        let mut working: Path = stored_path.clone();
        if reversed {
            working.reverse();
        }

        let Some(first) = working.first().copied() else {
            return;
        };
        let source_ground = (-first) as GridId;
        if !allowed_sources.contains(&source_ground) {
            return;
        }

        let Some(hop_idx) = find_hop(&working, u, v) else {
            return;
        };
        let mut truncated: Direction = working[..=hop_idx + 1].to_vec();
        truncated[0] = GROUND_SENTINEL;

        let (src, dst, _) = pid;
        out.entry(truncated)
            .or_default()
            .push(if reversed { (dst, src) } else { (src, dst) });
    }
}

/// Every hop (consecutive pair) of a direction, the unit the feasibility
/// LP constrains bandwidth over.
pub fn direction_edges(dir: &Direction) -> Vec<Edge> {
    dir.windows(2).map(|w| (w[0], w[1])).collect()
}

/// `true` if `f` is an uplink stub (`f.0 == -1`): the LP tightens its
/// capacity to `min(remaining, U)` rather than just `remaining`.
pub fn is_uplink_stub(f: &Edge) -> bool {
    f.0 == GROUND_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;
    use icarus_core::types::EdgeInfo;

    fn path_data_fixture() -> PathData {
        let mut pd = PathData::new();
        pd.insert((10, 20), vec![(vec![-10, 0, 1, -20], 3.0)]);
        pd
    }

    #[test]
    fn forward_traversal_produces_one_direction() {
        let path_data = path_data_fixture();
        let mut edge_data = EdgeData::new();
        edge_data.insert(
            (0, 1),
            EdgeInfo {
                paths_through: vec![(10, 20, 0)],
                centrality: 1.0,
                cov_centr: 0.0,
            },
        );
        let allowed: HashSet<GridId> = [10, 20].into_iter().collect();
        let strat = DirectionalFilterStrat;
        let dirs = strat.compute(&[(0, 1)], &edge_data, &path_data, &allowed);
        assert_eq!(dirs.len(), 1);
        let (dir, pairs) = dirs.iter().next().unwrap();
        assert_eq!(dir.first(), Some(&GROUND_SENTINEL));
        assert_eq!(dir.last(), Some(&1));
        assert_eq!(pairs, &vec![(10, 20)]);
    }

    #[test]
    fn disallowed_source_is_dropped() {
        let path_data = path_data_fixture();
        let mut edge_data = EdgeData::new();
        edge_data.insert(
            (0, 1),
            EdgeInfo {
                paths_through: vec![(10, 20, 0)],
                centrality: 1.0,
                cov_centr: 0.0,
            },
        );
        let allowed: HashSet<GridId> = [20].into_iter().collect();
        let strat = DirectionalFilterStrat;
        let dirs = strat.compute(&[(0, 1)], &edge_data, &path_data, &allowed);
        assert!(dirs.is_empty());
    }

    #[test]
    fn reversed_traversal_truncates_toward_target_head() {
        // Pair (30,40) stores its path going v(1) before u(0): 30 -> 1 -> 0 -> 40.
        // Attacking edge (0,1) (u=0,v=1) means we want u->v traffic, which this
        // pair only carries in its *reverse* direction (40 -> 0 -> 1 -> 30).
        let mut path_data = PathData::new();
        path_data.insert((30, 40), vec![(vec![-30, 1, 0, -40], 3.0)]);
        let mut edge_data = EdgeData::new();
        edge_data.insert(
            (1, 0),
            EdgeInfo {
                paths_through: vec![(30, 40, 0)],
                centrality: 1.0,
                cov_centr: 0.0,
            },
        );
        let allowed: HashSet<GridId> = [30, 40].into_iter().collect();
        let strat = DirectionalFilterStrat;
        let dirs = strat.compute(&[(0, 1)], &edge_data, &path_data, &allowed);
        assert_eq!(dirs.len(), 1);
        let (dir, pairs) = dirs.iter().next().unwrap();
        // reversed working path is -40, 0, 1, -30 -> truncated at hop (0,1) -> [-40,0,1]
        assert_eq!(dir, &vec![GROUND_SENTINEL, 0, 1]);
        // traffic flows 40 -> 30 here, so the originating pair is swapped.
        assert_eq!(pairs, &vec![(40, 30)]);
    }
}
