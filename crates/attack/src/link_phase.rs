//! Link Attack Engine phase (component G): for every edge with configured
//! bandwidth, runs path filtering, feasibility, and detectability
//! optimization to decide whether a botnet can flood it, and at what cost.
//!
//! Grounded on `phases/atk_phase.py`.

use std::collections::HashSet;

use icarus_core::phase::Phase;
use icarus_core::types::{AttackData, BwData, Edge, EdgeData, GridId, PathData};
use icarus_core::worker_pool::BatchedWorkerPool;
use icarus_core::Result;

use crate::direction::FilterStrategy;
use crate::feasibility::FeasibilityStrategy;
use crate::geo_constraint::GeoConstraintStrategy;
use crate::optim::OptimStrategy;

pub struct LinkAttackProps {
    pub edge_data: EdgeData,
    pub path_data: PathData,
    pub bw_data: BwData,
    pub grid_pos: icarus_core::types::GridPos,
    pub attack_data: AttackData,
}

pub struct LinkAttackPhase {
    pub filter: Box<dyn FilterStrategy>,
    pub feasibility: Box<dyn FeasibilityStrategy>,
    pub optim: Box<dyn OptimStrategy>,
    pub geo_constraint: Box<dyn GeoConstraintStrategy>,
    pub uplink_capacity_max: i64,
    pub num_workers: usize,
    pub num_batches: usize,
    pub read_persist: bool,
    pub persist: bool,
}

pub(crate) struct LinkAttackParams<'a> {
    pub(crate) edge_data: &'a EdgeData,
    pub(crate) path_data: &'a PathData,
    pub(crate) bw_data: &'a BwData,
    pub(crate) allowed_sources: &'a HashSet<GridId>,
    pub(crate) filter: &'a dyn FilterStrategy,
    pub(crate) feasibility: &'a dyn FeasibilityStrategy,
    pub(crate) optim: &'a dyn OptimStrategy,
    pub(crate) uplink_capacity_max: i64,
}

impl Phase<LinkAttackProps> for LinkAttackPhase {
    type Output = AttackData;

    fn name(&self) -> &str {
        "link_attack"
    }

    fn description(&self) -> String {
        format!(
            "link_attack::{}+{}+{}+{}+{}",
            self.filter.description(),
            self.feasibility.description(),
            self.optim.description(),
            self.geo_constraint.description(),
            self.uplink_capacity_max
        )
    }

    fn input_properties(&self) -> Vec<&'static str> {
        vec!["edge_data", "path_data", "bw_data", "grid_pos"]
    }

    fn output_properties(&self) -> Vec<&'static str> {
        vec!["attack_data"]
    }

    fn read_persist(&self) -> bool {
        self.read_persist
    }

    fn persist(&self) -> bool {
        self.persist
    }

    fn compute(&self, props: &mut LinkAttackProps) -> Result<()> {
        let allowed_sources = self.geo_constraint.allowed_sources(&props.grid_pos);

        let mut targets: Vec<Edge> = props.bw_data.keys().copied().collect();
        targets.sort_unstable();

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

        let pool: BatchedWorkerPool<Edge, AttackData, LinkAttackParams> =
            BatchedWorkerPool::new(self.num_workers, self.num_batches, &params);

        let attack_data = pool.run(
            targets,
            |&edge, acc: &mut AttackData, params: &LinkAttackParams| {
                let result = attack_single_edge(edge, params);
                acc.insert(edge, result);
            },
            |mut total: AttackData, acc: AttackData| {
                total.extend(acc);
                total
            },
            AttackData::new(),
        );

        props.attack_data = attack_data;
        Ok(())
    }

    fn check_result(&self, props: &LinkAttackProps) -> Result<()> {
        use color_eyre::eyre::ensure;
        for info in props.attack_data.values().flatten() {
            ensure!(
                info.cost >= info.flows_on_trg,
                "attack cost must be at least the target's remaining-bw requirement"
            );
            ensure!(
                info.detectability <= self.uplink_capacity_max,
                "detectability must not exceed the configured uplink cap"
            );
        }
        Ok(())
    }

    fn get_output(&self, props: &LinkAttackProps) -> AttackData {
        props.attack_data.clone()
    }

    fn set_output(&self, props: &mut LinkAttackProps, output: AttackData) {
        props.attack_data = output;
    }
}

/// Run §4.G.1 → §4.G.3 for a single target edge. Shared with the zone
/// attack engine (§4.H step 6), which calls the same pipeline over a cut
/// set instead of a singleton.
pub(crate) fn attack_single_edge(
    edge: Edge,
    params: &LinkAttackParams,
) -> Option<icarus_core::types::AttackInfo> {
    attack_edge_set(&[edge], params)
}

pub(crate) fn attack_edge_set(
    edges: &[Edge],
    params: &LinkAttackParams,
) -> Option<icarus_core::types::AttackInfo> {
    let directions = params
        .filter
        .compute(edges, params.edge_data, params.path_data, params.allowed_sources);
    if directions.is_empty() {
        return None;
    }
    params.optim.optimize(
        params.feasibility,
        &directions,
        params.bw_data,
        edges,
        params.uplink_capacity_max,
    )
}
