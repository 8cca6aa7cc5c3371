//! Routing phase: assembles the full [`PathData`] map by routing every
//! ordered ground pair `src < dst` independently over the shared ISL
//! network, using the Batched Worker Pool for parallelism.
//!
//! Grounded on `phases/routing_phase.py`.

use icarus_core::phase::Phase;
use icarus_core::types::{Coverage, GridId, GridPos, PathData, SatPos};
use icarus_core::worker_pool::BatchedWorkerPool;
use icarus_core::Result;
use itertools::Itertools;

use crate::graph::Network;
use crate::strategy::RoutingStrategy;

/// Properties this phase reads and writes. The binary's top-level property
/// table holds the concrete fields; this struct is the phase-local view.
pub struct RoutingProps {
    pub sat_pos: SatPos,
    pub grid_pos: GridPos,
    pub coverage: Coverage,
    pub network: Network,
    pub path_data: PathData,
}

struct RoutingParams<'a> {
    network: &'a Network,
    grid_pos: &'a GridPos,
    coverage: &'a Coverage,
    strategy: &'a dyn RoutingStrategy,
}

pub struct RoutingPhase {
    pub strategy: Box<dyn RoutingStrategy>,
    pub num_workers: usize,
    pub num_batches: usize,
    pub read_persist: bool,
    pub persist: bool,
}

impl Phase<RoutingProps> for RoutingPhase {
    type Output = PathData;

    fn name(&self) -> &str {
        "routing"
    }

    fn description(&self) -> String {
        format!("routing::{}", self.strategy.description())
    }

    fn input_properties(&self) -> Vec<&'static str> {
        vec!["sat_pos", "grid_pos", "coverage", "network"]
    }

    fn output_properties(&self) -> Vec<&'static str> {
        vec!["path_data"]
    }

    fn read_persist(&self) -> bool {
        self.read_persist
    }

    fn persist(&self) -> bool {
        self.persist
    }

    fn compute(&self, props: &mut RoutingProps) -> Result<()> {
        let mut ground_ids: Vec<GridId> = props.grid_pos.keys().copied().collect();
        ground_ids.sort_unstable();

        let pairs: Vec<(GridId, GridId)> = ground_ids
            .iter()
            .copied()
            .tuple_combinations()
            .filter(|(a, b)| a < b)
            .collect();

        let params = RoutingParams {
            network: &props.network,
            grid_pos: &props.grid_pos,
            coverage: &props.coverage,
            strategy: self.strategy.as_ref(),
        };

        let pool: BatchedWorkerPool<(GridId, GridId), PathData, RoutingParams> =
            BatchedWorkerPool::new(self.num_workers, self.num_batches, &params);

        let path_data = pool.run(
            pairs,
            |&(src, dst), acc: &mut PathData, params: &RoutingParams| {
                let lb = params
                    .strategy
                    .route(params.network, params.grid_pos, params.coverage, src, dst);
                if !lb.is_empty() {
                    acc.insert((src, dst), lb);
                }
            },
            |mut total: PathData, acc: PathData| {
                total.extend(acc);
                total
            },
            PathData::new(),
        );

        props.path_data = path_data;
        Ok(())
    }

    fn check_result(&self, props: &RoutingProps) -> Result<()> {
        use color_eyre::eyre::ensure;
        for ((src, dst), lb) in &props.path_data {
            ensure!(src < dst, "path_data key not ordered src < dst");
            for (path, _) in lb {
                ensure!(
                    path.first() == Some(&-(*src as i64)) && path.last() == Some(&-(*dst as i64)),
                    "path endpoints must be the pair's negated ground ids"
                );
            }
        }
        Ok(())
    }

    fn get_output(&self, props: &RoutingProps) -> PathData {
        props.path_data.clone()
    }

    fn set_output(&self, props: &mut RoutingProps, output: PathData) {
        props.path_data = output;
    }
}
