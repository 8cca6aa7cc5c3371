//! Edge aggregation phase: runs the configured [`EdgeStrategy`] over the
//! routed `PathData` to produce the full `EdgeData` index.

use icarus_core::phase::Phase;
use icarus_core::types::{EdgeData, GridPos, IslInfo, PathData, SatPos};
use icarus_core::Result;

use crate::strategy::EdgeStrategy;

pub struct EdgeProps {
    pub path_data: PathData,
    pub grid_pos: GridPos,
    pub sat_pos: SatPos,
    pub isls: Vec<IslInfo>,
    pub edge_data: EdgeData,
}

pub struct EdgePhase {
    pub strategy: Box<dyn EdgeStrategy>,
    pub read_persist: bool,
    pub persist: bool,
}

impl Phase<EdgeProps> for EdgePhase {
    type Output = EdgeData;

    fn name(&self) -> &str {
        "edges"
    }

    fn description(&self) -> String {
        format!("edges::{}", self.strategy.description())
    }

    fn input_properties(&self) -> Vec<&'static str> {
        vec!["path_data", "grid_pos", "sat_pos", "isls"]
    }

    fn output_properties(&self) -> Vec<&'static str> {
        vec!["edge_data"]
    }

    fn read_persist(&self) -> bool {
        self.read_persist
    }

    fn persist(&self) -> bool {
        self.persist
    }

    fn compute(&self, props: &mut EdgeProps) -> Result<()> {
        props.edge_data = self
            .strategy
            .compute(&props.path_data, &props.grid_pos, &props.sat_pos, &props.isls);
        Ok(())
    }

    fn check_result(&self, props: &EdgeProps) -> Result<()> {
        // Centrality is normalized by distinct path count, not hop count
        // (see `BidirEdgeStrat::compute`'s doc comment): it does not sum to
        // a fixed constant across edges in general, so there is nothing to
        // check here beyond the default-entry invariant below (mirrors the
        // original's `edge_phase.py::_check_result`, a no-op).
        use color_eyre::eyre::ensure;
        for isl in &props.isls {
            ensure!(
                props.edge_data.contains_key(&(isl.sat1 as i64, isl.sat2 as i64)),
                "missing default entry for ISL edge"
            );
        }
        Ok(())
    }

    fn get_output(&self, props: &EdgeProps) -> EdgeData {
        props.edge_data.clone()
    }

    fn set_output(&self, props: &mut EdgeProps, output: EdgeData) {
        props.edge_data = output;
    }
}
