//! Traffic allocation phase: runs the configured selection and assignment
//! strategies over the routed `PathData` to produce `BwData`.
//!
//! Grounded on `phases/bw_phase.py`.

use icarus_core::phase::Phase;
use icarus_core::types::{BwData, GridPos, IslInfo, PathData, SatPos};
use icarus_core::Result;

use crate::strategy::{BwAssignStrategy, BwSelectStrategy};

pub struct TrafficProps {
    pub path_data: PathData,
    pub grid_pos: GridPos,
    pub sat_pos: SatPos,
    pub isls: Vec<IslInfo>,
    pub bw_data: BwData,
}

pub struct TrafficPhase {
    pub select: Box<dyn BwSelectStrategy>,
    pub assign: Box<dyn BwAssignStrategy>,
    pub read_persist: bool,
    pub persist: bool,
}

impl Phase<TrafficProps> for TrafficPhase {
    type Output = BwData;

    fn name(&self) -> &str {
        "traffic"
    }

    fn description(&self) -> String {
        format!(
            "traffic::{}+{}",
            self.select.description(),
            self.assign.description()
        )
    }

    fn input_properties(&self) -> Vec<&'static str> {
        vec!["path_data", "grid_pos", "sat_pos", "isls"]
    }

    fn output_properties(&self) -> Vec<&'static str> {
        vec!["bw_data"]
    }

    fn read_persist(&self) -> bool {
        self.read_persist
    }

    fn persist(&self) -> bool {
        self.persist
    }

    fn compute(&self, props: &mut TrafficProps) -> Result<()> {
        let selection = self.select.select(&props.grid_pos, &props.path_data);
        props.bw_data = self
            .assign
            .assign(&selection, &props.path_data, &props.sat_pos, &props.isls);
        Ok(())
    }

    fn check_result(&self, props: &TrafficProps) -> Result<()> {
        use color_eyre::eyre::ensure;
        for info in props.bw_data.values() {
            ensure!(
                info.idle_bw <= info.capacity,
                "idle_bw must not exceed capacity after allocation"
            );
        }
        Ok(())
    }

    fn get_output(&self, props: &TrafficProps) -> BwData {
        props.bw_data.clone()
    }

    fn set_output(&self, props: &mut TrafficProps, output: BwData) {
        props.bw_data = output;
    }
}
