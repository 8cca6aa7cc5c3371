//! Raw configuration schema and parallel-list expansion (SPEC_FULL.md §6).
//!
//! Grounded on `original_source/icarus_simulator/configuration.py` and
//! `original_source/icarus_simulator/default_properties.py`: the donor reads
//! one JSON document mapping `phase_key -> {parameter: [values]}` and expands
//! parallel lists column-wise into one concrete run per index, padding short
//! lists with their own last element.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `phase_key -> parameter -> list of raw values`, parsed straight off the
/// user-supplied JSON document.
pub type RawPhaseConfig = HashMap<String, HashMap<String, Vec<Value>>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConfig(pub RawPhaseConfig);

/// One concrete, fully-resolved set of parameter values: every list in the
/// raw config collapsed to a single value at a shared run index.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub phases: HashMap<String, HashMap<String, Value>>,
}

impl RunConfig {
    pub fn get(&self, phase: &str, param: &str) -> Option<&Value> {
        self.phases.get(phase)?.get(param)
    }

    pub fn str(&self, phase: &str, param: &str) -> color_eyre::Result<String> {
        self.get(phase, param)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| config_error(phase, param))
    }

    pub fn f64(&self, phase: &str, param: &str) -> color_eyre::Result<f64> {
        self.get(phase, param)
            .and_then(Value::as_f64)
            .ok_or_else(|| config_error(phase, param))
    }

    pub fn u64(&self, phase: &str, param: &str) -> color_eyre::Result<u64> {
        self.get(phase, param)
            .and_then(Value::as_u64)
            .ok_or_else(|| config_error(phase, param))
    }

    pub fn usize(&self, phase: &str, param: &str) -> color_eyre::Result<usize> {
        Ok(self.u64(phase, param)? as usize)
    }

    pub fn i64(&self, phase: &str, param: &str) -> color_eyre::Result<i64> {
        self.get(phase, param)
            .and_then(Value::as_i64)
            .ok_or_else(|| config_error(phase, param))
    }
}

fn config_error(phase: &str, param: &str) -> color_eyre::eyre::Report {
    color_eyre::eyre::eyre!("missing or malformed configuration key {phase}.{param}")
}

/// Expand a [`RawConfig`] into one [`RunConfig`] per parallel-list index.
/// The run count is the longest list across every `phase.parameter` entry;
/// shorter lists are padded by repeating their own last element (never the
/// longest list's), matching the donor's `zip_longest`-with-fill semantics.
pub fn expand_configs(raw: &RawConfig) -> Vec<RunConfig> {
    let run_count = raw
        .0
        .values()
        .flat_map(|params| params.values())
        .map(|values| values.len())
        .max()
        .unwrap_or(0);

    (0..run_count.max(1))
        .map(|idx| {
            let mut phases = HashMap::new();
            for (phase, params) in &raw.0 {
                let mut resolved = HashMap::new();
                for (param, values) in params {
                    if let Some(v) = pick(values, idx) {
                        resolved.insert(param.clone(), v.clone());
                    }
                }
                phases.insert(phase.clone(), resolved);
            }
            RunConfig { phases }
        })
        .collect()
}

fn pick(values: &[Value], idx: usize) -> Option<&Value> {
    if values.is_empty() {
        return None;
    }
    values.get(idx).or_else(|| values.last())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_with(phase: &str, param: &str, values: Vec<Value>) -> RawConfig {
        let mut phases = RawPhaseConfig::new();
        let mut params = HashMap::new();
        params.insert(param.to_string(), values);
        phases.insert(phase.to_string(), params);
        RawConfig(phases)
    }

    #[test]
    fn single_value_list_yields_one_run() {
        let raw = raw_with("grid", "repeats", vec![json!(2)]);
        let runs = expand_configs(&raw);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].u64("grid", "repeats").unwrap(), 2);
    }

    #[test]
    fn shorter_list_pads_with_its_own_last_element() {
        let mut phases = RawPhaseConfig::new();
        let mut grid_params = HashMap::new();
        grid_params.insert("repeats".to_string(), vec![json!(1), json!(2), json!(3)]);
        phases.insert("grid".to_string(), grid_params);
        let mut cover_params = HashMap::new();
        cover_params.insert("min_elev_angle".to_string(), vec![json!(25.0)]);
        phases.insert("cover".to_string(), cover_params);
        let raw = RawConfig(phases);

        let runs = expand_configs(&raw);
        assert_eq!(runs.len(), 3);
        for run in &runs {
            assert_eq!(run.f64("cover", "min_elev_angle").unwrap(), 25.0);
        }
        assert_eq!(runs[0].u64("grid", "repeats").unwrap(), 1);
        assert_eq!(runs[1].u64("grid", "repeats").unwrap(), 2);
        assert_eq!(runs[2].u64("grid", "repeats").unwrap(), 3);
    }

    #[test]
    fn missing_key_is_a_config_error_not_a_panic() {
        let raw = raw_with("grid", "repeats", vec![json!(2)]);
        let runs = expand_configs(&raw);
        assert!(runs[0].f64("grid", "nonexistent").is_err());
    }

    #[test]
    fn empty_raw_config_still_yields_one_empty_run() {
        let raw = RawConfig(RawPhaseConfig::new());
        let runs = expand_configs(&raw);
        assert_eq!(runs.len(), 1);
    }
}
