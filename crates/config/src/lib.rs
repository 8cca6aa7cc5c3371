//! Run configuration: the nested JSON schema (SPEC_FULL.md §6), its
//! parallel-list expansion into concrete runs, and the registry resolving
//! each phase's configured strategy tag to a concrete implementation.
//!
//! Grounded on `original_source/icarus_simulator/configuration.py` and
//! `original_source/icarus_simulator/default_properties.py`.

pub mod registry;
pub mod schema;

pub use schema::{expand_configs, RawConfig, RawPhaseConfig, RunConfig};
