//! Phase engine (component A).
//!
//! Grounded on `icarus_simulator.py` + `phases/base_phase.py`: a strictly
//! sequential controller that resolves named properties, fingerprints each
//! phase's transitive dependency set, and persists/reads cached artifacts
//! keyed by that fingerprint.

use std::collections::{HashMap, HashSet};
use std::path::{Path as FsPath, PathBuf};
use std::time::Instant;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{PhaseError, Result};

/// A named, closed set of property values the engine can hold. Using an enum
/// rather than `Box<dyn Any>` gives compile-time checked `get`/`insert`
/// without runtime downcast panics (see SPEC_FULL.md §9, "Global mutable state").
pub trait PropertyValue: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}
impl<T> PropertyValue for T where T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

pub type Pname = &'static str;

/// One computation step over named input properties producing named output
/// properties, cacheable by dependency fingerprint.
///
/// Every phase in this workspace declares exactly one output property, so
/// the cache codec is keyed off a single associated `Output` type rather
/// than a type-erased tuple: `get_output`/`set_output` are the narrow seam
/// between the phase's own `Props` struct and [`write_cached`]/[`read_cached`].
pub trait Phase<Props> {
    type Output: PropertyValue;

    fn name(&self) -> &str;
    /// Human-readable, stable description including strategy identifiers
    /// and their parameters (forms part of the cache key).
    fn description(&self) -> String;
    fn input_properties(&self) -> Vec<Pname>;
    fn output_properties(&self) -> Vec<Pname>;
    fn read_persist(&self) -> bool;
    fn persist(&self) -> bool;

    /// Run the computation, writing the result into `props`'s output field(s).
    fn compute(&self, props: &mut Props) -> Result<()>;

    /// Validate invariants on the (fresh or cached) outputs. Return `Err`
    /// to fail the phase with a check error.
    fn check_result(&self, props: &Props) -> Result<()>;

    /// Read this phase's declared output out of `props`, for persisting.
    fn get_output(&self, props: &Props) -> Self::Output;
    /// Write a (freshly deserialized, cached) output back into `props`.
    fn set_output(&self, props: &mut Props, output: Self::Output);
}

/// Owns the property table and dependency table; the single mutable locus
/// of the simulation (SPEC_FULL.md §9).
pub struct Engine {
    results_dir: PathBuf,
    dependencies: HashMap<String, HashSet<String>>,
}

impl Engine {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            dependencies: HashMap::new(),
        }
    }

    /// Compute the new transitive dependency set for a phase given its
    /// inputs, and register it for every declared output.
    fn update_dependencies(&mut self, inputs: &[Pname], outputs: &[Pname], descr: &str) -> HashSet<String> {
        let mut new_deps = HashSet::new();
        new_deps.insert(descr.to_string());
        for inp in inputs {
            if let Some(deps) = self.dependencies.get(*inp) {
                new_deps.extend(deps.iter().cloned());
            }
        }
        for out in outputs {
            self.dependencies.insert((*out).to_string(), new_deps.clone());
        }
        new_deps
    }

    fn cache_key(&self, phase_name: &str, deps: &HashSet<String>) -> PathBuf {
        let mut sorted: Vec<&str> = deps.iter().map(|s| s.as_str()).collect();
        sorted.sort_unstable();
        let joined = sorted.join("_");
        let sanitized = joined.replace('/', "_slash_");
        self.results_dir
            .join(format!("{phase_name}||{sanitized}.bin.zst"))
    }

    /// Run one phase: resolve dependency fingerprint, try cache, else
    /// compute; validate; persist if requested.
    pub fn run_phase<Props, P>(&mut self, phase: &P, props: &mut Props) -> Result<()>
    where
        P: Phase<Props>,
    {
        let start = Instant::now();
        let name = phase.name().to_string();
        log::info!("{name} phase");

        let inputs = phase.input_properties();
        let outputs = phase.output_properties();
        let descr = phase.description();
        let deps = self.update_dependencies(&inputs, &outputs, &descr);
        let fname = self.cache_key(&name, &deps);

        let mut read_from_cache = false;
        if phase.read_persist() && fname.is_file() {
            match read_cached::<P::Output>(&fname) {
                Ok(output) => {
                    log::info!("{name} cache hit");
                    phase.set_output(props, output);
                    read_from_cache = true;
                }
                Err(e) => {
                    // Cache read error: fall through to recompute (SPEC_FULL.md §7).
                    log::warn!("{name} cache read failed, recomputing: {e:#}");
                }
            }
        }
        if !read_from_cache {
            log::info!("{name} computing");
            phase.compute(props)?;
        }

        phase.check_result(props).map_err(|e| {
            color_eyre::eyre::eyre!(PhaseError::CheckFailed {
                phase: name.clone(),
                reason: e.to_string(),
            })
        })?;

        if phase.persist() && !read_from_cache {
            if let Some(parent) = fname.parent() {
                std::fs::create_dir_all(parent)?;
            }
            write_cached(&fname, &phase.get_output(props))?;
            log::debug!("{name} persisted to {}", fname.display());
        }

        log::info!("{} finished in {:?}", name, start.elapsed());
        Ok(())
    }
}

/// Serialize `value` with bincode, compress with zstd, write atomically
/// (temp file + rename) to `path`. Shared by every phase that opts into
/// write-caching.
pub fn write_cached<T: Serialize>(path: &FsPath, value: &T) -> Result<()> {
    let encoded = bincode::serialize(value)?;
    let compressed = zstd::encode_all(&encoded[..], 0)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, compressed)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Inverse of [`write_cached`]. I/O or decode errors are the caller's
/// signal to fall through to recompute (SPEC_FULL.md §7, "cache read error").
pub fn read_cached<T: DeserializeOwned>(path: &FsPath) -> Result<T> {
    let compressed = std::fs::read(path)?;
    let decoded = zstd::decode_all(&compressed[..])?;
    Ok(bincode::deserialize(&decoded)?)
}
