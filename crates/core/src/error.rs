//! Fatal error conditions raised by the phase engine.
//!
//! These are the only errors the engine itself can raise; strategy-level
//! failures (e.g. an infeasible attack) are represented in-band as `None`
//! values inside the property payloads, never as an `Err`.

use std::fmt;

#[derive(Debug)]
pub enum PhaseError {
    /// A phase declared an input property that has not been produced yet.
    MissingInput { phase: String, property: String },
    /// A phase's compute function returned a different number of outputs
    /// than it declared.
    ResultShapeMismatch {
        phase: String,
        declared: usize,
        returned: usize,
    },
    /// The phase-supplied checker rejected the computed (or cached) result.
    CheckFailed { phase: String, reason: String },
    /// A configuration referenced a strategy key with no matching
    /// implementation.
    UnknownStrategy { phase_key: String, key: String },
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseError::MissingInput { phase, property } => write!(
                f,
                "phase `{phase}` requires property `{property}`, which has not been produced"
            ),
            PhaseError::ResultShapeMismatch {
                phase,
                declared,
                returned,
            } => write!(
                f,
                "phase `{phase}` declared {declared} output(s) but computed {returned}"
            ),
            PhaseError::CheckFailed { phase, reason } => {
                write!(f, "phase `{phase}` check failed: {reason}")
            }
            PhaseError::UnknownStrategy { phase_key, key } => write!(
                f,
                "no strategy registered for phase key `{phase_key}` named `{key}`"
            ),
        }
    }
}

impl std::error::Error for PhaseError {}

pub type Result<T> = color_eyre::eyre::Result<T>;

/// Resolve a declared input value, turning a missing property into the
/// fatal `MissingInput` error (SPEC_FULL.md §4.A step 1 / §7).
pub fn require<'a, T>(opt: &'a Option<T>, phase: &str, property: &str) -> Result<&'a T> {
    opt.as_ref().ok_or_else(|| {
        color_eyre::eyre::eyre!(PhaseError::MissingInput {
            phase: phase.to_string(),
            property: property.to_string(),
        })
    })
}
