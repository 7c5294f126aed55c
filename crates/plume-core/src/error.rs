//! Error types for the Plume transport solver.
//!
//! Organized by the failure taxonomy of the solver: configuration problems
//! detected at setup, communication failures between ranks, and violations
//! found by the optional internal consistency checks. Numerical degeneracy
//! (singular reconstruction matrices) is never an error; it is recovered
//! locally by dropping to a zero gradient.

use std::error::Error;
use std::fmt;

use crate::ComponentId;

// ── ConfigError ────────────────────────────────────────────────────

/// Invalid or unsupported configuration, detected at setup.
///
/// Every variant carries the parameter-list key that caused the failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The spatial/temporal discretization pair has no matching scheme.
    UnsupportedCombination {
        /// Offending parameter-list key.
        key: &'static str,
        /// Requested spatial order.
        spatial: u32,
        /// Requested temporal order.
        temporal: u32,
    },
    /// A parameter has the wrong type or is outside its admissible range.
    InvalidValue {
        /// Offending parameter-list key.
        key: &'static str,
        /// Human-readable description of the problem.
        reason: String,
    },
    /// A named component is not registered in the field store.
    UnknownComponent {
        /// Offending parameter-list key.
        key: &'static str,
        /// The name or id that failed to resolve.
        name: String,
    },
    /// A boundary condition references a face that is not on the domain
    /// boundary.
    InvalidBoundaryFace {
        /// Offending parameter-list key.
        key: &'static str,
        /// Local index of the face.
        face: usize,
    },
    /// Inflow boundary faces exist without a boundary condition.
    MissingBoundaryData {
        /// Offending parameter-list key.
        key: &'static str,
        /// Number of uncovered inflow faces across all ranks.
        faces: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedCombination {
                key,
                spatial,
                temporal,
            } => write!(
                f,
                "'{key}': spatial order {spatial} with temporal order {temporal} is not supported"
            ),
            Self::InvalidValue { key, reason } => write!(f, "'{key}': {reason}"),
            Self::UnknownComponent { key, name } => {
                write!(f, "'{key}': unknown component '{name}'")
            }
            Self::InvalidBoundaryFace { key, face } => {
                write!(f, "'{key}': face {face} is not a boundary face")
            }
            Self::MissingBoundaryData { key, faces } => {
                write!(f, "'{key}': {faces} inflow face(s) have no boundary data")
            }
        }
    }
}

impl Error for ConfigError {}

// ── CommError ──────────────────────────────────────────────────────

/// Failure of a collective or point-to-point communication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// The channel to a peer rank was closed.
    Disconnected {
        /// Rank of the unreachable peer.
        peer: usize,
    },
    /// A received message did not have the expected length.
    SizeMismatch {
        /// Rank of the sending peer.
        peer: usize,
        /// Number of values expected.
        expected: usize,
        /// Number of values received.
        actual: usize,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected { peer } => write!(f, "channel to rank {peer} is closed"),
            Self::SizeMismatch {
                peer,
                expected,
                actual,
            } => write!(
                f,
                "message from rank {peer} has {actual} values, expected {expected}"
            ),
        }
    }
}

impl Error for CommError {}

// ── CheckViolation ─────────────────────────────────────────────────

/// A conservation or positivity violation found by internal checks.
#[derive(Clone, Debug, PartialEq)]
pub enum CheckViolation {
    /// The global minimum concentration is below `-tolerance`.
    NegativeConcentration {
        /// Affected component.
        component: ComponentId,
        /// Global minimum concentration.
        value: f64,
    },
    /// Computed mass diverges from the boundary-flux bookkeeping.
    MassBalance {
        /// Affected component.
        component: ComponentId,
        /// Mass summed over cells.
        computed: f64,
        /// Mass expected from the start mass plus boundary and source terms.
        expected: f64,
    },
}

impl fmt::Display for CheckViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeConcentration { component, value } => {
                write!(f, "component {component}: negative concentration {value:e}")
            }
            Self::MassBalance {
                component,
                computed,
                expected,
            } => write!(
                f,
                "component {component}: mass {computed:e} diverges from expected {expected:e}"
            ),
        }
    }
}

impl Error for CheckViolation {}

// ── TransportError ─────────────────────────────────────────────────

/// Errors returned by the transport solver's public operations.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportError {
    /// Setup or per-step configuration failure.
    Config(ConfigError),
    /// Communication with another rank failed.
    Comm(CommError),
    /// Internal checks are enabled and at least one violation was found.
    CheckFailed(Vec<CheckViolation>),
    /// A scheme was entered for a new sub-step before the previous one
    /// reached completion.
    SchemeReentered {
        /// Component whose sub-step never completed.
        component: ComponentId,
    },
    /// A coupling or stable step is not a positive finite number.
    InvalidTimeStep {
        /// The rejected step length.
        dt: f64,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Comm(e) => write!(f, "communication error: {e}"),
            Self::CheckFailed(violations) => {
                write!(f, "{} internal check(s) failed", violations.len())?;
                if let Some(first) = violations.first() {
                    write!(f, ": {first}")?;
                }
                Ok(())
            }
            Self::SchemeReentered { component } => write!(
                f,
                "scheme re-entered for component {component} before its sub-step completed"
            ),
            Self::InvalidTimeStep { dt } => {
                write!(f, "time step must be finite and > 0, got {dt}")
            }
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Comm(e) => Some(e),
            Self::CheckFailed(v) => v.first().map(|e| e as &(dyn Error + 'static)),
            _ => None,
        }
    }
}

impl From<ConfigError> for TransportError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CommError> for TransportError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_key() {
        let e = ConfigError::UnsupportedCombination {
            key: "temporal discretization order",
            spatial: 1,
            temporal: 2,
        };
        let msg = e.to_string();
        assert!(msg.contains("temporal discretization order"));
        assert!(msg.contains("spatial order 1"));
    }

    #[test]
    fn transport_error_wraps_sources() {
        let e: TransportError = CommError::Disconnected { peer: 2 }.into();
        assert!(e.source().is_some());
        assert!(e.to_string().contains("rank 2"));

        let e = TransportError::CheckFailed(vec![CheckViolation::NegativeConcentration {
            component: ComponentId(0),
            value: -1.0,
        }]);
        assert!(e.to_string().starts_with("1 internal check(s) failed"));
        assert!(e.source().is_some());
    }

    #[test]
    fn empty_check_failure_has_no_source() {
        let e = TransportError::CheckFailed(Vec::new());
        assert!(e.source().is_none());
    }
}
