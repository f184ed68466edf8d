//! Crate-wide error type.

use thiserror::Error;

/// Errors raised during setup, evaluation, or persistence.
///
/// Configuration errors are fatal at setup time; dispatch errors propagate
/// from the external simulator and abort the run. Constraint violations are
/// never errors — they surface as penalties and reason bits.
#[derive(Debug, Error)]
pub enum CapmixError {
    /// A configuration parameter is outside its valid range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A candidate vector does not match the scenario's parameter count.
    #[error("candidate has {got} parameters, scenario expects {expected}")]
    CandidateLength { got: usize, expected: usize },

    /// The external dispatch simulator failed.
    #[error("dispatch simulation failed: {0}")]
    Dispatch(String),

    /// Trace, results, or exchanges file I/O failed.
    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Results or exchanges serialization failed.
    #[error("artifact serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CapmixError>;
