//! Error types for topology validation and job resolution.

use thiserror::Error;

/// Errors raised while deriving missing job dimensions.
///
/// Both variants are fatal for the request in question; the caller must
/// supply a corrected request, nothing is retried internally.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Not enough information to derive a required quantity.
    #[error("missing job dimension: {0}")]
    MissingDimension(String),

    /// Explicitly requested values contradict the hardware limits.
    #[error("unsatisfiable resource request: {0}")]
    UnsatisfiableResource(String),
}

/// Errors raised when constructing a hardware topology description.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// A base attribute is outside its allowed range.
    #[error("invalid topology value: {0}")]
    InvalidValue(String),
}
