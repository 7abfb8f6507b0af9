use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the ensemble integrator and its setup.
///
/// Everything here is raised synchronously from setup, `step` or `reset`.
/// Coincident particle centers are not an error: the integrator skips the
/// pair and reports it in its `StepReport`.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Position and velocity sequences are not index-aligned.
    #[error("length mismatch: {positions} positions vs {velocities} velocities")]
    LengthMismatch { positions: usize, velocities: usize },

    /// Geometry or state that cannot be brought inside the domain.
    #[error("out of range: {0}")]
    OutOfRange(String),
}
