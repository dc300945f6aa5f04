//! Error type shared by the leveling engine

/// Errors reported by fallible leveling operations.
///
/// Estimation itself never fails: filters and estimators are total over real
/// inputs and a degenerate compass solution simply skips an update. Errors only
/// arise from user-supplied text and from the calibration and measurement
/// windows.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LevelError {
    #[error("not a number: {0:?}")]
    InvalidNumber(String),

    #[error("dimension must not be negative: {0}")]
    NegativeDimension(f64),

    #[error("device is too close to vertical to calibrate (magnitude {magnitude:.3})")]
    NearVertical { magnitude: f64 },

    #[error("no acceleration samples arrived during the sampling window")]
    NoSamples,

    #[error("a sampling window is already in progress")]
    WindowInProgress,
}
