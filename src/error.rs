//! Error types for a single poll cycle

use std::fmt;

/// Result type alias for poll cycle operations
pub type CycleResult<T> = Result<T, CycleError>;

/// Errors that end a poll cycle without a measurement
///
/// None of these are fatal: the control loop records the failure with the
/// availability tracker and carries on with the next cycle.
#[derive(Debug)]
pub enum CycleError {
    /// The device could not be reached or kept failing after all retries
    Network(String),

    /// The payload was malformed or incomplete
    Protocol(String),

    /// The fields were present but could not be converted
    Conversion(String),
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleError::Network(msg) => write!(f, "device request failed: {}", msg),
            CycleError::Protocol(msg) => write!(f, "parse failed: {}", msg),
            CycleError::Conversion(msg) => write!(f, "convert data failed: {}", msg),
        }
    }
}

impl std::error::Error for CycleError {}
