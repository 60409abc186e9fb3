//! Error types for time-series sink operations

use std::fmt;
use std::path::PathBuf;

/// Result type alias for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors that can occur while talking to the time-series store
#[derive(Debug)]
pub enum SinkError {
    /// The store refused a timestamp not newer than its last update
    OutOfOrder(String),

    /// The store rejected the request for another reason
    Rejected(String),

    /// The database file does not exist
    MissingDatabase(PathBuf),

    /// Chart regeneration finished with failures
    ChartsFailed { failed: usize, total: usize },

    /// I/O error (spawning the store's tool, file access)
    IoError(std::io::Error),
}

impl SinkError {
    /// Whether the device clock is the likely culprit
    pub fn is_out_of_order(&self) -> bool {
        matches!(self, SinkError::OutOfOrder(_))
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::OutOfOrder(msg) => write!(f, "update out of order: {}", msg),
            SinkError::Rejected(msg) => write!(f, "update rejected: {}", msg),
            SinkError::MissingDatabase(path) => {
                write!(f, "time-series database {} does not exist", path.display())
            }
            SinkError::ChartsFailed { failed, total } => {
                write!(f, "{} of {} charts failed to render", failed, total)
            }
            SinkError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::IoError(err)
    }
}
