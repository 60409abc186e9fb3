//! Time-series sink trait definition

use async_trait::async_trait;

use super::error::SinkResult;
use crate::MeasurementRecord;

/// One sample for the round-robin store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    /// Epoch seconds
    pub timestamp: i64,

    /// Counts per minute
    pub cpm: u64,

    /// Dose rate in Sv/h
    pub sv_per_hr: f64,
}

impl From<&MeasurementRecord> for DataPoint {
    fn from(record: &MeasurementRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            cpm: record.cpm,
            sv_per_hr: record.sv_per_hr,
        }
    }
}

/// Downstream time-series store
///
/// The control loop only knows these two operations; how points are stored
/// and how charts are drawn is up to the implementation.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`: chart regeneration runs in a
/// detached task while the control loop keeps submitting points.
///
/// ## Ordering
///
/// Stores reject points whose timestamp is not strictly newer than the last
/// accepted one and report it as [`SinkError::OutOfOrder`]. Callers do not
/// buffer or reorder.
///
/// [`SinkError::OutOfOrder`]: super::error::SinkError::OutOfOrder
#[async_trait]
pub trait TimeSeriesSink: Send + Sync {
    /// Store one sample
    async fn submit(&self, point: DataPoint) -> SinkResult<()>;

    /// Re-render all charts from the stored history
    async fn regenerate_charts(&self) -> SinkResult<()>;
}
