//! In-memory time-series sink (no persistence)
//!
//! Keeps submitted points in a fixed-capacity ring buffer and enforces the
//! same strictly-increasing timestamp rule as rrdtool. Useful for tests and
//! for running the agent without rrdtool installed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::backend::{DataPoint, TimeSeriesSink};
use super::error::{SinkError, SinkResult};

/// Maximum points kept in memory
const MAX_POINTS: usize = 2880;

#[derive(Debug, Default)]
pub struct MemorySink {
    points: Mutex<VecDeque<DataPoint>>,

    /// Last accepted timestamp, survives eviction
    last_timestamp: Mutex<Option<i64>>,

    chart_runs: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored points, oldest first
    pub async fn points(&self) -> Vec<DataPoint> {
        self.points.lock().await.iter().copied().collect()
    }

    /// Number of chart regenerations requested so far
    pub fn chart_runs(&self) -> usize {
        self.chart_runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimeSeriesSink for MemorySink {
    async fn submit(&self, point: DataPoint) -> SinkResult<()> {
        let mut last = self.last_timestamp.lock().await;

        if let Some(previous) = *last
            && point.timestamp <= previous
        {
            return Err(SinkError::OutOfOrder(format!(
                "illegal attempt to update using time {} when last update time is {}",
                point.timestamp, previous
            )));
        }

        let mut points = self.points.lock().await;
        if points.len() == MAX_POINTS {
            points.pop_front();
        }
        points.push_back(point);
        *last = Some(point.timestamp);

        debug!("in-memory sink: stored point at {}", point.timestamp);
        Ok(())
    }

    async fn regenerate_charts(&self) -> SinkResult<()> {
        self.chart_runs.fetch_add(1, Ordering::SeqCst);
        debug!("in-memory sink: no charts to render");
        Ok(())
    }
}
