//! Agent - the single control loop driving the radiation monitor pipeline
//!
//! ## Message Flow
//!
//! ```text
//! fetch timer → Fetch → Parse → Convert ─┬→ Snapshot file
//!                                        ├→ Time-series sink (database timer)
//!                                        └→ Availability tracker (always)
//! chart timer → spawn chart regeneration (detached, never awaited)
//! ```
//!
//! The loop owns every piece of mutable state. Shutdown is only observed
//! between iterations, so a started cycle always completes; afterwards the
//! output files are removed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::MeasurementRecord;
use crate::config::{ClockSource, Config, OfflinePolicy};
use crate::error::CycleResult;
use crate::monitors::{AvailabilityState, DeviceFetcher, Endpoint};
use crate::payload;
use crate::snapshot::{Snapshot, SnapshotWriter};
use crate::storage::{DataPoint, TimeSeriesSink};

/// Timer for one of the loop's periodic actions
///
/// Fires on the first check, then whenever at least `interval` has passed
/// since it last fired.
#[derive(Debug, Clone)]
pub struct Periodic {
    interval: Duration,
    last: Option<Instant>,
}

impl Periodic {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Check whether the action is due at `now`, marking it as run if so
    pub fn fire(&mut self, now: Instant) -> bool {
        let due = self
            .last
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);

        if due {
            self.last = Some(now);
        }
        due
    }
}

pub struct Agent {
    fetcher: DeviceFetcher,
    writer: SnapshotWriter,
    sink: Arc<dyn TimeSeriesSink>,
    availability: AvailabilityState,

    clock: ClockSource,
    offline_policy: OfflinePolicy,
    fetch_interval: Duration,

    fetch_timer: Periodic,
    database_timer: Periodic,
    chart_timer: Periodic,
}

impl Agent {
    pub fn new(config: &Config, sink: Arc<dyn TimeSeriesSink>) -> Result<Self> {
        Ok(Self {
            fetcher: DeviceFetcher::new(config)?,
            writer: SnapshotWriter::new(
                config.output.snapshot_file.clone(),
                config.output.input_file.clone(),
            ),
            sink,
            availability: AvailabilityState::new(config.offline_threshold),
            clock: config.clock,
            offline_policy: config.offline_policy,
            fetch_interval: config.fetch_interval(),
            fetch_timer: Periodic::new(config.fetch_interval()),
            database_timer: Periodic::new(config.database_interval()),
            chart_timer: Periodic::new(config.chart_interval()),
        })
    }

    pub fn availability(&self) -> &AvailabilityState {
        &self.availability
    }

    pub fn writer(&self) -> &SnapshotWriter {
        &self.writer
    }

    /// Run until `shutdown` turns true or its sender goes away
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("starting up radmon agent process");

        loop {
            let started = Instant::now();
            self.tick(started).await;

            if *shutdown.borrow() {
                break;
            }

            let remaining = self.fetch_interval.saturating_sub(started.elapsed());
            trace!("processing took {:?}, sleeping {remaining:?}", started.elapsed());

            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}

                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("terminating radmon agent process");
        if let Err(e) = self.writer.remove().await {
            error!("failed to remove output files: {e}");
        }
    }

    /// One loop iteration: fetch if due, then start charts if due
    pub async fn tick(&mut self, now: Instant) {
        if self.fetch_timer.fire(now) {
            // failures are already logged and counted
            let _ = self.run_cycle(now).await;
        }

        if self.chart_timer.fire(now) {
            self.spawn_chart_regeneration();
        }
    }

    /// Fetch, validate and publish one reading
    ///
    /// The availability tracker is updated with the outcome whether the
    /// cycle succeeded or not. Once the device is confirmed offline every
    /// failed cycle reapplies the offline policy.
    #[instrument(skip_all)]
    pub async fn run_cycle(&mut self, now: Instant) -> CycleResult<MeasurementRecord> {
        let result = self.acquire().await;

        match &result {
            Ok((raw, record)) => {
                self.publish(raw, record).await;

                if self.database_timer.fire(now) {
                    self.submit(record).await;
                }
            }
            Err(e) => warn!("{e}"),
        }

        let transition = self.availability.record(result.is_ok());
        trace!("availability: {transition:?}");

        // offline output is reapplied until the device answers again
        if self.availability.offline_confirmed() {
            self.publish_offline().await;
        }

        result.map(|(_, record)| record)
    }

    async fn acquire(&mut self) -> CycleResult<(String, MeasurementRecord)> {
        let endpoint = if self.availability.take_reset_request() {
            Endpoint::Reset
        } else {
            Endpoint::Read
        };

        let raw = self.fetcher.fetch(endpoint).await?;
        let fields = payload::parse(&raw)?;
        let record = payload::convert(fields, self.clock)?;

        Ok((raw, record))
    }

    async fn publish(&self, raw: &str, record: &MeasurementRecord) {
        if let Err(e) = self.writer.write_raw(raw).await {
            error!("failed to write input data file: {e}");
        }

        if let Err(e) = self.writer.write(&Snapshot::from_record(record)).await {
            error!("failed to write output data file: {e}");
        }
    }

    async fn submit(&mut self, record: &MeasurementRecord) {
        match self.sink.submit(DataPoint::from(record)).await {
            Ok(()) => trace!("submitted point at {}", record.timestamp),
            Err(e) => {
                error!("time-series update failed: {e}");
                if e.is_out_of_order() {
                    self.availability.request_device_reset();
                }
            }
        }
    }

    async fn publish_offline(&self) {
        let result = match self.offline_policy {
            OfflinePolicy::Blank => self.writer.write(&Snapshot::offline()).await,
            OfflinePolicy::Remove => self.writer.remove().await,
        };

        if let Err(e) = result {
            error!("failed to publish offline status: {e}");
        }
    }

    fn spawn_chart_regeneration(&self) {
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            match sink.regenerate_charts().await {
                Ok(()) => debug!("charts regenerated"),
                Err(e) => error!("chart generation failed: {e}"),
            }
        });
    }
}
