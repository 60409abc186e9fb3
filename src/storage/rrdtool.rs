//! rrdtool-backed time-series sink
//!
//! Every operation runs the `rrdtool` command line tool as a child process
//! (no shell involved). Updates that rrdtool refuses because the timestamp
//! is not newer than the last update are reported as
//! [`SinkError::OutOfOrder`] so the agent can ask the device to reset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info, instrument, trace};

use super::backend::{DataPoint, TimeSeriesSink};
use super::charts::{CHARTS, ChartSpec};
use super::error::{SinkError, SinkResult};
use crate::config::StorageConfig;

/// rrdtool's complaint about a non-increasing update time
const OUT_OF_ORDER_MARKER: &str = "illegal attempt to update using time";

/// Days of history kept by the consolidated archive
const RRD_SIZE_IN_DAYS: u64 = 370;

/// Primary data points consolidated into one archive row
const RRD_CONSOLIDATION_STEPS: u64 = 30;

#[derive(Debug)]
pub struct RrdtoolSink {
    rrdtool: PathBuf,
    rrd_file: PathBuf,
    charts_dir: PathBuf,
    chart_width: u32,
    chart_height: u32,
}

impl RrdtoolSink {
    /// Attach to an existing database
    pub fn open(config: &StorageConfig) -> SinkResult<Self> {
        if !config.rrd_file.exists() {
            return Err(SinkError::MissingDatabase(config.rrd_file.clone()));
        }

        info!("using rrdtool database {}", config.rrd_file.display());

        Ok(Self {
            rrdtool: config.rrdtool.clone(),
            rrd_file: config.rrd_file.clone(),
            charts_dir: config.charts_dir.clone(),
            chart_width: config.chart_width,
            chart_height: config.chart_height,
        })
    }

    /// Create the database unless it already exists
    ///
    /// Returns `false` if there was nothing to do.
    #[instrument(skip(config))]
    pub async fn create(config: &StorageConfig, step: Duration, start: i64) -> SinkResult<bool> {
        if config.rrd_file.exists() {
            info!("rrdtool radiation database file already exists");
            return Ok(false);
        }

        let args = create_args(&config.rrd_file, step, start);
        info!("creating rrdtool radiation database: rrdtool {}", args.join(" "));

        run(&config.rrdtool, &args).await?;
        Ok(true)
    }

    pub fn rrd_file(&self) -> &Path {
        &self.rrd_file
    }

    #[instrument(skip(self, chart), fields(chart = chart.name))]
    async fn render(&self, chart: &ChartSpec) -> SinkResult<()> {
        let args = chart.graph_args(
            &self.rrd_file,
            &self.charts_dir,
            self.chart_width,
            self.chart_height,
        );
        let output = run(&self.rrdtool, &args).await?;
        trace!("rrdtool graph: {}", output.trim());
        Ok(())
    }
}

#[async_trait]
impl TimeSeriesSink for RrdtoolSink {
    #[instrument(skip(self))]
    async fn submit(&self, point: DataPoint) -> SinkResult<()> {
        let args = update_args(&self.rrd_file, &point);
        run(&self.rrdtool, &args).await?;
        debug!("database update successful");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn regenerate_charts(&self) -> SinkResult<()> {
        let mut failed = 0;
        for chart in &CHARTS {
            if let Err(e) = self.render(chart).await {
                error!("rrdtool graph {} failed: {e}", chart.name);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(SinkError::ChartsFailed {
                failed,
                total: CHARTS.len(),
            });
        }

        debug!("regenerated {} charts", CHARTS.len());
        Ok(())
    }
}

/// Arguments for `rrdtool update`
pub fn update_args(rrd_file: &Path, point: &DataPoint) -> Vec<String> {
    vec![
        "update".to_string(),
        rrd_file.display().to_string(),
        format!("{}:{}:{:e}", point.timestamp, point.cpm, point.sv_per_hr),
    ]
}

/// Arguments for `rrdtool create`
///
/// One primary archive keeps a day of raw samples, a second one keeps
/// [`RRD_SIZE_IN_DAYS`] of averages over [`RRD_CONSOLIDATION_STEPS`] steps.
pub fn create_args(rrd_file: &Path, step: Duration, start: i64) -> Vec<String> {
    let step = step.as_secs().max(1);
    let heartbeat = 2 * step;
    let day_rows = 86_400 / step;
    let year_rows = 86_400 * RRD_SIZE_IN_DAYS / (step * RRD_CONSOLIDATION_STEPS);

    vec![
        "create".to_string(),
        rrd_file.display().to_string(),
        "--start".to_string(),
        (start - 10).to_string(),
        "--step".to_string(),
        step.to_string(),
        format!("DS:CPM:GAUGE:{heartbeat}:U:U"),
        format!("DS:SvperHr:GAUGE:{heartbeat}:U:U"),
        format!("RRA:AVERAGE:0.5:1:{day_rows}"),
        format!("RRA:AVERAGE:0.5:{RRD_CONSOLIDATION_STEPS}:{year_rows}"),
    ]
}

/// Map a failed rrdtool invocation to a sink error
fn classify(output: &str) -> SinkError {
    let message = output.trim().to_string();
    if message.contains(OUT_OF_ORDER_MARKER) {
        SinkError::OutOfOrder(message)
    } else {
        SinkError::Rejected(message)
    }
}

/// Run rrdtool and return its stdout, or the classified failure
async fn run(rrdtool: &Path, args: &[String]) -> SinkResult<String> {
    let output = Command::new(rrdtool).args(args).output().await?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(classify(&format!("{stderr}{stdout}")))
}
