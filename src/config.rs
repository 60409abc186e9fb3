use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

/// Where the measurement timestamp comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    /// Use the UTC timestamp reported by the device
    #[default]
    Device,

    /// Use the agent's own wall clock (device not NTP synchronized)
    Server,
}

/// What happens to the output files once the device is declared offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfflinePolicy {
    /// Overwrite the snapshot with a blanked offline record
    #[default]
    Blank,

    /// Delete the snapshot and raw input files
    Remove,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default = "default_device_url")]
    pub device_url: String,

    /// Fetch this URL verbatim instead of the device endpoints
    pub mirror_url: Option<String>,

    /// Seconds between device requests
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval: u64,

    /// Seconds between time-series updates
    #[serde(default = "default_database_interval")]
    pub database_interval: u64,

    /// Seconds between chart regenerations
    #[serde(default = "default_chart_interval")]
    pub chart_interval: u64,

    /// Seconds to wait for the device to answer
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Consecutive failed cycles before the device is declared offline
    #[serde(default = "default_offline_threshold")]
    pub offline_threshold: usize,

    #[serde(default)]
    pub clock: ClockSource,

    #[serde(default)]
    pub offline_policy: OfflinePolicy,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct OutputConfig {
    /// JSON snapshot read by the web pages
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: PathBuf,

    /// Raw device payload for mirror servers
    pub input_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot_file: default_snapshot_file(),
            input_file: None,
        }
    }
}

/// rrdtool storage and chart configuration
#[derive(Debug, Clone, serde::Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_rrd_file")]
    pub rrd_file: PathBuf,

    #[serde(default = "default_charts_dir")]
    pub charts_dir: PathBuf,

    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    #[serde(default = "default_chart_height")]
    pub chart_height: u32,

    #[serde(default = "default_rrdtool")]
    pub rrdtool: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            rrd_file: default_rrd_file(),
            charts_dir: default_charts_dir(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
            rrdtool: default_rrdtool(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_url: default_device_url(),
            mirror_url: None,
            fetch_interval: default_fetch_interval(),
            database_interval: default_database_interval(),
            chart_interval: default_chart_interval(),
            http_timeout: default_http_timeout(),
            retry: RetryConfig::default(),
            offline_threshold: default_offline_threshold(),
            clock: ClockSource::default(),
            offline_policy: OfflinePolicy::default(),
            output: OutputConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval)
    }

    pub fn database_interval(&self) -> Duration {
        Duration::from_secs(self.database_interval)
    }

    pub fn chart_interval(&self) -> Duration {
        Duration::from_secs(self.chart_interval)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry.delay_ms)
    }

    /// Reject settings the control loop cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fetch_interval == 0 {
            anyhow::bail!("fetch interval must be at least one second");
        }
        if self.database_interval == 0 || self.chart_interval == 0 {
            anyhow::bail!("database and chart intervals must be at least one second");
        }
        if self.http_timeout == 0 {
            anyhow::bail!("http timeout must be at least one second");
        }
        if self.offline_threshold == 0 {
            anyhow::bail!("offline threshold must be at least one failed request");
        }
        if self.mirror_url.is_none() && self.device_url.trim().is_empty() {
            anyhow::bail!("no radiation monitor url configured");
        }
        Ok(())
    }
}

fn default_device_url() -> String {
    crate::util::get_device_url()
}

fn default_fetch_interval() -> u64 {
    5
}

fn default_database_interval() -> u64 {
    30
}

fn default_chart_interval() -> u64 {
    300
}

fn default_http_timeout() -> u64 {
    3
}

fn default_max_retries() -> usize {
    5
}

fn default_retry_delay_ms() -> u64 {
    1100
}

fn default_offline_threshold() -> usize {
    2
}

fn default_snapshot_file() -> PathBuf {
    PathBuf::from("./radmon/dynamic/radmonOutputData.js")
}

fn default_rrd_file() -> PathBuf {
    PathBuf::from("./radmon/database/radmonData.rrd")
}

fn default_charts_dir() -> PathBuf {
    PathBuf::from("./radmon/dynamic")
}

fn default_chart_width() -> u32 {
    600
}

fn default_chart_height() -> u32 {
    150
}

fn default_rrdtool() -> PathBuf {
    PathBuf::from("rrdtool")
}

/// Load the config file given on the command line or in `RADMON_CONFIG`,
/// falling back to the defaults
pub fn load_config(path: Option<String>) -> anyhow::Result<Config> {
    match path.or_else(crate::util::get_config_file) {
        Some(path) => read_config_file(&path),
        None => Ok(Config::default()),
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
