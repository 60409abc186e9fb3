//! Helper functions for integration tests

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use radmon::agent::Agent;
use radmon::config::Config;
use radmon::storage::memory::MemorySink;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SAMPLE_PAYLOAD: &str = "$,UTC=17:09:33 06/22/2021,CPS=0,CPM=26,uSv/hr=0.14,Mode=SLOW,#";

/// 2021-06-22T17:09:33Z
pub const SAMPLE_EPOCH: i64 = 1_624_381_773;

/// Config pointing at `device_url` with all output files inside `dir`
///
/// Retries are disabled so one cycle makes exactly one request.
pub fn create_test_config(device_url: &str, dir: &Path) -> Config {
    let mut config = Config {
        device_url: device_url.to_string(),
        fetch_interval: 1,
        http_timeout: 1,
        offline_threshold: 2,
        ..Config::default()
    };
    config.retry.max_retries = 0;
    config.retry.delay_ms = 10;
    config.output.snapshot_file = dir.join("radmonOutputData.js");
    config.output.input_file = Some(dir.join("radmonInputData.dat"));
    config.storage.rrd_file = dir.join("radmonData.rrd");
    config.storage.charts_dir = dir.to_path_buf();
    config
}

pub fn create_test_agent(config: &Config) -> (Agent, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let agent = Agent::new(config, sink.clone()).unwrap();
    (agent, sink)
}

pub fn payload(utc: &str, cpm: u64, dose: &str, mode: &str) -> String {
    format!("$,UTC={utc},CPS={},CPM={cpm},uSv/hr={dose},Mode={mode},#", cpm / 60)
}

pub async fn mount_payload(server: &MockServer, endpoint: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Device that takes `delay` to answer each request
pub async fn mount_slow_payload(server: &MockServer, endpoint: &str, body: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

pub async fn mount_failure(server: &MockServer, endpoint: &str) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

/// The single object inside the snapshot file
pub fn read_snapshot(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 1, "snapshot must hold exactly one record");
    entries[0].clone()
}

/// Poll `condition` every 10ms until it holds or `timeout_ms` passes
pub async fn wait_until(timeout_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// In-memory log sink for asserting on emitted events
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Subscriber recording `level` and above into `buffer` for the current thread
pub fn capture_logs(buffer: &LogBuffer, level: tracing::Level) -> tracing::subscriber::DefaultGuard {
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(level)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_default(subscriber)
}
