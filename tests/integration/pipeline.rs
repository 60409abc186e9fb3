//! End-to-end tests for the fetch → parse → convert → publish pipeline

use std::time::Duration;

use pretty_assertions::assert_eq;
use radmon::Status;
use radmon::config::ClockSource;
use radmon::storage::DataPoint;
use tokio::time::Instant;
use wiremock::MockServer;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_successful_cycle_publishes_everywhere() {
    let mock_server = MockServer::start().await;
    mount_payload(&mock_server, "/rdata", SAMPLE_PAYLOAD).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let (mut agent, sink) = create_test_agent(&config);

    let record = agent.run_cycle(Instant::now()).await.unwrap();
    assert_eq!(record.timestamp, SAMPLE_EPOCH);
    assert_eq!(agent.availability().status(), Status::Online);

    let snapshot = read_snapshot(&config.output.snapshot_file);
    assert_eq!(snapshot["CPM"], "26");
    assert_eq!(snapshot["CPS"], "0");
    assert_eq!(snapshot["uSvPerHr"], "0.14");
    assert_eq!(snapshot["mode"], "slow");
    assert_eq!(snapshot["status"], "online");
    assert_eq!(snapshot["date"], record.date.as_str());

    let points = sink.points().await;
    assert_eq!(points.len(), 1);
    let DataPoint {
        timestamp,
        cpm,
        sv_per_hr,
    } = points[0];
    assert_eq!(timestamp, SAMPLE_EPOCH);
    assert_eq!(cpm, 26);
    assert!((sv_per_hr - 0.14e-6).abs() < 1e-18);

    let raw = std::fs::read_to_string(config.output.input_file.as_ref().unwrap()).unwrap();
    assert_eq!(raw, format!("{SAMPLE_PAYLOAD}\n"));
}

#[tokio::test]
async fn test_database_updates_on_their_own_cadence() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let (mut agent, sink) = create_test_agent(&config);
    let start = Instant::now();

    mount_payload(&mock_server, "/rdata", &payload("17:09:33 06/22/2021", 26, "0.14", "SLOW")).await;
    agent.run_cycle(start).await.unwrap();

    mock_server.reset().await;
    mount_payload(&mock_server, "/rdata", &payload("17:09:38 06/22/2021", 30, "0.16", "SLOW")).await;
    agent.run_cycle(start + Duration::from_secs(5)).await.unwrap();

    // snapshot follows every cycle, the database only every 30 seconds
    assert_eq!(read_snapshot(&config.output.snapshot_file)["CPM"], "30");
    assert_eq!(sink.points().await.len(), 1);

    mock_server.reset().await;
    mount_payload(&mock_server, "/rdata", &payload("17:10:03 06/22/2021", 28, "0.15", "SLOW")).await;
    agent.run_cycle(start + Duration::from_secs(30)).await.unwrap();

    let timestamps: Vec<i64> = sink.points().await.iter().map(|p| p.timestamp).collect();
    assert_eq!(timestamps, vec![SAMPLE_EPOCH, SAMPLE_EPOCH + 30]);
}

#[tokio::test]
async fn test_out_of_order_update_requests_device_reset() {
    let mock_server = MockServer::start().await;
    mount_payload(&mock_server, "/rdata", SAMPLE_PAYLOAD).await;

    Mock::given(method("GET"))
        .and(path("/reset"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_PAYLOAD))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let (mut agent, sink) = create_test_agent(&config);
    let start = Instant::now();

    agent.run_cycle(start).await.unwrap();

    // the device repeats its timestamp, the store refuses it
    agent.run_cycle(start + Duration::from_secs(30)).await.unwrap();
    assert_eq!(sink.points().await.len(), 1);

    // next fetch goes to the reset endpoint, the one after back to rdata
    agent.run_cycle(start + Duration::from_secs(35)).await.unwrap();
    agent.run_cycle(start + Duration::from_secs(40)).await.unwrap();

    let paths: Vec<String> = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    assert_eq!(paths, vec!["/rdata", "/rdata", "/reset", "/rdata"]);
}

#[tokio::test]
async fn test_server_clock_tolerates_unsynchronized_device() {
    let mock_server = MockServer::start().await;
    mount_payload(&mock_server, "/rdata", &payload("??:??:?? 00/00/0000", 12, "0.07", "FAST")).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.clock = ClockSource::Server;
    let (mut agent, sink) = create_test_agent(&config);

    let before = chrono::Utc::now().timestamp();
    let record = agent.run_cycle(Instant::now()).await.unwrap();

    assert!(record.timestamp >= before);
    assert_eq!(record.mode, "fast");
    assert_eq!(sink.points().await[0].timestamp, record.timestamp);
}

#[tokio::test]
async fn test_tick_starts_chart_regeneration_in_background() {
    let mock_server = MockServer::start().await;
    mount_payload(&mock_server, "/rdata", SAMPLE_PAYLOAD).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let (mut agent, sink) = create_test_agent(&config);
    let start = Instant::now();

    agent.tick(start).await;
    assert!(wait_until(1000, || sink.chart_runs() == 1).await);

    // chart interval is 300 seconds, fetch interval 1 second
    agent.tick(start + Duration::from_secs(1)).await;
    agent.tick(start + Duration::from_secs(2)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.chart_runs(), 1);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);

    agent.tick(start + Duration::from_secs(300)).await;
    assert!(wait_until(1000, || sink.chart_runs() == 2).await);
}

#[tokio::test]
async fn test_tick_skips_fetch_before_interval() {
    let mock_server = MockServer::start().await;
    mount_payload(&mock_server, "/rdata", SAMPLE_PAYLOAD).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.fetch_interval = 5;
    let (mut agent, _sink) = create_test_agent(&config);
    let start = Instant::now();

    agent.tick(start).await;
    agent.tick(start + Duration::from_secs(2)).await;
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);

    agent.tick(start + Duration::from_secs(5)).await;
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_run_removes_snapshot_on_shutdown() {
    let mock_server = MockServer::start().await;
    mount_payload(&mock_server, "/rdata", SAMPLE_PAYLOAD).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let (agent, _sink) = create_test_agent(&config);
    let snapshot_file = config.output.snapshot_file.clone();
    let input_file = config.output.input_file.clone().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let controller = async {
        assert!(wait_until(3000, || snapshot_file.exists()).await);
        shutdown_tx.send(true).unwrap();
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(agent.run(shutdown_rx), controller);
    })
    .await
    .expect("agent did not stop after shutdown");

    assert!(!snapshot_file.exists());
    assert!(!input_file.exists());
}

#[tokio::test]
async fn test_run_subtracts_cycle_time_from_sleep() {
    let mock_server = MockServer::start().await;
    mount_slow_payload(
        &mock_server,
        "/rdata",
        SAMPLE_PAYLOAD,
        Duration::from_millis(500),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.http_timeout = 2;
    let (agent, _sink) = create_test_agent(&config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // cycles start at 0s, 1s, 2s and 3s; sleeping the full interval after
    // each 500ms request would start them at 0s, 1.5s and 3s instead
    let controller = async {
        tokio::time::sleep(Duration::from_millis(3500)).await;
        shutdown_tx.send(true).unwrap();
    };

    tokio::time::timeout(Duration::from_secs(8), async {
        tokio::join!(agent.run(shutdown_rx), controller);
    })
    .await
    .expect("agent did not stop after shutdown");

    assert_eq!(mock_server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_shutdown_lets_running_cycle_finish() {
    let mock_server = MockServer::start().await;
    mount_slow_payload(
        &mock_server,
        "/rdata",
        SAMPLE_PAYLOAD,
        Duration::from_millis(500),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.http_timeout = 2;
    let (agent, sink) = create_test_agent(&config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let controller = async {
        loop {
            if !mock_server.received_requests().await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // the device is still holding back its answer
        shutdown_tx.send(true).unwrap();
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(agent.run(shutdown_rx), controller);
    })
    .await
    .expect("agent did not stop after shutdown");

    let points = sink.points().await;
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].timestamp, SAMPLE_EPOCH);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
    assert!(!config.output.snapshot_file.exists());
}
