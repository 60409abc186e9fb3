use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use radmon::{config::load_config, storage::rrdtool::RrdtoolSink};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Create the rrdtool database the radmon agent writes to
#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short, long)]
    config: Option<String>,

    /// Seconds between database updates (defaults to the configured interval)
    #[arg(short, long)]
    step: Option<u64>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("radmon", LevelFilter::INFO),
        ("radmon_create_rrd", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = load_config(args.config)?;
    let step = Duration::from_secs(args.step.unwrap_or(config.database_interval));

    if let Some(parent) = config.storage.rrd_file.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let created = RrdtoolSink::create(&config.storage, step, Utc::now().timestamp())
        .await
        .context("rrdtool create failed")?;

    if created {
        info!("created {}", config.storage.rrd_file.display());
    }

    Ok(())
}
