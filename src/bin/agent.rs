use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use radmon::{
    agent::Agent,
    config::load_config,
    storage::{TimeSeriesSink, memory::MemorySink, rrdtool::RrdtoolSink},
};
use tokio::sync::watch;
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose debugging output
    #[arg(short, long)]
    debug: bool,

    /// Seconds between requests to the radiation monitor
    #[arg(short = 't', long)]
    interval: Option<u64>,

    /// URL of the radiation monitor
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// Keep samples in memory instead of the rrdtool database
    #[arg(long)]
    memory: bool,
}

fn init(debug: bool) {
    let level = if debug {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![("radmon", level), ("radmon_agent", level)]);
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
    let args = Args::parse();
    init(args.debug);
    trace!("started with args: {args:?}");

    let mut config = load_config(args.config)?;
    if let Some(interval) = args.interval {
        config.fetch_interval = interval;
    }
    if let Some(url) = args.url {
        config.device_url = url;
    }
    config.validate()?;

    let sink: Arc<dyn TimeSeriesSink> = if args.memory {
        warn!("using in-memory storage, samples are lost on exit");
        Arc::new(MemorySink::new())
    } else {
        let sink = RrdtoolSink::open(&config.storage)
            .context("use radmon-create-rrd to create the rrdtool database")?;
        Arc::new(sink)
    };

    let agent = Agent::new(&config, sink)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_shutdown(shutdown_tx));

    agent.run(shutdown_rx).await;

    Ok(())
}

async fn wait_for_shutdown(shutdown: watch::Sender<bool>) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("received termination signal, finishing current cycle");
    let _ = shutdown.send(true);
}
