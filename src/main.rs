use anyhow::Result;
use clap::Parser;
use flocknet_lib::app::{load_config, Harness};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Simulated seconds to run
    #[arg(short, long, default_value_t = 10.0)]
    duration: f64,

    /// Seed for spawning and packet loss
    #[arg(long)]
    seed: Option<u64>,

    /// Probability of losing a location batch
    #[arg(long)]
    drop_rate: Option<f64>,

    /// Number of observers
    #[arg(long)]
    observers: Option<usize>,

    /// Pace frames in wall-clock time instead of running flat out
    #[arg(long)]
    realtime: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "flocknet=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if args.seed.is_some() {
        config.simulation.seed = args.seed;
    }
    if let Some(drop_rate) = args.drop_rate {
        config.link.drop_rate = drop_rate;
    }
    if let Some(observers) = args.observers {
        config.link.observers = observers;
    }
    config.validate()?;

    let fps = config.target_fps;
    let dt = 1.0 / fps as f32;
    let frames = (args.duration.max(0.0) * fps as f64).ceil() as u64;

    let mut harness = Harness::new(config)?;
    harness.connect()?;
    tracing::info!(
        agents = harness.authority().directory().len(),
        observers = harness.observer_count(),
        frames,
        "Harness connected"
    );

    let mut interval = tokio::time::interval(Duration::from_secs_f32(dt));
    for frame in 1..=frames {
        if args.realtime {
            interval.tick().await;
        }
        let report = harness.frame(dt)?;
        if report.unresolved > 0 {
            tracing::debug!(unresolved = report.unresolved, "Observers dropped unknown records");
        }

        if frame % fps == 0 {
            let net = harness.net_summary();
            tracing::info!(
                time = harness.clock(),
                out_bytes_per_sec = net.out_bytes_per_sec,
                in_bytes_per_sec = net.in_bytes_per_sec,
                lost = net.lost,
                throttled = net.throttled,
                divergence = harness.max_divergence(),
                "Net stats"
            );
        }
    }

    let net = harness.net_summary();
    let metrics = harness.authority().replicator().metrics();
    tracing::info!(
        frames = harness.frames(),
        ticks = metrics.ticks(),
        batches = metrics.batches_sent(),
        records = metrics.records_sent(),
        bytes_sent = net.bytes_sent,
        messages_sent = net.messages_sent,
        lost = net.lost,
        throttled = net.throttled,
        divergence = harness.max_divergence(),
        "Run finished"
    );

    Ok(())
}
