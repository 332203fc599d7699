#![doc = include_str!("../README.md")]

use anyhow::Context;
use chrono_tz::Tz;
use clap::Parser;
use departure_display::{DisplayScheduler, Sink};
use departure_feed::watch_departures;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod board;
mod config;

use board::TrackBoard;
use config::BoardConfig;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the board configuration (JSON).
    #[arg(env = "BOARD_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// How long each line stays on the display, in milliseconds.
    #[arg(env, long, default_value_t = 2000)]
    rotation_interval_ms: u64,

    /// How long to wait before reconnecting once the feed goes away, in seconds.
    #[arg(env, long, default_value_t = 5)]
    restart_delay_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        // Standard logger, configured via the RUST_LOG env variable
        .with(tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env()))
        .init();

    let config = BoardConfig::load(&cli.config)?;
    let timezone = config.timezone()?;
    let sink = Sink::from_url(config.display_url.as_deref()).context("Unable to set up the display")?;
    let mut display =
        DisplayScheduler::with_interval(sink, Duration::from_millis(cli.rotation_interval_ms));
    let mut board = TrackBoard::new(config.track.clone());

    info!(
        station = %config.station,
        track = %board.track(),
        display = config.display_url.as_deref().unwrap_or("console"),
        "Departure board started"
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Unable to listen for Ctrl-C")?;
            info!("Ctrl-C received; shutting down...");
        }
        () = run(
            &config.station,
            timezone,
            &mut board,
            &mut display,
            Duration::from_secs(cli.restart_delay_secs),
        ) => {}
    }

    Ok(())
}

/// Feeds departures to the display until the process is stopped.
///
/// Each time the feed drops, the watch is started over from scratch after `restart_delay`.
async fn run(
    station: &str,
    timezone: Tz,
    board: &mut TrackBoard,
    display: &mut DisplayScheduler,
    restart_delay: Duration,
) {
    loop {
        let departures = watch_departures(station, timezone);
        futures::pin_mut!(departures);

        while let Some(projection) = departures.next().await {
            match projection {
                Ok(projection) => {
                    if let Some(lines) = board.accept(&projection) {
                        info!(departures = %lines.join(", "), "Departures changed");
                        display.show(lines).await;
                    }
                }
                Err(e) => {
                    error!("Departure feed failed: {e}");
                }
            }
        }

        warn!("Departure feed ended; reconnecting in {restart_delay:?}");
        tokio::time::sleep(restart_delay).await;
    }
}
