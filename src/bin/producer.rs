//! Producer executable.
//!
//! Wires the pipeline together: capture feeds -> decode -> store -> publish.
//! The browser-automation capture runs as an external service; with
//! `testMode: true` the built-in feed simulator drives the same channels.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{info, warn};

use oddsfeed::capture::simulator::FeedSimulator;
use oddsfeed::capture::{feed_channels, CaptureSource};
use oddsfeed::decoder::{run_bet_decoder, run_match_decoder};
use oddsfeed::publisher::EventPublisher;
use oddsfeed::{init_tracing, Heartbeat, OddsStore, Options, ShutdownManager};
use pinnacle_feed::bin_common::config_path_from_env;

const SIMULATOR_TICK: Duration = Duration::from_secs(1);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config_path = config_path_from_env();
    let opts = Options::load(&config_path)?;
    info!(
        config = %config_path.display(),
        site = %opts.site,
        test_mode = opts.test_mode,
        "producer starting"
    );

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let (store, signals) = OddsStore::new();
    let (feed_tx, feed_rx) = feed_channels();

    tokio::spawn(run_match_decoder(feed_rx.matches, Arc::clone(&store)));
    tokio::spawn(run_bet_decoder(feed_rx.bets, Arc::clone(&store)));

    let publisher = Arc::new(EventPublisher::new(&opts, Arc::clone(&store))?);
    Arc::clone(&publisher).spawn(signals);

    let capture: Box<dyn CaptureSource> = if opts.test_mode {
        Box::new(FeedSimulator::new(SIMULATOR_TICK))
    } else {
        bail!(
            "live capture is provided by the external browser-automation service; \
             set testMode: true to run the built-in feed simulator"
        );
    };
    let capture_task = tokio::spawn(capture.run(feed_tx, shutdown.flag()));

    let mut heartbeat = Heartbeat::new(HEARTBEAT_INTERVAL);
    while shutdown.is_running() {
        shutdown.interruptible_sleep(Duration::from_secs(1)).await;
        if heartbeat.should_beat() {
            let stats = store.stats();
            info!(
                matches = stats.matches,
                bets = stats.bets,
                pending = stats.pending,
                "store status"
            );
            heartbeat.beat();
        }
    }

    // Shutdown order: capture stops first, then the drains get a moment to
    // go quiet, then outstanding broker messages are flushed.
    match capture_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("capture source failed: {e}"),
        Err(e) => warn!("capture task aborted: {e}"),
    }

    let deadline = tokio::time::Instant::now() + DRAIN_GRACE;
    while store.stats().pending > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    publisher.flush(Duration::from_secs(5));
    info!("producer stopped");
    Ok(())
}
