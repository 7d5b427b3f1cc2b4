//! Consumer executable.
//!
//! Single-threaded poll loop: each message is decoded and fully applied to
//! the database before the next poll. Poll timeouts are not errors; any
//! other broker error ends the run. On SIGINT/SIGTERM the loop stops, the
//! database closes first and the broker consumer after it.

use anyhow::Result;
use rdkafka::consumer::Consumer;
use rdkafka::Message;
use tracing::{error, info};

use odds_db::applier::EventApplier;
use odds_db::OddsDatabase;
use oddsfeed::consumer::{create_consumer, POLL_TIMEOUT};
use oddsfeed::{decode_event, init_tracing, Options, ShutdownManager};
use pinnacle_feed::bin_common::config_path_from_env;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let opts = Options::load(config_path_from_env())?;
    info!("consumer starting");

    // An unreachable database at startup is fatal.
    let db = OddsDatabase::connect(&opts.db_connection).await?;
    let applier = EventApplier::new(db);

    let consumer = create_consumer(&opts)?;
    consumer.subscribe(&[opts.kafka_topic.as_str()])?;
    info!(topic = %opts.kafka_topic, "subscribed to topic");

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    while shutdown.is_running() {
        match tokio::time::timeout(POLL_TIMEOUT, consumer.recv()).await {
            // Poll timeout: nothing to read right now.
            Err(_) => continue,
            Ok(Ok(message)) => {
                if let Some(payload) = message.payload() {
                    if let Some(event) = decode_event(payload) {
                        applier.apply(event).await;
                    }
                }
            }
            Ok(Err(e)) => {
                error!("kafka consumer error: {e}");
                break;
            }
        }
    }

    // Database first, broker consumer second.
    applier.close().await;
    drop(consumer);
    info!("consumer stopped");
    Ok(())
}
