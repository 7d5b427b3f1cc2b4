//! Broker consumer configuration.
//!
//! The poll loop itself lives in the consumer binary; this module owns the
//! client settings so producer and consumer stay with one source of truth
//! for broker parameters.

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::StreamConsumer;
use rdkafka::error::KafkaResult;
use tracing::info;

use crate::config::Options;

/// Consumer group identity on the broker.
pub const GROUP_ID: &str = "pinnacle-consumer";

/// Poll timeout; elapsing is not an error.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub fn create_consumer(opts: &Options) -> KafkaResult<StreamConsumer> {
    let consumer = ClientConfig::new()
        .set("bootstrap.servers", opts.kafka_endpoint())
        .set("group.id", GROUP_ID)
        .set("auto.offset.reset", "earliest")
        .set("enable.auto.commit", "true")
        .create()?;

    info!(
        endpoint = %opts.kafka_endpoint(),
        group = GROUP_ID,
        "kafka consumer ready"
    );

    Ok(consumer)
}
