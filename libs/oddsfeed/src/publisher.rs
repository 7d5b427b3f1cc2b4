//! Event publisher.
//!
//! Five long-running tasks, one per store signal channel. Each reads an
//! advisory count, drains the matching endpoint, wraps the result in an
//! event envelope and hands it to the broker without blocking. The store
//! itself is the only buffer: on a full broker queue the payload is
//! abandoned after a short backoff and the next signal is read.
//!
//! Delivery reports are drained by the producer's poll thread, which calls
//! back into [`DeliveryLogger`] for every failed message.

use std::sync::Arc;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, KafkaResult, RDKafkaErrorCode};
use rdkafka::producer::{BaseRecord, DeliveryResult, Producer, ProducerContext, ThreadedProducer};
use rdkafka::ClientContext;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Options;
use crate::events::{Envelope, EventKind};
use crate::store::{OddsStore, StoreSignals};

/// Producer identity on the broker.
pub const CLIENT_ID: &str = "pinnacle-parser";

const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(200);

/// Logs per-message delivery failures reported by the broker.
pub struct DeliveryLogger;

impl ClientContext for DeliveryLogger {}

impl ProducerContext for DeliveryLogger {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _delivery_opaque: ()) {
        if let Err((e, _)) = delivery_result {
            error!("message delivery failed: {e}");
        }
    }
}

/// Serialize one outbound envelope to its wire bytes.
pub fn envelope_payload<T: Serialize>(kind: EventKind, data: Vec<T>) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&Envelope::new(kind, data))
}

pub struct EventPublisher {
    producer: ThreadedProducer<DeliveryLogger>,
    topic: String,
    store: Arc<OddsStore>,
}

impl EventPublisher {
    pub fn new(opts: &Options, store: Arc<OddsStore>) -> KafkaResult<Self> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", opts.kafka_endpoint())
            .set("client.id", CLIENT_ID)
            .set("acks", "all")
            .create_with_context(DeliveryLogger)?;

        info!(
            endpoint = %opts.kafka_endpoint(),
            topic = %opts.kafka_topic,
            "kafka producer ready"
        );

        Ok(Self {
            producer,
            topic: opts.kafka_topic.clone(),
            store,
        })
    }

    /// Spawn the five publishing tasks. The signal channels are never
    /// closed at runtime, so the tasks live for the rest of the process.
    pub fn spawn(self: Arc<Self>, signals: StoreSignals) -> Vec<JoinHandle<()>> {
        let StoreSignals {
            mut new_matches,
            mut upd_matches,
            mut new_bets,
            mut upd_bets,
            mut del_matches,
        } = signals;

        let mut handles = Vec::with_capacity(5);

        let publisher = Arc::clone(&self);
        handles.push(tokio::spawn(async move {
            while let Some(n) = new_matches.recv().await {
                let matches = publisher.store.drain_new_matches();
                if matches.is_empty() {
                    continue;
                }
                debug!(signalled = n, drained = matches.len(), "publishing new matches");
                publisher.publish(EventKind::MatchNew, matches).await;
            }
        }));

        let publisher = Arc::clone(&self);
        handles.push(tokio::spawn(async move {
            while let Some(n) = upd_matches.recv().await {
                let patches = publisher.store.drain_updated_matches();
                if patches.is_empty() {
                    continue;
                }
                debug!(signalled = n, drained = patches.len(), "publishing match updates");
                publisher.publish(EventKind::MatchUpdate, patches).await;
            }
        }));

        let publisher = Arc::clone(&self);
        handles.push(tokio::spawn(async move {
            while let Some(n) = new_bets.recv().await {
                let bets = publisher.store.drain_new_bets();
                if bets.is_empty() {
                    continue;
                }
                debug!(signalled = n, drained = bets.len(), "publishing new bets");
                publisher.publish(EventKind::BetNew, bets).await;
            }
        }));

        let publisher = Arc::clone(&self);
        handles.push(tokio::spawn(async move {
            while let Some(n) = upd_bets.recv().await {
                let patches = publisher.store.drain_updated_bets();
                if patches.is_empty() {
                    continue;
                }
                debug!(signalled = n, drained = patches.len(), "publishing bet updates");
                publisher.publish(EventKind::BetUpdate, patches).await;
            }
        }));

        let publisher = Arc::clone(&self);
        handles.push(tokio::spawn(async move {
            // Deletions arrive with their payload; there is nothing left in
            // the store to drain.
            while let Some(ids) = del_matches.recv().await {
                debug!(count = ids.len(), "publishing match deletions");
                publisher.publish(EventKind::MatchDelete, ids).await;
            }
        }));

        handles
    }

    async fn publish<T: Serialize>(&self, kind: EventKind, data: Vec<T>) {
        let payload = match envelope_payload(kind, data) {
            Ok(payload) => payload,
            Err(e) => {
                error!("failed to serialize event payload: {e}");
                return;
            }
        };

        match self
            .producer
            .send(BaseRecord::<(), Vec<u8>>::to(&self.topic).payload(&payload))
        {
            Ok(()) => {}
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                // The payload is dropped; undrained statuses will surface it
                // again on a later signal.
                warn!("broker queue full, backing off");
                sleep(QUEUE_FULL_BACKOFF).await;
            }
            Err((e, _)) => {
                error!("kafka produce error: {e}");
            }
        }
    }

    /// Flush outstanding messages, used on shutdown.
    pub fn flush(&self, timeout: Duration) {
        if let Err(e) = self.producer.flush(timeout) {
            error!("kafka flush failed: {e}");
        }
    }
}
