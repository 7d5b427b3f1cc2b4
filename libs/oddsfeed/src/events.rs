//! Broker event envelopes.
//!
//! Every message on the topic is UTF-8 JSON of the shape
//! `{ "eventType": <int>, "source": <string>, "data": <array> }`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::models::{Match, Straight};

/// Fixed identifier for this producer instance.
pub const SOURCE: &str = "pinnacle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    MatchNew,
    MatchUpdate,
    MatchDelete,
    BetNew,
    BetUpdate,
}

impl EventKind {
    pub fn code(self) -> i32 {
        match self {
            EventKind::MatchNew => 1,
            EventKind::MatchUpdate => 2,
            EventKind::MatchDelete => 3,
            EventKind::BetNew => 4,
            EventKind::BetUpdate => 5,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(EventKind::MatchNew),
            2 => Some(EventKind::MatchUpdate),
            3 => Some(EventKind::MatchDelete),
            4 => Some(EventKind::BetNew),
            5 => Some(EventKind::BetUpdate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub event_type: i32,
    pub source: String,
    pub data: Vec<T>,
}

impl<T> Envelope<T> {
    pub fn new(kind: EventKind, data: Vec<T>) -> Self {
        Self {
            event_type: kind.code(),
            source: SOURCE.to_string(),
            data,
        }
    }
}

/// A fully decoded inbound event, dispatched by event type.
///
/// Match updates stay as raw JSON objects: the consumer feeds them straight
/// into the RFC 7396 merge, which operates on JSON values.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    MatchNew(Vec<Match>),
    MatchUpdate(Vec<Value>),
    MatchDelete(Vec<i64>),
    BetNew(Vec<Straight>),
    BetUpdate(Vec<Straight>),
}

/// Decode one broker message. Unknown event types and malformed payloads
/// are logged and dropped; they must never stop the poll loop.
pub fn decode_event(payload: &[u8]) -> Option<FeedEvent> {
    let envelope: Envelope<Value> = match serde_json::from_slice(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("failed to decode event envelope: {e}");
            return None;
        }
    };

    let Some(kind) = EventKind::from_code(envelope.event_type) else {
        warn!(
            event_type = envelope.event_type,
            source = %envelope.source,
            "received event with unknown type"
        );
        return None;
    };

    match kind {
        EventKind::MatchNew => reparse(envelope.data).map(FeedEvent::MatchNew),
        EventKind::MatchUpdate => Some(FeedEvent::MatchUpdate(envelope.data)),
        EventKind::MatchDelete => reparse(envelope.data).map(FeedEvent::MatchDelete),
        EventKind::BetNew => reparse(envelope.data).map(FeedEvent::BetNew),
        EventKind::BetUpdate => reparse(envelope.data).map(FeedEvent::BetUpdate),
    }
}

fn reparse<T: DeserializeOwned>(data: Vec<Value>) -> Option<Vec<T>> {
    match serde_json::from_value(Value::Array(data)) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("failed to decode event payload: {e}");
            None
        }
    }
}
