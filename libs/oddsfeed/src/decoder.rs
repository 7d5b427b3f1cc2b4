//! Feed decoding.
//!
//! Each captured message is one complete JSON document: either a full match
//! array or a full straight array. Parse failures are logged and the message
//! dropped; they must never stop the pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::error;

use crate::capture::FeedReceiver;
use crate::models::{Match, Straight};
use crate::store::OddsStore;

pub fn decode_matches(body: &[u8]) -> Option<Vec<Match>> {
    match serde_json::from_slice(body) {
        Ok(matches) => Some(matches),
        Err(e) => {
            error!("failed to decode match feed: {e}");
            None
        }
    }
}

pub fn decode_straights(body: &[u8]) -> Option<Vec<Straight>> {
    match serde_json::from_slice(body) {
        Ok(straights) => Some(straights),
        Err(e) => {
            error!("failed to decode straight feed: {e}");
            None
        }
    }
}

/// Bridge the match byte channel into the store. Runs until the capture
/// side closes its channel.
pub async fn run_match_decoder(mut feed: FeedReceiver, store: Arc<OddsStore>) {
    while let Some(body) = feed.recv().await {
        if let Some(matches) = decode_matches(&body) {
            if matches.is_empty() {
                continue;
            }
            store.ingest_matches(matches).await;
        }
    }
}

/// Bridge the straight byte channel into the store, grouping each payload
/// by matchup id before ingest.
pub async fn run_bet_decoder(mut feed: FeedReceiver, store: Arc<OddsStore>) {
    while let Some(body) = feed.recv().await {
        if let Some(straights) = decode_straights(&body) {
            if straights.is_empty() {
                continue;
            }
            let mut batches: HashMap<i64, Vec<Straight>> = HashMap::new();
            for straight in straights {
                batches.entry(straight.matchup_id).or_default().push(straight);
            }
            store.ingest_bets(batches).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_dropped() {
        assert!(decode_matches(b"{{{{").is_none());
        assert!(decode_straights(b"[{\"matchupId\":").is_none());
    }

    #[test]
    fn match_array_decodes() {
        let body = br#"[{"id":42,"parentId":42,"isLive":true,"bestOfX":3}]"#;
        let matches = decode_matches(body).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 42);
        assert_eq!(matches[0].best_of_x, 3);
    }

    #[test]
    fn straight_array_decodes_with_prices() {
        let body = br#"[{"matchupId":7,"key":"s;0;m","type":"moneyline","prices":[{"designation":"home","price":-120}]}]"#;
        let straights = decode_straights(body).unwrap();
        assert_eq!(straights[0].prices[0].price, -120);
        assert!(straights[0].prices[0].participant_id.is_none());
    }
}
