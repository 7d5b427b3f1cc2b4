//! Capture seam.
//!
//! The browser-automation layer that watches the bookmaker's web application
//! lives outside this workspace. Its contract with the pipeline is two
//! bounded byte channels, one per feed kind, where every message is one
//! complete JSON document.

pub mod simulator;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Buffer depth for each feed channel.
pub const FEED_CHANNEL_BUFFER: usize = 10;

pub type FeedSender = mpsc::Sender<Vec<u8>>;
pub type FeedReceiver = mpsc::Receiver<Vec<u8>>;

/// Sending ends handed to a capture source.
pub struct FeedSenders {
    pub matches: FeedSender,
    pub bets: FeedSender,
}

/// Receiving ends consumed by the decode loops.
pub struct FeedReceivers {
    pub matches: FeedReceiver,
    pub bets: FeedReceiver,
}

pub fn feed_channels() -> (FeedSenders, FeedReceivers) {
    let (matches_tx, matches_rx) = mpsc::channel(FEED_CHANNEL_BUFFER);
    let (bets_tx, bets_rx) = mpsc::channel(FEED_CHANNEL_BUFFER);
    (
        FeedSenders {
            matches: matches_tx,
            bets: bets_tx,
        },
        FeedReceivers {
            matches: matches_rx,
            bets: bets_rx,
        },
    )
}

/// A source of raw feed documents.
///
/// Implementations run until the shutdown flag clears or the receiving side
/// goes away. Dropping the senders on return closes the decode loops.
#[async_trait]
pub trait CaptureSource: Send {
    async fn run(self: Box<Self>, feeds: FeedSenders, running: Arc<AtomicBool>) -> anyhow::Result<()>;
}
