//! Odds feed pipeline core.
//!
//! The producer half captures bookmaker feed documents, diffs them against
//! an in-memory store and publishes typed new/update/delete events onto a
//! broker topic. The consumer half decodes those events; persistence lives
//! in the `odds-db` crate.

pub mod capture;
pub mod config;
pub mod consumer;
pub mod decoder;
pub mod events;
pub mod merge;
pub mod models;
pub mod publisher;
pub mod store;
pub mod utils;

// Re-export commonly used items
pub use config::Options;
pub use events::{decode_event, Envelope, EventKind, FeedEvent, SOURCE};
pub use merge::{apply_merge_patch, merge_patch};
pub use models::{Match, MatchPatch, Straight, StraightPatch};
pub use store::{OddsStore, StoreSignals, StoreStats};
pub use utils::{init_tracing, Heartbeat, ShutdownManager};
