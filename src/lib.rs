//! Pinnacle odds CDC pipeline.
//!
//! Two executables share this workspace: a producer that captures the
//! bookmaker's internal feeds, diffs them in memory and publishes typed
//! change events to a broker topic, and a consumer that applies those
//! events to Postgres with RFC 7396 merge-patch semantics.
//!
//! - **oddsfeed**: delta engine, wire types, broker plumbing (re-exported)
//! - **odds-db**: consumer-side persistence (re-exported)
//! - **bin_common**: shared utilities for the binaries

// Re-export workspace libraries for convenience
pub use odds_db;
pub use oddsfeed;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::config_path_from_env;
}
