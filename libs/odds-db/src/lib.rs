//! Postgres persistence for consumed odds events.
//!
//! One `OddsDatabase` per consumer process. Every inbound record is applied
//! in its own transaction; there are no cross-record transactions.

pub mod applier;
pub mod models;
pub mod schema;

mod matches;
mod odds;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Schema error: {0}")]
    SchemaError(#[from] schema::SchemaError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Incomplete record: {0}")]
    IncompleteRecord(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Odds database manager
pub struct OddsDatabase {
    pool: PgPool,
}

impl OddsDatabase {
    /// Connect, ping, and make sure the schema exists.
    pub async fn connect(db_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(25)
            .min_connections(5)
            .max_lifetime(Duration::from_secs(3600))
            .connect(db_url)
            .await?;

        // Startup ping: a dead database is fatal here, not later.
        sqlx::query("SELECT 1").execute(&pool).await?;

        schema::initialize_schema(&pool).await?;

        info!("database initialized successfully");

        Ok(Self { pool })
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close database connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}
