use sqlx::PgPool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

/// Database schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize database schema
pub async fn initialize_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sports (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leagues (
            id BIGINT PRIMARY KEY,
            sport_id BIGINT NOT NULL REFERENCES sports(id),
            name TEXT NOT NULL,
            group_name TEXT NOT NULL DEFAULT '',
            is_hidden BOOLEAN NOT NULL DEFAULT false,
            is_promoted BOOLEAN NOT NULL DEFAULT false,
            is_sticky BOOLEAN NOT NULL DEFAULT false,
            sequence INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leagues_sport ON leagues(sport_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id BIGINT PRIMARY KEY,
            best_of_x INTEGER NOT NULL DEFAULT 0,
            is_live BOOLEAN NOT NULL DEFAULT false,
            league_id BIGINT NOT NULL REFERENCES leagues(id),
            start_time TIMESTAMPTZ,
            parent_id BIGINT NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_parent ON matches(parent_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS match_participants (
            id BIGSERIAL PRIMARY KEY,
            match_id BIGINT NOT NULL,
            team_id BIGINT NOT NULL REFERENCES teams(id),
            alignment TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_match_participants_match ON match_participants(match_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS odds (
            id BIGSERIAL PRIMARY KEY,
            key TEXT NOT NULL,
            matchup_id BIGINT NOT NULL,
            period INTEGER NOT NULL DEFAULT 0,
            side TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT '',
            type TEXT NOT NULL DEFAULT '',
            designation TEXT NOT NULL DEFAULT '',
            points DOUBLE PRECISION NOT NULL DEFAULT 0,
            participant_id BIGINT,
            latest_price INTEGER NOT NULL DEFAULT 0,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Uniqueness over the odd identity tuple; NULL participant ids compare
    // equal through the COALESCE sentinel.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_odds_identity
        ON odds(key, matchup_id, period, side, type, designation, COALESCE(participant_id, -1))
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_odds_matchup ON odds(matchup_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS price_values (
            id BIGSERIAL PRIMARY KEY,
            odd_id BIGINT NOT NULL REFERENCES odds(id),
            value INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_price_values_odd ON price_values(odd_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT INTO schema_version (version) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

/// Get current schema version
pub async fn get_schema_version(pool: &PgPool) -> Result<Option<i32>> {
    let row = sqlx::query_as::<_, (i32,)>(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(version,)| version))
}
