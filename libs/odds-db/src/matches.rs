//! Match hierarchy persistence: sports, leagues, teams, participants and
//! the matches themselves.

use sqlx::{Postgres, Transaction};
use tracing::{debug, warn};

use oddsfeed::models::{League, Match, Participant, Sport};

use crate::models::{DbMatchDetail, DbParticipant};
use crate::{DatabaseError, OddsDatabase, Result};

impl OddsDatabase {
    /// Upsert a sport by id.
    pub async fn store_sport(&self, sport: &Sport) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sports (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(sport.id)
        .bind(&sport.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert a league by id, making sure its sport exists first.
    pub async fn store_league(&self, league: &League) -> Result<()> {
        let sport = league.sport.as_ref().ok_or_else(|| {
            DatabaseError::IncompleteRecord(format!("league {} has no sport", league.id))
        })?;
        self.store_sport(sport).await?;

        sqlx::query(
            r#"
            INSERT INTO leagues (id, sport_id, name, group_name, is_hidden, is_promoted, is_sticky, sequence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                sport_id = EXCLUDED.sport_id,
                name = EXCLUDED.name,
                group_name = EXCLUDED.group_name,
                is_hidden = EXCLUDED.is_hidden,
                is_promoted = EXCLUDED.is_promoted,
                is_sticky = EXCLUDED.is_sticky,
                sequence = EXCLUDED.sequence
            "#,
        )
        .bind(league.id)
        .bind(sport.id)
        .bind(&league.name)
        .bind(&league.group)
        .bind(league.is_hidden)
        .bind(league.is_promoted)
        .bind(league.is_sticky)
        .bind(league.sequence)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert a full match: league hierarchy, the match row, then the
    /// participant relation (replaced wholesale).
    pub async fn store_match(&self, m: &Match) -> Result<()> {
        let league = m.league.as_ref().ok_or_else(|| {
            DatabaseError::IncompleteRecord(format!("match {} has no league", m.id))
        })?;
        self.store_league(league).await?;

        sqlx::query(
            r#"
            INSERT INTO matches (id, best_of_x, is_live, league_id, start_time, parent_id, status, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'active', NOW())
            ON CONFLICT (id) DO UPDATE SET
                best_of_x = EXCLUDED.best_of_x,
                is_live = EXCLUDED.is_live,
                league_id = EXCLUDED.league_id,
                start_time = EXCLUDED.start_time,
                parent_id = EXCLUDED.parent_id,
                status = 'active',
                updated_at = NOW()
            "#,
        )
        .bind(m.id)
        .bind(m.best_of_x)
        .bind(m.is_live)
        .bind(league.id)
        .bind(m.start_time)
        .bind(m.parent_id)
        .execute(&self.pool)
        .await?;

        if !m.participants.is_empty() {
            self.replace_participants(m.id, &m.participants).await?;
        }

        debug!(match_id = m.id, "match stored");
        Ok(())
    }

    /// Replace the participant relation of a match in one transaction.
    async fn replace_participants(&self, match_id: i64, participants: &[Participant]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM match_participants WHERE match_id = $1")
            .bind(match_id)
            .execute(&mut *tx)
            .await?;

        for participant in participants {
            let team_id = find_or_create_team(&mut tx, &participant.name).await?;
            sqlx::query(
                "INSERT INTO match_participants (match_id, team_id, alignment) VALUES ($1, $2, $3)",
            )
            .bind(match_id)
            .bind(team_id)
            .bind(&participant.alignment)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Load a persisted match with its league, sport and participants.
    /// Returns `None` when the match is unknown.
    pub async fn get_match(&self, id: i64) -> Result<Option<Match>> {
        let detail = sqlx::query_as::<_, DbMatchDetail>(
            r#"
            SELECT m.id, m.best_of_x, m.is_live, m.start_time, m.parent_id,
                   l.id AS league_id, l.name AS league_name, l.group_name,
                   l.is_hidden, l.is_promoted, l.is_sticky, l.sequence,
                   s.id AS sport_id, s.name AS sport_name
            FROM matches m
            JOIN leagues l ON l.id = m.league_id
            JOIN sports s ON s.id = l.sport_id
            WHERE m.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(detail) = detail else {
            return Ok(None);
        };

        let participants = sqlx::query_as::<_, DbParticipant>(
            r#"
            SELECT t.id AS team_id, t.name, mp.alignment
            FROM match_participants mp
            JOIN teams t ON t.id = mp.team_id
            WHERE mp.match_id = $1
            ORDER BY mp.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(detail.into_match(participants)))
    }

    /// Logical deletion: flag the match and all of its odds. Rows stay in
    /// place for history.
    pub async fn mark_match_deleted(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE matches SET status = 'deleted', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!(match_id = id, "delete event for unknown match");
        }

        sqlx::query(
            "UPDATE odds SET status = 'deleted', updated_at = NOW() WHERE matchup_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Look a team up by name, creating it on first sight.
async fn find_or_create_team(tx: &mut Transaction<'_, Postgres>, name: &str) -> Result<i64> {
    let existing = sqlx::query_as::<_, (i64,)>("SELECT id FROM teams WHERE name = $1 LIMIT 1")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let (id,) = sqlx::query_as::<_, (i64,)>("INSERT INTO teams (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
    Ok(id)
}
