//! Odds persistence with append-only price history.

use tracing::debug;

use oddsfeed::models::Straight;

use crate::{OddsDatabase, Result};

impl OddsDatabase {
    /// Upsert one odds row per price of a straight and append the observed
    /// price to the immutable history, all in one transaction.
    ///
    /// An odds row is identified by `(key, matchup_id, period, side, type,
    /// designation, participant_id)` where a NULL participant id matches
    /// only NULL.
    pub async fn store_straight(&self, straight: &Straight) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for price in &straight.prices {
            let existing = sqlx::query_as::<_, (i64,)>(
                r#"
                SELECT id FROM odds
                WHERE key = $1 AND matchup_id = $2 AND period = $3 AND side = $4
                  AND type = $5 AND designation = $6
                  AND participant_id IS NOT DISTINCT FROM $7
                "#,
            )
            .bind(&straight.key)
            .bind(straight.matchup_id)
            .bind(straight.period)
            .bind(&straight.side)
            .bind(&straight.bet_type)
            .bind(&price.designation)
            .bind(price.participant_id)
            .fetch_optional(&mut *tx)
            .await?;

            let odd_id = match existing {
                Some((id,)) => {
                    sqlx::query(
                        r#"
                        UPDATE odds SET
                            period = $1,
                            side = $2,
                            status = $3,
                            type = $4,
                            points = $5,
                            latest_price = $6,
                            updated_at = NOW()
                        WHERE id = $7
                        "#,
                    )
                    .bind(straight.period)
                    .bind(&straight.side)
                    .bind(&straight.status)
                    .bind(&straight.bet_type)
                    .bind(price.points)
                    .bind(price.price)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                    id
                }
                None => {
                    let (id,) = sqlx::query_as::<_, (i64,)>(
                        r#"
                        INSERT INTO odds (key, matchup_id, period, side, status, type,
                                          designation, points, participant_id, latest_price)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                        RETURNING id
                        "#,
                    )
                    .bind(&straight.key)
                    .bind(straight.matchup_id)
                    .bind(straight.period)
                    .bind(&straight.side)
                    .bind(&straight.status)
                    .bind(&straight.bet_type)
                    .bind(&price.designation)
                    .bind(price.points)
                    .bind(price.participant_id)
                    .bind(price.price)
                    .fetch_one(&mut *tx)
                    .await?;
                    id
                }
            };

            sqlx::query("INSERT INTO price_values (odd_id, value) VALUES ($1, $2)")
                .bind(odd_id)
                .bind(price.price)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(
            matchup_id = straight.matchup_id,
            key = %straight.key,
            prices = straight.prices.len(),
            "straight stored"
        );
        Ok(())
    }
}
