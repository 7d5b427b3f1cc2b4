//! Patch applier: turns decoded feed events into database effects.
//!
//! Delivery is at-least-once; every apply path is idempotent, so replays
//! converge on the same rows. A failure on one record is logged with its id
//! and never stops the loop.

use serde_json::Value;
use tracing::{error, info, warn};

use oddsfeed::merge::apply_merge_patch;
use oddsfeed::models::Match;
use oddsfeed::FeedEvent;

use crate::OddsDatabase;

pub struct EventApplier {
    db: OddsDatabase,
}

impl EventApplier {
    pub fn new(db: OddsDatabase) -> Self {
        Self { db }
    }

    pub async fn apply(&self, event: FeedEvent) {
        match event {
            FeedEvent::MatchNew(matches) => {
                info!(count = matches.len(), "processing new matches");
                for m in matches {
                    if let Err(e) = self.db.store_match(&m).await {
                        error!(match_id = m.id, "failed to store match: {e}");
                    }
                }
            }
            FeedEvent::MatchUpdate(patches) => {
                info!(count = patches.len(), "processing match updates");
                for patch in patches {
                    self.apply_match_patch(patch).await;
                }
            }
            FeedEvent::MatchDelete(ids) => {
                info!(count = ids.len(), "processing match deletions");
                for id in ids {
                    if let Err(e) = self.db.mark_match_deleted(id).await {
                        error!(match_id = id, "failed to delete match: {e}");
                    }
                }
            }
            FeedEvent::BetNew(straights) | FeedEvent::BetUpdate(straights) => {
                info!(count = straights.len(), "processing bets");
                for straight in straights {
                    if let Err(e) = self.db.store_straight(&straight).await {
                        error!(
                            matchup_id = straight.matchup_id,
                            key = %straight.key,
                            "failed to store bet: {e}"
                        );
                    }
                }
            }
        }
    }

    /// RFC 7396 application: load the persisted match, merge the patch over
    /// it, and persist the result through the regular upsert path. An
    /// unknown target is stored as a creation.
    async fn apply_match_patch(&self, patch: Value) {
        let Some(id) = patch_match_id(&patch) else {
            warn!("match update patch without an id, skipping");
            return;
        };

        match self.db.get_match(id).await {
            Ok(Some(current)) => {
                let merged: Match = match apply_merge_patch(&current, &patch) {
                    Ok(merged) => merged,
                    Err(e) => {
                        error!(match_id = id, "failed to merge match patch: {e}");
                        return;
                    }
                };
                if let Err(e) = self.db.store_match(&merged).await {
                    error!(match_id = id, "failed to store merged match: {e}");
                }
            }
            Ok(None) => {
                warn!(match_id = id, "update for unknown match, storing as new");
                match serde_json::from_value::<Match>(patch) {
                    Ok(m) => {
                        if let Err(e) = self.db.store_match(&m).await {
                            error!(match_id = id, "failed to store match from patch: {e}");
                        }
                    }
                    Err(e) => error!(match_id = id, "patch is not a storable match: {e}"),
                }
            }
            Err(e) => error!(match_id = id, "failed to load match for patching: {e}"),
        }
    }

    /// Close the underlying database pool.
    pub async fn close(self) {
        self.db.close().await;
    }
}

fn patch_match_id(patch: &Value) -> Option<i64> {
    patch.get("id").and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_id_extraction() {
        assert_eq!(patch_match_id(&json!({"id": 42, "isLive": true})), Some(42));
        assert_eq!(patch_match_id(&json!({"isLive": true})), None);
        assert_eq!(patch_match_id(&json!({"id": "42"})), None);
    }

    #[test]
    fn patch_without_target_still_decodes_as_match() {
        let patch = json!({"id": 42, "isLive": true});
        let m: Match = serde_json::from_value(patch).unwrap();
        assert_eq!(m.id, 42);
        assert!(m.is_live);
        assert!(m.league.is_none());
    }
}
