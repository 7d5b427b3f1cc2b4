//! In-memory delta engine.
//!
//! The store is the producer's single source of truth for what has already
//! been observed. Each ingested snapshot is reconciled against it under one
//! write-lock acquisition; classification results (created / updated /
//! deleted) are surfaced through bounded signal channels and drained by the
//! publisher tasks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{ChangeStatus, Match, MatchPatch, Straight, StraightPatch};

/// Count channels hold a single pending signal: the count is advisory and
/// the drain reads the truth, so older signals are safe to coalesce.
const SIGNAL_BUFFER: usize = 1;
/// Deleted-id batches are not re-derivable from the store, so they get a
/// deeper buffer and a blocking send.
const DELETE_BUFFER: usize = 8;

pub type CountReceiver = mpsc::Receiver<usize>;
pub type DeleteReceiver = mpsc::Receiver<Vec<i64>>;

/// Receiving ends of the store's signal channels, handed out once to the
/// publisher.
pub struct StoreSignals {
    pub new_matches: CountReceiver,
    pub upd_matches: CountReceiver,
    pub new_bets: CountReceiver,
    pub upd_bets: CountReceiver,
    pub del_matches: DeleteReceiver,
}

struct SignalSenders {
    new_matches: mpsc::Sender<usize>,
    upd_matches: mpsc::Sender<usize>,
    new_bets: mpsc::Sender<usize>,
    upd_bets: mpsc::Sender<usize>,
    del_matches: mpsc::Sender<Vec<i64>>,
}

#[derive(Default)]
struct State {
    matches: HashMap<i64, Match>,
    bets: HashMap<i64, HashMap<String, Straight>>,
}

/// Snapshot counters for heartbeat logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub matches: usize,
    pub bets: usize,
    /// Items whose status flag has not been drained yet.
    pub pending: usize,
}

pub struct OddsStore {
    state: RwLock<State>,
    signals: SignalSenders,
}

impl OddsStore {
    pub fn new() -> (Arc<Self>, StoreSignals) {
        let (new_matches_tx, new_matches_rx) = mpsc::channel(SIGNAL_BUFFER);
        let (upd_matches_tx, upd_matches_rx) = mpsc::channel(SIGNAL_BUFFER);
        let (new_bets_tx, new_bets_rx) = mpsc::channel(SIGNAL_BUFFER);
        let (upd_bets_tx, upd_bets_rx) = mpsc::channel(SIGNAL_BUFFER);
        let (del_matches_tx, del_matches_rx) = mpsc::channel(DELETE_BUFFER);

        let store = Arc::new(Self {
            state: RwLock::new(State::default()),
            signals: SignalSenders {
                new_matches: new_matches_tx,
                upd_matches: upd_matches_tx,
                new_bets: new_bets_tx,
                upd_bets: upd_bets_tx,
                del_matches: del_matches_tx,
            },
        });
        let signals = StoreSignals {
            new_matches: new_matches_rx,
            upd_matches: upd_matches_rx,
            new_bets: new_bets_rx,
            upd_bets: upd_bets_rx,
            del_matches: del_matches_rx,
        };
        (store, signals)
    }

    /// Reconcile a full match snapshot against the stored state.
    ///
    /// The first item's `parentId` (backfilled from its own id when zero)
    /// is the deletion scope for the whole call: stored matches in that
    /// scope which the snapshot omits are deleted, and their bets with
    /// them.
    pub async fn ingest_matches(&self, mut snapshot: Vec<Match>) {
        let Some(first) = snapshot.first_mut() else {
            warn!("ignoring empty match snapshot");
            return;
        };
        if first.parent_id == 0 {
            first.parent_id = first.id;
        }
        let scope = first.parent_id;

        let mut new_count = 0usize;
        let mut upd_count = 0usize;
        let deleted: Vec<i64>;
        {
            let mut state = self.state.write();
            let mut seen: HashSet<i64> = HashSet::with_capacity(snapshot.len());

            for mut incoming in snapshot {
                // Even a dropped item counts as seen: a malformed copy must
                // not delete the stored one by omission.
                seen.insert(incoming.id);
                if !incoming.has_required_hierarchy() {
                    warn!(match_id = incoming.id, "dropping match without league/sport");
                    continue;
                }
                if incoming.parent_id == 0 {
                    incoming.parent_id = scope;
                }

                match state.matches.get_mut(&incoming.id) {
                    None => {
                        incoming.status_flag = ChangeStatus::Created;
                        state.matches.insert(incoming.id, incoming);
                        new_count += 1;
                    }
                    Some(stored) => {
                        if stored.absorb(&incoming) {
                            // A not-yet-drained Created item keeps its flag:
                            // the eventual MATCH_NEW carries the newest body.
                            if stored.status_flag != ChangeStatus::Created {
                                stored.status_flag = ChangeStatus::Updated;
                                upd_count += 1;
                            }
                        }
                    }
                }
            }

            deleted = state
                .matches
                .values()
                .filter(|stored| stored.parent_id == scope && !seen.contains(&stored.id))
                .map(|stored| stored.id)
                .collect();
            for id in &deleted {
                state.matches.remove(id);
                state.bets.remove(id);
            }
        }

        if new_count > 0 {
            self.signal_count(&self.signals.new_matches, new_count);
        }
        if upd_count > 0 {
            self.signal_count(&self.signals.upd_matches, upd_count);
        }
        if !deleted.is_empty() {
            debug!(count = deleted.len(), scope, "matches deleted by omission");
            if self.signals.del_matches.send(deleted).await.is_err() {
                warn!("delete signal receiver dropped");
            }
        }
    }

    /// Reconcile straight markets, batched by matchup id.
    ///
    /// Bets are never deleted here; they leave the store only through the
    /// match-deletion cascade.
    pub async fn ingest_bets(&self, batches: HashMap<i64, Vec<Straight>>) {
        let mut new_count = 0usize;
        let mut upd_count = 0usize;
        {
            let mut state = self.state.write();
            for (matchup_id, bets) in batches {
                let matchup = state.bets.entry(matchup_id).or_default();
                for mut incoming in bets {
                    match matchup.get_mut(&incoming.key) {
                        None => {
                            incoming.status_flag = ChangeStatus::Created;
                            matchup.insert(incoming.key.clone(), incoming);
                            new_count += 1;
                        }
                        Some(stored) => {
                            if stored.absorb(&incoming)
                                && stored.status_flag != ChangeStatus::Created
                            {
                                stored.status_flag = ChangeStatus::Updated;
                                upd_count += 1;
                            }
                        }
                    }
                }
            }
        }

        if new_count > 0 {
            self.signal_count(&self.signals.new_bets, new_count);
        }
        if upd_count > 0 {
            self.signal_count(&self.signals.upd_bets, upd_count);
        }
    }

    /// Collect every created match, reset its flag and change-set, and
    /// return the full bodies.
    pub fn drain_new_matches(&self) -> Vec<Match> {
        let mut state = self.state.write();
        let mut drained = Vec::new();
        for stored in state.matches.values_mut() {
            if stored.status_flag == ChangeStatus::Created {
                stored.status_flag = ChangeStatus::NotChanged;
                stored.clear_changes();
                drained.push(stored.clone());
            }
        }
        drained
    }

    /// Collect every updated match as a minimal patch, resetting flags and
    /// change-sets as it goes.
    pub fn drain_updated_matches(&self) -> Vec<MatchPatch> {
        let mut state = self.state.write();
        let mut drained = Vec::new();
        for stored in state.matches.values_mut() {
            if stored.status_flag == ChangeStatus::Updated {
                stored.status_flag = ChangeStatus::NotChanged;
                drained.push(stored.take_patch());
            }
        }
        drained
    }

    pub fn drain_new_bets(&self) -> Vec<Straight> {
        let mut state = self.state.write();
        let mut drained = Vec::new();
        for matchup in state.bets.values_mut() {
            for stored in matchup.values_mut() {
                if stored.status_flag == ChangeStatus::Created {
                    stored.status_flag = ChangeStatus::NotChanged;
                    stored.clear_changes();
                    drained.push(stored.clone());
                }
            }
        }
        drained
    }

    pub fn drain_updated_bets(&self) -> Vec<StraightPatch> {
        let mut state = self.state.write();
        let mut drained = Vec::new();
        for matchup in state.bets.values_mut() {
            for stored in matchup.values_mut() {
                if stored.status_flag == ChangeStatus::Updated {
                    stored.status_flag = ChangeStatus::NotChanged;
                    drained.push(stored.take_patch());
                }
            }
        }
        drained
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        let mut pending = 0usize;
        for stored in state.matches.values() {
            if stored.status_flag != ChangeStatus::NotChanged {
                pending += 1;
            }
        }
        let mut bets = 0usize;
        for matchup in state.bets.values() {
            bets += matchup.len();
            for stored in matchup.values() {
                if stored.status_flag != ChangeStatus::NotChanged {
                    pending += 1;
                }
            }
        }
        StoreStats {
            matches: state.matches.len(),
            bets,
            pending,
        }
    }

    /// Non-blocking send; a full channel already carries a pending signal
    /// and the drain will read the truth.
    fn signal_count(&self, channel: &mpsc::Sender<usize>, count: usize) {
        if let Err(mpsc::error::TrySendError::Closed(_)) = channel.try_send(count) {
            warn!("signal receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{League, Participant, Price, Sport};

    fn snapshot_match(id: i64, parent_id: i64) -> Match {
        Match {
            id,
            parent_id,
            best_of_x: 3,
            is_live: false,
            league: Some(League {
                id: 9,
                name: "Premier".into(),
                sport: Some(Sport {
                    id: 1,
                    name: "Soccer".into(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            participants: vec![
                Participant {
                    name: "A".into(),
                    alignment: "home".into(),
                    ..Default::default()
                },
                Participant {
                    name: "B".into(),
                    alignment: "away".into(),
                    ..Default::default()
                },
            ],
            start_time: Some("2025-01-01T00:00:00Z".parse().unwrap()),
            ..Default::default()
        }
    }

    fn moneyline(matchup_id: i64) -> Straight {
        Straight {
            key: "s;0;m".into(),
            matchup_id,
            bet_type: "moneyline".into(),
            status: "open".into(),
            prices: vec![
                Price {
                    designation: "home".into(),
                    price: -120,
                    ..Default::default()
                },
                Price {
                    designation: "away".into(),
                    price: 110,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn repeated_snapshot_is_idempotent() {
        let (store, mut signals) = OddsStore::new();

        store.ingest_matches(vec![snapshot_match(42, 42)]).await;
        assert_eq!(signals.new_matches.try_recv(), Ok(1));
        assert_eq!(store.drain_new_matches().len(), 1);

        store.ingest_matches(vec![snapshot_match(42, 42)]).await;
        assert!(signals.new_matches.try_recv().is_err());
        assert!(signals.upd_matches.try_recv().is_err());
        assert!(signals.del_matches.try_recv().is_err());
        assert!(store.drain_new_matches().is_empty());
        assert!(store.drain_updated_matches().is_empty());
    }

    #[tokio::test]
    async fn update_patch_is_minimal() {
        let (store, mut signals) = OddsStore::new();
        store.ingest_matches(vec![snapshot_match(42, 42)]).await;
        store.drain_new_matches();

        let mut second = snapshot_match(42, 42);
        second.is_live = true;
        store.ingest_matches(vec![second]).await;

        assert_eq!(signals.upd_matches.try_recv(), Ok(1));
        let patches = store.drain_updated_matches();
        assert_eq!(patches.len(), 1);
        let json = serde_json::to_value(&patches[0]).unwrap();
        assert_eq!(json, serde_json::json!({"id": 42, "isLive": true}));
    }

    #[tokio::test]
    async fn deletion_is_scoped_by_parent_id() {
        let (store, mut signals) = OddsStore::new();
        store
            .ingest_matches(vec![snapshot_match(1, 100), snapshot_match(2, 100)])
            .await;
        store.ingest_matches(vec![snapshot_match(10, 200)]).await;
        store.drain_new_matches();

        // Snapshot for scope 100 omitting id 2: only id 2 may be deleted.
        store.ingest_matches(vec![snapshot_match(1, 100)]).await;
        assert_eq!(signals.del_matches.try_recv(), Ok(vec![2]));

        let stats = store.stats();
        assert_eq!(stats.matches, 2);
    }

    #[tokio::test]
    async fn deleting_a_match_cascades_to_its_bets() {
        let (store, mut signals) = OddsStore::new();
        store
            .ingest_matches(vec![snapshot_match(1, 100), snapshot_match(2, 100)])
            .await;
        store
            .ingest_bets(HashMap::from([(2, vec![moneyline(2)])]))
            .await;
        store.drain_new_matches();
        store.drain_new_bets();

        store.ingest_matches(vec![snapshot_match(1, 100)]).await;
        assert_eq!(signals.del_matches.try_recv(), Ok(vec![2]));
        assert_eq!(store.stats().bets, 0);
    }

    #[tokio::test]
    async fn drained_items_have_clean_change_sets() {
        let (store, _signals) = OddsStore::new();
        store.ingest_matches(vec![snapshot_match(42, 42)]).await;

        let mut second = snapshot_match(42, 42);
        second.is_live = true;
        // Changes landing before the first drain keep the item Created.
        store.ingest_matches(vec![second]).await;

        let drained = store.drain_new_matches();
        assert_eq!(drained.len(), 1);
        assert!(drained[0].is_live, "created drain carries the newest body");
        assert!(drained[0].changes.is_empty());
        assert_eq!(drained[0].status_flag, ChangeStatus::NotChanged);
        assert!(store.drain_updated_matches().is_empty());
    }

    #[tokio::test]
    async fn bet_price_move_emits_single_price_patch() {
        let (store, mut signals) = OddsStore::new();
        store
            .ingest_bets(HashMap::from([(7, vec![moneyline(7)])]))
            .await;
        assert_eq!(signals.new_bets.try_recv(), Ok(1));
        assert_eq!(store.drain_new_bets().len(), 1);

        let mut moved = moneyline(7);
        moved.prices[0].price = -115;
        store.ingest_bets(HashMap::from([(7, vec![moved])])).await;

        assert_eq!(signals.upd_bets.try_recv(), Ok(1));
        let patches = store.drain_updated_bets();
        assert_eq!(patches.len(), 1);
        let prices = patches[0].prices.as_ref().unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].designation.as_deref(), Some("home"));
        assert_eq!(prices[0].price, Some(-115));
    }

    #[tokio::test]
    async fn bets_for_unknown_matches_are_accepted() {
        let (store, _signals) = OddsStore::new();
        store
            .ingest_bets(HashMap::from([(999, vec![moneyline(999)])]))
            .await;
        assert_eq!(store.stats().bets, 1);
    }

    #[tokio::test]
    async fn match_without_hierarchy_is_dropped() {
        let (store, mut signals) = OddsStore::new();
        let mut bad = snapshot_match(5, 5);
        bad.league = None;
        store.ingest_matches(vec![bad]).await;
        assert!(signals.new_matches.try_recv().is_err());
        assert_eq!(store.stats().matches, 0);
    }

    #[tokio::test]
    async fn parent_id_backfills_from_first_item() {
        let (store, _signals) = OddsStore::new();
        let mut first = snapshot_match(42, 0);
        first.parent_id = 0;
        let mut second = snapshot_match(43, 0);
        second.parent_id = 0;
        store.ingest_matches(vec![first, second]).await;

        let drained = store.drain_new_matches();
        assert!(drained.iter().all(|m| m.parent_id == 42));
    }
}
