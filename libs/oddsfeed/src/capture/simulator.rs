//! Built-in feed simulator.
//!
//! Stands in for the external browser capture when `testMode` is enabled:
//! it keeps a small synthetic world of matches and markets, perturbs it once
//! per tick, and emits the same full-snapshot JSON documents the real feeds
//! carry, through the same byte channels. The rest of the pipeline cannot
//! tell the difference.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;
use tracing::{debug, info};

use super::{CaptureSource, FeedSenders};
use crate::models::{League, Match, Participant, Price, Sport, Straight};

/// All simulated matches share one deletion scope.
const SCOPE_ID: i64 = 1_000;

const SPORTS: &[(i64, &str)] = &[
    (1, "Soccer"),
    (2, "Basketball"),
    (3, "Tennis"),
    (4, "Hockey"),
    (7, "eSports"),
];

const TEAMS: &[&str] = &[
    "Red Dragons",
    "Blue Eagles",
    "Green Lions",
    "Black Knights",
    "White Tigers",
    "Golden Hawks",
    "Silver Wolves",
    "Purple Phoenix",
];

pub struct FeedSimulator {
    tick: Duration,
    max_matches: usize,
    next_id: i64,
    matches: Vec<Match>,
    bets: HashMap<i64, Vec<Straight>>,
    rng: StdRng,
}

impl FeedSimulator {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            max_matches: 16,
            next_id: 2_000,
            matches: Vec::new(),
            bets: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    fn spawn_match(&mut self) {
        let id = self.next_id;
        self.next_id += 1;

        let (sport_id, sport_name) = SPORTS[self.rng.gen_range(0..SPORTS.len())];
        let home = TEAMS[self.rng.gen_range(0..TEAMS.len())];
        let mut away = TEAMS[self.rng.gen_range(0..TEAMS.len())];
        while away == home {
            away = TEAMS[self.rng.gen_range(0..TEAMS.len())];
        }

        let m = Match {
            id,
            parent_id: SCOPE_ID,
            best_of_x: [1, 3, 5][self.rng.gen_range(0..3)],
            is_live: false,
            league: Some(League {
                id: sport_id * 100 + self.rng.gen_range(1..10),
                name: format!("{sport_name} League"),
                group: "Group A".into(),
                sequence: self.rng.gen_range(0..100),
                sport: Some(Sport {
                    id: sport_id,
                    name: sport_name.into(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            participants: vec![
                Participant {
                    name: home.into(),
                    alignment: "home".into(),
                    ..Default::default()
                },
                Participant {
                    name: away.into(),
                    alignment: "away".into(),
                    ..Default::default()
                },
            ],
            start_time: Some(Utc::now() + ChronoDuration::hours(self.rng.gen_range(1..72))),
            ..Default::default()
        };

        let mut markets = vec![self.make_straight(id, "moneyline", 0.0)];
        if self.rng.gen_bool(0.5) {
            let points = self.rng.gen_range(1..20) as f64 + 0.5;
            markets.push(self.make_straight(id, "spread", points));
        }
        self.bets.insert(id, markets);
        self.matches.push(m);
    }

    fn make_straight(&mut self, matchup_id: i64, bet_type: &str, points: f64) -> Straight {
        let price = self.rng.gen_range(100..300);
        Straight {
            key: format!("s;0;{}", &bet_type[..1]),
            matchup_id,
            period: 0,
            side: String::new(),
            status: "open".into(),
            bet_type: bet_type.into(),
            prices: vec![
                Price {
                    designation: "home".into(),
                    price: -price,
                    points,
                    ..Default::default()
                },
                Price {
                    designation: "away".into(),
                    price: price - self.rng.gen_range(0..30),
                    points: -points,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    /// One tick of world evolution: maybe add, mutate, maybe drop.
    fn advance(&mut self) {
        if self.matches.len() < self.max_matches && self.rng.gen_bool(0.6) {
            self.spawn_match();
        }

        for m in &mut self.matches {
            if self.rng.gen_bool(0.15) {
                m.is_live = !m.is_live;
            }
        }
        for markets in self.bets.values_mut() {
            for straight in markets.iter_mut() {
                if self.rng.gen_bool(0.6) {
                    let shift = self.rng.gen_range(1..15);
                    let idx = self.rng.gen_range(0..straight.prices.len());
                    straight.prices[idx].price += if self.rng.gen_bool(0.5) { shift } else { -shift };
                }
                if self.rng.gen_bool(0.05) {
                    straight.status = if straight.status == "open" {
                        "suspended".into()
                    } else {
                        "open".into()
                    };
                }
            }
        }

        if self.matches.len() > 4 && self.rng.gen_bool(0.1) {
            let idx = self.rng.gen_range(0..self.matches.len());
            let gone = self.matches.remove(idx);
            self.bets.remove(&gone.id);
            debug!(match_id = gone.id, "simulator dropped a match");
        }
    }
}

#[async_trait]
impl CaptureSource for FeedSimulator {
    async fn run(
        mut self: Box<Self>,
        feeds: FeedSenders,
        running: Arc<AtomicBool>,
    ) -> anyhow::Result<()> {
        info!(tick_ms = self.tick.as_millis() as u64, "feed simulator started");

        while running.load(Ordering::Acquire) {
            sleep(self.tick).await;
            self.advance();
            if self.matches.is_empty() {
                continue;
            }

            let snapshot = serde_json::to_vec(&self.matches)?;
            if feeds.matches.send(snapshot).await.is_err() {
                break;
            }
            for markets in self.bets.values() {
                let body = serde_json::to_vec(markets)?;
                if feeds.bets.send(body).await.is_err() {
                    return Ok(());
                }
            }
        }

        info!("feed simulator stopped");
        Ok(())
    }
}
