//! Integration tests: ingest -> signal -> drain -> envelope -> decode.
//!
//! Exercises the producer pipeline end to end (minus the broker) and the
//! merge semantics the consumer applies on the other side.

use std::collections::HashMap;

use oddsfeed::merge::apply_merge_patch;
use oddsfeed::models::{League, Match, Participant, Price, Sport, Straight};
use oddsfeed::publisher::envelope_payload;
use oddsfeed::{decode_event, EventKind, FeedEvent, OddsStore};

fn soccer_match(id: i64, parent_id: i64) -> Match {
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

fn moneyline() -> Straight {
    Straight {
        key: "s;0;m".into(),
        matchup_id: 7,
        period: 0,
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
async fn create_then_update_a_single_match() {
    let (store, mut signals) = OddsStore::new();

    store.ingest_matches(vec![soccer_match(42, 42)]).await;
    assert_eq!(signals.new_matches.try_recv(), Ok(1));

    // MATCH_NEW carries the full body.
    let created = store.drain_new_matches();
    let payload = envelope_payload(EventKind::MatchNew, created).unwrap();
    match decode_event(&payload).unwrap() {
        FeedEvent::MatchNew(matches) => {
            assert_eq!(matches.len(), 1);
            assert_eq!(matches[0].id, 42);
            assert_eq!(matches[0].participants.len(), 2);
            assert!(matches[0].has_required_hierarchy());
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let mut second = soccer_match(42, 42);
    second.is_live = true;
    store.ingest_matches(vec![second]).await;
    assert_eq!(signals.upd_matches.try_recv(), Ok(1));

    // MATCH_UPDATE carries exactly {id, isLive}.
    let patches = store.drain_updated_matches();
    let payload = envelope_payload(EventKind::MatchUpdate, patches).unwrap();
    match decode_event(&payload).unwrap() {
        FeedEvent::MatchUpdate(patches) => {
            assert_eq!(patches.len(), 1);
            assert_eq!(patches[0], serde_json::json!({"id": 42, "isLive": true}));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn scoped_deletion_emits_only_omitted_ids() {
    let (store, mut signals) = OddsStore::new();

    store
        .ingest_matches(vec![soccer_match(1, 100), soccer_match(2, 100)])
        .await;
    store.drain_new_matches();

    store.ingest_matches(vec![soccer_match(1, 100)]).await;
    let deleted = signals.del_matches.try_recv().unwrap();

    let payload = envelope_payload(EventKind::MatchDelete, deleted).unwrap();
    match decode_event(&payload).unwrap() {
        FeedEvent::MatchDelete(ids) => assert_eq!(ids, vec![2]),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(store.stats().matches, 1);
}

#[tokio::test]
async fn bet_price_change_round_trips() {
    let (store, mut signals) = OddsStore::new();

    store
        .ingest_bets(HashMap::from([(7, vec![moneyline()])]))
        .await;
    assert_eq!(signals.new_bets.try_recv(), Ok(1));
    let payload = envelope_payload(EventKind::BetNew, store.drain_new_bets()).unwrap();
    match decode_event(&payload).unwrap() {
        FeedEvent::BetNew(bets) => {
            assert_eq!(bets.len(), 1);
            assert_eq!(bets[0].prices.len(), 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let mut moved = moneyline();
    moved.prices[0].price = -115;
    store.ingest_bets(HashMap::from([(7, vec![moved])])).await;
    assert_eq!(signals.upd_bets.try_recv(), Ok(1));

    let payload = envelope_payload(EventKind::BetUpdate, store.drain_updated_bets()).unwrap();
    match decode_event(&payload).unwrap() {
        FeedEvent::BetUpdate(bets) => {
            assert_eq!(bets.len(), 1);
            assert_eq!(bets[0].matchup_id, 7);
            assert_eq!(bets[0].key, "s;0;m");
            // Exactly the moved outcome, re-anchored by designation.
            assert_eq!(bets[0].prices.len(), 1);
            assert_eq!(bets[0].prices[0].designation, "home");
            assert_eq!(bets[0].prices[0].price, -115);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn merge_of_drained_patch_reproduces_the_mutation() {
    let (store, _signals) = OddsStore::new();
    let original = soccer_match(42, 42);

    store.ingest_matches(vec![original.clone()]).await;
    store.drain_new_matches();

    // Scalar and nested-object mutations; the participants array is
    // covered by the roster round-trip below.
    let mut mutated = soccer_match(42, 42);
    mutated.is_live = true;
    mutated.best_of_x = 5;
    {
        let league = mutated.league.as_mut().unwrap();
        league.name = "Championship".into();
        league.sport.as_mut().unwrap().name = "Futsal".into();
    }
    store.ingest_matches(vec![mutated.clone()]).await;

    let patches = store.drain_updated_matches();
    assert_eq!(patches.len(), 1);
    let patch = serde_json::to_value(&patches[0]).unwrap();

    let merged: Match = apply_merge_patch(&original, &patch).unwrap();
    assert_eq!(merged, mutated);
}

#[tokio::test]
async fn participants_patch_round_trips_without_losing_siblings() {
    let (store, _signals) = OddsStore::new();
    let original = soccer_match(42, 42);

    store.ingest_matches(vec![original.clone()]).await;
    store.drain_new_matches();

    // Only one of two participants changes.
    let mut mutated = soccer_match(42, 42);
    mutated.participants[0].name = "A2".into();
    store.ingest_matches(vec![mutated.clone()]).await;

    let patches = store.drain_updated_matches();
    assert_eq!(patches.len(), 1);
    let patch = serde_json::to_value(&patches[0]).unwrap();

    // The wire patch carries the complete roster, so the generic merge
    // (arrays replace wholesale) keeps the unchanged sibling intact.
    let roster = patch["participants"].as_array().unwrap();
    assert_eq!(roster.len(), 2);

    let merged: Match = apply_merge_patch(&original, &patch).unwrap();
    assert_eq!(merged, mutated);
    assert_eq!(merged.participants[0].name, "A2");
    assert_eq!(merged.participants[1].name, "B");
    assert_eq!(merged.participants[1].alignment, "away");
}

#[tokio::test]
async fn every_published_event_type_is_known() {
    let (store, _signals) = OddsStore::new();
    store.ingest_matches(vec![soccer_match(42, 42)]).await;

    let payload = envelope_payload(EventKind::MatchNew, store.drain_new_matches()).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    let code = value["eventType"].as_i64().unwrap();
    assert!((1..=5).contains(&code));
    assert!(value["source"].is_string());
    assert!(value["data"].is_array());
}
