//! Match hierarchy: a match owns a league, the league owns a sport, and the
//! match owns its participants by position.
//!
//! `absorb` reconciles an incoming snapshot copy into the stored copy field
//! by field, marking dirty fields as it goes. `take_patch` turns the
//! accumulated change-set into a minimal patch and clears it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChangeSet, ChangeStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sport {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub changes: ChangeSet,
}

impl Sport {
    fn absorb(&mut self, incoming: &Sport) -> bool {
        let mut changed = false;
        if self.id != incoming.id {
            self.id = incoming.id;
            self.changes.mark("id");
            changed = true;
        }
        if self.name != incoming.name {
            self.name = incoming.name.clone();
            self.changes.mark("name");
            changed = true;
        }
        changed
    }

    fn take_patch(&mut self) -> SportPatch {
        let patch = SportPatch {
            id: self.id,
            name: self.changes.contains("name").then(|| self.name.clone()),
        };
        self.changes.clear();
        patch
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub group: String,
    pub is_hidden: bool,
    pub is_promoted: bool,
    pub is_sticky: bool,
    pub sequence: i32,
    pub sport: Option<Sport>,
    #[serde(skip)]
    pub changes: ChangeSet,
}

impl League {
    fn absorb(&mut self, incoming: &League) -> bool {
        let mut changed = false;
        if self.group != incoming.group {
            self.group = incoming.group.clone();
            self.changes.mark("group");
            changed = true;
        }
        if self.id != incoming.id {
            self.id = incoming.id;
            self.changes.mark("id");
            changed = true;
        }
        if self.is_hidden != incoming.is_hidden {
            self.is_hidden = incoming.is_hidden;
            self.changes.mark("isHidden");
            changed = true;
        }
        if self.is_promoted != incoming.is_promoted {
            self.is_promoted = incoming.is_promoted;
            self.changes.mark("isPromoted");
            changed = true;
        }
        if self.is_sticky != incoming.is_sticky {
            self.is_sticky = incoming.is_sticky;
            self.changes.mark("isSticky");
            changed = true;
        }
        if self.name != incoming.name {
            self.name = incoming.name.clone();
            self.changes.mark("name");
            changed = true;
        }
        if self.sequence != incoming.sequence {
            self.sequence = incoming.sequence;
            self.changes.mark("sequence");
            changed = true;
        }
        match (self.sport.as_mut(), incoming.sport.as_ref()) {
            (Some(current), Some(inc)) => {
                if current.absorb(inc) {
                    self.changes.mark("sport");
                    changed = true;
                }
            }
            (None, Some(inc)) => {
                self.sport = Some(inc.clone());
                self.changes.mark("sport");
                changed = true;
            }
            _ => {}
        }
        changed
    }

    fn take_patch(&mut self) -> LeaguePatch {
        let mut patch = LeaguePatch {
            id: self.id,
            ..Default::default()
        };
        if self.changes.contains("group") {
            patch.group = Some(self.group.clone());
        }
        if self.changes.contains("isHidden") {
            patch.is_hidden = Some(self.is_hidden);
        }
        if self.changes.contains("isPromoted") {
            patch.is_promoted = Some(self.is_promoted);
        }
        if self.changes.contains("isSticky") {
            patch.is_sticky = Some(self.is_sticky);
        }
        if self.changes.contains("name") {
            patch.name = Some(self.name.clone());
        }
        if self.changes.contains("sequence") {
            patch.sequence = Some(self.sequence);
        }
        if self.changes.contains("sport") {
            patch.sport = self.sport.as_mut().map(Sport::take_patch);
        }
        self.changes.clear();
        patch
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Participant {
    /// Some feeds carry a participant id, some only a roster position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub alignment: String,
    #[serde(skip)]
    pub changes: ChangeSet,
}

impl Participant {
    fn absorb(&mut self, incoming: &Participant) -> bool {
        let mut changed = false;
        if self.alignment != incoming.alignment {
            self.alignment = incoming.alignment.clone();
            self.changes.mark("alignment");
            changed = true;
        }
        if self.name != incoming.name {
            self.name = incoming.name.clone();
            self.changes.mark("name");
            changed = true;
        }
        changed
    }

}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Match {
    pub id: i64,
    pub best_of_x: i32,
    pub is_live: bool,
    pub league: Option<League>,
    pub participants: Vec<Participant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    pub parent_id: i64,
    #[serde(skip)]
    pub status_flag: ChangeStatus,
    #[serde(skip)]
    pub changes: ChangeSet,
}

impl Match {
    /// A match is only storable when its league and sport arrived with it.
    pub fn has_required_hierarchy(&self) -> bool {
        self.league.as_ref().is_some_and(|l| l.sport.is_some())
    }

    /// Fold an incoming snapshot copy into this stored copy, marking every
    /// differing field dirty. Returns whether anything changed.
    pub fn absorb(&mut self, incoming: &Match) -> bool {
        let mut changed = false;
        if self.best_of_x != incoming.best_of_x {
            self.best_of_x = incoming.best_of_x;
            self.changes.mark("bestOfX");
            changed = true;
        }
        if self.is_live != incoming.is_live {
            self.is_live = incoming.is_live;
            self.changes.mark("isLive");
            changed = true;
        }
        match (self.league.as_mut(), incoming.league.as_ref()) {
            (Some(current), Some(inc)) => {
                if current.absorb(inc) {
                    self.changes.mark("league");
                    changed = true;
                }
            }
            (None, Some(inc)) => {
                self.league = Some(inc.clone());
                self.changes.mark("league");
                changed = true;
            }
            _ => {}
        }
        // Participant slots are positional: index i is the same slot across
        // snapshots. Extra incoming slots are ignored.
        for (slot, inc) in self.participants.iter_mut().zip(&incoming.participants) {
            if slot.absorb(inc) {
                self.changes.mark("participants");
                changed = true;
            }
        }
        if self.start_time != incoming.start_time {
            self.start_time = incoming.start_time;
            self.changes.mark("startTime");
            changed = true;
        }
        changed
    }

    /// Build the minimal update patch from the accumulated change-set and
    /// clear it. The patch always carries the match id.
    pub fn take_patch(&mut self) -> MatchPatch {
        let mut patch = MatchPatch {
            id: self.id,
            ..Default::default()
        };
        if self.changes.contains("bestOfX") {
            patch.best_of_x = Some(self.best_of_x);
        }
        if self.changes.contains("isLive") {
            patch.is_live = Some(self.is_live);
        }
        if self.changes.contains("league") {
            patch.league = self.league.as_mut().map(League::take_patch);
        }
        if self.changes.contains("participants") {
            // Merge patches replace arrays wholesale, so a participant
            // change ships the complete roster with full bodies.
            for participant in &mut self.participants {
                participant.changes.clear();
            }
            patch.participants = Some(self.participants.clone());
        }
        if self.changes.contains("startTime") {
            patch.start_time = self.start_time;
        }
        self.changes.clear();
        patch
    }

    /// Clear the change-sets on this match and everything it owns.
    pub fn clear_changes(&mut self) {
        self.changes.clear();
        if let Some(league) = self.league.as_mut() {
            league.changes.clear();
            if let Some(sport) = league.sport.as_mut() {
                sport.changes.clear();
            }
        }
        for participant in &mut self.participants {
            participant.changes.clear();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SportPatch {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaguePatch {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_promoted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_sticky: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sport: Option<SportPatch>,
}

/// Minimal update shape for a match: identity plus changed leaves only.
/// The exception is `participants`: arrays replace wholesale under merge,
/// so when any slot changes the patch carries the complete roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchPatch {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_of_x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league: Option<LeaguePatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<Participant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match() -> Match {
        Match {
            id: 42,
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
            parent_id: 42,
            ..Default::default()
        }
    }

    #[test]
    fn absorb_detects_no_change_on_identical_snapshot() {
        let mut stored = sample_match();
        let incoming = sample_match();
        assert!(!stored.absorb(&incoming));
        assert!(stored.changes.is_empty());
    }

    #[test]
    fn absorb_marks_scalar_and_nested_changes() {
        let mut stored = sample_match();
        let mut incoming = sample_match();
        incoming.is_live = true;
        incoming.league.as_mut().unwrap().sport.as_mut().unwrap().name = "Futsal".into();
        incoming.participants[1].name = "C".into();

        assert!(stored.absorb(&incoming));
        assert!(stored.changes.contains("isLive"));
        assert!(stored.changes.contains("league"));
        assert!(stored.changes.contains("participants"));
        let league = stored.league.as_ref().unwrap();
        assert!(league.changes.contains("sport"));
        assert!(league.sport.as_ref().unwrap().changes.contains("name"));
        assert!(stored.participants[1].changes.contains("name"));
        assert!(stored.participants[0].changes.is_empty());
    }

    #[test]
    fn take_patch_emits_only_identity_and_changed_leaves() {
        let mut stored = sample_match();
        let mut incoming = sample_match();
        incoming.is_live = true;
        stored.absorb(&incoming);

        let patch = stored.take_patch();
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"id": 42, "isLive": true}));
        assert!(stored.changes.is_empty());
    }

    #[test]
    fn take_patch_anchors_nested_objects_by_id() {
        let mut stored = sample_match();
        let mut incoming = sample_match();
        incoming.league.as_mut().unwrap().name = "Championship".into();
        stored.absorb(&incoming);

        let patch = stored.take_patch();
        let league = patch.league.expect("league patch");
        assert_eq!(league.id, 9);
        assert_eq!(league.name.as_deref(), Some("Championship"));
        assert!(league.sport.is_none());
        assert!(stored.league.as_ref().unwrap().changes.is_empty());
    }

    #[test]
    fn participant_patch_carries_the_full_roster() {
        let mut stored = sample_match();
        let mut incoming = sample_match();
        incoming.participants[0].alignment = "neutral".into();
        stored.absorb(&incoming);

        let patch = stored.take_patch();
        // One changed slot still ships every participant with a full body:
        // the consumer merge replaces the array wholesale.
        let roster = patch.participants.expect("participants roster");
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].alignment, "neutral");
        assert_eq!(roster[0].name, "A");
        assert_eq!(roster[1].alignment, "away");
        assert_eq!(roster[1].name, "B");
        assert!(roster.iter().all(|p| p.changes.is_empty()));
        assert!(stored.participants.iter().all(|p| p.changes.is_empty()));
    }

    #[test]
    fn unchanged_participants_stay_out_of_the_patch() {
        let mut stored = sample_match();
        let mut incoming = sample_match();
        incoming.is_live = true;
        stored.absorb(&incoming);

        let patch = stored.take_patch();
        assert!(patch.participants.is_none());
    }

    #[test]
    fn hierarchy_validation_requires_league_and_sport() {
        let mut m = sample_match();
        assert!(m.has_required_hierarchy());
        m.league.as_mut().unwrap().sport = None;
        assert!(!m.has_required_hierarchy());
        m.league = None;
        assert!(!m.has_required_hierarchy());
    }
}
