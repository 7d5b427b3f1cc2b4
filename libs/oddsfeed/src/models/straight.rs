//! Straight markets and their priced outcomes.
//!
//! A straight is identified by `(matchupId, key)`; the key encodes period,
//! bet type, points and side, so it is stable for a given market. Prices
//! are positional within the straight.

use serde::{Deserialize, Serialize};

use super::{ChangeSet, ChangeStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Price {
    pub designation: String,
    /// American odds.
    pub price: i32,
    pub points: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<i64>,
    #[serde(skip)]
    pub changes: ChangeSet,
}

impl Price {
    fn absorb(&mut self, incoming: &Price) -> bool {
        let mut changed = false;
        if self.designation != incoming.designation {
            self.designation = incoming.designation.clone();
            self.changes.mark("designation");
            changed = true;
        }
        if self.price != incoming.price {
            self.price = incoming.price;
            self.changes.mark("price");
            changed = true;
        }
        if self.points != incoming.points {
            self.points = incoming.points;
            self.changes.mark("points");
            changed = true;
        }
        changed
    }

    fn take_patch(&mut self) -> PricePatch {
        let patch = PricePatch {
            // Anchors for re-association downstream, not change markers.
            participant_id: self.participant_id,
            designation: (!self.designation.is_empty()).then(|| self.designation.clone()),
            price: self.changes.contains("price").then_some(self.price),
            points: self.changes.contains("points").then_some(self.points),
        };
        self.changes.clear();
        patch
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Straight {
    pub key: String,
    pub matchup_id: i64,
    pub period: i32,
    pub prices: Vec<Price>,
    pub side: String,
    pub status: String,
    #[serde(rename = "type")]
    pub bet_type: String,
    #[serde(skip)]
    pub status_flag: ChangeStatus,
    #[serde(skip)]
    pub changes: ChangeSet,
}

impl Straight {
    /// Fold an incoming copy of the same market into this stored copy,
    /// marking differing fields dirty. Returns whether anything changed.
    pub fn absorb(&mut self, incoming: &Straight) -> bool {
        let mut changed = false;
        if self.period != incoming.period {
            self.period = incoming.period;
            self.changes.mark("period");
            changed = true;
        }
        if self.side != incoming.side {
            self.side = incoming.side.clone();
            self.changes.mark("side");
            changed = true;
        }
        if self.status != incoming.status {
            self.status = incoming.status.clone();
            self.changes.mark("status");
            changed = true;
        }
        if self.bet_type != incoming.bet_type {
            self.bet_type = incoming.bet_type.clone();
            self.changes.mark("type");
            changed = true;
        }
        for (slot, inc) in self.prices.iter_mut().zip(&incoming.prices) {
            if slot.absorb(inc) {
                self.changes.mark("prices");
                changed = true;
            }
        }
        changed
    }

    /// Build the minimal update patch and clear the change-set. Identity
    /// (matchupId, key, type) is always present to anchor the merge.
    ///
    /// `prices` lists only the moved outcomes. Bet updates are never
    /// applied through the generic array-replacing merge: the consumer
    /// upserts each listed price against its odds identity tuple
    /// (designation / participantId), leaving unlisted outcomes untouched.
    pub fn take_patch(&mut self) -> StraightPatch {
        let mut patch = StraightPatch {
            matchup_id: self.matchup_id,
            key: self.key.clone(),
            bet_type: self.bet_type.clone(),
            ..Default::default()
        };
        if self.changes.contains("period") {
            patch.period = Some(self.period);
        }
        if self.changes.contains("side") {
            patch.side = Some(self.side.clone());
        }
        if self.changes.contains("status") {
            patch.status = Some(self.status.clone());
        }
        if self.changes.contains("prices") {
            let slots: Vec<PricePatch> = self
                .prices
                .iter_mut()
                .filter(|p| !p.changes.is_empty())
                .map(Price::take_patch)
                .collect();
            if !slots.is_empty() {
                patch.prices = Some(slots);
            }
        }
        self.changes.clear();
        patch
    }

    pub fn clear_changes(&mut self) {
        self.changes.clear();
        for price in &mut self.prices {
            price.changes.clear();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
}

/// Minimal update shape for a straight market. Its `prices` carry only the
/// moved outcomes, each anchored by designation or participant id; the
/// consumer applies them additively per odds row, not as an array merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StraightPatch {
    pub matchup_id: i64,
    pub key: String,
    #[serde(rename = "type")]
    pub bet_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prices: Option<Vec<PricePatch>>,
}
