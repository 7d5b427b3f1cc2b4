//! Row types for reassembling persisted matches.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use oddsfeed::models::{League, Match, Participant, Sport};

/// A match joined with its league and sport.
#[derive(Debug, Clone, FromRow)]
pub struct DbMatchDetail {
    pub id: i64,
    pub best_of_x: i32,
    pub is_live: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub parent_id: i64,
    pub league_id: i64,
    pub league_name: String,
    pub group_name: String,
    pub is_hidden: bool,
    pub is_promoted: bool,
    pub is_sticky: bool,
    pub sequence: i32,
    pub sport_id: i64,
    pub sport_name: String,
}

/// One participant slot of a match.
#[derive(Debug, Clone, FromRow)]
pub struct DbParticipant {
    pub team_id: i64,
    pub name: String,
    pub alignment: String,
}

impl DbMatchDetail {
    /// Rebuild the domain match this row set was stored from. Used as the
    /// merge target when applying match update patches.
    pub fn into_match(self, participants: Vec<DbParticipant>) -> Match {
        Match {
            id: self.id,
            best_of_x: self.best_of_x,
            is_live: self.is_live,
            start_time: self.start_time,
            parent_id: self.parent_id,
            league: Some(League {
                id: self.league_id,
                name: self.league_name,
                group: self.group_name,
                is_hidden: self.is_hidden,
                is_promoted: self.is_promoted,
                is_sticky: self.is_sticky,
                sequence: self.sequence,
                sport: Some(Sport {
                    id: self.sport_id,
                    name: self.sport_name,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            participants: participants
                .into_iter()
                .map(|p| Participant {
                    id: Some(p.team_id),
                    name: p.name,
                    alignment: p.alignment,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }
}
