use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// The lifecycle status of a league match.
#[derive(Debug, PartialEq, Eq, Clone, Copy, sqlx::Type, Serialize, Deserialize, Display, Default)]
#[sqlx(type_name = "match_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[strum(to_string = "Scheduled")]
    #[default]
    Scheduled,
    #[strum(to_string = "In progress")]
    InProgress,
    #[strum(to_string = "Completed")]
    Completed,
    #[strum(to_string = "Cancelled")]
    Cancelled,
}

/// A match within the database. Matches without a league are friendlies.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LeagueMatch {
    pub match_id: Uuid,
    pub league_id: Option<Uuid>,
    pub status: MatchStatus,
    pub scheduled_at: DateTime<Utc>,
}

/// A confirmed roster row for a match.
///
/// The side label is stored exactly as the client sent it. Use
/// [`SideLabel`](crate::duel::SideLabel) to compare sides.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct RosterEntry {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub team_side: Option<String>,
}

/// A player's standing within a league, joined with their display identity.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LeagueMember {
    pub league_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub rating: Option<f64>,
    pub duel_honors: i32,
}

impl LeagueMember {
    /// The member's rating, with a missing rating counted as zero.
    pub fn rating(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }
}

/// The status of a duel. Pending and active duels are open; the rest are terminal.
#[derive(Debug, PartialEq, Eq, Clone, Copy, sqlx::Type, Serialize, Deserialize, Display, Default)]
#[sqlx(type_name = "duel_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DuelStatus {
    #[strum(to_string = "Pending")]
    #[default]
    Pending,
    #[strum(to_string = "Active")]
    Active,
    #[strum(to_string = "Completed")]
    Completed,
    #[strum(to_string = "Draw")]
    Draw,
}

impl DuelStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, DuelStatus::Pending | DuelStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

/// A head-to-head rivalry attached to a single match.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Duel {
    pub duel_id: Uuid,
    pub match_id: Uuid,
    pub challenger_id: Uuid,
    pub rival_id: Uuid,
    pub status: DuelStatus,
    pub winner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Duel {
    /// Creates a fresh pending duel between two players.
    pub fn new(match_id: Uuid, challenger_id: Uuid, rival_id: Uuid) -> Self {
        Self {
            duel_id: Uuid::new_v4(),
            match_id,
            challenger_id,
            rival_id,
            status: DuelStatus::Pending,
            winner_id: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// The order-independent key of the two duelists.
    pub fn pair_key(&self) -> crate::duel::PairKey {
        crate::duel::PairKey::new(self.challenger_id, self.rival_id)
    }
}
