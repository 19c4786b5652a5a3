use thiserror::Error;
use uuid::Uuid;

use crate::EngineError;

/// Selection of a rivalry pair for a match.
pub mod matchmaker;
/// Candidate pairs and the rules for picking among them.
pub mod pairing;
/// Deciding a duel once the match is over.
pub mod resolver;

pub use matchmaker::{DuelMatchmaker, DuelistProfile, GeneratedDuel, PairingDetails};
pub use pairing::{CandidatePair, PairKey, SideLabel};
pub use resolver::{DuelResolver, Resolution, WriteMode};

/// Only the best-balanced candidates up to this count take part in the draw.
pub const CANDIDATE_POOL_SIZE: usize = 6;
/// Rating added to the winner's league standing.
pub const WINNER_RATING_BONUS: f64 = 0.1;
/// Honors added to the winner's league standing.
pub const DUEL_HONOR_INCREMENT: i32 = 1;

/// Reasons a duel could not be generated for a match.
///
/// Every variant is raised before anything is written.
#[derive(Debug, Error)]
pub enum DuelError {
    #[error("Match {0} does not exist.")]
    MatchNotFound(Uuid),
    #[error("Match {0} already has a duel.")]
    DuelAlreadyExists(Uuid),
    #[error("Only {found} confirmed player(s), at least 2 are required.")]
    InsufficientConfirmedPlayers { found: usize },
    #[error("Match {0} does not belong to a league.")]
    MatchHasNoLeague(Uuid),
    #[error("Only {found} confirmed player(s) have league data, at least 2 are required.")]
    InsufficientMemberData { found: usize },
    #[error("No compatible pair is left once the previous duel is excluded.")]
    NoCompatiblePairs,
    #[error("Unable to draw a pair from the candidate pool.")]
    PairSelectionFailed,
    #[error(transparent)]
    Store(#[from] EngineError),
}

impl DuelError {
    /// The message to show the player who asked for the duel.
    pub fn user_message(&self) -> &'static str {
        use DuelError::*;
        match self {
            MatchNotFound(_) => "This match could not be found.",
            DuelAlreadyExists(_) => "A duel has already been set up for this match.",
            InsufficientConfirmedPlayers { .. } => {
                "Need at least 2 confirmed players to create a duel."
            }
            MatchHasNoLeague(_) => "Duels are only available for league matches.",
            InsufficientMemberData { .. } => {
                "Not enough confirmed players have a league rating yet."
            }
            NoCompatiblePairs => "No new rivalry is possible. The only pair left just dueled.",
            PairSelectionFailed => "Unable to pick a rivalry. Please try again.",
            Store(_) => "Something went wrong. Please try again later.",
        }
    }
}
