use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::pairing::{self, CandidatePair, PairKey, SideLabel, SideLookup};
use super::DuelError;
use crate::config::DuelSettings;
use crate::database::models::{Duel, LeagueMember};
use crate::database::DuelDatabase;
use crate::EngineError;

/// Public identity of one side of a duel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelistProfile {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub rating: f64,
    pub side: SideLabel,
}

impl DuelistProfile {
    fn new(member: &LeagueMember, sides: &SideLookup) -> Self {
        Self {
            user_id: member.user_id,
            username: member.username.clone(),
            display_name: member.display_name.clone(),
            rating: member.rating(),
            side: sides.side_of(member.user_id),
        }
    }
}

/// Who was paired and how close they are, for display to the players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingDetails {
    pub challenger: DuelistProfile,
    pub rival: DuelistProfile,
    /// The rating difference with two decimals, e.g. "0.35".
    pub rating_diff: String,
}

impl PairingDetails {
    fn new(pair: &CandidatePair<'_>, sides: &SideLookup) -> Self {
        Self {
            challenger: DuelistProfile::new(pair.first, sides),
            rival: DuelistProfile::new(pair.second, sides),
            rating_diff: format!("{:.2}", pair.rating_diff),
        }
    }
}

/// A freshly stored duel along with its pairing details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDuel {
    pub duel: Duel,
    pub details: PairingDetails,
}

/// Picks and stores the rivalry duel of a match.
pub struct DuelMatchmaker<'a, DB, R: ?Sized> {
    database: &'a mut DB,
    rng: &'a mut R,
    settings: &'a DuelSettings,
}

impl<'a, DB, R> DuelMatchmaker<'a, DB, R>
where
    DB: DuelDatabase,
    R: Rng + ?Sized,
{
    pub fn new(database: &'a mut DB, rng: &'a mut R, settings: &'a DuelSettings) -> Self {
        Self {
            database,
            rng,
            settings,
        }
    }

    /// Generates a pending duel for a match.
    ///
    /// All preconditions are checked before the single insert, so a failure never
    /// leaves a partial duel behind.
    #[instrument(name = "generate_duel", skip(self))]
    pub async fn generate(mut self, match_id: Uuid) -> Result<GeneratedDuel, DuelError> {
        let league_match = match self.database.get_match(match_id).await? {
            Some(m) => m,
            None => {
                warn!("Cannot generate a duel: match {} not found", match_id);
                return Err(DuelError::MatchNotFound(match_id));
            }
        };

        if self.database.get_duel_by_match(match_id).await?.is_some() {
            warn!("Cannot generate a duel: match {} already has one", match_id);
            return Err(DuelError::DuelAlreadyExists(match_id));
        }

        let roster = self.database.get_confirmed_roster(match_id).await?;
        if roster.len() < 2 {
            warn!(
                "Cannot generate a duel: {} confirmed player(s) in match {}",
                roster.len(),
                match_id
            );
            return Err(DuelError::InsufficientConfirmedPlayers {
                found: roster.len(),
            });
        }

        let league_id = match league_match.league_id {
            Some(id) => id,
            None => {
                warn!("Cannot generate a duel: match {} is not a league match", match_id);
                return Err(DuelError::MatchHasNoLeague(match_id));
            }
        };

        let sides = SideLookup::new(
            roster
                .iter()
                .map(|entry| (entry.user_id, entry.team_side.as_deref())),
        );

        let previous = previous_pair(self.database, league_id, match_id).await?;
        if let Some(key) = previous {
            debug!("Excluding the previous duel pair {}", key);
        }

        let user_ids: Vec<Uuid> = roster.iter().map(|entry| entry.user_id).collect();
        let members = self.database.get_league_members(league_id, &user_ids).await?;
        if members.len() < 2 {
            warn!(
                "Cannot generate a duel: {} confirmed player(s) have league data in match {}",
                members.len(),
                match_id
            );
            return Err(DuelError::InsufficientMemberData {
                found: members.len(),
            });
        }

        let candidates = pairing::enumerate_candidates(&members, &sides);
        let ranked = pairing::rank_candidates(candidates, previous);
        if ranked.is_empty() {
            warn!("Cannot generate a duel: every pair in match {} was excluded", match_id);
            return Err(DuelError::NoCompatiblePairs);
        }

        let pool = pairing::selection_pool(&ranked);
        let picked = pairing::draw(&pool, self.settings.candidate_pool_size, self.rng)
            .ok_or(DuelError::PairSelectionFailed)?;
        debug!(
            "Drew from {} candidate(s), {} in the selection pool",
            ranked.len(),
            pool.len()
        );

        let details = PairingDetails::new(picked, &sides);
        let duel = Duel::new(match_id, picked.first.user_id, picked.second.user_id);

        let duel = match self.database.insert_duel(&duel).await? {
            Some(duel) => duel,
            // Another caller stored a duel for this match since the check above.
            None => return Err(DuelError::DuelAlreadyExists(match_id)),
        };

        info!(
            "Duel {} created for match {}: {} vs {} (rating diff {})",
            duel.duel_id,
            match_id,
            details.challenger.username,
            details.rival.username,
            details.rating_diff
        );

        Ok(GeneratedDuel { duel, details })
    }
}

/// The pair that dueled in the league's most recent other completed match.
///
/// Only a duel that reached a terminal status counts.
pub async fn previous_pair<DB: DuelDatabase>(
    database: &mut DB,
    league_id: Uuid,
    match_id: Uuid,
) -> Result<Option<PairKey>, EngineError> {
    let previous_match = match database.get_latest_completed_match(league_id, match_id).await? {
        Some(m) => m,
        None => return Ok(None),
    };

    let pair = database
        .get_duel_by_match(previous_match.match_id)
        .await?
        .filter(|duel| duel.status.is_terminal())
        .map(|duel| duel.pair_key());

    Ok(pair)
}
