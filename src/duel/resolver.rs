use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::DuelSettings;
use crate::database::models::{Duel, DuelStatus};
use crate::database::DuelDatabase;
use crate::EngineError;

/// The decision reached for a match's duel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    /// There was nothing to decide, or deciding failed.
    NoDecision,
    Draw { duel_id: Uuid },
    Winner { duel_id: Uuid, winner_id: Uuid },
}

impl Resolution {
    pub fn winner(&self) -> Option<Uuid> {
        match self {
            Resolution::Winner { winner_id, .. } => Some(*winner_id),
            _ => None,
        }
    }

    pub fn is_decided(&self) -> bool {
        !matches!(self, Resolution::NoDecision)
    }
}

/// How the resolver's writes relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Each write commits on its own. If the reward fails after the outcome was
    /// stored, the failure is logged and the decision still stands.
    Standalone,
    /// Writes belong to a caller's transaction and sit behind a savepoint. Any
    /// failure rolls them back to it and means no decision, while the caller's
    /// own writes stay in place.
    UnitOfWork,
}

/// Decides open duels from the players' match performance.
pub struct DuelResolver<'a, DB> {
    database: &'a mut DB,
    settings: &'a DuelSettings,
    mode: WriteMode,
}

impl<'a, DB> DuelResolver<'a, DB>
where
    DB: DuelDatabase,
{
    pub fn new(database: &'a mut DB, settings: &'a DuelSettings, mode: WriteMode) -> Self {
        Self {
            database,
            settings,
            mode,
        }
    }

    /// Resolves the open duel of a match.
    ///
    /// Never fails: a missing duel and any store error both come back as
    /// [`Resolution::NoDecision`], the latter after being logged.
    #[instrument(name = "resolve_duel", skip(self))]
    pub async fn resolve(mut self, match_id: Uuid) -> Resolution {
        match self.try_resolve(match_id).await {
            Ok(resolution) => resolution,
            Err(e) => {
                error!("Error resolving the duel of match {}: {:#}", match_id, e);
                Resolution::NoDecision
            }
        }
    }

    async fn try_resolve(&mut self, match_id: Uuid) -> Result<Resolution, EngineError> {
        if self.mode == WriteMode::Standalone {
            return self.apply(match_id).await;
        }

        self.database.savepoint().await?;
        let outcome = match self.apply(match_id).await {
            Ok(resolution) => self.database.release_savepoint().await.map(|_| resolution),
            Err(e) => Err(e),
        };

        if outcome.is_err() {
            if let Err(e) = self.database.rollback_to_savepoint().await {
                error!(
                    "Unable to roll back the duel resolution of match {}: {:#}",
                    match_id, e
                );
            }
        }

        outcome
    }

    async fn apply(&mut self, match_id: Uuid) -> Result<Resolution, EngineError> {
        let duel = match self.database.get_open_duel(match_id).await? {
            Some(duel) => duel,
            None => {
                info!("No open duel to resolve for match {}", match_id);
                return Ok(Resolution::NoDecision);
            }
        };

        let challenger = self.performance(match_id, duel.challenger_id).await?;
        let rival = self.performance(match_id, duel.rival_id).await?;

        let resolution = decide(&duel, challenger, rival);
        let (status, winner_id) = match resolution {
            Resolution::Winner { winner_id, .. } => (DuelStatus::Completed, Some(winner_id)),
            _ => (DuelStatus::Draw, None),
        };

        self.database
            .set_duel_outcome(duel.duel_id, status, winner_id)
            .await?;
        info!(
            "Duel {} of match {} resolved as {} ({} vs {})",
            duel.duel_id, match_id, status, challenger, rival
        );

        if let Some(winner_id) = winner_id {
            if let Err(e) = self.reward(match_id, winner_id).await {
                match self.mode {
                    WriteMode::UnitOfWork => return Err(e),
                    WriteMode::Standalone => error!(
                        "Duel {} was resolved but the winner {} was not rewarded: {:#}",
                        duel.duel_id, winner_id, e
                    ),
                }
            }
        }

        Ok(resolution)
    }

    async fn performance(&mut self, match_id: Uuid, user_id: Uuid) -> Result<f64, EngineError> {
        Ok(self
            .database
            .get_performance_rating(match_id, user_id)
            .await?
            .unwrap_or(0.0))
    }

    async fn reward(&mut self, match_id: Uuid, winner_id: Uuid) -> Result<(), EngineError> {
        let league_id = match self.database.get_match(match_id).await? {
            Some(m) => m.league_id,
            None => None,
        };
        let league_id = match league_id {
            Some(id) => id,
            None => {
                warn!("Match {} has no league, skipping the duel reward", match_id);
                return Ok(());
            }
        };

        self.database
            .award_duel_honor(
                league_id,
                winner_id,
                self.settings.honor_increment,
                self.settings.winner_rating_bonus,
            )
            .await
    }
}

/// The strictly higher performance wins. Anything else is a draw.
pub fn decide(duel: &Duel, challenger: f64, rival: f64) -> Resolution {
    if challenger > rival {
        Resolution::Winner {
            duel_id: duel.duel_id,
            winner_id: duel.challenger_id,
        }
    } else if rival > challenger {
        Resolution::Winner {
            duel_id: duel.duel_id,
            winner_id: duel.rival_id,
        }
    } else {
        Resolution::Draw {
            duel_id: duel.duel_id,
        }
    }
}
