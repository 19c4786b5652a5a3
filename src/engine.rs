use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::balance::{self, Participant, TeamAssignment};
use crate::config::DuelSettings;
use crate::database::models::Duel;
use crate::database::DuelDatabase;
use crate::duel::{
    DuelError, DuelMatchmaker, DuelResolver, GeneratedDuel, Resolution, SideLabel, WriteMode,
};
use crate::events::{DuelEvent, DuelNotifier};
use crate::EngineError;

/// Entry point for roster balancing and duel matchmaking.
///
/// The engine owns its store and random source. Nothing is shared between calls
/// other than those two.
pub struct LeagueEngine<DB, R = StdRng> {
    database: DB,
    rng: R,
    settings: DuelSettings,
    notifier: Option<DuelNotifier>,
}

impl<DB> LeagueEngine<DB, StdRng>
where
    DB: DuelDatabase,
{
    /// Creates an engine drawing from an entropy-seeded random source.
    pub fn new(database: DB, settings: DuelSettings) -> Self {
        Self::with_rng(database, StdRng::from_entropy(), settings)
    }
}

impl<DB, R> LeagueEngine<DB, R>
where
    DB: DuelDatabase,
    R: Rng,
{
    pub fn with_rng(database: DB, rng: R, settings: DuelSettings) -> Self {
        Self {
            database,
            rng,
            settings,
            notifier: None,
        }
    }

    /// Emits duel events through `notifier` after each successful write.
    pub fn with_notifier(mut self, notifier: DuelNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn database(&self) -> &DB {
        &self.database
    }

    pub fn settings(&self) -> &DuelSettings {
        &self.settings
    }

    /// Splits players into two teams of similar total rating.
    pub fn balance(&self, players: Vec<Participant>) -> TeamAssignment {
        balance::balance(players)
    }

    /// Picks a rivalry among the confirmed players of a match and stores it as a pending duel.
    pub async fn generate_duel(&mut self, match_id: Uuid) -> Result<GeneratedDuel, DuelError> {
        let generated = DuelMatchmaker::new(&mut self.database, &mut self.rng, &self.settings)
            .generate(match_id)
            .await?;

        if let Some(notifier) = &self.notifier {
            notifier.emit(DuelEvent::created(&generated));
        }

        Ok(generated)
    }

    /// Resolves a match's open duel with each write committing on its own.
    pub async fn resolve_duel(&mut self, match_id: Uuid) -> Resolution {
        let resolver = DuelResolver::new(&mut self.database, &self.settings, WriteMode::Standalone);
        let resolution = resolver.resolve(match_id).await;

        if resolution.is_decided() {
            self.notify_resolution(match_id, resolution);
        }

        resolution
    }

    /// Resolves a match's open duel inside the caller's unit of work.
    ///
    /// The resolution's writes sit behind a savepoint. When anything fails they are
    /// rolled back, the result is [`Resolution::NoDecision`], and the unit of work
    /// stays usable for the caller's other writes.
    ///
    /// Nothing is emitted here. Once the caller has committed it may pass the
    /// result to [`notify_resolution`](Self::notify_resolution).
    pub async fn resolve_duel_in<T>(&self, unit_of_work: &mut T, match_id: Uuid) -> Resolution
    where
        T: DuelDatabase,
    {
        DuelResolver::new(unit_of_work, &self.settings, WriteMode::UnitOfWork)
            .resolve(match_id)
            .await
    }

    pub fn notify_resolution(&self, match_id: Uuid, resolution: Resolution) {
        if let Some(notifier) = &self.notifier {
            notifier.emit(DuelEvent::resolved(match_id, resolution));
        }
    }

    /// Splits the confirmed roster of a league match into sides "A" and "B".
    ///
    /// Players without a league rating count as zero. The new sides are written
    /// back to the roster.
    #[instrument(skip(self))]
    pub async fn assign_teams(&mut self, match_id: Uuid) -> Result<TeamAssignment, DuelError> {
        let league_match = self
            .database
            .get_match(match_id)
            .await?
            .ok_or(DuelError::MatchNotFound(match_id))?;
        let league_id = league_match
            .league_id
            .ok_or(DuelError::MatchHasNoLeague(match_id))?;

        let roster = self.database.get_confirmed_roster(match_id).await?;
        let user_ids: Vec<Uuid> = roster.iter().map(|entry| entry.user_id).collect();
        let members = self.database.get_league_members(league_id, &user_ids).await?;

        let players = roster
            .iter()
            .map(|entry| {
                let member = members.iter().find(|m| m.user_id == entry.user_id);
                if member.is_none() {
                    warn!("User {} has no standing in league {}", entry.user_id, league_id);
                }
                Participant::from_roster(entry, member)
            })
            .collect();

        let mut assignment = balance::balance(players);
        for (team, label) in [(&mut assignment.team_a, "A"), (&mut assignment.team_b, "B")] {
            for player in team.iter_mut() {
                self.database
                    .set_team_side(match_id, player.user_id, label)
                    .await?;
                player.side = SideLabel::new(Some(label));
            }
        }

        let (sum_a, sum_b) = assignment.rating_sums();
        info!(
            "Assigned {} vs {} players in match {} (ratings {:.2} vs {:.2})",
            assignment.team_a.len(),
            assignment.team_b.len(),
            match_id,
            sum_a,
            sum_b
        );

        Ok(assignment)
    }

    /// Retrieves the duel of a match regardless of its status.
    pub async fn duel_for_match(&mut self, match_id: Uuid) -> Result<Option<Duel>, EngineError> {
        self.database.get_duel_by_match(match_id).await
    }
}
