use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::EngineError;
use models::*;

/// Models for the database.
///
/// These models are specific to the current database design and schema.
/// Most if not all are directly mapped to a table in the database.
pub mod models;
/// Statements shared by every executor the engine can write through.
mod queries;

#[cfg(test)]
pub(crate) mod memory;

/// A transaction handed to the engine by the caller's unit of work.
pub type PgTransaction<'c> = Transaction<'c, Postgres>;

/// Any store the duel engine can read rosters from and write duels to.
///
/// Methods take `&mut self` so that a caller's open transaction can implement
/// the trait directly and keep every write inside its unit of work.
#[allow(async_fn_in_trait)]
pub trait DuelDatabase {
    /// Retrieves a match by its id.
    async fn get_match(&mut self, match_id: Uuid) -> Result<Option<LeagueMatch>, EngineError>;

    /// Retrieves the most recently scheduled completed match of a league, skipping `excluding`.
    async fn get_latest_completed_match(
        &mut self,
        league_id: Uuid,
        excluding: Uuid,
    ) -> Result<Option<LeagueMatch>, EngineError>;

    /// Retrieves every roster row marked as confirmed for a match.
    async fn get_confirmed_roster(&mut self, match_id: Uuid)
        -> Result<Vec<RosterEntry>, EngineError>;

    /// Retrieves the league standings of the given users.
    ///
    /// Users without a standing in the league are left out. The result follows
    /// the order of `user_ids`.
    async fn get_league_members(
        &mut self,
        league_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Vec<LeagueMember>, EngineError>;

    /// Updates the side label of a roster row.
    async fn set_team_side(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
        team_side: &str,
    ) -> Result<(), EngineError>;

    /// Retrieves the duel of a match regardless of its status.
    async fn get_duel_by_match(&mut self, match_id: Uuid) -> Result<Option<Duel>, EngineError>;

    /// Retrieves the duel of a match if it is still pending or active.
    async fn get_open_duel(&mut self, match_id: Uuid) -> Result<Option<Duel>, EngineError>;

    /// Stores a new duel.
    ///
    /// Returns `None` without writing anything when the match already has a duel.
    async fn insert_duel(&mut self, duel: &Duel) -> Result<Option<Duel>, EngineError>;

    /// Retrieves a player's performance rating for a match, if one was recorded.
    async fn get_performance_rating(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<f64>, EngineError>;

    /// Records the outcome of a duel.
    async fn set_duel_outcome(
        &mut self,
        duel_id: Uuid,
        status: DuelStatus,
        winner_id: Option<Uuid>,
    ) -> Result<(), EngineError>;

    /// Adds honors and a rating bonus to a player's league standing.
    async fn award_duel_honor(
        &mut self,
        league_id: Uuid,
        user_id: Uuid,
        honors: i32,
        rating_bonus: f64,
    ) -> Result<(), EngineError>;

    /// Marks a point the following writes can be rolled back to.
    ///
    /// Stores that commit every statement on its own have nothing to mark.
    async fn savepoint(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Keeps every write made since [`savepoint`](Self::savepoint).
    async fn release_savepoint(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Undoes every write made since [`savepoint`](Self::savepoint), leaving
    /// earlier work in the unit of work untouched.
    async fn rollback_to_savepoint(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// The Postgres database used by the league backend.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pub pool: PgPool,
}

impl PgDatabase {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, EngineError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        info!("Successfully connected to the database.");

        Ok(PgDatabase { pool })
    }

    pub async fn migrate(&self) -> Result<(), EngineError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Opens a transaction that can be passed to the engine as a unit of work.
    pub async fn begin(&self) -> Result<PgTransaction<'static>, EngineError> {
        Ok(self.pool.begin().await?)
    }
}

impl DuelDatabase for PgDatabase {
    async fn get_match(&mut self, match_id: Uuid) -> Result<Option<LeagueMatch>, EngineError> {
        queries::get_match(&self.pool, match_id).await
    }

    async fn get_latest_completed_match(
        &mut self,
        league_id: Uuid,
        excluding: Uuid,
    ) -> Result<Option<LeagueMatch>, EngineError> {
        queries::get_latest_completed_match(&self.pool, league_id, excluding).await
    }

    async fn get_confirmed_roster(
        &mut self,
        match_id: Uuid,
    ) -> Result<Vec<RosterEntry>, EngineError> {
        queries::get_confirmed_roster(&self.pool, match_id).await
    }

    async fn get_league_members(
        &mut self,
        league_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Vec<LeagueMember>, EngineError> {
        queries::get_league_members(&self.pool, league_id, user_ids).await
    }

    async fn set_team_side(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
        team_side: &str,
    ) -> Result<(), EngineError> {
        queries::set_team_side(&self.pool, match_id, user_id, team_side).await
    }

    async fn get_duel_by_match(&mut self, match_id: Uuid) -> Result<Option<Duel>, EngineError> {
        queries::get_duel_by_match(&self.pool, match_id).await
    }

    async fn get_open_duel(&mut self, match_id: Uuid) -> Result<Option<Duel>, EngineError> {
        queries::get_open_duel(&self.pool, match_id).await
    }

    async fn insert_duel(&mut self, duel: &Duel) -> Result<Option<Duel>, EngineError> {
        queries::insert_duel(&self.pool, duel).await
    }

    async fn get_performance_rating(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<f64>, EngineError> {
        queries::get_performance_rating(&self.pool, match_id, user_id).await
    }

    async fn set_duel_outcome(
        &mut self,
        duel_id: Uuid,
        status: DuelStatus,
        winner_id: Option<Uuid>,
    ) -> Result<(), EngineError> {
        queries::set_duel_outcome(&self.pool, duel_id, status, winner_id).await
    }

    async fn award_duel_honor(
        &mut self,
        league_id: Uuid,
        user_id: Uuid,
        honors: i32,
        rating_bonus: f64,
    ) -> Result<(), EngineError> {
        queries::award_duel_honor(&self.pool, league_id, user_id, honors, rating_bonus).await
    }
}

/// Runs every statement on the caller's transaction. Nothing is committed here.
impl DuelDatabase for PgTransaction<'_> {
    async fn get_match(&mut self, match_id: Uuid) -> Result<Option<LeagueMatch>, EngineError> {
        queries::get_match(&mut **self, match_id).await
    }

    async fn get_latest_completed_match(
        &mut self,
        league_id: Uuid,
        excluding: Uuid,
    ) -> Result<Option<LeagueMatch>, EngineError> {
        queries::get_latest_completed_match(&mut **self, league_id, excluding).await
    }

    async fn get_confirmed_roster(
        &mut self,
        match_id: Uuid,
    ) -> Result<Vec<RosterEntry>, EngineError> {
        queries::get_confirmed_roster(&mut **self, match_id).await
    }

    async fn get_league_members(
        &mut self,
        league_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Vec<LeagueMember>, EngineError> {
        queries::get_league_members(&mut **self, league_id, user_ids).await
    }

    async fn set_team_side(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
        team_side: &str,
    ) -> Result<(), EngineError> {
        queries::set_team_side(&mut **self, match_id, user_id, team_side).await
    }

    async fn get_duel_by_match(&mut self, match_id: Uuid) -> Result<Option<Duel>, EngineError> {
        queries::get_duel_by_match(&mut **self, match_id).await
    }

    async fn get_open_duel(&mut self, match_id: Uuid) -> Result<Option<Duel>, EngineError> {
        queries::get_open_duel(&mut **self, match_id).await
    }

    async fn insert_duel(&mut self, duel: &Duel) -> Result<Option<Duel>, EngineError> {
        queries::insert_duel(&mut **self, duel).await
    }

    async fn get_performance_rating(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<f64>, EngineError> {
        queries::get_performance_rating(&mut **self, match_id, user_id).await
    }

    async fn set_duel_outcome(
        &mut self,
        duel_id: Uuid,
        status: DuelStatus,
        winner_id: Option<Uuid>,
    ) -> Result<(), EngineError> {
        queries::set_duel_outcome(&mut **self, duel_id, status, winner_id).await
    }

    async fn award_duel_honor(
        &mut self,
        league_id: Uuid,
        user_id: Uuid,
        honors: i32,
        rating_bonus: f64,
    ) -> Result<(), EngineError> {
        queries::award_duel_honor(&mut **self, league_id, user_id, honors, rating_bonus).await
    }

    async fn savepoint(&mut self) -> Result<(), EngineError> {
        queries::savepoint(&mut **self).await
    }

    async fn release_savepoint(&mut self) -> Result<(), EngineError> {
        queries::release_savepoint(&mut **self).await
    }

    async fn rollback_to_savepoint(&mut self) -> Result<(), EngineError> {
        queries::rollback_to_savepoint(&mut **self).await
    }
}
