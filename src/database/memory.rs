//! An in-memory [`DuelDatabase`] for tests.

use std::collections::HashMap;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::models::*;
use super::DuelDatabase;
use crate::EngineError;

#[derive(Debug, Clone)]
pub struct RosterRow {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub confirmed: bool,
    pub team_side: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    pub matches: HashMap<Uuid, LeagueMatch>,
    pub roster: Vec<RosterRow>,
    pub members: Vec<LeagueMember>,
    pub duels: Vec<Duel>,
    pub performances: HashMap<(Uuid, Uuid), f64>,
    /// Name of a trait method that should fail when called.
    pub failing: Option<&'static str>,
    pub writes: usize,
    savepoint: Option<Snapshot>,
}

#[derive(Debug)]
struct Snapshot {
    roster: Vec<RosterRow>,
    members: Vec<LeagueMember>,
    duels: Vec<Duel>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a match scheduled `days_ago` days in the past.
    pub fn add_match(
        &mut self,
        league_id: Option<Uuid>,
        status: MatchStatus,
        days_ago: i64,
    ) -> Uuid {
        let match_id = Uuid::new_v4();
        self.matches.insert(
            match_id,
            LeagueMatch {
                match_id,
                league_id,
                status,
                scheduled_at: base_time() - Duration::days(days_ago),
            },
        );
        match_id
    }

    /// Adds a league member and returns their user id.
    pub fn add_member(&mut self, league_id: Uuid, username: &str, rating: Option<f64>) -> Uuid {
        let user_id = Uuid::new_v4();
        self.members.push(LeagueMember {
            league_id,
            user_id,
            username: username.to_string(),
            display_name: Some(username.to_uppercase()),
            rating,
            duel_honors: 0,
        });
        user_id
    }

    pub fn add_roster(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
        confirmed: bool,
        side: Option<&str>,
    ) {
        self.roster.push(RosterRow {
            match_id,
            user_id,
            confirmed,
            team_side: side.map(str::to_string),
        });
    }

    pub fn confirm(&mut self, match_id: Uuid, user_id: Uuid, side: Option<&str>) {
        self.add_roster(match_id, user_id, true, side);
    }

    pub fn add_duel(
        &mut self,
        match_id: Uuid,
        challenger_id: Uuid,
        rival_id: Uuid,
        status: DuelStatus,
    ) -> Uuid {
        let mut duel = Duel::new(match_id, challenger_id, rival_id);
        duel.status = status;
        let duel_id = duel.duel_id;
        self.duels.push(duel);
        duel_id
    }

    pub fn member(&self, league_id: Uuid, user_id: Uuid) -> Option<&LeagueMember> {
        self.members
            .iter()
            .find(|m| m.league_id == league_id && m.user_id == user_id)
    }

    pub fn duel(&self, match_id: Uuid) -> Option<&Duel> {
        self.duels.iter().find(|d| d.match_id == match_id)
    }

    fn check(&self, operation: &str) -> Result<(), EngineError> {
        match self.failing {
            Some(failing) if failing == operation => Err(anyhow!("{} is unavailable", operation)),
            _ => Ok(()),
        }
    }
}

fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_718_000_000, 0).unwrap_or_default()
}

impl DuelDatabase for MemoryDatabase {
    async fn get_match(&mut self, match_id: Uuid) -> Result<Option<LeagueMatch>, EngineError> {
        self.check("get_match")?;
        Ok(self.matches.get(&match_id).cloned())
    }

    async fn get_latest_completed_match(
        &mut self,
        league_id: Uuid,
        excluding: Uuid,
    ) -> Result<Option<LeagueMatch>, EngineError> {
        self.check("get_latest_completed_match")?;
        Ok(self
            .matches
            .values()
            .filter(|m| {
                m.league_id == Some(league_id)
                    && m.match_id != excluding
                    && m.status == MatchStatus::Completed
            })
            .max_by_key(|m| m.scheduled_at)
            .cloned())
    }

    async fn get_confirmed_roster(
        &mut self,
        match_id: Uuid,
    ) -> Result<Vec<RosterEntry>, EngineError> {
        self.check("get_confirmed_roster")?;
        Ok(self
            .roster
            .iter()
            .filter(|r| r.match_id == match_id && r.confirmed)
            .map(|r| RosterEntry {
                match_id: r.match_id,
                user_id: r.user_id,
                team_side: r.team_side.clone(),
            })
            .collect())
    }

    async fn get_league_members(
        &mut self,
        league_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Vec<LeagueMember>, EngineError> {
        self.check("get_league_members")?;
        Ok(user_ids
            .iter()
            .filter_map(|id| self.member(league_id, *id).cloned())
            .collect())
    }

    async fn set_team_side(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
        team_side: &str,
    ) -> Result<(), EngineError> {
        self.check("set_team_side")?;
        self.writes += 1;
        if let Some(row) = self
            .roster
            .iter_mut()
            .find(|r| r.match_id == match_id && r.user_id == user_id)
        {
            row.team_side = Some(team_side.to_string());
        }
        Ok(())
    }

    async fn get_duel_by_match(&mut self, match_id: Uuid) -> Result<Option<Duel>, EngineError> {
        self.check("get_duel_by_match")?;
        Ok(self.duel(match_id).cloned())
    }

    async fn get_open_duel(&mut self, match_id: Uuid) -> Result<Option<Duel>, EngineError> {
        self.check("get_open_duel")?;
        Ok(self
            .duel(match_id)
            .filter(|d| d.status.is_open())
            .cloned())
    }

    async fn insert_duel(&mut self, duel: &Duel) -> Result<Option<Duel>, EngineError> {
        self.check("insert_duel")?;
        if self.duel(duel.match_id).is_some() {
            return Ok(None);
        }
        self.writes += 1;
        self.duels.push(duel.clone());
        Ok(Some(duel.clone()))
    }

    async fn get_performance_rating(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<f64>, EngineError> {
        self.check("get_performance_rating")?;
        Ok(self.performances.get(&(match_id, user_id)).copied())
    }

    async fn set_duel_outcome(
        &mut self,
        duel_id: Uuid,
        status: DuelStatus,
        winner_id: Option<Uuid>,
    ) -> Result<(), EngineError> {
        self.check("set_duel_outcome")?;
        self.writes += 1;
        let duel = self
            .duels
            .iter_mut()
            .find(|d| d.duel_id == duel_id)
            .ok_or(anyhow!("Duel {} not found", duel_id))?;
        duel.status = status;
        duel.winner_id = winner_id;
        duel.resolved_at = Some(Utc::now());
        Ok(())
    }

    async fn award_duel_honor(
        &mut self,
        league_id: Uuid,
        user_id: Uuid,
        honors: i32,
        rating_bonus: f64,
    ) -> Result<(), EngineError> {
        self.check("award_duel_honor")?;
        self.writes += 1;
        let member = self
            .members
            .iter_mut()
            .find(|m| m.league_id == league_id && m.user_id == user_id)
            .ok_or(anyhow!("No league standing for user {}", user_id))?;
        member.duel_honors += honors;
        member.rating = Some(member.rating.unwrap_or(0.0) + rating_bonus);
        Ok(())
    }

    async fn savepoint(&mut self) -> Result<(), EngineError> {
        self.check("savepoint")?;
        self.savepoint = Some(Snapshot {
            roster: self.roster.clone(),
            members: self.members.clone(),
            duels: self.duels.clone(),
        });
        Ok(())
    }

    async fn release_savepoint(&mut self) -> Result<(), EngineError> {
        self.check("release_savepoint")?;
        self.savepoint = None;
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self) -> Result<(), EngineError> {
        self.check("rollback_to_savepoint")?;
        let snapshot = self
            .savepoint
            .take()
            .ok_or(anyhow!("No savepoint to roll back to"))?;
        self.roster = snapshot.roster;
        self.members = snapshot.members;
        self.duels = snapshot.duels;
        Ok(())
    }
}
