//! Roster balancing and rivalry duels for league matches.
//!
//! [`LeagueEngine`] is the entry point. It splits a confirmed roster into two
//! teams of similar strength, picks one balanced rivalry pair per league match,
//! and settles that duel from the players' match performance once the match is over.

/// Greedy split of a roster into two teams.
pub mod balance;
/// Settings read from the environment.
pub mod config;
/// The duel store and its Postgres implementation.
pub mod database;
pub mod duel;
mod engine;
/// Notifications sent after a duel is stored or settled.
pub mod events;
pub mod log;

pub use balance::{Participant, TeamAssignment};
pub use config::{DatabaseConfig, DuelSettings};
pub use database::{DuelDatabase, PgDatabase, PgTransaction};
pub use duel::{DuelError, GeneratedDuel, Resolution};
pub use engine::LeagueEngine;
pub use events::{DuelEvent, DuelNotifier};

/// Errors raised by the store and the ambient setup.
pub type EngineError = anyhow::Error;
