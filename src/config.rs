use std::str::FromStr;

use anyhow::anyhow;
use tracing::warn;

use crate::duel::{CANDIDATE_POOL_SIZE, DUEL_HONOR_INCREMENT, WINNER_RATING_BONUS};
use crate::EngineError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for the Postgres store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Reads `DATABASE_URL` and `DATABASE_MAX_CONNECTIONS` from the environment.
    pub fn from_env() -> Result<Self, EngineError> {
        // Load the .env file only in the development environment (bypassed with the --release flag)
        #[cfg(debug_assertions)]
        dotenv::dotenv().ok();

        let url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => return Err(anyhow!("DATABASE_URL environment variable not found")),
        };

        Ok(Self {
            url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
        })
    }
}

/// Tunables for duel generation and resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct DuelSettings {
    /// How many of the best-balanced candidates take part in the random draw.
    pub candidate_pool_size: usize,
    /// Added to the winner's league rating after a decided duel.
    pub winner_rating_bonus: f64,
    /// Added to the winner's duel honors after a decided duel.
    pub honor_increment: i32,
}

impl Default for DuelSettings {
    fn default() -> Self {
        Self {
            candidate_pool_size: CANDIDATE_POOL_SIZE,
            winner_rating_bonus: WINNER_RATING_BONUS,
            honor_increment: DUEL_HONOR_INCREMENT,
        }
    }
}

impl DuelSettings {
    /// Reads `DUEL_CANDIDATE_POOL_SIZE` and `DUEL_WINNER_RATING_BONUS`, keeping
    /// the defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        #[cfg(debug_assertions)]
        dotenv::dotenv().ok();

        let defaults = Self::default();
        Self {
            candidate_pool_size: env_or("DUEL_CANDIDATE_POOL_SIZE", defaults.candidate_pool_size)
                .max(1),
            winner_rating_bonus: env_or("DUEL_WINNER_RATING_BONUS", defaults.winner_rating_bonus),
            honor_increment: defaults.honor_increment,
        }
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Debug>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Debug>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("Invalid value {:?} for {}, using {:?}", raw, key, default);
            default
        }
    }
}
