use std::fs::File;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use crate::EngineError;

const DEFAULT_LOG_FILE: &str = "league-duels.log";

/// Sets up the tracing subscriber for the engine.
///
/// Debug builds log to stdout, filtered by `RUST_LOG` on top of `league_duels=info`.
/// Release builds only log errors, into the file named by `LEAGUE_DUELS_LOG_FILE`.
pub fn setup_tracing() -> Result<(), EngineError> {
    if cfg!(debug_assertions) {
        let filter = EnvFilter::from_default_env().add_directive("league_duels=info".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::NONE)
            .pretty()
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;

        return Ok(());
    }

    let path = std::env::var("LEAGUE_DUELS_LOG_FILE").unwrap_or(DEFAULT_LOG_FILE.to_string());
    let log_file = File::create(path)?;

    // Set up tracing with a filter that only logs errors in production
    tracing_subscriber::fmt::fmt()
        .with_span_events(FmtSpan::NONE)
        .with_max_level(LevelFilter::ERROR)
        .with_writer(Mutex::new(log_file))
        .pretty()
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
