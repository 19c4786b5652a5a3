use anyhow::{anyhow, bail};
use tracing::{error, info};
use uuid::Uuid;

use league_duels::events::spawn_dispatcher;
use league_duels::log::setup_tracing;
use league_duels::{DatabaseConfig, DuelSettings, EngineError, LeagueEngine, PgDatabase};

const USAGE: &str = "Usage: league-duels <teams|generate|resolve> <match id>";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{:#}", e);
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

/// Runs a single engine operation against the configured database.
async fn run() -> Result<(), EngineError> {
    let config = DatabaseConfig::from_env()?;
    setup_tracing()?;

    let mut args = std::env::args().skip(1);
    let command = args.next().ok_or(anyhow!(USAGE))?;
    let match_id: Uuid = args
        .next()
        .ok_or(anyhow!(USAGE))?
        .parse()
        .map_err(|e| anyhow!("Invalid match id: {}", e))?;

    let database = PgDatabase::connect(&config).await?;
    database.migrate().await?;

    let (notifier, dispatcher) = spawn_dispatcher(|event| async move {
        info!("Duel event: {}", event.payload()?);
        Ok::<(), EngineError>(())
    });
    let mut engine = LeagueEngine::new(database, DuelSettings::from_env()).with_notifier(notifier);

    match command.as_str() {
        "teams" => {
            let teams = engine.assign_teams(match_id).await?;
            println!("{}", serde_json::to_string_pretty(&teams)?);
        }
        "generate" => {
            let generated = engine.generate_duel(match_id).await?;
            println!("{}", serde_json::to_string_pretty(&generated)?);
        }
        "resolve" => {
            let resolution = engine.resolve_duel(match_id).await;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        other => bail!("Unknown command {}. {}", other, USAGE),
    }

    // Dropping the engine closes the event channel so the dispatcher can finish.
    drop(engine);
    dispatcher.await?;

    Ok(())
}
