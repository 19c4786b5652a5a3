//! SQL shared by the pool and transaction implementations of
//! [`DuelDatabase`](super::DuelDatabase).
//!
//! Every function takes any Postgres executor, so the same statement can run
//! on `&PgPool` or on a caller's open transaction.

use sqlx::PgExecutor;
use uuid::Uuid;

use super::models::{Duel, DuelStatus, LeagueMatch, LeagueMember, MatchStatus, RosterEntry};
use crate::EngineError;

pub async fn get_match<'e, E>(
    executor: E,
    match_id: Uuid,
) -> Result<Option<LeagueMatch>, EngineError>
where
    E: PgExecutor<'e>,
{
    let league_match = sqlx::query_as::<_, LeagueMatch>(
        r#"
        SELECT match_id, league_id, status, scheduled_at
        FROM league_matches
        WHERE match_id = $1
        LIMIT 1
        "#,
    )
    .bind(match_id)
    .fetch_optional(executor)
    .await?;

    Ok(league_match)
}

pub async fn get_latest_completed_match<'e, E>(
    executor: E,
    league_id: Uuid,
    excluding: Uuid,
) -> Result<Option<LeagueMatch>, EngineError>
where
    E: PgExecutor<'e>,
{
    let league_match = sqlx::query_as::<_, LeagueMatch>(
        r#"
        SELECT match_id, league_id, status, scheduled_at
        FROM league_matches
        WHERE league_id = $1 AND match_id <> $2 AND status = $3
        ORDER BY scheduled_at DESC
        LIMIT 1
        "#,
    )
    .bind(league_id)
    .bind(excluding)
    .bind(MatchStatus::Completed)
    .fetch_optional(executor)
    .await?;

    Ok(league_match)
}

pub async fn get_confirmed_roster<'e, E>(
    executor: E,
    match_id: Uuid,
) -> Result<Vec<RosterEntry>, EngineError>
where
    E: PgExecutor<'e>,
{
    let roster = sqlx::query_as::<_, RosterEntry>(
        r#"
        SELECT match_id, user_id, team_side
        FROM match_roster
        WHERE match_id = $1 AND status = 'confirmed'
        ORDER BY joined_at, user_id
        "#,
    )
    .bind(match_id)
    .fetch_all(executor)
    .await?;

    Ok(roster)
}

pub async fn get_league_members<'e, E>(
    executor: E,
    league_id: Uuid,
    user_ids: &[Uuid],
) -> Result<Vec<LeagueMember>, EngineError>
where
    E: PgExecutor<'e>,
{
    let members = sqlx::query_as::<_, LeagueMember>(
        r#"
        SELECT lm.league_id, lm.user_id, u.username, u.display_name, lm.rating, lm.duel_honors
        FROM league_members AS lm
        JOIN users AS u ON u.user_id = lm.user_id
        WHERE lm.league_id = $1 AND lm.user_id = ANY($2)
        ORDER BY array_position($2, lm.user_id)
        "#,
    )
    .bind(league_id)
    .bind(user_ids)
    .fetch_all(executor)
    .await?;

    Ok(members)
}

pub async fn set_team_side<'e, E>(
    executor: E,
    match_id: Uuid,
    user_id: Uuid,
    team_side: &str,
) -> Result<(), EngineError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE match_roster
        SET team_side = $3
        WHERE match_id = $1 AND user_id = $2
        "#,
    )
    .bind(match_id)
    .bind(user_id)
    .bind(team_side)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_duel_by_match<'e, E>(
    executor: E,
    match_id: Uuid,
) -> Result<Option<Duel>, EngineError>
where
    E: PgExecutor<'e>,
{
    let duel = sqlx::query_as::<_, Duel>(
        r#"
        SELECT duel_id, match_id, challenger_id, rival_id, status, winner_id,
            created_at, resolved_at
        FROM match_duels
        WHERE match_id = $1
        LIMIT 1
        "#,
    )
    .bind(match_id)
    .fetch_optional(executor)
    .await?;

    Ok(duel)
}

pub async fn get_open_duel<'e, E>(executor: E, match_id: Uuid) -> Result<Option<Duel>, EngineError>
where
    E: PgExecutor<'e>,
{
    let duel = sqlx::query_as::<_, Duel>(
        r#"
        SELECT duel_id, match_id, challenger_id, rival_id, status, winner_id,
            created_at, resolved_at
        FROM match_duels
        WHERE match_id = $1 AND status IN ('pending', 'active')
        LIMIT 1
        "#,
    )
    .bind(match_id)
    .fetch_optional(executor)
    .await?;

    Ok(duel)
}

/// Inserts a duel, returning `None` when the match already owns one.
pub async fn insert_duel<'e, E>(executor: E, duel: &Duel) -> Result<Option<Duel>, EngineError>
where
    E: PgExecutor<'e>,
{
    let inserted = sqlx::query_as::<_, Duel>(
        r#"
        INSERT INTO match_duels
            (duel_id, match_id, challenger_id, rival_id, status, winner_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (match_id) DO NOTHING
        RETURNING duel_id, match_id, challenger_id, rival_id, status, winner_id,
            created_at, resolved_at
        "#,
    )
    .bind(duel.duel_id)
    .bind(duel.match_id)
    .bind(duel.challenger_id)
    .bind(duel.rival_id)
    .bind(duel.status)
    .bind(duel.winner_id)
    .bind(duel.created_at)
    .fetch_optional(executor)
    .await?;

    Ok(inserted)
}

pub async fn get_performance_rating<'e, E>(
    executor: E,
    match_id: Uuid,
    user_id: Uuid,
) -> Result<Option<f64>, EngineError>
where
    E: PgExecutor<'e>,
{
    let rating = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT rating
        FROM match_performances
        WHERE match_id = $1 AND user_id = $2
        LIMIT 1
        "#,
    )
    .bind(match_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(rating)
}

pub async fn set_duel_outcome<'e, E>(
    executor: E,
    duel_id: Uuid,
    status: DuelStatus,
    winner_id: Option<Uuid>,
) -> Result<(), EngineError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE match_duels
        SET status = $2, winner_id = $3, resolved_at = NOW()
        WHERE duel_id = $1
        "#,
    )
    .bind(duel_id)
    .bind(status)
    .bind(winner_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Bumps the honors counter and the rating of a league standing in one statement.
pub async fn award_duel_honor<'e, E>(
    executor: E,
    league_id: Uuid,
    user_id: Uuid,
    honors: i32,
    rating_bonus: f64,
) -> Result<(), EngineError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE league_members
        SET duel_honors = duel_honors + $3,
            rating = COALESCE(rating, 0) + $4
        WHERE league_id = $1 AND user_id = $2
        "#,
    )
    .bind(league_id)
    .bind(user_id)
    .bind(honors)
    .bind(rating_bonus)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(anyhow::anyhow!(
            "No league standing for user {} in league {}",
            user_id,
            league_id
        ));
    }

    Ok(())
}

// Guards the writes of a duel resolution inside a caller's transaction.
const SAVEPOINT: &str = "SAVEPOINT duel_resolution";
const RELEASE_SAVEPOINT: &str = "RELEASE SAVEPOINT duel_resolution";
const ROLLBACK_TO_SAVEPOINT: &str = "ROLLBACK TO SAVEPOINT duel_resolution";

pub async fn savepoint<'e, E>(executor: E) -> Result<(), EngineError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(SAVEPOINT).execute(executor).await?;

    Ok(())
}

pub async fn release_savepoint<'e, E>(executor: E) -> Result<(), EngineError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(RELEASE_SAVEPOINT).execute(executor).await?;

    Ok(())
}

pub async fn rollback_to_savepoint<'e, E>(executor: E) -> Result<(), EngineError>
where
    E: PgExecutor<'e>,
{
    // Also clears an aborted transaction so the caller can keep using it.
    sqlx::query(ROLLBACK_TO_SAVEPOINT).execute(executor).await?;

    Ok(())
}
