//! Idempotent schema bootstrap for the PostgreSQL store.

use sqlx::PgPool;

use super::timeouts::with_transaction_timeout;
use crate::tournament::TournamentResult;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tournaments (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        game_id UUID NOT NULL,
        organizer_id UUID NOT NULL,
        bracket_type TEXT NOT NULL,
        max_teams INTEGER NOT NULL CHECK (max_teams > 0),
        current_teams INTEGER NOT NULL DEFAULT 0,
        prize_pool_cents BIGINT NOT NULL DEFAULT 0 CHECK (prize_pool_cents >= 0),
        start_date TIMESTAMPTZ NOT NULL,
        end_date TIMESTAMPTZ NOT NULL,
        status TEXT NOT NULL,
        rules TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT tournaments_capacity_check CHECK (current_teams >= 0 AND current_teams <= max_teams)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tournaments_status ON tournaments(status)",
    "CREATE INDEX IF NOT EXISTS idx_tournaments_game_id ON tournaments(game_id)",
    r#"
    CREATE TABLE IF NOT EXISTS teams (
        id UUID PRIMARY KEY,
        tournament_id UUID NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        captain_id UUID NOT NULL,
        members UUID[] NOT NULL DEFAULT '{}',
        seed INTEGER NOT NULL,
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_teams_tournament ON teams(tournament_id, seed)",
    r#"
    CREATE TABLE IF NOT EXISTS matches (
        id UUID PRIMARY KEY,
        tournament_id UUID NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
        round INTEGER NOT NULL CHECK (round >= 1),
        match_number INTEGER NOT NULL CHECK (match_number >= 1),
        team1_id UUID,
        team2_id UUID,
        winner_id UUID,
        score TEXT,
        status TEXT NOT NULL,
        scheduled_at TIMESTAMPTZ NOT NULL,
        started_at TIMESTAMPTZ,
        completed_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS matches_round_number_key
        ON matches(tournament_id, round, match_number)
    "#,
];

/// Create the tournament tables and indexes if they are missing
pub async fn ensure_schema(pool: &PgPool) -> TournamentResult<()> {
    with_transaction_timeout(async {
        let mut tx = pool.begin().await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok::<_, sqlx::Error>(())
    })
    .await?;

    log::info!("Tournament schema is up to date");
    Ok(())
}
