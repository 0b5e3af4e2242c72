//! PostgreSQL implementation of `TournamentStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::str::FromStr;

use super::{
    repository::{Applied, MatchMutation, TeamAdmission, TournamentMutation, TournamentStore},
    timeouts::{with_default_timeout, with_transaction_timeout},
};
use crate::tournament::{
    Match, MatchId, Team, Tournament, TournamentError, TournamentFilter, TournamentId,
    TournamentResult,
};

const TOURNAMENT_COLUMNS: &str = "id, name, game_id, organizer_id, bracket_type, max_teams, \
     current_teams, prize_pool_cents, start_date, end_date, status, rules, created_at, updated_at";

const TEAM_COLUMNS: &str = "id, tournament_id, name, captain_id, members, seed, status, created_at";

const MATCH_COLUMNS: &str = "id, tournament_id, round, match_number, team1_id, team2_id, \
     winner_id, score, status, scheduled_at, started_at, completed_at";

/// Default PostgreSQL implementation of `TournamentStore`
#[derive(Clone)]
pub struct PgTournamentStore {
    pool: PgPool,
}

impl PgTournamentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TournamentStore for PgTournamentStore {
    async fn health_check(&self) -> TournamentResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }

    async fn insert_tournament(&self, t: &Tournament) -> TournamentResult<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO tournaments (id, name, game_id, organizer_id, bracket_type, max_teams,
                                     current_teams, prize_pool_cents, start_date, end_date,
                                     status, rules, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(t.id)
        .bind(&t.name)
        .bind(t.game_id)
        .bind(t.organizer_id)
        .bind(t.bracket_type.as_str())
        .bind(to_db_int(t.max_teams)?)
        .bind(to_db_int(t.current_teams)?)
        .bind(t.prize_pool_cents)
        .bind(t.start_date)
        .bind(t.end_date)
        .bind(t.status.as_str())
        .bind(&t.rules)
        .bind(t.created_at)
        .bind(t.updated_at);

        with_default_timeout(query.execute(&self.pool)).await?;
        Ok(())
    }

    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&self.pool))
            .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn list_tournaments(
        &self,
        filter: &TournamentFilter,
    ) -> TournamentResult<Vec<Tournament>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE TRUE"
        ));
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(game_id) = filter.game_id {
            query.push(" AND game_id = ").push_bind(game_id);
        }
        query.push(" ORDER BY created_at DESC");

        let rows = with_default_timeout(query.build().fetch_all(&self.pool)).await?;
        rows.iter().map(tournament_from_row).collect()
    }

    async fn update_tournament(
        &self,
        id: TournamentId,
        mutate: TournamentMutation<'_>,
    ) -> TournamentResult<Tournament> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| TournamentError::tournament_not_found(id))?;
            let current = tournament_from_row(&row)?;

            let next = mutate(&current)?;
            next.check_capacity()?;

            sqlx::query(
                r#"
                UPDATE tournaments
                SET name = $1, bracket_type = $2, max_teams = $3, prize_pool_cents = $4,
                    start_date = $5, end_date = $6, status = $7, rules = $8, updated_at = $9
                WHERE id = $10
                "#,
            )
            .bind(&next.name)
            .bind(next.bracket_type.as_str())
            .bind(to_db_int(next.max_teams)?)
            .bind(next.prize_pool_cents)
            .bind(next.start_date)
            .bind(next.end_date)
            .bind(next.status.as_str())
            .bind(&next.rules)
            .bind(next.updated_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, TournamentError>(next)
        })
        .await
    }

    async fn delete_tournament(&self, id: TournamentId) -> TournamentResult<bool> {
        // teams and matches go with it through ON DELETE CASCADE
        let result = with_default_timeout(
            sqlx::query("DELETE FROM tournaments WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn admit_team(
        &self,
        tournament_id: TournamentId,
        admit: TeamAdmission<'_>,
    ) -> TournamentResult<Team> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            // Row lock serializes registrations for this tournament only
            let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| TournamentError::tournament_not_found(tournament_id))?;
            let tournament = tournament_from_row(&row)?;

            let team = admit(&tournament)?;

            sqlx::query(
                r#"
                INSERT INTO teams (id, tournament_id, name, captain_id, members, seed, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(team.id)
            .bind(team.tournament_id)
            .bind(&team.name)
            .bind(team.captain_id)
            .bind(&team.members)
            .bind(to_db_int(team.seed)?)
            .bind(team.status.as_str())
            .bind(team.created_at)
            .execute(&mut *tx)
            .await?;

            let incremented = sqlx::query(
                r#"
                UPDATE tournaments
                SET current_teams = current_teams + 1, updated_at = NOW()
                WHERE id = $1 AND current_teams < max_teams
                "#,
            )
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

            if incremented.rows_affected() == 0 {
                return Err(TournamentError::CapacityExceeded {
                    tournament_id,
                    max_teams: tournament.max_teams,
                });
            }

            tx.commit().await?;
            Ok(team)
        })
        .await
    }

    async fn list_teams(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Team>> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE tournament_id = $1 ORDER BY seed");
        let rows =
            with_default_timeout(sqlx::query(&sql).bind(tournament_id).fetch_all(&self.pool))
                .await?;

        rows.iter().map(team_from_row).collect()
    }

    async fn insert_match(&self, m: &Match) -> TournamentResult<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO matches (id, tournament_id, round, match_number, team1_id, team2_id,
                                 winner_id, score, status, scheduled_at, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(m.id)
        .bind(m.tournament_id)
        .bind(to_db_int(m.round)?)
        .bind(to_db_int(m.match_number)?)
        .bind(m.team1_id)
        .bind(m.team2_id)
        .bind(m.winner_id)
        .bind(&m.score)
        .bind(m.status.as_str())
        .bind(m.scheduled_at)
        .bind(m.started_at)
        .bind(m.completed_at);

        with_default_timeout(async {
            query
                .execute(&self.pool)
                .await
                .map_err(|err| classify_match_insert_error(err, m))
        })
        .await?;
        Ok(())
    }

    async fn get_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&self.pool))
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1 ORDER BY round, match_number"
        );
        let rows =
            with_default_timeout(sqlx::query(&sql).bind(tournament_id).fetch_all(&self.pool))
                .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn update_match(
        &self,
        id: MatchId,
        mutate: MatchMutation<'_>,
    ) -> TournamentResult<Applied<Match>> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| TournamentError::match_not_found(id))?;
            let current = match_from_row(&row)?;

            let Some(next) = mutate(&current)? else {
                // Dropping the transaction releases the row lock
                return Ok(Applied {
                    entity: current,
                    changed: false,
                });
            };

            sqlx::query(
                r#"
                UPDATE matches
                SET status = $1, winner_id = $2, score = $3, started_at = $4, completed_at = $5
                WHERE id = $6
                "#,
            )
            .bind(next.status.as_str())
            .bind(next.winner_id)
            .bind(&next.score)
            .bind(next.started_at)
            .bind(next.completed_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, TournamentError>(Applied {
                entity: next,
                changed: true,
            })
        })
        .await
    }
}

fn classify_match_insert_error(err: sqlx::Error, m: &Match) -> TournamentError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return TournamentError::InvalidInput(format!(
                "match {} already exists in round {}",
                m.match_number, m.round
            ));
        }
        // tournament was deleted between the existence check and the insert
        if db_err.is_foreign_key_violation() {
            return TournamentError::tournament_not_found(m.tournament_id);
        }
    }
    err.into()
}

fn to_db_int(value: u32) -> TournamentResult<i32> {
    i32::try_from(value)
        .map_err(|_| TournamentError::InvalidInput(format!("value {value} is out of range")))
}

fn count_column(row: &PgRow, column: &str) -> TournamentResult<u32> {
    let raw: i32 = row.try_get(column)?;
    u32::try_from(raw).map_err(|_| corrupt(column, &raw.to_string()))
}

fn text_column<T>(row: &PgRow, column: &str) -> TournamentResult<T>
where
    T: FromStr<Err = TournamentError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|_| corrupt(column, &raw))
}

fn corrupt(column: &str, value: &str) -> TournamentError {
    TournamentError::StoreUnavailable(format!("corrupt value '{value}' in column {column}"))
}

fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        game_id: row.try_get("game_id")?,
        organizer_id: row.try_get("organizer_id")?,
        bracket_type: text_column(row, "bracket_type")?,
        max_teams: count_column(row, "max_teams")?,
        current_teams: count_column(row, "current_teams")?,
        prize_pool_cents: row.try_get("prize_pool_cents")?,
        start_date: row.try_get::<DateTime<Utc>, _>("start_date")?,
        end_date: row.try_get::<DateTime<Utc>, _>("end_date")?,
        status: text_column(row, "status")?,
        rules: row.try_get::<Option<String>, _>("rules")?.unwrap_or_default(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn team_from_row(row: &PgRow) -> TournamentResult<Team> {
    Ok(Team {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        name: row.try_get("name")?,
        captain_id: row.try_get("captain_id")?,
        members: row.try_get("members")?,
        seed: count_column(row, "seed")?,
        status: text_column(row, "status")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn match_from_row(row: &PgRow) -> TournamentResult<Match> {
    Ok(Match {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        round: count_column(row, "round")?,
        match_number: count_column(row, "match_number")?,
        team1_id: row.try_get("team1_id")?,
        team2_id: row.try_get("team2_id")?,
        winner_id: row.try_get("winner_id")?,
        score: row.try_get("score")?,
        status: text_column(row, "status")?,
        scheduled_at: row.try_get::<DateTime<Utc>, _>("scheduled_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}
