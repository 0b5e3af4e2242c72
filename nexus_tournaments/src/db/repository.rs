//! Store trait definitions for testability and dependency injection.
//!
//! The tournament core only ever talks to `TournamentStore`. Two
//! implementations ship with the crate: [`PgTournamentStore`](super::PgTournamentStore)
//! for PostgreSQL and [`MemoryStore`](super::MemoryStore) for tests and
//! database-less deployments.

use async_trait::async_trait;

use crate::tournament::{
    Match, MatchId, Team, Tournament, TournamentFilter, TournamentId, TournamentResult,
};

/// Decides whether a team may join, given the locked tournament row.
/// Returning `Err` aborts the unit of work with nothing written.
pub type TeamAdmission<'a> = &'a (dyn Fn(&Tournament) -> TournamentResult<Team> + Send + Sync);

/// Produces the replacement row for a locked tournament
pub type TournamentMutation<'a> =
    &'a (dyn Fn(&Tournament) -> TournamentResult<Tournament> + Send + Sync);

/// Produces the replacement row for a locked match; `Ok(None)` leaves it untouched
pub type MatchMutation<'a> = &'a (dyn Fn(&Match) -> TournamentResult<Option<Match>> + Send + Sync);

/// Result of a conditional update
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<T> {
    /// Row as stored after the update
    pub entity: T,
    /// False when the mutation asked to leave the row as it was
    pub changed: bool,
}

/// Trait for tournament persistence operations
///
/// Conditional operations (`admit_team`, `update_tournament`, `update_match`)
/// hold an exclusive lock on the affected row for the duration of the
/// callback and the write, so concurrent callers for the same row serialize
/// while callers for different rows do not contend.
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Check that the backing store is reachable
    async fn health_check(&self) -> TournamentResult<()>;

    /// Insert a new tournament
    async fn insert_tournament(&self, tournament: &Tournament) -> TournamentResult<()>;

    /// Find tournament by ID
    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    /// List tournaments matching `filter`, newest first
    async fn list_tournaments(&self, filter: &TournamentFilter)
    -> TournamentResult<Vec<Tournament>>;

    /// Atomically replace a tournament row
    async fn update_tournament(
        &self,
        id: TournamentId,
        mutate: TournamentMutation<'_>,
    ) -> TournamentResult<Tournament>;

    /// Delete a tournament together with its teams and matches.
    /// Returns false if it did not exist.
    async fn delete_tournament(&self, id: TournamentId) -> TournamentResult<bool>;

    /// Atomically run `admit` against the locked tournament, insert the team
    /// it returns and increment `current_teams`
    async fn admit_team(
        &self,
        tournament_id: TournamentId,
        admit: TeamAdmission<'_>,
    ) -> TournamentResult<Team>;

    /// List a tournament's teams ordered by seed
    async fn list_teams(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Team>>;

    /// Insert a match. A duplicate (round, match number) within the
    /// tournament is rejected with `InvalidInput`.
    async fn insert_match(&self, new_match: &Match) -> TournamentResult<()>;

    /// Find match by ID
    async fn get_match(&self, id: MatchId) -> TournamentResult<Option<Match>>;

    /// List a tournament's matches ordered by round, then match number
    async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>>;

    /// Atomically run `mutate` against the locked match and persist its result
    async fn update_match(
        &self,
        id: MatchId,
        mutate: MatchMutation<'_>,
    ) -> TournamentResult<Applied<Match>>;
}
