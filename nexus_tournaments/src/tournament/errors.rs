//! Tournament error types.

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::models::{MatchId, MatchStatus, TeamId, TournamentId};

/// Kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Tournament,
    Team,
    Match,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Tournament => "Tournament",
            EntityKind::Team => "Team",
            EntityKind::Match => "Match",
        })
    }
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Referenced tournament, team or match does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: Uuid },

    /// Registration over the capacity limit
    #[error("Tournament {tournament_id} is full ({max_teams} teams)")]
    CapacityExceeded {
        tournament_id: TournamentId,
        max_teams: u32,
    },

    /// Illegal match state change
    #[error("Invalid match transition: {from} -> {to}")]
    InvalidTransition { from: MatchStatus, to: MatchStatus },

    /// Winner is neither of the match's teams
    #[error("Team {winner} is not playing in match {match_id}")]
    InvalidWinner { match_id: MatchId, winner: TeamId },

    /// Malformed command payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persistence failure; never retried by the core
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl TournamentError {
    pub fn tournament_not_found(id: TournamentId) -> Self {
        TournamentError::NotFound {
            entity: EntityKind::Tournament,
            id,
        }
    }

    pub fn team_not_found(id: TeamId) -> Self {
        TournamentError::NotFound {
            entity: EntityKind::Team,
            id,
        }
    }

    pub fn match_not_found(id: MatchId) -> Self {
        TournamentError::NotFound {
            entity: EntityKind::Match,
            id,
        }
    }

    /// Stable machine-readable error code
    pub fn kind(&self) -> &'static str {
        match self {
            TournamentError::NotFound { .. } => "not_found",
            TournamentError::CapacityExceeded { .. } => "capacity_exceeded",
            TournamentError::InvalidTransition { .. } => "invalid_transition",
            TournamentError::InvalidWinner { .. } => "invalid_winner",
            TournamentError::InvalidInput(_) => "invalid_input",
            TournamentError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Get a client-safe error message
    ///
    /// Store errors are sanitized so SQL details never reach the caller.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<sqlx::Error> for TournamentError {
    fn from(err: sqlx::Error) -> Self {
        TournamentError::StoreUnavailable(err.to_string())
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
