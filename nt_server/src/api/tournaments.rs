//! Tournament, team and match REST handlers.
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments \
//!   -H "x-user-id: 4f9c0c1e-8d0a-4a53-9d6c-1f1f0d1b6f11" \
//!   -H "Content-Type: application/json" \
//!   -d '{"name":"Friday Cup","game_id":"…","bracket_type":"single_elimination",
//!        "max_teams":8,"start_date":"2026-11-01T18:00:00Z","end_date":"2026-11-01T23:00:00Z"}'
//! ```
//!
//! Finish a match:
//! ```bash
//! curl -X PUT http://localhost:8080/api/v1/tournaments/{id}/matches/{match_id} \
//!   -H "Content-Type: application/json" \
//!   -d '{"status":"completed","winner_id":"…","score":"2-1"}'
//! ```

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use nexus_tournaments::{
    TournamentError,
    tournament::{
        Bracket, Match, MatchId, MatchUpdate, NewMatch, NewTournament, RegisterTeam, Team,
        Tournament, TournamentFilter, TournamentId, TournamentUpdate,
    },
};

use super::{AppState, error::ApiError, identity::CallerId};
use crate::metrics;

type ApiResult<T> = Result<T, ApiError>;

// === Tournaments ===

/// Create a tournament organized by the caller.
///
/// Returns `201 Created` with the new tournament in `upcoming` status.
pub async fn create_tournament(
    State(state): State<AppState>,
    CallerId(organizer): CallerId,
    payload: Result<Json<NewTournament>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Tournament>)> {
    let Json(request) = payload?;
    let tournament = state.service.create_tournament(request, organizer).await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

/// List tournaments, newest first.
///
/// # Query Parameters
///
/// - `status`: only tournaments in this status
/// - `game_id`: only tournaments for this game
pub async fn list_tournaments(
    State(state): State<AppState>,
    query: Result<Query<TournamentFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<Tournament>>> {
    let Query(filter) = query?;
    Ok(Json(state.service.list_tournaments(&filter).await?))
}

pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(state.service.get_tournament(tournament_id).await?))
}

/// Replace a tournament's editable fields.
///
/// # Errors
///
/// - `400 Bad Request`: invalid fields, or `max_teams` below registered teams
/// - `404 Not Found`: tournament doesn't exist
pub async fn update_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    payload: Result<Json<TournamentUpdate>, JsonRejection>,
) -> ApiResult<Json<Tournament>> {
    let Json(update) = payload?;
    Ok(Json(
        state.service.update_tournament(tournament_id, update).await?,
    ))
}

/// Delete a tournament with its teams and matches.
///
/// Live observers receive `tournament_deleted` and are then disconnected.
pub async fn delete_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<StatusCode> {
    state.service.delete_tournament(tournament_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// === Teams ===

/// Register a team captained by the caller.
///
/// # Errors
///
/// - `404 Not Found`: tournament doesn't exist
/// - `409 Conflict`: tournament is full
/// - `400 Bad Request`: empty team name
pub async fn register_team(
    State(state): State<AppState>,
    CallerId(captain): CallerId,
    Path(tournament_id): Path<TournamentId>,
    payload: Result<Json<RegisterTeam>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let Json(request) = payload?;
    match state
        .service
        .register_team(tournament_id, request, captain)
        .await
    {
        Ok(team) => {
            metrics::team_registrations_total("accepted");
            Ok((StatusCode::CREATED, Json(team)))
        }
        Err(err) => {
            if matches!(err, TournamentError::CapacityExceeded { .. }) {
                metrics::capacity_rejections_total();
            }
            metrics::team_registrations_total(err.kind());
            Err(err.into())
        }
    }
}

/// List registered teams ordered by seed.
pub async fn list_teams(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.service.list_teams(tournament_id).await?))
}

// === Matches ===

/// Matches grouped by round. Keys are round numbers.
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Bracket>> {
    Ok(Json(state.service.get_bracket(tournament_id).await?))
}

pub async fn list_matches(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Vec<Match>>> {
    Ok(Json(state.service.list_matches(tournament_id).await?))
}

/// Create a `scheduled` match.
///
/// # Errors
///
/// - `400 Bad Request`: invalid round or number, or the slot is taken
/// - `404 Not Found`: tournament or a referenced team doesn't exist
pub async fn create_match(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    payload: Result<Json<NewMatch>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Match>)> {
    let Json(request) = payload?;
    let created = state.service.create_match(tournament_id, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
) -> ApiResult<Json<Match>> {
    Ok(Json(
        state
            .service
            .get_tournament_match(tournament_id, match_id)
            .await?,
    ))
}

/// Move a match through its lifecycle.
///
/// Repeating the update that completed or cancelled a match returns the
/// stored match unchanged.
///
/// # Errors
///
/// - `409 Conflict`: transition not allowed from the current status
/// - `422 Unprocessable Entity`: winner is not playing in the match
/// - `400 Bad Request`: winner missing on completion, or given otherwise
pub async fn update_match(
    State(state): State<AppState>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
    payload: Result<Json<MatchUpdate>, JsonRejection>,
) -> ApiResult<Json<Match>> {
    let Json(update) = payload?;
    Ok(Json(
        state
            .service
            .update_tournament_match(tournament_id, match_id, update)
            .await?,
    ))
}
