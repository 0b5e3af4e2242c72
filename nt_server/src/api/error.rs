//! Mapping of tournament errors onto HTTP responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nexus_tournaments::TournamentError;
use serde::{Deserialize, Serialize};

use crate::logging;

/// JSON error body
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Stable error code
    pub error: String,
    pub message: String,
}

/// Handler error wrapping a [`TournamentError`]
#[derive(Debug)]
pub struct ApiError(pub TournamentError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TournamentError::NotFound { .. } => StatusCode::NOT_FOUND,
            TournamentError::CapacityExceeded { .. } => StatusCode::CONFLICT,
            TournamentError::InvalidTransition { .. } => StatusCode::CONFLICT,
            TournamentError::InvalidWinner { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            TournamentError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TournamentError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn invalid_input(message: String) -> Self {
        ApiError(TournamentError::InvalidInput(message))
    }
}

impl From<TournamentError> for ApiError {
    fn from(err: TournamentError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Store failure while handling request");
        } else {
            logging::log_command_rejected(self.0.kind(), &self.0.to_string());
        }

        let body = ErrorResponse {
            error: self.0.kind().to_string(),
            message: self.0.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_tournaments::tournament::MatchStatus;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        let cases = [
            (TournamentError::tournament_not_found(id), StatusCode::NOT_FOUND),
            (
                TournamentError::CapacityExceeded {
                    tournament_id: id,
                    max_teams: 2,
                },
                StatusCode::CONFLICT,
            ),
            (
                TournamentError::InvalidTransition {
                    from: MatchStatus::Completed,
                    to: MatchStatus::InProgress,
                },
                StatusCode::CONFLICT,
            ),
            (
                TournamentError::InvalidWinner {
                    match_id: id,
                    winner: id,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                TournamentError::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                TournamentError::StoreUnavailable("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    #[test]
    fn test_store_details_not_leaked() {
        let response =
            ApiError(TournamentError::StoreUnavailable("relation does not exist".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
