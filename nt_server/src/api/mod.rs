//! HTTP/WebSocket API for the tournament server.
//!
//! # Modules
//!
//! - [`tournaments`]: Tournament, team and match commands and queries
//! - [`websocket`]: Read-only live event streams
//! - [`identity`]: Caller identity from the `x-user-id` header
//! - [`error`]: Mapping of domain errors onto HTTP responses
//! - [`request_id`]: Request IDs, access logging and request metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                                           - Health check
//! POST   /api/v1/tournaments                               - Create tournament
//! GET    /api/v1/tournaments?status=&game_id=              - List tournaments
//! GET    /api/v1/tournaments/{id}                          - Get tournament
//! PUT    /api/v1/tournaments/{id}                          - Update tournament
//! DELETE /api/v1/tournaments/{id}                          - Delete tournament
//! POST   /api/v1/tournaments/{id}/register                 - Register team
//! GET    /api/v1/tournaments/{id}/teams                    - List teams
//! GET    /api/v1/tournaments/{id}/bracket                  - Matches by round
//! GET    /api/v1/tournaments/{id}/matches                  - List matches
//! POST   /api/v1/tournaments/{id}/matches                  - Create match
//! GET    /api/v1/tournaments/{id}/matches/{match_id}       - Get match
//! PUT    /api/v1/tournaments/{id}/matches/{match_id}       - Update match
//! GET    /api/v1/tournaments/{id}/live                     - Tournament event stream
//! GET    /api/v1/live                                      - Lobby event stream
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use nexus_tournaments::{EventHub, TournamentService, db::MemoryStore};
//! use nt_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TournamentService::new(Arc::new(MemoryStore::new()), EventHub::default());
//! let app = create_router(AppState { service });
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod error;
pub mod identity;
pub mod request_id;
pub mod tournaments;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use nexus_tournaments::TournamentService;
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub service: TournamentService,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tournaments",
            get(tournaments::list_tournaments).post(tournaments::create_tournament),
        )
        .route(
            "/tournaments/{tournament_id}",
            get(tournaments::get_tournament)
                .put(tournaments::update_tournament)
                .delete(tournaments::delete_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/teams",
            get(tournaments::list_teams),
        )
        .route(
            "/tournaments/{tournament_id}/register",
            post(tournaments::register_team),
        )
        .route(
            "/tournaments/{tournament_id}/bracket",
            get(tournaments::get_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/matches",
            get(tournaments::list_matches).post(tournaments::create_match),
        )
        .route(
            "/tournaments/{tournament_id}/matches/{match_id}",
            get(tournaments::get_match).put(tournaments::update_match),
        )
        .route(
            "/tournaments/{tournament_id}/live",
            get(websocket::tournament_live),
        )
        .route("/live", get(websocket::lobby_live))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store answers, `503 Service Unavailable`
/// otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","store":true,"events":{"partitions":2,"observers":5},...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = match state.service.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            false
        }
    };

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let hub = state.service.hub();
    let stats = hub.stats();
    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "events": {
            "partitions": hub.partition_count(),
            "observers": hub.observer_count(),
            "published": stats.published,
            "dropped": stats.dropped,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
