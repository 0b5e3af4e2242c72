//! Tournament core: data model, registration, match lifecycle and the
//! service that ties them to the store and the event hub.
//!
//! ## Example
//!
//! ```no_run
//! use nexus_tournaments::db::MemoryStore;
//! use nexus_tournaments::events::EventHub;
//! use nexus_tournaments::tournament::{BracketType, NewTournament, RegisterTeam, TournamentService};
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = TournamentService::new(Arc::new(MemoryStore::new()), EventHub::default());
//!     let organizer = Uuid::new_v4();
//!
//!     let now = chrono::Utc::now();
//!     let cup = service
//!         .create_tournament(
//!             NewTournament {
//!                 name: "Friday Cup".to_string(),
//!                 game_id: Uuid::new_v4(),
//!                 bracket_type: BracketType::SingleElimination,
//!                 max_teams: 8,
//!                 prize_pool_cents: 0,
//!                 start_date: now,
//!                 end_date: now,
//!                 rules: String::new(),
//!             },
//!             organizer,
//!         )
//!         .await?;
//!
//!     let mut observer = service.subscribe(cup.id).await?;
//!     service
//!         .register_team(cup.id, RegisterTeam { name: "Owls".into(), members: vec![] }, organizer)
//!         .await?;
//!     println!("{:?}", observer.recv().await);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod models;
pub mod ordering;
pub mod registration;
pub mod service;
pub mod state_machine;

pub use errors::{EntityKind, TournamentError, TournamentResult};
pub use models::{
    Bracket, BracketType, Match, MatchId, MatchStatus, MatchUpdate, NewMatch, NewTournament,
    RegisterTeam, Team, TeamId, TeamStatus, Tournament, TournamentFilter, TournamentId,
    TournamentStatus, TournamentUpdate, UserId, group_by_round,
};
pub use ordering::KeyedLocks;
pub use registration::RegistrationManager;
pub use service::TournamentService;
pub use state_machine::{MatchStateMachine, Transition, apply_update, is_legal};
