//! # Nexus Tournaments
//!
//! Tournament orchestration for competitive play: capacity-gated team
//! registration, a strict match lifecycle and live event fan-out.
//!
//! ## Core Modules
//!
//! - [`tournament`]: data model, registration manager, match state machine
//!   and the [`TournamentService`](tournament::TournamentService)
//! - [`db`]: store trait with PostgreSQL and in-memory implementations
//! - [`events`]: domain events and the partitioned [`EventHub`](events::EventHub)

/// Persistence layer.
pub mod db;

/// Domain events and observer fan-out.
pub mod events;

/// Tournament core logic.
pub mod tournament;

pub use events::{DomainEvent, EventHub, ObserverHandle};
pub use tournament::{TournamentError, TournamentResult, TournamentService};
