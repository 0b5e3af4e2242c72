//! Persistence layer: PostgreSQL connection pooling and the tournament stores.
//!
//! The core only depends on [`TournamentStore`]. [`PgTournamentStore`] is the
//! default backend; [`MemoryStore`] keeps everything in process.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::tournament::TournamentResult;

pub mod config;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod schema;
pub mod timeouts;

pub use config::{DatabaseConfig, DatabaseConfigError};
pub use memory::MemoryStore;
pub use postgres::PgTournamentStore;
pub use repository::{Applied, MatchMutation, TeamAdmission, TournamentMutation, TournamentStore};
pub use schema::ensure_schema;

/// PostgreSQL pool with the tournament schema in place
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a pool and create any missing tournament tables.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nexus_tournaments::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    ///     let _store = db.tournament_store();
    ///     Ok(())
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// * `TournamentError::StoreUnavailable` - Unreachable database, or the
    ///   schema could not be created
    pub async fn connect(config: &DatabaseConfig) -> TournamentResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        ensure_schema(&pool).await?;
        log::info!(
            "Tournament schema ready ({}..{} connections)",
            config.min_connections,
            config.max_connections
        );

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Tournament store sharing this pool
    pub fn tournament_store(&self) -> PgTournamentStore {
        PgTournamentStore::new(self.pool.clone())
    }

    /// Wait for in-flight queries, then close every connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}
