//! Database query timeout helpers
//!
//! Store calls must complete or fail within a bounded window. A timeout is
//! reported as `StoreUnavailable`; nothing here retries.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::tournament::{TournamentError, TournamentResult};

/// Default timeout for single queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Execute a store operation with timeout
///
/// # Example
///
/// ```no_run
/// use nexus_tournaments::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> nexus_tournaments::tournament::TournamentResult<()> {
///
/// with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT 1").execute(pool),
/// ).await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> TournamentResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<TournamentError>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(TournamentError::StoreUnavailable(format!(
            "operation timed out after {duration:?}"
        ))),
    }
}

/// Execute a single query with the default timeout (5 seconds)
pub async fn with_default_timeout<F, T, E>(future: F) -> TournamentResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<TournamentError>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

/// Execute a transaction body with the transaction timeout (10 seconds)
pub async fn with_transaction_timeout<F, T, E>(future: F) -> TournamentResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<TournamentError>,
{
    with_timeout(DEFAULT_TRANSACTION_TIMEOUT, future).await
}
