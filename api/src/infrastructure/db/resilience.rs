use std::future::Future;
use std::time::Duration;

use tracing::{info_span, warn, Instrument};

use crate::application::errors::Unavailable;
use crate::bootstrap::config::DbRetrySettings;

/// Errors that may succeed when simply tried again.
pub trait TransientError: std::fmt::Display {
    fn is_transient(&self) -> bool;
}

// Postgres SQLSTATEs for lost or refused connections and server shutdown.
const TRANSIENT_SQLSTATES: &[&str] = &[
    "08000", "08001", "08003", "08004", "08006", "57P01", "57P02", "57P03", "53300",
];

impl TransientError for sqlx::Error {
    fn is_transient(&self) -> bool {
        match self {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => true,
            sqlx::Error::Database(db) => db
                .code()
                .map(|c| TRANSIENT_SQLSTATES.contains(&c.as_ref()))
                .unwrap_or(false),
            sqlx::Error::Protocol(msg) => {
                let msg = msg.to_ascii_lowercase();
                msg.contains("connection") || msg.contains("unexpected eof")
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DbRetrySettings::default())
    }
}

impl From<&DbRetrySettings> for RetryPolicy {
    fn from(s: &DbRetrySettings) -> Self {
        Self {
            max_attempts: s.max_attempts.max(1),
            initial_delay: s.initial_delay,
            max_delay: s.max_delay,
            multiplier: 1.5,
        }
    }
}

impl RetryPolicy {
    /// Sleep before attempt `failed + 1`, where `failed` attempts have already failed.
    pub fn delay_after(&self, failed: u32) -> Duration {
        let exp = failed.saturating_sub(1) as i32;
        let ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exp);
        Duration::from_millis(ms as u64).min(self.max_delay)
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the attempt
/// ceiling is reached. Non-transient errors are returned after a single attempt.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, op: F) -> Result<T, E>
where
    E: TransientError,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        let span = info_span!("db_retry", operation = %operation, attempt);
        match op().instrument(span).await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation = %operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "db_transient_failure_retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// [`with_retry`] for sqlx work; an exhausted transient failure is tagged
/// [`Unavailable`] so callers map it to a 503.
pub async fn run<T, F, Fut>(policy: &RetryPolicy, operation: &str, op: F) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    with_retry(policy, operation, op).await.map_err(|e| {
        if e.is_transient() {
            anyhow::Error::new(e).context(Unavailable)
        } else {
            anyhow::Error::new(e).context(format!("{operation} failed"))
        }
    })
}

/// Failure of one attempt at a multi-statement transaction.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error(transparent)]
    Statement(#[from] sqlx::Error),
    /// `COMMIT` was sent and the acknowledgement never arrived, so the
    /// transaction may or may not have been applied.
    #[error("commit not acknowledged: {0}")]
    Commit(sqlx::Error),
}

impl TransientError for TxError {
    fn is_transient(&self) -> bool {
        match self {
            TxError::Statement(e) => e.is_transient(),
            TxError::Commit(_) => false,
        }
    }
}

/// Context attached when a transaction's outcome is unknown.
#[derive(Debug, Clone, Copy)]
pub struct CommitUnknown;

impl std::fmt::Display for CommitUnknown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("transaction outcome unknown")
    }
}

pub async fn commit(tx: sqlx::Transaction<'_, sqlx::Postgres>) -> Result<(), TxError> {
    tx.commit().await.map_err(TxError::Commit)
}

/// [`run`] for a whole transaction. Statements before [`commit`] are retried
/// like any other query; a failed commit is returned at once, tagged
/// [`CommitUnknown`], so the caller can check what actually landed.
pub async fn run_tx<T, F, Fut>(policy: &RetryPolicy, operation: &str, op: F) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, TxError>>,
{
    with_retry(policy, operation, op).await.map_err(|e| match e {
        TxError::Statement(e) if e.is_transient() => anyhow::Error::new(e).context(Unavailable),
        TxError::Statement(e) => anyhow::Error::new(e).context(format!("{operation} failed")),
        TxError::Commit(e) => {
            warn!(operation = %operation, error = %e, "db_commit_unacknowledged");
            anyhow::Error::new(e).context(CommitUnknown)
        }
    })
}

pub fn is_commit_unknown(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CommitUnknown>().is_some()
}

/// True when the error (or what it wraps) is a unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}
