//! Error taxonomy for the auth core.
//!
//! Every variant maps to exactly one wire status in `api::handlers::auth::error`.

use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Records written by signup, used to tell insert failures apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Record {
    Account,
    Contact,
    Profile,
}

impl Record {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Contact => "contact",
            Self::Profile => "profile",
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("account not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is blocked")]
    AccountBlocked,

    #[error("account is not verified")]
    AccountNotVerified,

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("failed to insert {record}: {reason}")]
    Insert {
        record: Record,
        reason: String,
        unique_violation: bool,
    },

    #[error("failed to select {record}: {reason}")]
    Select { record: Record, reason: String },

    #[error("failed to update {record}: {reason}")]
    Update { record: Record, reason: String },

    #[error("failed to hash password: {0}")]
    PasswordHash(String),

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid token: {0}")]
    Claims(String),

    #[error("token has been invalidated")]
    InvalidatedToken,

    #[error("revocation ledger error: {0}")]
    Ledger(String),

    /// Pool exhausted or closed, or the connection to Postgres failed.
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl Error {
    /// Whether a caller may retry the same request unchanged.
    ///
    /// The core never retries on its own.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Ledger(_) | Self::Unavailable(_)
        )
    }

    #[must_use]
    pub const fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Insert {
                unique_violation: true,
                ..
            }
        )
    }

    /// Failure of a transaction step (`begin`, `commit`, ...).
    pub(crate) fn transaction(stage: &str, err: &sqlx::Error) -> Self {
        if is_connectivity(err) {
            return Self::Unavailable(format!("{stage}: {err}"));
        }
        Self::Transaction(format!("{stage}: {err}"))
    }

    pub(crate) fn insert(record: Record, err: &sqlx::Error) -> Self {
        if is_connectivity(err) {
            return Self::Unavailable(format!("insert {record}: {err}"));
        }
        Self::Insert {
            record,
            reason: err.to_string(),
            unique_violation: is_unique_violation(err),
        }
    }

    pub(crate) fn select(record: Record, err: &sqlx::Error) -> Self {
        if is_connectivity(err) {
            return Self::Unavailable(format!("select {record}: {err}"));
        }
        Self::Select {
            record,
            reason: err.to_string(),
        }
    }

    pub(crate) fn update(record: Record, err: &sqlx::Error) -> Self {
        if is_connectivity(err) {
            return Self::Unavailable(format!("update {record}: {err}"));
        }
        Self::Update {
            record,
            reason: err.to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Claims(err.to_string())
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Self::Ledger(err.to_string())
    }
}

/// Postgres reports unique constraint violations as SQLSTATE 23505.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Errors that say nothing about the statement, only about reaching Postgres.
pub(crate) fn is_connectivity(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed
    )
}

/// Bound an external call by `after`, turning an elapsed deadline into [`Error::Timeout`].
///
/// # Errors
/// Returns the future's own error, or `Error::Timeout` if it did not finish in time.
pub async fn bounded<T, F>(operation: &'static str, after: Duration, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| Error::Timeout { operation, after })?
}
