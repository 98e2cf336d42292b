//! Revocation Ledger: expiring token status entries in a key-value store.
//!
//! An absent entry means the token was never evaluated (or its entry
//! expired). `invalid` always wins over signature and expiry checks.

use super::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod redis;

#[cfg(any(test, feature = "test-support"))]
pub use self::memory::MemoryLedger;
pub use self::redis::RedisLedger;

pub const TOKEN_VALID: &str = "valid";
pub const TOKEN_INVALID: &str = "invalid";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    Invalid,
}

impl TokenStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => TOKEN_VALID,
            Self::Invalid => TOKEN_INVALID,
        }
    }

    /// Parse a stored marker.
    ///
    /// # Errors
    /// Returns `Error::Ledger` for anything other than `valid` or `invalid`.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            TOKEN_VALID => Ok(Self::Valid),
            TOKEN_INVALID => Ok(Self::Invalid),
            other => Err(Error::Ledger(format!("unexpected token status: {other}"))),
        }
    }
}

#[async_trait]
pub trait RevocationLedger: Send + Sync {
    async fn set(&self, key: &str, status: TokenStatus, ttl: Duration) -> Result<()>;

    /// Write `status` and return the previous entry in one atomic step.
    async fn swap(&self, key: &str, status: TokenStatus, ttl: Duration)
    -> Result<Option<TokenStatus>>;

    async fn get(&self, key: &str) -> Result<Option<TokenStatus>>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}
