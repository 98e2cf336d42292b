//! In-process Revocation Ledger with per-entry expiry.

use super::{RevocationLedger, TokenStatus};
use crate::auth::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
struct Entry {
    status: TokenStatus,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    unavailable: bool,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<State>>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate an outage: every command fails until re-enabled.
    pub fn set_available(&self, available: bool) {
        self.lock().unavailable = !available;
    }

    fn check(state: &State) -> Result<()> {
        if state.unavailable {
            Err(Error::Ledger("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    /// Live (non-expired) entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .entries
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining lifetime of `key`, if present.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.lock()
            .entries
            .get(key)
            .and_then(|entry| entry.expires_at.checked_duration_since(now))
    }

    fn live(state: &mut State, key: &str) -> Option<TokenStatus> {
        let now = Instant::now();
        match state.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.status),
            Some(_) => {
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl RevocationLedger for MemoryLedger {
    async fn set(&self, key: &str, status: TokenStatus, ttl: Duration) -> Result<()> {
        let mut state = self.lock();
        Self::check(&state)?;
        state.entries.insert(
            key.to_string(),
            Entry {
                status,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn swap(
        &self,
        key: &str,
        status: TokenStatus,
        ttl: Duration,
    ) -> Result<Option<TokenStatus>> {
        let mut state = self.lock();
        Self::check(&state)?;
        let previous = Self::live(&mut state, key);
        state.entries.insert(
            key.to_string(),
            Entry {
                status,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(previous)
    }

    async fn get(&self, key: &str) -> Result<Option<TokenStatus>> {
        let mut state = self.lock();
        Self::check(&state)?;
        Ok(Self::live(&mut state, key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.lock();
        Self::check(&state)?;
        state.entries.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Self::check(&self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() -> anyhow::Result<()> {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.get("t").await?, None);

        ledger.set("t", TokenStatus::Valid, Duration::from_secs(60)).await?;
        assert_eq!(ledger.get("t").await?, Some(TokenStatus::Valid));
        assert_eq!(ledger.len(), 1);

        ledger.delete("t").await?;
        assert_eq!(ledger.get("t").await?, None);
        assert!(ledger.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn entries_expire() -> anyhow::Result<()> {
        let ledger = MemoryLedger::new();
        ledger
            .set("t", TokenStatus::Invalid, Duration::from_millis(20))
            .await?;
        assert_eq!(ledger.get("t").await?, Some(TokenStatus::Invalid));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(ledger.get("t").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn swap_returns_previous() -> anyhow::Result<()> {
        let ledger = MemoryLedger::new();
        let ttl = Duration::from_secs(60);
        assert_eq!(ledger.swap("t", TokenStatus::Invalid, ttl).await?, None);
        assert_eq!(
            ledger.swap("t", TokenStatus::Invalid, ttl).await?,
            Some(TokenStatus::Invalid)
        );
        Ok(())
    }

    #[tokio::test]
    async fn outage_surfaces_ledger_error() {
        let ledger = MemoryLedger::new();
        ledger.set_available(false);
        assert!(matches!(ledger.ping().await, Err(Error::Ledger(_))));
        assert!(matches!(ledger.get("t").await, Err(Error::Ledger(_))));
        ledger.set_available(true);
        assert!(ledger.ping().await.is_ok());
    }
}
