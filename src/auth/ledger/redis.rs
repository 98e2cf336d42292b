//! Redis-backed Revocation Ledger.

use super::{RevocationLedger, TokenStatus};
use crate::auth::error::{Error, Result};
use ::redis::{Client, aio::ConnectionManager, cmd};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{Instrument, Span, info_span};

pub const DEFAULT_KEY_PREFIX: &str = "brickwall:token:";

fn ledger_span(operation: &'static str) -> Span {
    info_span!("ledger.command", db.system = "redis", db.operation = operation)
}

// SET EX rejects zero.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[derive(Clone)]
pub struct RedisLedger {
    conn: ConnectionManager,
    prefix: String,
}

impl std::fmt::Debug for RedisLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLedger")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisLedger {
    /// Connect to `url` (e.g. `redis://localhost:6379/0`).
    ///
    /// # Errors
    /// Returns `Error::Ledger` if the URL is invalid or the first connection fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client)
            .instrument(ledger_span("CONNECT"))
            .await?;
        Ok(Self {
            conn,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
        })
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn key(&self, token: &str) -> String {
        format!("{}{token}", self.prefix)
    }
}

fn parse(value: Option<String>) -> Result<Option<TokenStatus>> {
    value.as_deref().map(TokenStatus::parse).transpose()
}

#[async_trait]
impl RevocationLedger for RedisLedger {
    async fn set(&self, key: &str, status: TokenStatus, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let (): () = cmd("SET")
            .arg(self.key(key))
            .arg(status.as_str())
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async(&mut conn)
            .instrument(ledger_span("SET"))
            .await?;
        Ok(())
    }

    async fn swap(
        &self,
        key: &str,
        status: TokenStatus,
        ttl: Duration,
    ) -> Result<Option<TokenStatus>> {
        let mut conn = self.conn.clone();
        // SET .. GET needs Redis 6.2+
        let previous: Option<String> = cmd("SET")
            .arg(self.key(key))
            .arg(status.as_str())
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .arg("GET")
            .query_async(&mut conn)
            .instrument(ledger_span("SET"))
            .await?;
        parse(previous)
    }

    async fn get(&self, key: &str) -> Result<Option<TokenStatus>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = cmd("GET")
            .arg(self.key(key))
            .query_async(&mut conn)
            .instrument(ledger_span("GET"))
            .await?;
        parse(value)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _removed: i64 = cmd("DEL")
            .arg(self.key(key))
            .query_async(&mut conn)
            .instrument(ledger_span("DEL"))
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = cmd("PING")
            .query_async(&mut conn)
            .instrument(ledger_span("PING"))
            .await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(Error::Ledger(format!("unexpected PING reply: {pong}")))
        }
    }
}
