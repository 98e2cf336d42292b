//! Credential Store: relational persistence for accounts, contacts and profiles.
//!
//! Signup writes go through an [`AccountTx`] so the registrar controls the
//! transaction boundary. "Not found" is `Ok(None)`, never an error.

use super::error::Result;
use super::models::{AccountSummary, Credentials, NewAccount, NewContact, NewProfile};
use async_trait::async_trait;
use uuid::Uuid;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Open a transaction for the signup inserts.
    async fn begin(&self) -> Result<Box<dyn AccountTx>>;

    async fn select_credentials(&self, username: &str) -> Result<Option<Credentials>>;

    /// Set `visited_at = now()` and return the updated row.
    async fn update_visited_at(&self, id: Uuid) -> Result<AccountSummary>;

    /// Reachability check for `/health`.
    async fn ping(&self) -> Result<()>;
}

/// Open signup transaction. Dropping it without `commit` discards every insert.
#[async_trait]
pub trait AccountTx: Send {
    async fn insert_account(&mut self, account: &NewAccount) -> Result<AccountSummary>;

    async fn insert_contact(&mut self, contact: &NewContact) -> Result<()>;

    async fn insert_profile(&mut self, profile: &NewProfile) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
