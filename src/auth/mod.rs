//! Authentication core: signup, signin and session tokens.
//!
//! Services take their collaborators as `Arc<dyn Trait>` so the Postgres and
//! Redis backends can be swapped for the in-memory ones in tests. Those are
//! only compiled for unit tests or with the `test-support` feature.

pub mod authenticator;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod password;
pub mod registrar;
pub mod store;
pub mod token;

pub use authenticator::{Authenticator, SessionAuthenticator};
pub use error::{Error, Record, Result};
pub use ledger::{RedisLedger, RevocationLedger, TokenStatus};
pub use models::{AccountSummary, Session, SignupRequest, TokenPair};
pub use notify::{LogNotifier, SignupNotifier};
pub use registrar::{AccountRegistrar, Registrar};
pub use store::{CredentialStore, PgStore};
#[cfg(any(test, feature = "test-support"))]
pub use {ledger::MemoryLedger, store::MemoryStore};
pub use token::{Claims, TokenConfig, TokenIssuer, TokenKind};
