//! Shared services handed to the auth handlers.

use crate::auth::{
    AccountRegistrar, Authenticator, CredentialStore, LogNotifier, Registrar, RevocationLedger,
    SessionAuthenticator, SignupNotifier, TokenConfig, TokenIssuer,
};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

pub struct AuthState {
    registrar: Arc<dyn AccountRegistrar>,
    authenticator: Arc<dyn SessionAuthenticator>,
    issuer: Arc<TokenIssuer>,
    store: Arc<dyn CredentialStore>,
    timeout: Duration,
}

impl AuthState {
    /// Wire the auth services over the given backends.
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        ledger: Arc<dyn RevocationLedger>,
        tokens: &TokenConfig,
        timeout: Duration,
    ) -> Self {
        Self::with_notifier(store, ledger, tokens, timeout, Arc::new(LogNotifier))
    }

    #[must_use]
    pub fn with_notifier(
        store: Arc<dyn CredentialStore>,
        ledger: Arc<dyn RevocationLedger>,
        tokens: &TokenConfig,
        timeout: Duration,
        notifier: Arc<dyn SignupNotifier>,
    ) -> Self {
        let issuer = Arc::new(TokenIssuer::new(tokens, ledger, timeout));
        let registrar =
            Arc::new(Registrar::new(Arc::clone(&store), timeout).with_notifier(notifier));
        let authenticator = Arc::new(Authenticator::new(
            Arc::clone(&store),
            Arc::clone(&issuer),
            timeout,
        ));
        Self {
            registrar,
            authenticator,
            issuer,
            store,
            timeout,
        }
    }

    #[must_use]
    pub fn registrar(&self) -> &dyn AccountRegistrar {
        self.registrar.as_ref()
    }

    #[must_use]
    pub fn authenticator(&self) -> &dyn SessionAuthenticator {
        self.authenticator.as_ref()
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    /// Upper bound for each store or ledger call.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn ledger(&self) -> &dyn RevocationLedger {
        self.issuer.ledger().as_ref()
    }
}
