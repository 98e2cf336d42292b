//! Session Authenticator: signin and signout.
//!
//! Signin checks run in a fixed order and stop at the first failure: lookup,
//! password, blocked, verified. Issuing tokens, touching `visited_at` and
//! registering the refresh token are three separate effects. If a later one
//! fails the earlier ones stay, and a cancelled request may leave any prefix
//! of them applied.

use super::error::{Error, Result, bounded};
use super::models::{Session, TokenPair};
use super::password;
use super::store::CredentialStore;
use super::token::{TokenIssuer, TokenKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[async_trait]
pub trait SessionAuthenticator: Send + Sync {
    async fn signin(&self, username: &str, password: &str) -> Result<Session>;

    /// Revoke the refresh token and, when given, the access token.
    ///
    /// Nothing is written unless both tokens carry the expected kind and subject.
    async fn signout(&self, refresh_token: &str, access_token: Option<&str>) -> Result<()>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;
}

pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
    timeout: Duration,
}

impl Authenticator {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, issuer: Arc<TokenIssuer>, timeout: Duration) -> Self {
        Self {
            store,
            issuer,
            timeout,
        }
    }
}

#[async_trait]
impl SessionAuthenticator for Authenticator {
    #[instrument(skip(self, password))]
    async fn signin(&self, username: &str, password: &str) -> Result<Session> {
        let credentials = bounded(
            "store.select_credentials",
            self.timeout,
            self.store.select_credentials(username),
        )
        .await?;

        let Some(credentials) = credentials else {
            // keep the unknown-user path as slow as a wrong password
            password::verify_dummy(password.to_string()).await;
            debug!("unknown username");
            return Err(Error::NotFound);
        };

        if !password::verify_blocking(password.to_string(), credentials.password_hash.clone())
            .await?
        {
            debug!(account_id = %credentials.id, "password mismatch");
            return Err(Error::InvalidCredentials);
        }

        if credentials.is_blocked {
            warn!(account_id = %credentials.id, blocked_at = ?credentials.blocked_at, "signin attempt on blocked account");
            return Err(Error::AccountBlocked);
        }

        if !credentials.is_checked {
            warn!(account_id = %credentials.id, "signin attempt on unverified account");
            return Err(Error::AccountNotVerified);
        }

        let tokens = self.issuer.generate_tokens(credentials.id)?;

        let user = bounded(
            "store.update_visited_at",
            self.timeout,
            self.store.update_visited_at(credentials.id),
        )
        .await?;

        self.issuer.store_token(&tokens.refresh).await?;

        info!(account_id = %user.id, "signin");
        Ok(Session { user, tokens })
    }

    #[instrument(skip_all)]
    async fn signout(&self, refresh_token: &str, access_token: Option<&str>) -> Result<()> {
        // both tokens are checked before the first ledger write
        let refresh = self.issuer.inspect(refresh_token, TokenKind::Refresh)?;
        let access = access_token
            .map(|token| {
                self.issuer
                    .inspect(token, TokenKind::Access)
                    .map(|claims| (token, claims))
            })
            .transpose()?;
        if let Some((_, claims)) = &access
            && claims.sub != refresh.sub
        {
            return Err(Error::Claims(
                "access and refresh tokens belong to different accounts".to_string(),
            ));
        }

        self.issuer.revoke(refresh_token, &refresh).await?;
        if let Some((token, claims)) = &access {
            self.issuer.revoke(token, claims).await?;
        }
        info!(account_id = %refresh.sub, "signout");
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        self.issuer.refresh_tokens(refresh_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ledger::{MemoryLedger, RevocationLedger, TokenStatus};
    use crate::auth::models::SignupRequest;
    use crate::auth::registrar::{AccountRegistrar, Registrar};
    use crate::auth::store::MemoryStore;
    use crate::auth::token::tests::issuer;

    struct Fixture {
        store: MemoryStore,
        ledger: Arc<MemoryLedger>,
        issuer: Arc<TokenIssuer>,
        authenticator: Authenticator,
    }

    impl Fixture {
        fn with_store(store: MemoryStore) -> Self {
            let ledger = Arc::new(MemoryLedger::new());
            let issuer = Arc::new(issuer(ledger.clone()));
            let authenticator = Authenticator::new(
                Arc::new(store.clone()),
                issuer.clone(),
                Duration::from_millis(500),
            );
            Self {
                store,
                ledger,
                issuer,
                authenticator,
            }
        }

        async fn signup(&self, username: &str) -> anyhow::Result<()> {
            Registrar::new(Arc::new(self.store.without_faults()), Duration::from_secs(2))
                .signup(SignupRequest {
                    email: format!("{username}@x.com"),
                    username: username.to_string(),
                    password: "p4ssw0rd".to_string(),
                    firstname: "First".to_string(),
                    lastname: "Last".to_string(),
                })
                .await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn signin_issues_tokens_for_checked_account() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;
        fixture.store.set_checked("alice", true);

        let session = fixture.authenticator.signin("alice", "p4ssw0rd").await?;
        assert_eq!(session.user.username, "alice");
        assert!(session.user.visited_at.is_some());

        let claims = fixture
            .issuer
            .validate_kind(&session.tokens.access, TokenKind::Access)
            .await?;
        assert_eq!(claims.sub, session.user.id);
        assert_eq!(
            fixture.ledger.get(&session.tokens.refresh).await?,
            Some(TokenStatus::Valid)
        );
        Ok(())
    }

    #[tokio::test]
    async fn unverified_account_is_rejected_until_checked() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;

        let result = fixture.authenticator.signin("alice", "p4ssw0rd").await;
        assert!(matches!(result, Err(Error::AccountNotVerified)));
        assert!(fixture.ledger.is_empty());

        fixture.store.set_checked("alice", true);
        assert!(fixture.authenticator.signin("alice", "p4ssw0rd").await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn blocked_account_gets_no_tokens() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;
        fixture.store.set_checked("alice", true);
        fixture.store.set_blocked("alice", true);

        let result = fixture.authenticator.signin("alice", "p4ssw0rd").await;
        assert!(matches!(result, Err(Error::AccountBlocked)));
        assert!(fixture.ledger.is_empty());
        assert!(
            fixture
                .store
                .account("alice")
                .is_some_and(|account| account.visited_at.is_none())
        );
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;
        fixture.store.set_checked("alice", true);

        assert!(matches!(
            fixture.authenticator.signin("alice", "wrong").await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            fixture.authenticator.signin("bob", "p4ssw0rd").await,
            Err(Error::NotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn password_checked_before_status() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;
        fixture.store.set_blocked("alice", true);

        // a wrong password must not reveal that the account is blocked
        assert!(matches!(
            fixture.authenticator.signin("alice", "wrong").await,
            Err(Error::InvalidCredentials)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn slow_store_times_out() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new().with_delay(Duration::from_secs(5)));
        let result = fixture.authenticator.signin("alice", "p4ssw0rd").await;
        assert!(matches!(
            result,
            Err(Error::Timeout {
                operation: "store.select_credentials",
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn ledger_outage_after_visit_update() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;
        fixture.store.set_checked("alice", true);
        fixture.ledger.set_available(false);

        let result = fixture.authenticator.signin("alice", "p4ssw0rd").await;
        assert!(matches!(result, Err(Error::Ledger(_))));
        // earlier steps are not undone
        assert!(
            fixture
                .store
                .account("alice")
                .is_some_and(|account| account.visited_at.is_some())
        );
        Ok(())
    }

    #[tokio::test]
    async fn signout_revokes_both_tokens() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;
        fixture.store.set_checked("alice", true);
        let session = fixture.authenticator.signin("alice", "p4ssw0rd").await?;

        fixture
            .authenticator
            .signout(&session.tokens.refresh, Some(&session.tokens.access))
            .await?;

        assert!(matches!(
            fixture.issuer.validate_token(&session.tokens.access).await,
            Err(Error::InvalidatedToken)
        ));
        assert!(matches!(
            fixture.authenticator.refresh(&session.tokens.refresh).await,
            Err(Error::InvalidatedToken)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn signout_rejects_swapped_tokens() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;
        fixture.store.set_checked("alice", true);
        let session = fixture.authenticator.signin("alice", "p4ssw0rd").await?;

        let result = fixture
            .authenticator
            .signout(&session.tokens.access, None)
            .await;
        assert!(matches!(result, Err(Error::Claims(_))));

        let result = fixture
            .authenticator
            .signout(&session.tokens.refresh, Some(&session.tokens.refresh))
            .await;
        assert!(matches!(result, Err(Error::Claims(_))));

        assert_eq!(fixture.ledger.get(&session.tokens.access).await?, None);
        assert_eq!(
            fixture.ledger.get(&session.tokens.refresh).await?,
            Some(TokenStatus::Valid)
        );
        fixture.authenticator.refresh(&session.tokens.refresh).await?;
        Ok(())
    }

    #[tokio::test]
    async fn signout_with_forged_bearer_writes_nothing() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;
        fixture.store.set_checked("alice", true);
        let session = fixture.authenticator.signin("alice", "p4ssw0rd").await?;

        let forged = format!("{}x", session.tokens.access);
        let result = fixture
            .authenticator
            .signout(&session.tokens.refresh, Some(&forged))
            .await;
        assert!(matches!(result, Err(Error::Claims(_))));
        assert_eq!(
            fixture.ledger.get(&session.tokens.refresh).await?,
            Some(TokenStatus::Valid)
        );
        Ok(())
    }

    #[tokio::test]
    async fn signout_rejects_foreign_access_token() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;
        fixture.signup("bob").await?;
        fixture.store.set_checked("alice", true);
        fixture.store.set_checked("bob", true);
        let alice = fixture.authenticator.signin("alice", "p4ssw0rd").await?;
        let bob = fixture.authenticator.signin("bob", "p4ssw0rd").await?;

        let result = fixture
            .authenticator
            .signout(&alice.tokens.refresh, Some(&bob.tokens.access))
            .await;
        assert!(matches!(result, Err(Error::Claims(_))));
        assert_eq!(fixture.ledger.get(&bob.tokens.access).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_through_authenticator() -> anyhow::Result<()> {
        let fixture = Fixture::with_store(MemoryStore::new());
        fixture.signup("alice").await?;
        fixture.store.set_checked("alice", true);
        let session = fixture.authenticator.signin("alice", "p4ssw0rd").await?;

        let pair = fixture.authenticator.refresh(&session.tokens.refresh).await?;
        let claims = fixture
            .issuer
            .validate_kind(&pair.access, TokenKind::Access)
            .await?;
        assert_eq!(claims.sub, session.user.id);
        Ok(())
    }
}
