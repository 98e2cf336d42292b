//! Account Registrar: transactional signup.
//!
//! Account, contact and profile are inserted in one transaction. Any failure
//! rolls the whole thing back, so a failed signup never leaves partial rows.

use super::error::{Result, bounded};
use super::models::{
    AccountSummary, CONTACT_CLASS_EMAIL, NewAccount, NewContact, NewProfile, SignupRequest,
};
use super::notify::{LogNotifier, SignupNotifier};
use super::password;
use super::store::{AccountTx, CredentialStore};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

#[async_trait]
pub trait AccountRegistrar: Send + Sync {
    /// Create an account with its contact and profile.
    async fn signup(&self, request: SignupRequest) -> Result<AccountSummary>;
}

pub struct Registrar {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn SignupNotifier>,
    timeout: Duration,
}

impl Registrar {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, timeout: Duration) -> Self {
        Self {
            store,
            notifier: Arc::new(LogNotifier),
            timeout,
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn SignupNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    async fn insert_all(
        &self,
        tx: &mut dyn AccountTx,
        account: &NewAccount,
        email: &str,
        firstname: String,
        lastname: String,
    ) -> Result<AccountSummary> {
        let summary = bounded(
            "store.insert_account",
            self.timeout,
            tx.insert_account(account),
        )
        .await?;

        let contact = NewContact {
            user_id: summary.id,
            class: CONTACT_CLASS_EMAIL.to_string(),
            content: email.to_string(),
        };
        bounded(
            "store.insert_contact",
            self.timeout,
            tx.insert_contact(&contact),
        )
        .await?;

        let profile = NewProfile {
            user_id: summary.id,
            firstname,
            lastname,
        };
        bounded(
            "store.insert_profile",
            self.timeout,
            tx.insert_profile(&profile),
        )
        .await?;

        Ok(summary)
    }
}

#[async_trait]
impl AccountRegistrar for Registrar {
    #[instrument(skip_all, fields(username = %request.username))]
    async fn signup(&self, request: SignupRequest) -> Result<AccountSummary> {
        let SignupRequest {
            email,
            username,
            password,
            firstname,
            lastname,
        } = request;

        let account = NewAccount {
            username,
            password_hash: password::hash_blocking(password).await?,
        };

        let mut tx = bounded("store.begin", self.timeout, self.store.begin()).await?;

        let inserted = self
            .insert_all(tx.as_mut(), &account, &email, firstname, lastname)
            .await;
        let summary = match inserted {
            Ok(summary) => summary,
            Err(err) => {
                debug!("signup failed, rolling back: {err}");
                if let Err(rollback_err) =
                    bounded("store.rollback", self.timeout, tx.rollback()).await
                {
                    error!("Failed to roll back signup: {rollback_err}");
                }
                return Err(err);
            }
        };

        bounded("store.commit", self.timeout, tx.commit()).await?;
        info!(account_id = %summary.id, "account created");

        let notifier = Arc::clone(&self.notifier);
        let created = summary.clone();
        tokio::spawn(async move {
            notifier.account_created(&created, &email).await;
        });

        Ok(summary)
    }
}
