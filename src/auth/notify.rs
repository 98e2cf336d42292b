//! Post-commit hook fired after a successful signup.
//!
//! Verification mail delivery is not part of this service; the default
//! notifier only logs. The registrar spawns the hook and never waits on it.

use super::models::AccountSummary;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait SignupNotifier: Send + Sync {
    async fn account_created(&self, account: &AccountSummary, email: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl SignupNotifier for LogNotifier {
    async fn account_created(&self, account: &AccountSummary, _email: &str) {
        info!(account_id = %account.id, "account created, verification pending");
    }
}
