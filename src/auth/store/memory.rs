//! In-process Credential Store.
//!
//! Mirrors the Postgres constraints (unique username, unique contact) and
//! transaction visibility closely enough for the registrar and authenticator
//! to be exercised without a database. Usernames are reserved on insert, so
//! of two concurrent signups for the same name exactly one gets through.

use super::{AccountTx, CredentialStore};
use crate::auth::error::{Error, Record, Result};
use crate::auth::models::{AccountSummary, Credentials, NewAccount, NewContact, NewProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct StoredAccount {
    summary: AccountSummary,
    password_hash: String,
    is_blocked: bool,
    blocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Uuid, StoredAccount>,
    // committed and reserved
    usernames: HashMap<String, Uuid>,
    contact_keys: HashSet<(String, String)>,
    contacts: Vec<NewContact>,
    profiles: Vec<NewProfile>,
    available: bool,
}

#[derive(Clone, Debug)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    fail_on: Option<Record>,
    delay: Option<Duration>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                available: true,
                ..State::default()
            })),
            fail_on: None,
            delay: None,
        }
    }

    /// Make every insert of `record` fail.
    #[must_use]
    pub const fn failing_on(mut self, record: Record) -> Self {
        self.fail_on = Some(record);
        self
    }

    /// Delay every read and update by `delay`.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle on the same rows with injected failures and delays removed.
    #[must_use]
    pub fn without_faults(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            fail_on: None,
            delay: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Administrative flip of the verification flag.
    pub fn set_checked(&self, username: &str, checked: bool) -> bool {
        self.update_account(username, |account| {
            account.summary.is_checked = checked;
            account.summary.checked_at = checked.then(Utc::now);
        })
    }

    /// Administrative flip of the blocked flag.
    pub fn set_blocked(&self, username: &str, blocked: bool) -> bool {
        self.update_account(username, |account| {
            account.is_blocked = blocked;
            account.blocked_at = blocked.then(Utc::now);
        })
    }

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    fn update_account(&self, username: &str, apply: impl FnOnce(&mut StoredAccount)) -> bool {
        let mut state = self.lock();
        let Some(id) = state.usernames.get(username).copied() else {
            return false;
        };
        state.accounts.get_mut(&id).map(apply).is_some()
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.lock().accounts.len()
    }

    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.lock().contacts.len()
    }

    #[must_use]
    pub fn profile_count(&self) -> usize {
        self.lock().profiles.len()
    }

    #[must_use]
    pub fn account(&self, username: &str) -> Option<AccountSummary> {
        let state = self.lock();
        let id = state.usernames.get(username)?;
        state.accounts.get(id).map(|account| account.summary.clone())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn AccountTx>> {
        if !self.lock().available {
            return Err(Error::Unavailable("begin: store unavailable".to_string()));
        }
        Ok(Box::new(MemoryTx {
            state: Arc::clone(&self.state),
            fail_on: self.fail_on,
            accounts: Vec::new(),
            contacts: Vec::new(),
            profiles: Vec::new(),
            reserved_usernames: Vec::new(),
            reserved_contacts: Vec::new(),
            finished: false,
        }))
    }

    async fn select_credentials(&self, username: &str) -> Result<Option<Credentials>> {
        self.pause().await;
        let state = self.lock();
        let Some(id) = state.usernames.get(username) else {
            return Ok(None);
        };
        // reserved but not yet committed rows are invisible
        Ok(state.accounts.get(id).map(|account| Credentials {
            id: account.summary.id,
            username: account.summary.username.clone(),
            password_hash: account.password_hash.clone(),
            is_blocked: account.is_blocked,
            is_checked: account.summary.is_checked,
            blocked_at: account.blocked_at,
            checked_at: account.summary.checked_at,
        }))
    }

    async fn update_visited_at(&self, id: Uuid) -> Result<AccountSummary> {
        self.pause().await;
        let mut state = self.lock();
        let account = state.accounts.get_mut(&id).ok_or(Error::NotFound)?;
        account.summary.visited_at = Some(Utc::now());
        Ok(account.summary.clone())
    }

    async fn ping(&self) -> Result<()> {
        if self.lock().available {
            Ok(())
        } else {
            Err(Error::Unavailable("ping: store unavailable".to_string()))
        }
    }
}

struct MemoryTx {
    state: Arc<Mutex<State>>,
    fail_on: Option<Record>,
    accounts: Vec<StoredAccount>,
    contacts: Vec<NewContact>,
    profiles: Vec<NewProfile>,
    reserved_usernames: Vec<String>,
    reserved_contacts: Vec<(String, String)>,
    finished: bool,
}

impl MemoryTx {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn injected(&self, record: Record) -> Result<()> {
        if self.fail_on == Some(record) {
            return Err(Error::Insert {
                record,
                reason: "injected failure".to_string(),
                unique_violation: false,
            });
        }
        Ok(())
    }

    fn release(&mut self) {
        let usernames = std::mem::take(&mut self.reserved_usernames);
        let contacts = std::mem::take(&mut self.reserved_contacts);
        let mut state = self.lock();
        for username in &usernames {
            state.usernames.remove(username);
        }
        for key in &contacts {
            state.contact_keys.remove(key);
        }
    }
}

#[async_trait]
impl AccountTx for MemoryTx {
    async fn insert_account(&mut self, account: &NewAccount) -> Result<AccountSummary> {
        self.injected(Record::Account)?;
        let summary = AccountSummary {
            id: Uuid::new_v4(),
            username: account.username.clone(),
            is_checked: false,
            checked_at: None,
            visited_at: None,
            created_at: Utc::now(),
        };
        {
            let mut state = self.lock();
            if state.usernames.contains_key(&account.username) {
                return Err(Error::Insert {
                    record: Record::Account,
                    reason: format!("username {} already exists", account.username),
                    unique_violation: true,
                });
            }
            state
                .usernames
                .insert(account.username.clone(), summary.id);
        }
        self.reserved_usernames.push(account.username.clone());
        self.accounts.push(StoredAccount {
            summary: summary.clone(),
            password_hash: account.password_hash.clone(),
            is_blocked: false,
            blocked_at: None,
        });
        Ok(summary)
    }

    async fn insert_contact(&mut self, contact: &NewContact) -> Result<()> {
        self.injected(Record::Contact)?;
        if !self.accounts.iter().any(|a| a.summary.id == contact.user_id) {
            return Err(Error::Insert {
                record: Record::Contact,
                reason: "unknown user_id".to_string(),
                unique_violation: false,
            });
        }
        let key = (contact.class.clone(), contact.content.clone());
        if !self.lock().contact_keys.insert(key.clone()) {
            return Err(Error::Insert {
                record: Record::Contact,
                reason: format!("{} contact already exists", contact.class),
                unique_violation: true,
            });
        }
        self.reserved_contacts.push(key);
        self.contacts.push(contact.clone());
        Ok(())
    }

    async fn insert_profile(&mut self, profile: &NewProfile) -> Result<()> {
        self.injected(Record::Profile)?;
        self.profiles.push(profile.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        let accounts = std::mem::take(&mut this.accounts);
        let contacts = std::mem::take(&mut this.contacts);
        let profiles = std::mem::take(&mut this.profiles);
        {
            let mut state = this.lock();
            for account in accounts {
                state.accounts.insert(account.summary.id, account);
            }
            state.contacts.extend(contacts);
            state.profiles.extend(profiles);
        }
        this.reserved_usernames.clear();
        this.reserved_contacts.clear();
        this.finished = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.release();
        this.finished = true;
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            self.release();
        }
    }
}
