//! Postgres implementation of the Credential Store.

use super::{AccountTx, CredentialStore};
use crate::auth::error::{Error, Record, Result};
use crate::auth::models::{AccountSummary, Credentials, NewAccount, NewContact, NewProfile};
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Postgres, Transaction};
use tracing::{Instrument, Span, info_span};
use uuid::Uuid;

const INSERT_ACCOUNT: &str = r"
    INSERT INTO users (username, password)
    VALUES ($1, $2)
    RETURNING id, username, is_checked, checked_at, visited_at, created_at
";

const INSERT_CONTACT: &str = "INSERT INTO contacts (user_id, class, content) VALUES ($1, $2, $3)";

const INSERT_PROFILE: &str =
    "INSERT INTO profiles (user_id, firstname, lastname) VALUES ($1, $2, $3)";

const SELECT_CREDENTIALS: &str = r"
    SELECT id, username, password, is_blocked, is_checked, blocked_at, checked_at
    FROM users
    WHERE username = $1
";

const UPDATE_VISITED_AT: &str = r"
    UPDATE users SET visited_at = NOW()
    WHERE id = $1
    RETURNING id, username, is_checked, checked_at, visited_at, created_at
";

fn db_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn AccountTx>> {
        let tx = self
            .pool
            .begin()
            .instrument(info_span!(
                "db.begin",
                db.system = "postgresql",
                db.operation = "BEGIN"
            ))
            .await
            .map_err(|err| Error::transaction("begin", &err))?;
        Ok(Box::new(PgAccountTx { tx }))
    }

    async fn select_credentials(&self, username: &str) -> Result<Option<Credentials>> {
        sqlx::query_as::<_, Credentials>(SELECT_CREDENTIALS)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", SELECT_CREDENTIALS))
            .await
            .map_err(|err| Error::select(Record::Account, &err))
    }

    async fn update_visited_at(&self, id: Uuid) -> Result<AccountSummary> {
        sqlx::query_as::<_, AccountSummary>(UPDATE_VISITED_AT)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", UPDATE_VISITED_AT))
            .await
            .map_err(|err| Error::update(Record::Account, &err))?
            .ok_or(Error::NotFound)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await
            .map_err(|err| Error::transaction("acquire", &err))?;
        conn.ping()
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await
            .map_err(|err| Error::transaction("ping", &err))
    }
}

struct PgAccountTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccountTx for PgAccountTx {
    async fn insert_account(&mut self, account: &NewAccount) -> Result<AccountSummary> {
        sqlx::query_as::<_, AccountSummary>(INSERT_ACCOUNT)
            .bind(&account.username)
            .bind(&account.password_hash)
            .fetch_one(&mut *self.tx)
            .instrument(db_span("INSERT", INSERT_ACCOUNT))
            .await
            .map_err(|err| Error::insert(Record::Account, &err))
    }

    async fn insert_contact(&mut self, contact: &NewContact) -> Result<()> {
        sqlx::query(INSERT_CONTACT)
            .bind(contact.user_id)
            .bind(&contact.class)
            .bind(&contact.content)
            .execute(&mut *self.tx)
            .instrument(db_span("INSERT", INSERT_CONTACT))
            .await
            .map(|_| ())
            .map_err(|err| Error::insert(Record::Contact, &err))
    }

    async fn insert_profile(&mut self, profile: &NewProfile) -> Result<()> {
        sqlx::query(INSERT_PROFILE)
            .bind(profile.user_id)
            .bind(&profile.firstname)
            .bind(&profile.lastname)
            .execute(&mut *self.tx)
            .instrument(db_span("INSERT", INSERT_PROFILE))
            .await
            .map(|_| ())
            .map_err(|err| Error::insert(Record::Profile, &err))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .instrument(info_span!(
                "db.commit",
                db.system = "postgresql",
                db.operation = "COMMIT"
            ))
            .await
            .map_err(|err| Error::transaction("commit", &err))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .instrument(info_span!(
                "db.rollback",
                db.system = "postgresql",
                db.operation = "ROLLBACK"
            ))
            .await
            .map_err(|err| Error::transaction("rollback", &err))
    }
}
