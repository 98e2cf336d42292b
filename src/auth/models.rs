//! Account records and transient session values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Contact class written for every signup.
pub const CONTACT_CLASS_EMAIL: &str = "email";

/// Input to the registrar. Fields are expected to be format-checked already.
#[derive(Clone)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"***")
            .field("firstname", &self.firstname)
            .field("lastname", &self.lastname)
            .finish()
    }
}

/// Account row as written by signup, with the password already hashed.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewContact {
    pub user_id: Uuid,
    pub class: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub firstname: String,
    pub lastname: String,
}

/// Credential row used only inside signin; never serialized.
#[derive(Clone, sqlx::FromRow)]
pub struct Credentials {
    pub id: Uuid,
    pub username: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub is_blocked: bool,
    pub is_checked: bool,
    pub blocked_at: Option<DateTime<Utc>>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("is_blocked", &self.is_blocked)
            .field("is_checked", &self.is_checked)
            .finish_non_exhaustive()
    }
}

/// Public view of an account. Never carries the password hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub is_checked: bool,
    pub checked_at: Option<DateTime<Utc>>,
    pub visited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPair { .. }")
    }
}

/// Result of a successful signin.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub user: AccountSummary,
    pub tokens: TokenPair,
}
