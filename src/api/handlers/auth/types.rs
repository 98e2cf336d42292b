//! Request/response bodies for the auth endpoints.
//!
//! Success bodies are wrapped as `{content, timestamp}`, failures as
//! `{code, message, timestamp}`.

use crate::auth::{AccountSummary, Session, SignupRequest, TokenKind, TokenPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::utils::{normalize_email, valid_email};

const MAX_EMAIL_LEN: usize = 255;
const MAX_NAME_LEN: usize = 255;
const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 4;
const MAX_PASSWORD_LEN: usize = 72;

fn within(value: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&value.chars().count())
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct SignupBody {
    pub email: String,
    /// Defaults to the email address.
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
}

impl SignupBody {
    /// Check field formats and build the registrar input.
    ///
    /// # Errors
    /// Returns a message naming the first offending field.
    pub fn validate(self) -> Result<SignupRequest, String> {
        let email = normalize_email(&self.email);
        if email.len() > MAX_EMAIL_LEN || !valid_email(&email) {
            return Err("Invalid email".to_string());
        }

        let username = match self.username {
            Some(username) => {
                let username = username.trim().to_string();
                if !within(&username, 1, MAX_USERNAME_LEN) {
                    return Err("Invalid username".to_string());
                }
                username
            }
            None => self.email.trim().to_string(),
        };

        if !within(&self.password, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN) {
            return Err("Invalid password".to_string());
        }

        let firstname = self.firstname.trim().to_string();
        let lastname = self.lastname.trim().to_string();
        if !within(&firstname, 1, MAX_NAME_LEN) {
            return Err("Invalid firstname".to_string());
        }
        if !within(&lastname, 1, MAX_NAME_LEN) {
            return Err("Invalid lastname".to_string());
        }

        Ok(SignupRequest {
            email,
            username,
            password: self.password,
            firstname,
            lastname,
        })
    }
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct SigninBody {
    pub username: String,
    pub password: String,
}

impl SigninBody {
    /// # Errors
    /// Returns a message when a field is empty or too long.
    pub fn validate(&self) -> Result<(), String> {
        // emails double as usernames, so allow their full length here
        if !within(self.username.trim(), 1, MAX_EMAIL_LEN) {
            return Err("Invalid username".to_string());
        }
        if !within(&self.password, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN) {
            return Err("Invalid password".to_string());
        }
        Ok(())
    }
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct TokenBody {
    pub token: String,
}

impl TokenBody {
    /// # Errors
    /// Returns a message when the token is blank.
    pub fn validate(&self) -> Result<&str, String> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err("Missing token".to_string());
        }
        Ok(token)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountResponse {
    pub content: AccountSummary,
    pub timestamp: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub content: Session,
    pub timestamp: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokensResponse {
    pub content: TokenPair,
    pub timestamp: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AckResponse {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl AckResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            content: "ok".to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub token_id: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PrincipalResponse {
    pub content: Principal,
    pub timestamp: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
