//! Small helpers for auth request handling.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use regex::Regex;
use std::sync::OnceLock;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(email_normalized))
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub(super) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
