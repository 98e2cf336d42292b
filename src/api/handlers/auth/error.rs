//! Mapping from auth errors to HTTP responses.
//!
//! Unknown usernames and wrong passwords share one response, as do blocked
//! and unverified accounts. The precise reason only reaches the logs.

use super::types::ErrorBody;
use crate::auth::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{debug, error, warn};

pub const MSG_BAD_CREDENTIALS: &str = "invalid username or password";
pub const MSG_ACCOUNT_NOT_ALLOWED: &str = "account is not allowed to sign in";
pub const MSG_INVALID_TOKEN: &str = "invalid or expired token";
pub const MSG_ACCOUNT_EXISTS: &str = "account already exists";
pub const MSG_RECORD_FAILED: &str = "record operation failed";
pub const MSG_INTERNAL: &str = "internal server error";
pub const MSG_LEDGER_UNAVAILABLE: &str = "session store unavailable";
pub const MSG_STORE_UNAVAILABLE: &str = "account store unavailable";
pub const MSG_TIMEOUT: &str = "upstream timed out";

#[derive(Debug)]
pub enum ApiError {
    /// Request body missing or malformed.
    BadRequest(String),
    /// Missing bearer credentials.
    Unauthorized,
    Auth(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Auth(err)
    }
}

/// Wire status and message for an auth error.
#[must_use]
pub fn status_of(err: &Error) -> (StatusCode, &'static str) {
    match err {
        Error::NotFound | Error::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, MSG_BAD_CREDENTIALS)
        }
        Error::AccountBlocked | Error::AccountNotVerified => {
            (StatusCode::FORBIDDEN, MSG_ACCOUNT_NOT_ALLOWED)
        }
        Error::InvalidatedToken | Error::Claims(_) => (StatusCode::UNAUTHORIZED, MSG_INVALID_TOKEN),
        Error::Insert {
            unique_violation: true,
            ..
        } => (StatusCode::CONFLICT, MSG_ACCOUNT_EXISTS),
        Error::Insert { .. } | Error::Select { .. } | Error::Update { .. } => {
            (StatusCode::NOT_ACCEPTABLE, MSG_RECORD_FAILED)
        }
        Error::Transaction(_) | Error::PasswordHash(_) | Error::Signing(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
        }
        Error::Ledger(_) => (StatusCode::SERVICE_UNAVAILABLE, MSG_LEDGER_UNAVAILABLE),
        Error::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, MSG_STORE_UNAVAILABLE),
        Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, MSG_TIMEOUT),
    }
}

fn body(status: StatusCode, message: String) -> Response {
    let body = ErrorBody {
        code: status.as_u16(),
        message,
        timestamp: Utc::now(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => body(StatusCode::BAD_REQUEST, message),
            Self::Unauthorized => body(StatusCode::UNAUTHORIZED, MSG_INVALID_TOKEN.to_string()),
            Self::Auth(err) => {
                let (status, message) = status_of(&err);
                if status.is_server_error() {
                    error!("auth request failed: {err}");
                } else if matches!(err, Error::AccountBlocked | Error::AccountNotVerified) {
                    warn!("auth request rejected: {err}");
                } else {
                    debug!("auth request rejected: {err}");
                }
                body(status, message.to_string())
            }
        }
    }
}
