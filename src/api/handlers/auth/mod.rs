//! Auth endpoints.
//!
//! Handlers only parse and validate input, call into [`crate::auth`] and map
//! the outcome with [`error::ApiError`]. Tokens travel in JSON bodies, except
//! the access token which is read from `Authorization: Bearer`.

pub(crate) mod error;
pub(crate) mod session;
pub(crate) mod signin;
pub(crate) mod signup;
mod state;
pub(crate) mod types;
mod utils;

pub use state::{AuthState, DEFAULT_REQUEST_TIMEOUT};

#[cfg(test)]
mod tests;
