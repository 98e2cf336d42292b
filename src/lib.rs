//! # Brickwall (account signup, signin and session tokens)
//!
//! `brickwall` creates accounts and issues access/refresh token pairs for
//! them. It is built from a small core and two thin layers around it.
//!
//! ## Accounts
//!
//! Signup writes the account, an `email` contact and a profile in a single
//! Postgres transaction. New accounts start unverified (`is_checked = false`)
//! and cannot sign in until an operator marks them checked.
//!
//! ## Tokens
//!
//! Tokens are HS256 JWTs. Access tokens live 15 minutes, refresh tokens 24
//! hours by default. A Redis revocation ledger maps token strings to `valid`
//! or `invalid`:
//!
//! - **Signin** registers the refresh token as `valid`.
//! - **Refresh** consumes the refresh token (rotate-on-use).
//! - **Signout/invalidate** mark tokens `invalid`.
//!
//! An `invalid` entry always wins over signature and expiry checks. Entries
//! expire, so revocation is bounded in time: an invalidation record is kept
//! for the token's remaining lifetime or the access lifetime, whichever is
//! longer.
//!
//! ## Failures
//!
//! Unknown usernames and wrong passwords produce the same `401` response.
//! Blocked and unverified accounts both produce `403`; the reason is logged.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }
}
