//! Argon2id password hashing.
//!
//! Hashing is CPU bound, so the async wrappers move it onto the blocking pool.

use super::error::{Error, Result};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand::{RngCore, rngs::OsRng};
use std::sync::OnceLock;

fn salt() -> Result<SaltString> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| Error::PasswordHash(format!("failed to generate salt: {err}")))?;
    SaltString::encode_b64(&bytes).map_err(|err| Error::PasswordHash(err.to_string()))
}

/// Hash `password` into a PHC string.
///
/// # Errors
/// Returns `Error::PasswordHash` if salt generation or hashing fails.
pub fn hash(password: &str) -> Result<String> {
    Argon2::default()
        .hash_password(password.as_bytes(), &salt()?)
        .map(|hash| hash.to_string())
        .map_err(|err| Error::PasswordHash(err.to_string()))
}

/// Check `password` against a stored PHC string. Unparseable hashes never match.
#[must_use]
pub fn verify(password: &str, phc: &str) -> bool {
    PasswordHash::new(phc).is_ok_and(|hash| {
        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    })
}

// Hash of a random throwaway password, verified against when the username is
// unknown so both signin failure paths cost one argon2 run.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| {
            let mut bytes = [0u8; 24];
            OsRng.try_fill_bytes(&mut bytes).ok()?;
            let throwaway: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            hash(&throwaway).ok()
        })
        .as_deref()
}

/// Hash on the blocking pool.
///
/// # Errors
/// Returns `Error::PasswordHash` if hashing fails or the blocking task panics.
pub async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash(&password))
        .await
        .map_err(|err| Error::PasswordHash(err.to_string()))?
}

/// Verify on the blocking pool.
///
/// # Errors
/// Returns `Error::PasswordHash` if the blocking task panics.
pub async fn verify_blocking(password: String, phc: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify(&password, &phc))
        .await
        .map_err(|err| Error::PasswordHash(err.to_string()))
}

/// Burn one verification against a throwaway hash.
pub async fn verify_dummy(password: String) {
    let _ = tokio::task::spawn_blocking(move || {
        if let Some(phc) = dummy_hash() {
            let _ = verify(&password, phc);
        }
    })
    .await;
}
