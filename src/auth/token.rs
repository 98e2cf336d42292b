//! Token Issuer: HS256 access/refresh pairs checked against the revocation ledger.
//!
//! Refresh tokens carry the subject so a refresh resolves identity from the
//! token itself. Every token carries a random `jti`, so two pairs minted in
//! the same second for the same account still differ, and a `typ` claim so
//! the two kinds cannot stand in for each other.

use super::error::{Error, Result, bounded};
use super::ledger::{RevocationLedger, TokenStatus};
use super::models::TokenPair;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use ulid::Ulid;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub typ: TokenKind,
}

impl Claims {
    /// Seconds until expiry, zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        let left = self.exp.saturating_sub(Utc::now().timestamp());
        Duration::from_secs(u64::try_from(left).unwrap_or(0))
    }
}

#[derive(Clone)]
pub struct TokenConfig {
    secret: SecretString,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenConfig {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self {
            secret,
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }

    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"***")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    ledger: Arc<dyn RevocationLedger>,
    timeout: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &TokenConfig, ledger: Arc<dyn RevocationLedger>, timeout: Duration) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            ledger,
            timeout,
        }
    }

    #[must_use]
    pub const fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn RevocationLedger> {
        &self.ledger
    }

    fn claims(account_id: Uuid, typ: TokenKind, ttl: Duration) -> Result<Claims> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| Error::Signing(format!("{typ:?} lifetime overflows")))?;
        let exp = iat
            .checked_add(ttl)
            .ok_or_else(|| Error::Signing(format!("{typ:?} exp overflows")))?;
        Ok(Claims {
            sub: account_id,
            iat,
            exp,
            jti: Ulid::new().to_string(),
            typ,
        })
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| Error::Signing(err.to_string()))
    }

    fn decode(&self, token: &str, validate_exp: bool) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        Ok(jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }

    /// Mint a fresh access/refresh pair for `account_id`. No ledger write.
    ///
    /// # Errors
    /// Returns `Error::Signing` if encoding fails.
    pub fn generate_tokens(&self, account_id: Uuid) -> Result<TokenPair> {
        let access = Self::claims(account_id, TokenKind::Access, self.access_ttl)?;
        let refresh = Self::claims(account_id, TokenKind::Refresh, self.refresh_ttl)?;
        Ok(TokenPair {
            access: self.sign(&access)?,
            refresh: self.sign(&refresh)?,
        })
    }

    async fn status(&self, token: &str) -> Result<Option<TokenStatus>> {
        bounded("ledger.get", self.timeout, self.ledger.get(token)).await
    }

    /// Check the ledger first, then signature and expiry.
    ///
    /// # Errors
    /// `Error::InvalidatedToken` when the ledger marks the token `invalid`,
    /// `Error::Claims` when it is malformed, forged or expired, and
    /// `Error::Ledger`/`Error::Timeout` when the ledger cannot be read.
    #[instrument(skip_all)]
    pub async fn validate_token(&self, token: &str) -> Result<Claims> {
        if self.status(token).await? == Some(TokenStatus::Invalid) {
            debug!("rejecting invalidated token");
            return Err(Error::InvalidatedToken);
        }
        self.decode(token, true)
    }

    /// [`Self::validate_token`] restricted to one token kind.
    ///
    /// # Errors
    /// As `validate_token`, plus `Error::Claims` for the wrong kind.
    pub async fn validate_kind(&self, token: &str, kind: TokenKind) -> Result<Claims> {
        let claims = self.validate_token(token).await?;
        if claims.typ != kind {
            return Err(Error::Claims(format!("expected a {kind:?} token")));
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new pair, consuming the old one.
    ///
    /// The old token is marked `invalid` with an atomic swap, so of two
    /// concurrent refreshes with the same token only one gets a new pair.
    ///
    /// # Errors
    /// Validation errors as `validate_kind`, `Error::InvalidatedToken` if the
    /// token was consumed concurrently, and ledger errors.
    #[instrument(skip_all)]
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.validate_kind(refresh_token, TokenKind::Refresh).await?;

        let previous = bounded(
            "ledger.swap",
            self.timeout,
            self.ledger.swap(
                refresh_token,
                TokenStatus::Invalid,
                self.revocation_ttl(&claims),
            ),
        )
        .await?;
        if previous == Some(TokenStatus::Invalid) {
            return Err(Error::InvalidatedToken);
        }

        let pair = self.generate_tokens(claims.sub)?;
        self.store_token(&pair.refresh).await?;
        debug!(account_id = %claims.sub, "refresh token rotated");
        Ok(pair)
    }

    /// Mark `token` as `invalid`. Expired tokens are accepted, forged ones are not.
    ///
    /// The entry lives for the access lifetime or the token's remaining
    /// lifetime, whichever is longer.
    ///
    /// # Errors
    /// `Error::Claims` for malformed or forged tokens, and ledger errors.
    #[instrument(skip_all)]
    pub async fn invalidate_token(&self, token: &str) -> Result<()> {
        let claims = self.decode(token, false)?;
        self.revoke(token, &claims).await
    }

    /// Check signature and kind of `token` without reading the ledger. Expiry is ignored.
    ///
    /// # Errors
    /// `Error::Claims` for malformed or forged tokens and for the wrong kind.
    pub fn inspect(&self, token: &str, kind: TokenKind) -> Result<Claims> {
        let claims = self.decode(token, false)?;
        if claims.typ != kind {
            return Err(Error::Claims(format!("expected a {kind:?} token")));
        }
        Ok(claims)
    }

    /// Write `invalid` for a token whose claims were already checked.
    pub(crate) async fn revoke(&self, token: &str, claims: &Claims) -> Result<()> {
        bounded(
            "ledger.set",
            self.timeout,
            self.ledger
                .set(token, TokenStatus::Invalid, self.revocation_ttl(claims)),
        )
        .await?;
        debug!(account_id = %claims.sub, kind = ?claims.typ, "token invalidated");
        Ok(())
    }

    /// # Errors
    /// Returns ledger errors.
    pub async fn is_token_invalidated(&self, token: &str) -> Result<bool> {
        Ok(self.status(token).await? == Some(TokenStatus::Invalid))
    }

    /// Register `token` as `valid` for the access lifetime.
    ///
    /// # Errors
    /// Returns ledger errors.
    pub async fn store_token(&self, token: &str) -> Result<()> {
        bounded(
            "ledger.set",
            self.timeout,
            self.ledger.set(token, TokenStatus::Valid, self.access_ttl),
        )
        .await
    }

    fn revocation_ttl(&self, claims: &Claims) -> Duration {
        self.access_ttl.max(claims.remaining())
    }
}
