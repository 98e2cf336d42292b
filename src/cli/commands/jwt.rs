use crate::auth::TokenConfig;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_ACCESS_EXPIRATION: &str = "jwt-access-expiration";
pub const ARG_JWT_REFRESH_EXPIRATION: &str = "jwt-refresh-expiration";

/// HS256 keys shorter than the hash output are rejected.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug)]
pub struct Options {
    pub tokens: TokenConfig,
}

impl Options {
    /// Parse token arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret is missing or short, or the lifetimes are inconsistent.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let Some(secret) = matches.get_one::<String>(ARG_JWT_SECRET) else {
            anyhow::bail!("missing required argument: --{ARG_JWT_SECRET}");
        };
        if secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("--{ARG_JWT_SECRET} must be at least {MIN_SECRET_LEN} bytes");
        }

        let access = matches
            .get_one::<u64>(ARG_JWT_ACCESS_EXPIRATION)
            .copied()
            .unwrap_or(900);
        let refresh = matches
            .get_one::<u64>(ARG_JWT_REFRESH_EXPIRATION)
            .copied()
            .unwrap_or(86_400);
        if access == 0 || access >= refresh {
            anyhow::bail!(
                "--{ARG_JWT_ACCESS_EXPIRATION} ({access}s) must be non-zero and shorter than --{ARG_JWT_REFRESH_EXPIRATION} ({refresh}s)"
            );
        }

        Ok(Self {
            tokens: TokenConfig::new(SecretString::from(secret.clone()))
                .with_access_ttl(Duration::from_secs(access))
                .with_refresh_ttl(Duration::from_secs(refresh)),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Shared HS256 signing secret (at least 32 bytes)")
                .env("BRICKWALL_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_ACCESS_EXPIRATION)
                .long(ARG_JWT_ACCESS_EXPIRATION)
                .help("Access token lifetime in seconds")
                .env("BRICKWALL_JWT_ACCESS_EXPIRATION")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_JWT_REFRESH_EXPIRATION)
                .long(ARG_JWT_REFRESH_EXPIRATION)
                .help("Refresh token lifetime in seconds")
                .env("BRICKWALL_JWT_REFRESH_EXPIRATION")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64)),
        )
}
