use clap::{Arg, ArgMatches, Command};
use url::Url;

pub const ARG_REDIS_URL: &str = "redis-url";

#[derive(Debug, Clone)]
pub struct Options {
    pub url: String,
}

impl Options {
    /// Parse revocation ledger arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the URL is not a `redis://` or `rediss://` URL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let Some(url) = matches.get_one::<String>(ARG_REDIS_URL) else {
            anyhow::bail!("missing required argument: --{ARG_REDIS_URL}");
        };
        let parsed = Url::parse(url)
            .map_err(|err| anyhow::anyhow!("invalid --{ARG_REDIS_URL}: {err}"))?;
        if !matches!(parsed.scheme(), "redis" | "rediss") {
            anyhow::bail!("invalid --{ARG_REDIS_URL}: expected redis:// or rediss://");
        }
        Ok(Self { url: url.clone() })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_REDIS_URL)
            .long(ARG_REDIS_URL)
            .help("Redis URL for the token revocation ledger")
            .env("BRICKWALL_REDIS_URL")
            .default_value("redis://localhost:6379/0"),
    )
}
