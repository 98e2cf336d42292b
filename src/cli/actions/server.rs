use crate::api::{self, PoolConfig, ServerConfig};
use crate::auth::TokenConfig;
use anyhow::Result;
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub pool: PoolConfig,
    pub redis_url: String,
    pub tokens: TokenConfig,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub cors_allow_origin: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if Postgres or Redis are unreachable or the listener fails.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    api::new(ServerConfig {
        port: args.port,
        dsn: args.dsn,
        pool: args.pool,
        redis_url: args.redis_url,
        tokens: args.tokens,
        request_timeout: args.request_timeout,
        shutdown_timeout: args.shutdown_timeout,
        cors_allow_origin: args.cors_allow_origin,
    })
    .await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_url(&args.dsn)),
        ("redis_url", redact_url(&args.redis_url)),
        (
            "pool",
            format!(
                "{}..{} conns",
                args.pool.min_connections, args.pool.max_connections
            ),
        ),
        (
            "access_ttl",
            format!("{}s", args.tokens.access_ttl().as_secs()),
        ),
        (
            "refresh_ttl",
            format!("{}s", args.tokens.refresh_ttl().as_secs()),
        ),
        (
            "request_timeout",
            format!("{}ms", args.request_timeout.as_millis()),
        ),
        ("cors_allow_origin", args.cors_allow_origin.clone()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "brickwall {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

/// Replace any password in a connection URL before it reaches the logs.
fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-url".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
