//! Map validated CLI arguments to the action the binary should run.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{jwt, postgres, redis, server};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let server_opts = server::Options::parse(matches)?;
    let postgres_opts = postgres::Options::parse(matches)?;
    let redis_opts = redis::Options::parse(matches)?;
    let jwt_opts = jwt::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port: server_opts.port,
        dsn: postgres_opts.dsn,
        pool: postgres_opts.pool,
        redis_url: redis_opts.url,
        tokens: jwt_opts.tokens,
        request_timeout: server_opts.request_timeout,
        shutdown_timeout: server_opts.shutdown_timeout,
        cors_allow_origin: server_opts.cors_allow_origin,
    }))
}
