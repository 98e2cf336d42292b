use crate::api::DEFAULT_REQUEST_TIMEOUT;
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_PORT: &str = "port";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";
pub const ARG_SHUTDOWN_TIMEOUT: &str = "shutdown-timeout";
pub const ARG_CORS_ALLOW_ORIGIN: &str = "cors-allow-origin";

#[derive(Debug, Clone)]
pub struct Options {
    pub port: u16,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub cors_allow_origin: String,
}

impl Options {
    /// Parse listener arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a timeout is zero or the CORS origin list is empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8081);

        let request_timeout = matches
            .get_one::<u64>(ARG_REQUEST_TIMEOUT)
            .copied()
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs);
        if request_timeout.is_zero() {
            anyhow::bail!("--{ARG_REQUEST_TIMEOUT} must be greater than zero");
        }

        let shutdown_timeout = Duration::from_secs(
            matches
                .get_one::<u64>(ARG_SHUTDOWN_TIMEOUT)
                .copied()
                .unwrap_or(5),
        );
        if shutdown_timeout.is_zero() {
            anyhow::bail!("--{ARG_SHUTDOWN_TIMEOUT} must be greater than zero");
        }

        let cors_allow_origin = matches
            .get_one::<String>(ARG_CORS_ALLOW_ORIGIN)
            .map_or("*", String::as_str)
            .trim()
            .to_string();
        if cors_allow_origin.is_empty() {
            anyhow::bail!("--{ARG_CORS_ALLOW_ORIGIN} must not be empty");
        }

        Ok(Self {
            port,
            request_timeout,
            shutdown_timeout,
            cors_allow_origin,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8081")
                .env("BRICKWALL_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long(ARG_REQUEST_TIMEOUT)
                .help("Upper bound in seconds for each store or ledger call")
                .env("BRICKWALL_REQUEST_TIMEOUT")
                .default_value("3")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SHUTDOWN_TIMEOUT)
                .long(ARG_SHUTDOWN_TIMEOUT)
                .help("Seconds to drain in-flight requests after a shutdown signal")
                .env("BRICKWALL_SHUTDOWN_TIMEOUT")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_CORS_ALLOW_ORIGIN)
                .long(ARG_CORS_ALLOW_ORIGIN)
                .help("Allowed CORS origins, `*` or a comma separated list")
                .env("BRICKWALL_CORS_ALLOW_ORIGIN")
                .default_value("*"),
        )
}
