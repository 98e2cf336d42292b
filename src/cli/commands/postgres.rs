use crate::api::PoolConfig;
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_DSN: &str = "dsn";
pub const ARG_MAX_CONNS: &str = "postgres-max-conns";
pub const ARG_MIN_CONNS: &str = "postgres-min-conns";
pub const ARG_MAX_CONN_LIFETIME: &str = "postgres-max-conn-lifetime";
pub const ARG_MAX_CONN_IDLE_TIME: &str = "postgres-max-conn-idle-time";

#[derive(Debug, Clone)]
pub struct Options {
    pub dsn: String,
    pub pool: PoolConfig,
}

impl Options {
    /// Parse database arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the DSN is missing or the pool bounds are inconsistent.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let dsn = match matches.get_one::<String>(ARG_DSN) {
            Some(value) if !value.trim().is_empty() => value.clone(),
            _ => anyhow::bail!("missing required argument: --{ARG_DSN}"),
        };

        let defaults = PoolConfig::default();
        let max_connections = matches
            .get_one::<u32>(ARG_MAX_CONNS)
            .copied()
            .unwrap_or(defaults.max_connections);
        let min_connections = matches
            .get_one::<u32>(ARG_MIN_CONNS)
            .copied()
            .unwrap_or(defaults.min_connections);
        if max_connections == 0 || min_connections > max_connections {
            anyhow::bail!(
                "invalid pool bounds: --{ARG_MIN_CONNS} {min_connections} / --{ARG_MAX_CONNS} {max_connections}"
            );
        }

        let seconds = |id: &str, default: Duration| {
            matches
                .get_one::<u64>(id)
                .copied()
                .map_or(default, Duration::from_secs)
        };

        Ok(Self {
            dsn,
            pool: PoolConfig {
                max_connections,
                min_connections,
                max_lifetime: seconds(ARG_MAX_CONN_LIFETIME, defaults.max_lifetime),
                idle_timeout: seconds(ARG_MAX_CONN_IDLE_TIME, defaults.idle_timeout),
            },
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("BRICKWALL_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_MAX_CONNS)
                .long(ARG_MAX_CONNS)
                .help("Maximum number of pooled Postgres connections")
                .env("BRICKWALL_POSTGRES_MAX_CONNS")
                .default_value("100")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_MIN_CONNS)
                .long(ARG_MIN_CONNS)
                .help("Minimum number of idle Postgres connections kept open")
                .env("BRICKWALL_POSTGRES_MIN_CONNS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_MAX_CONN_LIFETIME)
                .long(ARG_MAX_CONN_LIFETIME)
                .help("Maximum lifetime of a Postgres connection in seconds")
                .env("BRICKWALL_POSTGRES_MAX_CONN_LIFETIME")
                .default_value("600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_MAX_CONN_IDLE_TIME)
                .long(ARG_MAX_CONN_IDLE_TIME)
                .help("Close Postgres connections idle for longer than this many seconds")
                .env("BRICKWALL_POSTGRES_MAX_CONN_IDLE_TIME")
                .default_value("180")
                .value_parser(clap::value_parser!(u64)),
        )
}
