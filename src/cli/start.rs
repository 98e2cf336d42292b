use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;

/// Map verbosity count to tracing level
const fn get_verbosity_level(verbosity: u8) -> Option<tracing::Level> {
    match verbosity {
        0 => None,
        1 => Some(tracing::Level::WARN),
        2 => Some(tracing::Level::INFO),
        3 => Some(tracing::Level::DEBUG),
        _ => Some(tracing::Level::TRACE),
    }
}

/// Main entry point for the CLI - builds and returns the Action
///
/// # Errors
///
/// Returns an error if argument parsing, telemetry initialization, or action dispatch fails
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let verbosity_level = get_verbosity_level(
        matches
            .get_one::<u8>(commands::logging::ARG_VERBOSITY)
            .copied()
            .unwrap_or(0),
    );

    let log_format = matches
        .get_one::<String>(commands::logging::ARG_LOG_FORMAT)
        .map(|format| format.parse::<telemetry::LogFormat>())
        .transpose()
        .map_err(|err| anyhow::anyhow!(err))?
        .unwrap_or_default();

    telemetry::init(verbosity_level, log_format)?;

    dispatch::handler(&matches)
}
