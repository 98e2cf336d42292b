use anyhow::Result;
use brickwall::cli;

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let result = action.execute().await;

    cli::telemetry::shutdown_tracer();

    result
}
