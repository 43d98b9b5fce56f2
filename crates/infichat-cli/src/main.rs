//! infichat CLI entry point.

use clap::Parser;
use infichat_cli::{init_logging, load_config, run, Cli, Commands};
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so .env values can feed clap's `env` fallbacks
    let dotenv = infichat_core::env::load_dotenv();

    let cli = Cli::parse();
    let allow_missing = matches!(cli.command, Commands::Config(_));
    let config = load_config(cli.config.as_deref(), allow_missing)?;
    init_logging(&config.logging, cli.verbose);

    if let Err(e) = dotenv {
        warn!(error = %e, "Failed to read .env, continuing without it");
    }

    run(cli, config).await
}
