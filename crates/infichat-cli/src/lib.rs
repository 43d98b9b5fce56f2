//! infichat command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use infichat_core::config::LoggingConfig;
use infichat_core::env::vars;
use infichat_core::Config;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// infichat - chat with unbounded history through a context proxy
#[derive(Parser)]
#[command(name = "infichat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "INFICHAT_CONFIG", global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Send a conversation through the context proxy
    Chat(commands::chat::ChatArgs),

    /// Count input tokens for a prompt
    Tokens(commands::chat::TokensArgs),

    /// List known models
    Models,

    /// Store a memory for a user
    Remember(commands::memory::RememberArgs),

    /// Search a user's memories
    Recall(commands::memory::RecallArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Load the config file given on the command line, or the default one.
///
/// With `allow_missing`, an explicit path that does not exist yet yields the
/// defaults (used by `config init`).
pub fn load_config(path: Option<&Path>, allow_missing: bool) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) if allow_missing && !path.exists() => Config::default(),
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };
    Ok(config)
}

/// Install the global tracing subscriber.
///
/// `INFICHAT_LOG` wins over `RUST_LOG`, which wins over `-v`, which wins over
/// the config file. Logs go to stderr so replies can be piped.
pub fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let default = match verbose {
        0 => logging.level.clone(),
        1 => "infichat=debug".to_string(),
        _ => "infichat=trace,reqwest=debug".to_string(),
    };

    let filter = EnvFilter::try_from_env(vars::INFICHAT_LOG)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Chat(args) => commands::chat::run(args, &config).await,
        Commands::Tokens(args) => commands::chat::tokens(args, &config).await,
        Commands::Models => commands::chat::models(&config).await,
        Commands::Remember(args) => commands::memory::remember(args, &config).await,
        Commands::Recall(args) => commands::memory::recall(args, &config).await,
        Commands::Config(args) => commands::config::run(args, cli.config.as_deref(), &config),
        Commands::Version => {
            println!("infichat {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
