//! Config command implementation.

use anyhow::bail;
use clap::{Args, Subcommand};
use infichat_core::{paths, Config};
use std::path::{Path, PathBuf};

/// Arguments for `infichat config`.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn resolve_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(paths::config_file()?),
    }
}

/// Run `infichat config`.
pub fn run(args: ConfigArgs, explicit: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            println!("{}", config.to_json5()?);
        }
        ConfigCommand::Path => {
            println!("{}", resolve_path(explicit)?.display());
        }
        ConfigCommand::Init { force } => {
            let path = resolve_path(explicit)?;
            init(&path, force)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Config::default().save(path)?;
    Ok(())
}
