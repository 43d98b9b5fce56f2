//! Memory commands.

use anyhow::bail;
use clap::Args;
use infichat_core::{Config, Credentials};
use infichat_memory::{AddMemoryTool, SearchMemoriesTool, SupermemoryClient, Tool};
use std::sync::Arc;

/// Arguments for `infichat remember`.
#[derive(Args)]
pub struct RememberArgs {
    /// User the memory belongs to
    #[arg(long)]
    pub user: String,

    /// Memory content
    #[arg(required = true)]
    pub content: Vec<String>,
}

/// Arguments for `infichat recall`.
#[derive(Args)]
pub struct RecallArgs {
    /// User whose memories to search
    #[arg(long)]
    pub user: String,

    /// Maximum number of results (defaults to memory.searchLimit)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Search query
    #[arg(required = true)]
    pub query: Vec<String>,
}

fn client(config: &Config) -> anyhow::Result<Arc<SupermemoryClient>> {
    let client = SupermemoryClient::from_config(&config.memory, &Credentials::from_env())?;
    Ok(Arc::new(client))
}

/// Run `infichat remember`.
pub async fn remember(args: RememberArgs, config: &Config) -> anyhow::Result<()> {
    let tool = AddMemoryTool::new(client(config)?, args.user).with_source(config.memory.source.as_str());
    let outcome = tool.add_memory(&args.content.join(" ")).await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if let Some(error) = outcome.error() {
        bail!("{}", error);
    }
    Ok(())
}

/// Run `infichat recall`.
pub async fn recall(args: RecallArgs, config: &Config) -> anyhow::Result<()> {
    let tool = SearchMemoriesTool::new(client(config)?, args.user)
        .with_limit(args.limit.unwrap_or(config.memory.search_limit));

    let result = tool
        .execute("cli", serde_json::json!({ "query": args.query.join(" ") }))
        .await?;

    if result.is_error {
        bail!("{}", result.output.as_str().unwrap_or("memory search failed"));
    }
    println!("{}", serde_json::to_string_pretty(&result.output)?);
    Ok(())
}
