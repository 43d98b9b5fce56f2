//! Chat and token counting commands.

use anyhow::{bail, Context};
use clap::Args;
use futures::StreamExt;
use infichat_core::{Config, Credentials};
use infichat_providers::{AnthropicProvider, Message, Provider, ProxyConfigurator, StreamEvent};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Arguments for `infichat chat`.
#[derive(Args)]
pub struct ChatArgs {
    /// Conversation identifier sent to the proxy
    #[arg(long)]
    pub conversation: String,

    /// User identifier sent to the proxy
    #[arg(long)]
    pub user: String,

    /// Model to use (defaults to proxy.defaultModel)
    #[arg(short, long)]
    pub model: Option<String>,

    /// JSON file with prior messages to forward before the prompt
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// System prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Stream the reply
    #[arg(long)]
    pub stream: bool,

    /// Print the strategy descriptor and thinking to stderr
    #[arg(long)]
    pub show_strategy: bool,

    /// Prompt text
    #[arg(required = true)]
    pub prompt: Vec<String>,
}

/// Arguments for `infichat tokens`.
#[derive(Args)]
pub struct TokensArgs {
    /// Model to count for (defaults to proxy.defaultModel)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Text to count
    #[arg(required = true)]
    pub text: Vec<String>,
}

/// Read a JSON array of messages.
fn read_history(path: &Path) -> anyhow::Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid history file {}", path.display()))
}

/// Run `infichat chat`.
pub async fn run(args: ChatArgs, config: &Config) -> anyhow::Result<()> {
    let mut messages = Vec::new();
    if let Some(system) = &args.system {
        messages.push(Message::system(system.as_str()));
    }
    if let Some(path) = &args.history {
        messages.extend(read_history(path)?);
    }
    messages.push(Message::user(args.prompt.join(" ")));

    let model_name = args
        .model
        .clone()
        .unwrap_or_else(|| config.proxy.default_model.clone());

    let configurator = ProxyConfigurator::new(config.proxy.clone());
    let (model, messages, strategy) = configurator
        .configure(&messages, &args.conversation, &args.user, &model_name)
        .await?;

    if !model.provider().is_model_available(model.model()).await? {
        warn!(model = model.model(), "Unknown model, forwarding anyway");
    }

    if args.show_strategy {
        eprintln!("{}", serde_json::to_string_pretty(&strategy)?);
    }

    if !args.stream {
        let reply = model.chat(messages, None).await?;
        if args.show_strategy {
            if let Some(thinking) = &reply.thinking {
                eprintln!("[thinking] {}", thinking);
            }
            eprintln!(
                "[usage] {} input + {} output = {} tokens",
                reply.usage.input_tokens,
                reply.usage.output_tokens,
                reply.usage.total_tokens()
            );
        }
        println!("{}", reply.content);
        return Ok(());
    }

    let mut stream = model.chat_stream(messages, None).await?;
    let mut stdout = std::io::stdout();
    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::ContentDelta { delta } => {
                write!(stdout, "{}", delta)?;
                stdout.flush()?;
            }
            StreamEvent::ThinkingDelta { delta } if args.show_strategy => eprint!("{}", delta),
            StreamEvent::Error { message } => bail!("Stream error: {}", message),
            _ => {}
        }
    }
    writeln!(stdout)?;
    Ok(())
}

/// Client for direct upstream calls.
fn upstream(config: &Config) -> anyhow::Result<AnthropicProvider> {
    let credentials = Credentials::from_env();
    let api_key = credentials.require_anthropic()?;
    Ok(AnthropicProvider::new(api_key.expose_secret())?
        .with_base_url(config.proxy.upstream_url.as_str())
        .with_timeout(config.proxy.timeout_secs))
}

/// Run `infichat tokens`.
pub async fn tokens(args: TokensArgs, config: &Config) -> anyhow::Result<()> {
    let model = args
        .model
        .unwrap_or_else(|| config.proxy.default_model.clone());

    let provider = upstream(config)?;
    let count = provider
        .count_tokens(&model, &[Message::user(args.text.join(" "))])
        .await?;

    println!("{} tokens ({})", count.count, count.model);
    Ok(())
}

/// Run `infichat models`.
pub async fn models(config: &Config) -> anyhow::Result<()> {
    let provider = upstream(config)?;
    let models = provider.list_models().await?;
    let caps = provider.capabilities();

    println!("Models ({}):\n", provider.name());
    println!(
        "  {:<28} {:>8} {:>8}  {}",
        "MODEL", "CONTEXT", "OUTPUT", "THINKING"
    );
    println!("  {}", "-".repeat(58));
    for model in &models {
        let marker = if model.id == config.proxy.default_model {
            " (default)"
        } else {
            ""
        };
        println!(
            "  {:<28} {:>8} {:>8}  {}{}",
            model.id,
            model.context_window,
            model.max_output,
            if model.extended_thinking { "yes" } else { "no" },
            marker
        );
    }
    println!();
    println!(
        "  streaming: {}, tools: {}, vision: {}",
        caps.streaming, caps.tools, caps.vision
    );
    Ok(())
}
