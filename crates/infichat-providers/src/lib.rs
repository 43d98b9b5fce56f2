//! Model provider access for infichat.
//!
//! - [`AnthropicProvider`]: Messages API client (chat, streaming, token counting)
//! - [`proxy`]: routes a conversation through the Supermemory context proxy
//!
//! # Example
//!
//! ```rust,ignore
//! use infichat_providers::{proxy, Message};
//!
//! let history = vec![Message::user("Hello!")];
//! let (model, messages, strategy) =
//!     proxy::configure(&history, "conv-1", "user-1", "claude-sonnet-4-20250514").await?;
//! let reply = model.chat(messages, None).await?;
//! ```

mod error;
mod types;

pub mod anthropic;
pub mod proxy;

pub use anthropic::AnthropicProvider;
pub use error::{ProviderError, Result};
pub use proxy::{ConversationScope, ProxiedModel, ProxyConfigurator, StrategyDescriptor};
pub use types::*;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Stream of completion events for streaming responses.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// A model provider that can generate completions and count tokens.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get provider name.
    fn name(&self) -> &str;

    /// List available models.
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Check if a model is available.
    async fn is_model_available(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m.id == model))
    }

    /// Generate a chat completion.
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<ChatOptions>,
    ) -> Result<ChatResponse>;

    /// Generate a streaming chat completion.
    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<ChatOptions>,
    ) -> Result<CompletionStream>;

    /// Count input tokens for a message sequence.
    async fn count_tokens(&self, model: &str, messages: &[Message]) -> Result<TokenCount>;

    /// Get model capabilities.
    fn capabilities(&self) -> ProviderCapabilities;
}

/// Provider capabilities.
#[derive(Debug, Clone, Default)]
pub struct ProviderCapabilities {
    /// Supports streaming responses.
    pub streaming: bool,

    /// Supports function/tool calling.
    pub tools: bool,

    /// Supports vision/image input.
    pub vision: bool,

    /// Supports extended thinking.
    pub extended_thinking: bool,

    /// Maximum context window (tokens).
    pub max_context: Option<usize>,

    /// Maximum output tokens.
    pub max_output: Option<usize>,
}
