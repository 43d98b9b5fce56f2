//! Routing conversations through the Supermemory context proxy.
//!
//! The proxy sits in front of the upstream Messages API and manages the
//! context window on its side. This module only builds the route: the full
//! message history is forwarded untouched, with three scoping headers that let
//! the proxy partition stored context per conversation and per user.
//!
//! Preconditions: `conversation_id` and `user_id` are opaque and are not
//! checked for format or uniqueness, and an empty history is accepted as-is.
//! Values that cannot be carried in an HTTP header are rejected with
//! [`crate::ProviderError::InvalidRequest`] before any network call.

use crate::{
    AnthropicProvider, ChatOptions, ChatResponse, CompletionStream, Message, Provider, Result,
};
use infichat_core::config::ProxyConfig;
use infichat_core::{Credentials, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Header carrying the proxy access credential.
pub const PROXY_KEY_HEADER: &str = "x-supermemory-api-key";

/// Header carrying the conversation identifier.
pub const CONVERSATION_ID_HEADER: &str = "x-sm-conversation-id";

/// Header carrying the user identifier.
pub const USER_ID_HEADER: &str = "x-sm-user-id";

/// Context window of the upstream models, used for log output only.
pub const UPSTREAM_CONTEXT_WINDOW: usize = 200_000;

const STRATEGY_REASONING: &str = "Full conversation history is forwarded to the Supermemory \
     context proxy, which manages the upstream context window; extended thinking is enabled.";

/// Conversation and user identifiers a route is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationScope {
    pub conversation_id: String,
    pub user_id: String,
}

impl ConversationScope {
    pub fn new(conversation_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Summary of the routing decision, for logging and telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDescriptor {
    /// Extended thinking is requested on the routed model.
    pub use_extended_thinking: bool,

    /// Requests go through the context proxy.
    pub use_supermemory_proxy: bool,

    /// Input tokens of the forwarded history, as counted upstream.
    pub estimated_tokens: usize,

    /// Human-readable justification.
    pub reasoning: String,
}

impl StrategyDescriptor {
    fn proxied(estimated_tokens: usize) -> Self {
        Self {
            use_extended_thinking: true,
            use_supermemory_proxy: true,
            estimated_tokens,
            reasoning: STRATEGY_REASONING.to_string(),
        }
    }
}

/// A model handle whose requests go through the context proxy.
pub struct ProxiedModel {
    provider: AnthropicProvider,
    model: String,
    scope: ConversationScope,
    thinking_budget: usize,
    max_tokens: usize,
}

impl ProxiedModel {
    /// Target model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Scope the route was built for.
    pub fn scope(&self) -> &ConversationScope {
        &self.scope
    }

    /// Routed base URL (proxy URL with the upstream URL appended).
    pub fn base_url(&self) -> &str {
        self.provider.api_base()
    }

    /// Underlying client, with the scoping headers installed.
    pub fn provider(&self) -> &AnthropicProvider {
        &self.provider
    }

    /// Fill in the route's thinking budget and output budget where unset.
    fn apply_defaults(&self, options: Option<ChatOptions>) -> ChatOptions {
        let mut options = options.unwrap_or_default();
        if options.thinking_budget.is_none() && self.thinking_budget > 0 {
            options.thinking_budget = Some(self.thinking_budget);
        }
        if options.max_tokens.is_none() {
            options.max_tokens = Some(self.max_tokens);
        }
        options
    }

    /// Send the conversation through the proxy.
    pub async fn chat(
        &self,
        messages: &[Message],
        options: Option<ChatOptions>,
    ) -> Result<ChatResponse> {
        let options = self.apply_defaults(options);
        self.provider.chat(&self.model, messages, Some(options)).await
    }

    /// Stream a reply through the proxy.
    pub async fn chat_stream(
        &self,
        messages: &[Message],
        options: Option<ChatOptions>,
    ) -> Result<CompletionStream> {
        let options = self.apply_defaults(options);
        self.provider
            .chat_stream(&self.model, messages, Some(options))
            .await
    }
}

impl std::fmt::Debug for ProxiedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxiedModel")
            .field("model", &self.model)
            .field("base_url", &self.base_url())
            .field("scope", &self.scope)
            .finish()
    }
}

/// Builds [`ProxiedModel`] routes.
///
/// Credentials are read from the environment on every call unless set
/// explicitly with [`ProxyConfigurator::with_credentials`].
pub struct ProxyConfigurator {
    config: ProxyConfig,
    credentials: Option<Credentials>,
    token_counter: Option<Arc<dyn Provider>>,
}

impl Default for ProxyConfigurator {
    fn default() -> Self {
        Self::new(ProxyConfig::default())
    }
}

impl ProxyConfigurator {
    /// Create a configurator from proxy settings.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            credentials: None,
            token_counter: None,
        }
    }

    /// Use fixed credentials instead of reading the environment.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Count tokens with the given provider instead of the upstream API.
    pub fn with_token_counter(mut self, counter: Arc<dyn Provider>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    /// Build a proxied route for a conversation.
    ///
    /// Returns the model handle, the input messages unchanged, and the
    /// strategy descriptor. Fails with [`crate::ProviderError::Config`] before any
    /// network call when a credential is missing; token-counting failures are
    /// propagated.
    pub async fn configure<'a>(
        &self,
        messages: &'a [Message],
        conversation_id: &str,
        user_id: &str,
        model_name: &str,
    ) -> Result<(ProxiedModel, &'a [Message], StrategyDescriptor)> {
        let credentials = match &self.credentials {
            Some(credentials) => credentials.clone(),
            None => Credentials::from_env(),
        };
        let proxy_key = credentials.require_supermemory()?;
        let upstream_key = credentials.require_anthropic()?;

        // Header values are checked here, before the token count goes out.
        let scope = ConversationScope::new(conversation_id, user_id);
        let provider = AnthropicProvider::new(upstream_key.expose_secret())?
            .with_base_url(self.config.routed_base_url())
            .with_timeout(self.config.timeout_secs)
            .with_sensitive_header(PROXY_KEY_HEADER, proxy_key.expose_secret())?
            .with_header(CONVERSATION_ID_HEADER, &scope.conversation_id)?
            .with_header(USER_ID_HEADER, &scope.user_id)?;

        let estimated_tokens = self
            .estimate_tokens(upstream_key, model_name, messages)
            .await?;

        info!(
            message_count = messages.len(),
            estimated_tokens,
            model = model_name,
            conversation_id,
            user_id,
            "Routing full conversation through context proxy"
        );
        if estimated_tokens > UPSTREAM_CONTEXT_WINDOW {
            info!(
                estimated_tokens,
                context_window = UPSTREAM_CONTEXT_WINDOW,
                "Conversation exceeds the upstream context window, proxy manages it"
            );
        }

        let model = ProxiedModel {
            provider,
            model: model_name.to_string(),
            scope,
            thinking_budget: self.config.thinking_budget,
            max_tokens: self.config.max_tokens,
        };

        info!(
            message_count = messages.len(),
            estimated_tokens,
            base_url = %model.base_url(),
            "Context proxy route configured"
        );

        Ok((model, messages, StrategyDescriptor::proxied(estimated_tokens)))
    }

    async fn estimate_tokens(
        &self,
        upstream_key: &SecretString,
        model: &str,
        messages: &[Message],
    ) -> Result<usize> {
        if messages.is_empty() {
            debug!("Empty history, skipping token count");
            return Ok(0);
        }

        let count = match &self.token_counter {
            Some(counter) => counter.count_tokens(model, messages).await?,
            None => {
                AnthropicProvider::new(upstream_key.expose_secret())?
                    .with_base_url(self.config.upstream_url.as_str())
                    .with_timeout(self.config.timeout_secs)
                    .count_tokens(model, messages)
                    .await?
            }
        };
        Ok(count.count)
    }
}

/// Build a proxied route with default settings and credentials from the environment.
///
/// Shorthand for [`ProxyConfigurator::configure`] on a default configurator.
pub async fn configure<'a>(
    messages: &'a [Message],
    conversation_id: &str,
    user_id: &str,
    model_name: &str,
) -> Result<(ProxiedModel, &'a [Message], StrategyDescriptor)> {
    ProxyConfigurator::default()
        .configure(messages, conversation_id, user_id, model_name)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelInfo, ProviderCapabilities, ProviderError, TokenCount};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Token counter returning a fixed count and recording calls.
    struct FixedCounter {
        count: usize,
        calls: AtomicUsize,
    }

    impl FixedCounter {
        fn new(count: usize) -> Arc<Self> {
            Arc::new(Self {
                count,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for FixedCounter {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }

        async fn chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _options: Option<ChatOptions>,
        ) -> Result<ChatResponse> {
            Err(ProviderError::invalid_request("counter only"))
        }

        async fn chat_stream(
            &self,
            _model: &str,
            _messages: &[Message],
            _options: Option<ChatOptions>,
        ) -> Result<CompletionStream> {
            Err(ProviderError::invalid_request("counter only"))
        }

        async fn count_tokens(&self, model: &str, _messages: &[Message]) -> Result<TokenCount> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TokenCount {
                count: self.count,
                model: model.to_string(),
            })
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities::default()
        }
    }

    fn history() -> Vec<Message> {
        vec![
            Message::system("You are a helpful assistant."),
            Message::user("My cat is called Miso."),
            Message::assistant("Nice name!"),
            Message::user("What is my cat called?"),
        ]
    }

    fn configurator(counter: Arc<FixedCounter>) -> ProxyConfigurator {
        ProxyConfigurator::default()
            .with_credentials(Credentials::new("sm-key", "ant-key"))
            .with_token_counter(counter)
    }

    #[tokio::test]
    async fn test_configure_returns_messages_unchanged() {
        let counter = FixedCounter::new(1234);
        let messages = history();

        let (model, forwarded, strategy) = configurator(counter.clone())
            .configure(&messages, "conv-1", "user-1", "claude-sonnet-4-20250514")
            .await
            .unwrap();

        assert!(std::ptr::eq(forwarded, messages.as_slice()));
        assert_eq!(forwarded, history().as_slice());
        assert_eq!(model.model(), "claude-sonnet-4-20250514");
        assert_eq!(strategy.estimated_tokens, 1234);
        assert!(strategy.use_supermemory_proxy);
        assert!(strategy.use_extended_thinking);
        assert!(!strategy.reasoning.is_empty());
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_configure_installs_scoping_headers() {
        let messages = history();
        let (model, _, _) = configurator(FixedCounter::new(10))
            .configure(&messages, "conv-42", "user-7", "claude-sonnet-4-20250514")
            .await
            .unwrap();

        let headers = model.provider().extra_headers();
        assert_eq!(headers.get(PROXY_KEY_HEADER).unwrap(), "sm-key");
        assert!(headers.get(PROXY_KEY_HEADER).unwrap().is_sensitive());
        assert_eq!(headers.get(CONVERSATION_ID_HEADER).unwrap(), "conv-42");
        assert_eq!(headers.get(USER_ID_HEADER).unwrap(), "user-7");
        assert_eq!(
            model.base_url(),
            "https://api.supermemory.ai/v3/https://api.anthropic.com"
        );
        assert_eq!(model.scope(), &ConversationScope::new("conv-42", "user-7"));
    }

    #[tokio::test]
    async fn test_missing_proxy_key_fails_before_counting() {
        let counter = FixedCounter::new(10);
        let messages = history();

        let err = ProxyConfigurator::default()
            .with_credentials(Credentials::default().with_anthropic_key("ant-key"))
            .with_token_counter(counter.clone())
            .configure(&messages, "conv-1", "user-1", "claude-sonnet-4-20250514")
            .await
            .unwrap_err();

        assert!(err.is_config());
        assert!(err.to_string().contains("SUPERMEMORY_API_KEY"));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_upstream_key_is_config_error() {
        let err = ProxyConfigurator::default()
            .with_credentials(Credentials::default().with_supermemory_key("sm-key"))
            .with_token_counter(FixedCounter::new(10))
            .configure(&history(), "conv-1", "user-1", "claude-sonnet-4-20250514")
            .await
            .unwrap_err();

        assert!(err.is_config());
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn test_empty_history_is_forwarded() {
        let counter = FixedCounter::new(99);
        let messages: Vec<Message> = Vec::new();

        let (_, forwarded, strategy) = configurator(counter.clone())
            .configure(&messages, "conv-1", "user-1", "claude-sonnet-4-20250514")
            .await
            .unwrap();

        assert!(forwarded.is_empty());
        assert_eq!(strategy.estimated_tokens, 0);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_large_history_is_not_truncated() {
        let messages: Vec<Message> = (0..500)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question {i}"))
                } else {
                    Message::assistant(format!("answer {i}"))
                }
            })
            .collect();

        let (_, forwarded, strategy) = configurator(FixedCounter::new(250_000))
            .configure(&messages, "conv-1", "user-1", "claude-sonnet-4-20250514")
            .await
            .unwrap();

        assert_eq!(forwarded.len(), 500);
        assert_eq!(forwarded, messages.as_slice());
        assert!(strategy.estimated_tokens > UPSTREAM_CONTEXT_WINDOW);
    }

    #[tokio::test]
    async fn test_unencodable_scope_is_rejected() {
        let counter = FixedCounter::new(1);

        let err = configurator(counter.clone())
            .configure(&history(), "conv\r\n1", "user-1", "claude-sonnet-4-20250514")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));

        let err = configurator(counter.clone())
            .configure(&history(), "conv-1", "user\n1", "claude-sonnet-4-20250514")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));

        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_apply_defaults() {
        let (model, _, _) = configurator(FixedCounter::new(1))
            .configure(&history(), "conv-1", "user-1", "claude-sonnet-4-20250514")
            .await
            .unwrap();

        let options = model.apply_defaults(None);
        assert_eq!(options.thinking_budget, Some(10_000));
        assert_eq!(options.max_tokens, Some(16_000));

        let options = model.apply_defaults(Some(ChatOptions::with_max_tokens(30_000).thinking(2048)));
        assert_eq!(options.thinking_budget, Some(2048));
        assert_eq!(options.max_tokens, Some(30_000));
    }

    #[test]
    fn test_strategy_descriptor_wire_names() {
        let json = serde_json::to_value(StrategyDescriptor::proxied(5)).unwrap();
        assert_eq!(json["useExtendedThinking"], true);
        assert_eq!(json["useSupermemoryProxy"], true);
        assert_eq!(json["estimatedTokens"], 5);
        assert!(json["reasoning"].is_string());
    }
}
