//! Anthropic Messages API client.
//!
//! The same client talks to the API directly (token counting) and through the
//! context proxy (chat), in which case the base URL points at the proxy and
//! the scoping headers ride along as extra headers.
//!
//! # Example
//!
//! ```rust,ignore
//! use infichat_providers::{AnthropicProvider, Message, Provider};
//!
//! let provider = AnthropicProvider::new("your-api-key")?;
//! let count = provider
//!     .count_tokens("claude-sonnet-4-20250514", &[Message::user("Hello!")])
//!     .await?;
//! ```

use crate::{
    ChatOptions, ChatResponse, CompletionStream, ContentPart, ImageSourceType, Message,
    MessageContent, MessageRole, ModelInfo, Provider, ProviderCapabilities, ProviderError, Result,
    StopReason, StreamEvent, TokenCount, ToolChoice, ToolDefinition, ToolUse, Usage,
};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Anthropic API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Current API version.
const API_VERSION: &str = "2023-06-01";

/// Output budget used when the caller does not set one.
const DEFAULT_MAX_TOKENS: usize = 4096;

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    /// HTTP client.
    client: Client,

    /// API key.
    api_key: SecretString,

    /// API base URL.
    api_base: String,

    /// Headers added to every request.
    extra_headers: HeaderMap,

    /// Request timeout in seconds.
    timeout: u64,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with an API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::config("API key is required"));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: SecretString::new(api_key),
            api_base: DEFAULT_API_BASE.to_string(),
            extra_headers: HeaderMap::new(),
            timeout: 300,
        })
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Add a header sent with every request.
    pub fn with_header(self, name: &str, value: &str) -> Result<Self> {
        self.insert_header(name, value, false)
    }

    /// Add a header whose value must never show up in logs.
    pub fn with_sensitive_header(self, name: &str, value: &str) -> Result<Self> {
        self.insert_header(name, value, true)
    }

    fn insert_header(mut self, name: &str, value: &str, sensitive: bool) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProviderError::invalid_request(format!("Invalid header name '{}': {}", name, e)))?;
        let mut value = HeaderValue::from_str(value).map_err(|e| {
            ProviderError::invalid_request(format!("Invalid value for header '{}': {}", name, e))
        })?;
        value.set_sensitive(sensitive);
        self.extra_headers.insert(name, value);
        Ok(self)
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// The API base URL requests are sent to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The extra headers sent with every request.
    pub fn extra_headers(&self) -> &HeaderMap {
        &self.extra_headers
    }

    /// Start a POST request with authentication and extra headers applied.
    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.api_base, path))
            .timeout(Duration::from_secs(self.timeout))
            .headers(self.extra_headers.clone())
            .header("x-api-key", self.api_key.expose_secret().as_str())
            .header("anthropic-version", API_VERSION)
    }

    /// Convert messages to Anthropic format.
    ///
    /// System messages are lifted into the top-level `system` field; every
    /// other message is forwarded in order.
    fn convert_messages(
        &self,
        messages: &[Message],
    ) -> Result<(Option<String>, Vec<AnthropicMessage>)> {
        let mut system: Vec<&str> = Vec::new();
        let mut converted = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                MessageRole::System => {
                    if let Some(text) = msg.text() {
                        system.push(text);
                    }
                }
                MessageRole::User | MessageRole::Assistant => {
                    converted.push(AnthropicMessage {
                        role: if msg.role.is_user() { "user" } else { "assistant" },
                        content: self.convert_content(&msg.content)?,
                    });
                }
                MessageRole::Tool => {
                    let content = match &msg.tool_call_id {
                        Some(tool_call_id) => {
                            AnthropicContent::Parts(vec![AnthropicContentPart::ToolResult {
                                tool_use_id: tool_call_id.clone(),
                                content: msg.text().unwrap_or_default().to_string(),
                                is_error: false,
                            }])
                        }
                        // Without a call id the API cannot pair the result; send it as text.
                        None => self.convert_content(&msg.content)?,
                    };
                    converted.push(AnthropicMessage {
                        role: "user",
                        content,
                    });
                }
            }
        }

        let system = if system.is_empty() {
            None
        } else {
            Some(system.join("\n\n"))
        };

        Ok((system, converted))
    }

    /// Convert content to Anthropic format.
    fn convert_content(&self, content: &MessageContent) -> Result<AnthropicContent> {
        let parts = match content {
            MessageContent::Text(s) => return Ok(AnthropicContent::Text(s.clone())),
            MessageContent::Parts(parts) => parts,
        };

        let converted = parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(s) => AnthropicContentPart::Text { text: s.clone() },
                ContentPart::Image(img) => AnthropicContentPart::Image {
                    source: match img.source_type {
                        ImageSourceType::Base64 => ImageSource::Base64 {
                            media_type: img.media_type.clone(),
                            data: img.data.clone(),
                        },
                        ImageSourceType::Url => ImageSource::Url {
                            url: img.data.clone(),
                        },
                    },
                },
                ContentPart::ToolUse(tool) => AnthropicContentPart::ToolUse {
                    id: tool.id.clone(),
                    name: tool.name.clone(),
                    input: tool.input.clone(),
                },
                ContentPart::ToolResult(result) => AnthropicContentPart::ToolResult {
                    tool_use_id: result.tool_use_id.clone(),
                    content: result.content.clone(),
                    is_error: result.is_error,
                },
            })
            .collect();

        Ok(AnthropicContent::Parts(converted))
    }

    /// Build a Messages API request body.
    fn build_request(
        &self,
        model: &str,
        messages: &[Message],
        options: ChatOptions,
        stream: bool,
    ) -> Result<AnthropicRequest> {
        let (system, messages) = self.convert_messages(messages)?;

        let thinking = options
            .thinking_budget
            .filter(|budget| *budget > 0)
            .map(|budget_tokens| AnthropicThinking {
                kind: "enabled",
                budget_tokens,
            });

        let mut max_tokens = options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if let Some(thinking) = &thinking {
            // The thinking budget is carved out of max_tokens.
            if max_tokens <= thinking.budget_tokens {
                max_tokens = thinking.budget_tokens + DEFAULT_MAX_TOKENS;
            }
        }

        let temperature = if thinking.is_some() {
            if options.temperature.is_some() {
                debug!("Dropping temperature: not supported together with extended thinking");
            }
            None
        } else {
            options.temperature
        };

        Ok(AnthropicRequest {
            model: model.to_string(),
            messages,
            max_tokens,
            system,
            temperature,
            stop_sequences: options.stop,
            thinking,
            tools: options.tools.as_deref().map(convert_tools),
            tool_choice: options.tool_choice.as_ref().map(|c| match c {
                ToolChoice::Auto => AnthropicToolChoice::Auto,
                ToolChoice::Any => AnthropicToolChoice::Any,
                ToolChoice::None => AnthropicToolChoice::None,
                ToolChoice::Tool { name } => AnthropicToolChoice::Tool { name: name.clone() },
            }),
            stream,
        })
    }

    /// Parse Anthropic response.
    fn parse_response(&self, response: AnthropicResponse) -> ChatResponse {
        let mut content = String::new();
        let mut thinking = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                AnthropicContentBlock::Text { text } => content.push_str(&text),
                AnthropicContentBlock::Thinking { thinking: text, .. } => thinking.push_str(&text),
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolUse { id, name, input });
                }
                AnthropicContentBlock::RedactedThinking | AnthropicContentBlock::Other => {}
            }
        }

        ChatResponse {
            id: response.id,
            model: response.model,
            content,
            thinking: (!thinking.is_empty()).then_some(thinking),
            tool_calls,
            stop_reason: StopReason::from_wire(response.stop_reason.as_deref()),
            usage: Usage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
                cache_read_tokens: response.usage.cache_read_input_tokens.unwrap_or(0),
                cache_creation_tokens: response.usage.cache_creation_input_tokens.unwrap_or(0),
            },
            metadata: HashMap::new(),
        }
    }
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
    tools
        .iter()
        .map(|t| AnthropicTool {
            name: t.name.clone(),
            description: t.description.clone(),
            input_schema: t.input_schema.clone(),
        })
        .collect()
}

/// Turn a non-success response into a provider error.
async fn error_from_response(response: Response) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<AnthropicError>(&body) {
        Ok(err) => err.error.message,
        Err(_) if body.trim().is_empty() => format!("HTTP {}", status),
        Err(_) => body,
    };

    match status {
        401 | 403 => ProviderError::auth(message),
        429 => ProviderError::rate_limit(message, retry_after),
        400 | 413 | 422 => ProviderError::invalid_request(message),
        _ => ProviderError::server_error(status, message),
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        // No list endpoint is used; these are the models the proxy is tested with.
        Ok(vec![
            ModelInfo {
                id: "claude-opus-4-20250514".to_string(),
                name: "Claude Opus 4".to_string(),
                context_window: 200_000,
                max_output: 32_000,
                extended_thinking: true,
            },
            ModelInfo {
                id: "claude-sonnet-4-20250514".to_string(),
                name: "Claude Sonnet 4".to_string(),
                context_window: 200_000,
                max_output: 64_000,
                extended_thinking: true,
            },
            ModelInfo {
                id: "claude-3-5-haiku-20241022".to_string(),
                name: "Claude 3.5 Haiku".to_string(),
                context_window: 200_000,
                max_output: 8192,
                extended_thinking: false,
            },
        ])
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<ChatOptions>,
    ) -> Result<ChatResponse> {
        let request = self.build_request(model, messages, options.unwrap_or_default(), false)?;

        debug!(
            model,
            base_url = %self.api_base,
            message_count = request.messages.len(),
            thinking = request.thinking.is_some(),
            "Sending messages request"
        );

        let response = self.post("/v1/messages").json(&request).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let response: AnthropicResponse = response.json().await?;
        Ok(self.parse_response(response))
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<ChatOptions>,
    ) -> Result<CompletionStream> {
        let request = self.build_request(model, messages, options.unwrap_or_default(), true)?;

        let response = self.post("/v1/messages").json(&request).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let model = model.to_string();
        let stream = response.bytes_stream().eventsource().filter_map(move |result| {
            let model = model.clone();
            async move {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => return Some(Err(ProviderError::stream(e.to_string()))),
                };
                if event.data.is_empty() || event.data == "[DONE]" {
                    return None;
                }

                let sse = match serde_json::from_str::<AnthropicStreamEvent>(&event.data) {
                    Ok(sse) => sse,
                    Err(e) => {
                        warn!("Failed to parse SSE event: {}", e);
                        return None;
                    }
                };

                match sse {
                    AnthropicStreamEvent::MessageStart { message } => {
                        Some(Ok(StreamEvent::Start { id: message.id, model }))
                    }
                    AnthropicStreamEvent::ContentBlockStart { content_block } => {
                        match content_block {
                            AnthropicContentBlock::ToolUse { id, name, .. } => {
                                Some(Ok(StreamEvent::ToolUseStart { id, name }))
                            }
                            _ => None,
                        }
                    }
                    AnthropicStreamEvent::ContentBlockDelta { delta } => {
                        if let Some(text) = delta.text {
                            Some(Ok(StreamEvent::ContentDelta { delta: text }))
                        } else if let Some(thinking) = delta.thinking {
                            Some(Ok(StreamEvent::ThinkingDelta { delta: thinking }))
                        } else {
                            delta
                                .partial_json
                                .map(|json| Ok(StreamEvent::ToolInputDelta { delta: json }))
                        }
                    }
                    AnthropicStreamEvent::MessageDelta { delta, usage } => {
                        Some(Ok(StreamEvent::End {
                            stop_reason: StopReason::from_wire(delta.stop_reason.as_deref()),
                            usage: Usage {
                                output_tokens: usage.output_tokens,
                                ..Usage::default()
                            },
                        }))
                    }
                    AnthropicStreamEvent::Error { error } => {
                        Some(Ok(StreamEvent::Error { message: error.message }))
                    }
                    AnthropicStreamEvent::Other => None,
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn count_tokens(&self, model: &str, messages: &[Message]) -> Result<TokenCount> {
        let (system, messages) = self.convert_messages(messages)?;
        let request = CountTokensRequest {
            model,
            messages,
            system,
        };

        let response = self
            .post("/v1/messages/count_tokens")
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        #[derive(Deserialize)]
        struct TokenCountResponse {
            input_tokens: usize,
        }

        let result: TokenCountResponse = response.json().await?;
        Ok(TokenCount {
            count: result.input_tokens,
            model: model.to_string(),
        })
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            tools: true,
            vision: true,
            extended_thinking: true,
            max_context: Some(200_000),
            max_output: Some(64_000),
        }
    }
}

// Wire types for the Messages API

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<AnthropicThinking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<AnthropicToolChoice>,
    stream: bool,
}

#[derive(Serialize)]
struct CountTokensRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct AnthropicThinking {
    #[serde(rename = "type")]
    kind: &'static str,
    budget_tokens: usize,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: AnthropicContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Parts(Vec<AnthropicContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentPart {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

#[derive(Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicToolChoice {
    Auto,
    Any,
    None,
    Tool { name: String },
}

#[derive(Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    RedactedThinking,
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
    cache_read_input_tokens: Option<usize>,
    cache_creation_input_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamEvent {
    MessageStart {
        message: AnthropicStreamMessage,
    },
    ContentBlockStart {
        content_block: AnthropicContentBlock,
    },
    ContentBlockDelta {
        delta: ContentDelta,
    },
    MessageDelta {
        delta: MessageDelta,
        usage: StreamUsage,
    },
    Error {
        error: AnthropicErrorDetail,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicStreamMessage {
    id: String,
}

#[derive(Deserialize)]
struct ContentDelta {
    text: Option<String>,
    thinking: Option<String>,
    partial_json: Option<String>,
}

#[derive(Deserialize)]
struct MessageDelta {
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct StreamUsage {
    output_tokens: usize,
}
