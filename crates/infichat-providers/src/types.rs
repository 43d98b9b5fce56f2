//! Common types for model providers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use infichat_core::ToolDefinition;

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions).
    System,
    /// User message.
    User,
    /// Assistant message.
    Assistant,
    /// Tool result message.
    Tool,
}

impl MessageRole {
    /// Check if this is a user message.
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }
}

/// A message in a conversation.
///
/// Messages are owned by the caller and never rewritten by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role.
    pub role: MessageRole,

    /// Message content.
    pub content: MessageContent,

    /// Tool call ID (for tool results).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn text_message(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::text_message(MessageRole::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::text_message(MessageRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text_message(MessageRole::Assistant, content)
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::text_message(MessageRole::Tool, content)
        }
    }

    /// Get the first text segment of the message.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(s) => Some(s),
            MessageContent::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text(s) => Some(s.as_str()),
                _ => None,
            }),
        }
    }
}

/// Message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content.
    Text(String),

    /// Multi-part content (text, images, tool traffic).
    Parts(Vec<ContentPart>),
}

/// A part of multi-part content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content.
    Text(String),

    /// Image content.
    Image(ImageContent),

    /// Tool use request.
    ToolUse(ToolUse),

    /// Tool result.
    ToolResult(ToolResultContent),
}

/// Image content for vision models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Image source type.
    #[serde(rename = "type")]
    pub source_type: ImageSourceType,

    /// Media type (e.g., "image/jpeg").
    pub media_type: String,

    /// Image data (base64 for base64, URL for url).
    pub data: String,
}

/// Image source type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSourceType {
    Base64,
    Url,
}

/// Tool use request from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Unique ID for this tool use.
    pub id: String,

    /// Tool name.
    pub name: String,

    /// Tool arguments as JSON.
    pub input: serde_json::Value,
}

/// Tool result content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultContent {
    /// Tool call ID this result is for.
    pub tool_use_id: String,

    /// Tool result content.
    pub content: String,

    /// Whether the tool execution failed.
    #[serde(default)]
    pub is_error: bool,
}

/// Chat completion options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Temperature for sampling. Ignored when extended thinking is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Stop sequences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Extended thinking budget in tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<usize>,

    /// Tools available for the model to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    /// Tool choice mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

impl ChatOptions {
    /// Create new chat options with max tokens.
    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..Default::default()
        }
    }

    /// Set temperature.
    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Enable extended thinking with the given budget.
    pub fn thinking(mut self, budget_tokens: usize) -> Self {
        self.thinking_budget = Some(budget_tokens);
        self
    }
}

/// Tool choice mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides whether to use tools.
    Auto,
    /// Model must use a tool.
    Any,
    /// Model cannot use tools.
    None,
    /// Model must use a specific tool.
    Tool { name: String },
}

/// Chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Response ID.
    pub id: String,

    /// Model used.
    pub model: String,

    /// Response text.
    pub content: String,

    /// Extended thinking text, when the model produced any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,

    /// Tool calls requested by the model.
    #[serde(default)]
    pub tool_calls: Vec<ToolUse>,

    /// Stop reason.
    pub stop_reason: StopReason,

    /// Token usage.
    pub usage: Usage,

    /// Response metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    StopSequence,
    MaxTokens,
    ToolUse,
    Unknown,
}

impl StopReason {
    /// Map the wire value reported by the Messages API.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("end_turn") => Self::EndTurn,
            Some("stop_sequence") => Self::StopSequence,
            Some("max_tokens") => Self::MaxTokens,
            Some("tool_use") => Self::ToolUse,
            _ => Self::Unknown,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Input/prompt tokens.
    pub input_tokens: usize,

    /// Output/completion tokens.
    pub output_tokens: usize,

    /// Cache read tokens.
    #[serde(default)]
    pub cache_read_tokens: usize,

    /// Cache creation tokens.
    #[serde(default)]
    pub cache_creation_tokens: usize,
}

impl Usage {
    /// Get total tokens used.
    pub fn total_tokens(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// Token count result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCount {
    /// Number of input tokens.
    pub count: usize,

    /// Model used for counting.
    pub model: String,
}

/// Model information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model ID.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Maximum context window.
    pub context_window: usize,

    /// Maximum output tokens.
    pub max_output: usize,

    /// Supports extended thinking.
    #[serde(default)]
    pub extended_thinking: bool,
}

/// Streaming event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Stream started.
    Start { id: String, model: String },

    /// Text delta.
    ContentDelta { delta: String },

    /// Extended thinking delta.
    ThinkingDelta { delta: String },

    /// Tool use started.
    ToolUseStart { id: String, name: String },

    /// Tool input delta (partial JSON).
    ToolInputDelta { delta: String },

    /// Stream completed.
    End { stop_reason: StopReason, usage: Usage },

    /// Error reported inside the stream.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let sys = Message::system("You are a helpful assistant.");
        assert_eq!(sys.role, MessageRole::System);
        assert_eq!(sys.text(), Some("You are a helpful assistant."));

        let tool = Message::tool_result("call_1", "42");
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_parts_text() {
        let msg = Message {
            role: MessageRole::User,
            content: MessageContent::Parts(vec![
                ContentPart::Image(ImageContent {
                    source_type: ImageSourceType::Url,
                    media_type: String::new(),
                    data: "https://example.com/cat.png".to_string(),
                }),
                ContentPart::Text("what is this?".to_string()),
            ]),
            tool_call_id: None,
        };
        assert_eq!(msg.text(), Some("what is this?"));
    }

    #[test]
    fn test_chat_options() {
        let opts = ChatOptions::with_max_tokens(16_000)
            .temperature(0.5)
            .thinking(10_000);

        assert_eq!(opts.max_tokens, Some(16_000));
        assert_eq!(opts.temperature, Some(0.5));
        assert_eq!(opts.thinking_budget, Some(10_000));
        assert!(opts.tools.is_none());
    }

    #[test]
    fn test_stop_reason_from_wire() {
        assert_eq!(StopReason::from_wire(Some("end_turn")), StopReason::EndTurn);
        assert_eq!(StopReason::from_wire(Some("tool_use")), StopReason::ToolUse);
        assert_eq!(StopReason::from_wire(Some("refusal")), StopReason::Unknown);
        assert_eq!(StopReason::from_wire(None), StopReason::Unknown);
    }
}
