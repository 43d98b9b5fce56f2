//! Configuration schema definitions.
//!
//! Only non-secret settings live here. API keys come from the environment,
//! see [`crate::credentials`].

use serde::{Deserialize, Serialize};

/// Default proxy base URL; the upstream URL is appended to it.
pub const DEFAULT_PROXY_URL: &str = "https://api.supermemory.ai/v3";

/// Default upstream model API.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.anthropic.com";

/// Default memory API base URL.
pub const DEFAULT_MEMORY_URL: &str = "https://api.supermemory.ai";

/// Default model.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Main infichat configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model routing through the context proxy.
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Memory API settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Proxy routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Proxy base URL.
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    /// Upstream model API base URL, embedded as a suffix of the proxy URL.
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Model used when none is given.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Extended thinking budget in tokens.
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: usize,

    /// Maximum output tokens per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_proxy_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            proxy_url: default_proxy_url(),
            upstream_url: default_upstream_url(),
            default_model: default_model(),
            thinking_budget: default_thinking_budget(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_proxy_timeout(),
        }
    }
}

impl ProxyConfig {
    /// The routed base URL: the proxy URL with the upstream URL appended.
    pub fn routed_base_url(&self) -> String {
        format!(
            "{}/{}",
            self.proxy_url.trim_end_matches('/'),
            self.upstream_url.trim_end_matches('/')
        )
    }
}

/// Memory API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfig {
    /// Memory API base URL.
    #[serde(default = "default_memory_url")]
    pub base_url: String,

    /// Source tag recorded in memory metadata.
    #[serde(default = "default_memory_source")]
    pub source: String,

    /// Default number of search results.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_memory_timeout")]
    pub timeout_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_memory_url(),
            source: default_memory_source(),
            search_limit: default_search_limit(),
            timeout_secs: default_memory_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_proxy_url() -> String {
    DEFAULT_PROXY_URL.to_string()
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_thinking_budget() -> usize {
    10_000
}

fn default_max_tokens() -> usize {
    16_000
}

fn default_proxy_timeout() -> u64 {
    300
}

fn default_memory_url() -> String {
    DEFAULT_MEMORY_URL.to_string()
}

fn default_memory_source() -> String {
    "infichat".to_string()
}

fn default_search_limit() -> usize {
    5
}

fn default_memory_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "infichat=info".to_string()
}
