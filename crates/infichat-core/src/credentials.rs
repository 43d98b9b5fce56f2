//! Credentials for the proxy and the upstream model API.
//!
//! Both keys live in the process environment and are re-read every time
//! [`Credentials::from_env`] is called. They are never stored in the config file.

use crate::env::{self, vars};
use crate::error::ConfigError;
use crate::secret::SecretString;

/// API keys needed to reach the external services.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Key for the Supermemory proxy and memory API.
    pub supermemory_api_key: Option<SecretString>,

    /// Key for the upstream Anthropic API.
    pub anthropic_api_key: Option<SecretString>,
}

impl Credentials {
    /// Create credentials from explicit values.
    pub fn new(supermemory_api_key: impl Into<String>, anthropic_api_key: impl Into<String>) -> Self {
        Self {
            supermemory_api_key: non_empty(supermemory_api_key.into()),
            anthropic_api_key: non_empty(anthropic_api_key.into()),
        }
    }

    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self {
            supermemory_api_key: env::get_var(vars::SUPERMEMORY_API_KEY).map(SecretString::new),
            anthropic_api_key: env::get_var(vars::ANTHROPIC_API_KEY).map(SecretString::new),
        }
    }

    /// Set the Supermemory key.
    pub fn with_supermemory_key(mut self, key: impl Into<String>) -> Self {
        self.supermemory_api_key = non_empty(key.into());
        self
    }

    /// Set the Anthropic key.
    pub fn with_anthropic_key(mut self, key: impl Into<String>) -> Self {
        self.anthropic_api_key = non_empty(key.into());
        self
    }

    /// The Supermemory key, or a configuration error if it is absent.
    pub fn require_supermemory(&self) -> Result<&SecretString, ConfigError> {
        self.supermemory_api_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingCredential(vars::SUPERMEMORY_API_KEY.to_string()))
    }

    /// The Anthropic key, or a configuration error if it is absent.
    pub fn require_anthropic(&self) -> Result<&SecretString, ConfigError> {
        self.anthropic_api_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingCredential(vars::ANTHROPIC_API_KEY.to_string()))
    }
}

fn non_empty(value: String) -> Option<SecretString> {
    if value.trim().is_empty() {
        None
    } else {
        Some(SecretString::new(value))
    }
}
