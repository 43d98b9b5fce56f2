//! # infichat-core
//!
//! Core types, configuration, and utilities shared by the infichat crates.
//!
//! - **Configuration**: JSON5 config file with proxy, memory and logging sections
//! - **Credentials**: API keys read from the process environment
//! - **Types**: Tool definitions and tool results

pub mod config;
pub mod credentials;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use credentials::Credentials;
pub use error::{ConfigError, Error, Result};
pub use secret::SecretString;
pub use types::*;
