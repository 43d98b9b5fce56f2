//! Credential lookup from the process environment.
//!
//! Kept in its own test binary: it mutates process-wide environment variables.

use infichat_core::env::vars;
use infichat_providers::{proxy, Message, ProviderError};

#[tokio::test]
async fn test_configure_reads_credentials_from_environment() {
    std::env::set_var(vars::ANTHROPIC_API_KEY, "ant-key");
    std::env::remove_var(vars::SUPERMEMORY_API_KEY);

    let history = vec![Message::user("hello")];
    let err = proxy::configure(&history, "conv-1", "user-1", "claude-sonnet-4-20250514")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Config(ref m) if m.contains(vars::SUPERMEMORY_API_KEY)));

    std::env::set_var(vars::SUPERMEMORY_API_KEY, "   ");
    let err = proxy::configure(&history, "conv-1", "user-1", "claude-sonnet-4-20250514")
        .await
        .unwrap_err();
    assert!(err.is_config());

    std::env::set_var(vars::SUPERMEMORY_API_KEY, "sm-key");
    std::env::remove_var(vars::ANTHROPIC_API_KEY);
    let err = proxy::configure(&history, "conv-1", "user-1", "claude-sonnet-4-20250514")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Config(ref m) if m.contains(vars::ANTHROPIC_API_KEY)));
}
