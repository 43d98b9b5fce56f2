//! Live round trip through the real proxy. Needs SUPERMEMORY_API_KEY and
//! ANTHROPIC_API_KEY; run with `cargo test -- --ignored`.

use infichat_providers::{proxy, Message};

#[tokio::test]
#[ignore]
async fn test_live_proxy_round_trip() {
    let history = vec![
        Message::user("Remember that my favourite colour is teal."),
        Message::assistant("Noted, teal it is."),
        Message::user("What is my favourite colour? Answer in one word."),
    ];

    let (model, messages, strategy) =
        proxy::configure(&history, "infichat-smoke", "infichat-smoke-user", "claude-sonnet-4-20250514")
            .await
            .unwrap();
    assert!(strategy.estimated_tokens > 0);

    let reply = model.chat(messages, None).await.unwrap();
    assert!(reply.content.to_lowercase().contains("teal"));
}
