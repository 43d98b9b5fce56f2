//! Context proxy routing against a mock proxy and upstream.
//!
//! One wiremock server plays both roles: token counting hits the upstream
//! path directly, replies go through `{proxy}/{upstream}/v1/messages`.

use infichat_core::config::ProxyConfig;
use infichat_core::Credentials;
use infichat_providers::proxy::{CONVERSATION_ID_HEADER, PROXY_KEY_HEADER, USER_ID_HEADER};
use infichat_providers::{Message, ProviderError, ProxyConfigurator};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "claude-sonnet-4-20250514";

fn proxy_config(server: &MockServer) -> ProxyConfig {
    ProxyConfig {
        proxy_url: format!("{}/v3", server.uri()),
        upstream_url: server.uri(),
        ..ProxyConfig::default()
    }
}

/// 500 alternating turns, roughly 250k tokens' worth of text.
fn long_history() -> Vec<Message> {
    let filler = "The quick brown fox jumps over the lazy dog. ".repeat(45);
    (0..500)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("Turn {i}: {filler}"))
            } else {
                Message::assistant(format!("Reply {i}: {filler}"))
            }
        })
        .collect()
}

#[tokio::test]
async fn test_long_conversation_is_forwarded_untruncated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages/count_tokens"))
        .and(header("x-api-key", "ant-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"input_tokens": 250_000})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v3/.+/v1/messages$"))
        .and(header(PROXY_KEY_HEADER, "sm-key"))
        .and(header(CONVERSATION_ID_HEADER, "conv-long"))
        .and(header(USER_ID_HEADER, "user-long"))
        .and(header("x-api-key", "ant-key"))
        .and(body_partial_json(serde_json::json!({
            "model": MODEL,
            "thinking": {"type": "enabled", "budget_tokens": 10_000}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "msg_long",
            "model": MODEL,
            "content": [
                {"type": "thinking", "thinking": "Recalling turn 0.", "signature": "sig"},
                {"type": "text", "text": "Your first message was about a fox."}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 250_000, "output_tokens": 12}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let history = long_history();
    let configurator = ProxyConfigurator::new(proxy_config(&server))
        .with_credentials(Credentials::new("sm-key", "ant-key"));

    let round_trip = async {
        let (model, messages, strategy) = configurator
            .configure(&history, "conv-long", "user-long", MODEL)
            .await
            .unwrap();

        assert_eq!(messages.len(), 500);
        assert_eq!(messages, history.as_slice());
        assert!(strategy.estimated_tokens > 200_000);
        assert!(strategy.use_supermemory_proxy);
        assert!(strategy.use_extended_thinking);

        model.chat(messages, None).await.unwrap()
    };

    let reply = tokio::time::timeout(Duration::from_secs(60), round_trip)
        .await
        .expect("round trip exceeded 60 seconds");

    assert_eq!(reply.content, "Your first message was about a fox.");
    assert_eq!(reply.thinking.as_deref(), Some("Recalling turn 0."));

    let requests = server.received_requests().await.unwrap();
    let proxied = requests
        .iter()
        .find(|r| r.url.path().starts_with("/v3/"))
        .expect("no request reached the proxy");
    let body: serde_json::Value = proxied.body_json().unwrap();
    let turns = body["messages"].as_array().unwrap();
    assert_eq!(turns.len(), 500);
    assert_eq!(turns[0]["role"], "user");
    assert!(turns[0]["content"].as_str().unwrap().starts_with("Turn 0: "));
    assert_eq!(turns[499]["role"], "assistant");
    assert!(turns[499]["content"].as_str().unwrap().starts_with("Reply 499: "));
}

#[tokio::test]
async fn test_unencodable_scope_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let configurator = ProxyConfigurator::new(proxy_config(&server))
        .with_credentials(Credentials::new("sm-key", "ant-key"));

    let history = vec![Message::user("hello")];
    let err = configurator
        .configure(&history, "conv\r\n1", "user-1", MODEL)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_missing_proxy_key_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let configurator = ProxyConfigurator::new(proxy_config(&server))
        .with_credentials(Credentials::default().with_anthropic_key("ant-key"));

    let history = vec![Message::user("hello")];
    let err = configurator
        .configure(&history, "conv-1", "user-1", MODEL)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Config(_)));
    assert!(err.to_string().contains("SUPERMEMORY_API_KEY"));
}

#[tokio::test]
async fn test_token_count_failure_is_propagated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages/count_tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "type": "error",
            "error": {"type": "authentication_error", "message": "invalid x-api-key"}
        })))
        .mount(&server)
        .await;

    let configurator = ProxyConfigurator::new(proxy_config(&server))
        .with_credentials(Credentials::new("sm-key", "bad-key"));

    let history = vec![Message::user("hello")];
    let err = configurator
        .configure(&history, "conv-1", "user-1", MODEL)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Authentication(_)));
}

#[tokio::test]
async fn test_conversations_are_scoped_independently() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages/count_tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"input_tokens": 5})))
        .mount(&server)
        .await;

    let configurator = ProxyConfigurator::new(proxy_config(&server))
        .with_credentials(Credentials::new("sm-key", "ant-key"));
    let history = vec![Message::user("hello")];

    let (first, _, _) = configurator
        .configure(&history, "conv-a", "user-1", MODEL)
        .await
        .unwrap();
    let (second, _, _) = configurator
        .configure(&history, "conv-b", "user-2", MODEL)
        .await
        .unwrap();

    assert_eq!(first.scope().conversation_id, "conv-a");
    assert_eq!(second.scope().conversation_id, "conv-b");
    assert_eq!(
        second.provider().extra_headers().get(USER_ID_HEADER).unwrap(),
        "user-2"
    );
    assert_eq!(first.base_url(), second.base_url());
}
