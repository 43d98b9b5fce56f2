//! Memory tools against a mock Supermemory service.

use infichat_memory::{AddMemoryOutcome, AddMemoryTool, SearchMemoriesTool, SupermemoryClient, Tool};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> Arc<SupermemoryClient> {
    Arc::new(
        SupermemoryClient::new("sm-key")
            .unwrap()
            .with_base_url(server.uri()),
    )
}

#[tokio::test]
async fn test_remember_then_recall() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/memories"))
        .and(header("authorization", "Bearer sm-key"))
        .and(body_partial_json(serde_json::json!({
            "content": "Prefers window seats",
            "containerTags": ["user-9"],
            "metadata": {"source": "infichat"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "mem_9",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/search"))
        .and(body_partial_json(serde_json::json!({
            "q": "seat preference",
            "containerTags": ["user-9"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "documentId": "mem_9",
                "score": 0.93,
                "chunks": [{"content": "Prefers window seats", "score": 0.9}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let add = AddMemoryTool::new(client.clone(), "user-9").with_source("infichat");
    let search = SearchMemoriesTool::new(client, "user-9");

    let outcome = add.add_memory("Prefers window seats").await;
    assert_eq!(
        outcome,
        AddMemoryOutcome::Stored {
            memory_id: "mem_9".to_string(),
            status: "queued".to_string(),
        }
    );

    let result = search
        .execute("call_1", serde_json::json!({"query": "seat preference"}))
        .await
        .unwrap();
    assert!(!result.is_error);
    assert_eq!(result.output["count"], 1);
    assert_eq!(result.output["results"][0]["content"], "Prefers window seats");
}

#[tokio::test]
async fn test_service_failure_becomes_failed_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/memories"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "storage offline"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tool = AddMemoryTool::new(client(&server), "user-9");

    let result = tool
        .execute("call_2", serde_json::json!({"content": "Has a dog named Rex"}))
        .await
        .unwrap();

    assert!(result.is_error);
    assert_eq!(result.output["outcome"], "failed");
    assert!(result.output["error"]
        .as_str()
        .unwrap()
        .contains("storage offline"));
}
