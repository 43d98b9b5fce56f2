//! Memory tools.
//!
//! - [`AddMemoryTool`] - Store a memory for the current user
//! - [`SearchMemoriesTool`] - Search the current user's memories
//!
//! Both are scoped to one user at construction time. Neither ever returns
//! `Err`: service failures become error results the agent can read and move
//! past.

use super::Tool;
use crate::client::{MemoryHit, SupermemoryClient};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use infichat_core::types::{ToolDefinition, ToolGroup, ToolResult};
use serde::{Deserialize, Serialize};
use std::slice;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default metadata source tag.
const DEFAULT_SOURCE: &str = "infichat";

/// Result of an `addMemory` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AddMemoryOutcome {
    /// The service accepted the memory.
    Stored {
        #[serde(rename = "memoryId")]
        memory_id: String,
        status: String,
    },

    /// The memory was not stored.
    Failed { error: String },
}

impl AddMemoryOutcome {
    fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Whether the memory was stored.
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }

    /// Failure message, when not stored.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Stored { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// AddMemoryTool
// ---------------------------------------------------------------------------

/// Store a memory for a fixed user.
pub struct AddMemoryTool {
    client: Arc<SupermemoryClient>,
    user_id: String,
    source: String,
}

impl AddMemoryTool {
    /// Create a tool scoped to `user_id`.
    pub fn new(client: Arc<SupermemoryClient>, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    /// Set the source tag recorded in metadata.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }


    /// Store `content` for the user. Never fails; see [`AddMemoryOutcome`].
    pub async fn add_memory(&self, content: &str) -> AddMemoryOutcome {
        if content.trim().is_empty() {
            return AddMemoryOutcome::failed("Memory content cannot be empty");
        }

        let metadata = serde_json::json!({
            "source": self.source,
            "timestamp": Utc::now().to_rfc3339(),
        });

        match self
            .client
            .add(content, slice::from_ref(&self.user_id), &metadata)
            .await
        {
            Ok(record) => {
                info!(
                    memory_id = %record.id,
                    status = %record.status,
                    user_id = %self.user_id,
                    "Memory stored"
                );
                AddMemoryOutcome::Stored {
                    memory_id: record.id,
                    status: record.status,
                }
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Failed to store memory");
                AddMemoryOutcome::failed(format!("Failed to store memory: {}", e))
            }
        }
    }
}

#[async_trait]
impl Tool for AddMemoryTool {
    fn name(&self) -> &str {
        "addMemory"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Store a fact, preference or detail about the user so it can be \
                          recalled in later conversations"
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "The memory to store, written as a standalone statement"
                    }
                },
                "required": ["content"]
            }),
        }
    }

    async fn execute(&self, tool_use_id: &str, args: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let Some(content) = args.get("content").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::error(tool_use_id, "Missing 'content' argument")
                .with_duration(start.elapsed()));
        };

        let outcome = self.add_memory(content).await;
        let mut result = ToolResult::success(
            tool_use_id,
            serde_json::to_value(&outcome).unwrap_or_default(),
        );
        result.is_error = !outcome.is_stored();

        Ok(result.with_duration(start.elapsed()))
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Memory
    }
}

// ---------------------------------------------------------------------------
// SearchMemoriesTool
// ---------------------------------------------------------------------------

/// Search a fixed user's memories.
pub struct SearchMemoriesTool {
    client: Arc<SupermemoryClient>,
    user_id: String,
    limit: usize,
}

impl SearchMemoriesTool {
    /// Create a tool scoped to `user_id`.
    pub fn new(client: Arc<SupermemoryClient>, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            limit: 5,
        }
    }

    /// Set the default number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }
}

fn hit_to_json(hit: &MemoryHit) -> serde_json::Value {
    let content: Vec<&str> = hit.chunks.iter().map(|c| c.content.as_str()).collect();
    serde_json::json!({
        "documentId": hit.document_id,
        "title": hit.title,
        "score": hit.score,
        "content": content.join("\n"),
    })
}

#[async_trait]
impl Tool for SearchMemoriesTool {
    fn name(&self) -> &str {
        "searchMemories"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Search previously stored memories about the user".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look for"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 5)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, tool_use_id: &str, args: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let query = match args.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q,
            _ => {
                return Ok(ToolResult::error(tool_use_id, "Missing 'query' argument")
                    .with_duration(start.elapsed()))
            }
        };

        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|l| (l as usize).max(1))
            .unwrap_or(self.limit);

        debug!(query, limit, user_id = %self.user_id, "Memory search");

        let result = match self
            .client
            .search(query, slice::from_ref(&self.user_id), limit)
            .await
        {
            Ok(hits) => {
                let results: Vec<serde_json::Value> = hits.iter().map(hit_to_json).collect();
                ToolResult::success(
                    tool_use_id,
                    serde_json::json!({
                        "query": query,
                        "count": results.len(),
                        "results": results,
                    }),
                )
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Memory search failed");
                ToolResult::error(tool_use_id, format!("Memory search failed: {}", e))
            }
        };

        Ok(result.with_duration(start.elapsed()))
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Memory
    }
}
