//! Agent tools backed by the memory service.
//!
//! - [`Tool`] trait implemented by every tool
//! - [`AddMemoryTool`] / [`SearchMemoriesTool`]

mod memory;

pub use memory::{AddMemoryOutcome, AddMemoryTool, SearchMemoriesTool};

use crate::Result;
use async_trait::async_trait;
use infichat_core::types::{ToolDefinition, ToolGroup, ToolResult};

/// A tool an agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get the tool definition advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with JSON arguments.
    async fn execute(&self, tool_use_id: &str, args: serde_json::Value) -> Result<ToolResult>;

    /// Get the tool group.
    fn group(&self) -> ToolGroup {
        ToolGroup::Custom
    }
}
