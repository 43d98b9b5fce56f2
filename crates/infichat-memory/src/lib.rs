//! Hosted memory for infichat.
//!
//! Storage, retrieval and ranking all happen in the Supermemory service; this
//! crate provides the HTTP client and the agent tools built on it:
//!
//! - [`SupermemoryClient`] - add and search memories over HTTP
//! - [`tools::AddMemoryTool`] - store a memory for a user
//! - [`tools::SearchMemoriesTool`] - search a user's memories
//!
//! Tool invocations never return an error to the agent loop; failures come
//! back as tagged results.

pub mod client;
pub mod error;
pub mod tools;

pub use client::{MemoryChunk, MemoryHit, MemoryRecord, SupermemoryClient};
pub use error::{MemoryError, Result};
pub use tools::{AddMemoryOutcome, AddMemoryTool, SearchMemoriesTool, Tool};
