//! Providers module - LLM provider contract and the resilience layer
//!
//! This module defines the `LLMProvider` trait implemented by vendor
//! adapters, and everything the kernel wraps around a provider call:
//!
//! - [`ResilientProvider`]: throttling, timeouts, retries with backoff
//! - [`error_classifier`]: raw failure to [`ErrorKind`](crate::error::ErrorKind)
//! - [`repair`]: tool-call sequence repair and validation
//!
//! # Example
//!
//! ```rust
//! use agentkernel::providers::{ChatOptions, ChatRequest, ToolDefinition};
//! use agentkernel::session::Message;
//! use serde_json::json;
//!
//! let request = ChatRequest::new(vec![Message::user("Hello!")])
//!     .with_tools(vec![ToolDefinition::new("echo", "Echo a message", json!({"type": "object"}))])
//!     .with_options(ChatOptions::new().with_max_tokens(1000));
//! assert_eq!(request.tools.len(), 1);
//! ```

pub mod error_classifier;
pub mod repair;
pub mod retry;
mod types;

pub use error_classifier::translate_failure;
pub use repair::{
    find_orphaned_tool_calls, repair_tool_sequence, validate_tool_sequence, OrphanedToolCall,
    RepairReport, TOOL_RESULT_MISSING_MARKER,
};
pub use retry::{ResilientProvider, RetryPolicy, ThrottlePolicy};
pub use types::{
    ChatOptions, ChatRequest, LLMProvider, LLMResponse, LLMToolCall, ToolDefinition, Usage,
};
