//! Tools module - Tool definitions and execution for LLM function calling
//!
//! - `Tool` trait: The interface that all tools must implement
//! - `ToolContext`: Execution context (session, cancellation, hooks)
//! - `ToolRegistry`: Registry for looking up and executing tools
//!
//! Concrete tools are supplied by modules; `EchoTool` ships for smoke
//! testing the loop end to end.

mod registry;
mod types;

pub use registry::ToolRegistry;
pub use types::{Tool, ToolContext, ToolOutput};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Echoes back the `message` argument.
///
/// # Example
///
/// ```rust
/// use agentkernel::tools::{EchoTool, Tool, ToolContext};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let out = EchoTool
///     .execute(json!({"message": "Hello"}), &ToolContext::detached())
///     .await
///     .unwrap();
/// assert_eq!(out.for_llm, "Hello");
/// # });
/// ```
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the provided message"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo"
                }
            },
            "required": ["message"]
        })
    }

    fn idempotent(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let message = args
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("(no message)");
        Ok(ToolOutput::llm_only(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_echo_tool_parameters() {
        let params = EchoTool.parameters();
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["message"]["type"], "string");
    }

    #[tokio::test]
    async fn test_echo_tool_execute_no_message() {
        let out = EchoTool
            .execute(json!({}), &ToolContext::detached())
            .await
            .unwrap();
        assert_eq!(out.for_llm, "(no message)");
    }

    #[tokio::test]
    async fn test_echo_tool_execute_null_message() {
        let out = EchoTool
            .execute(json!({"message": null}), &ToolContext::detached())
            .await
            .unwrap();
        assert_eq!(out.for_llm, "(no message)");
    }
}
