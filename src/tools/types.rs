//! Tool types
//!
//! This module defines the `Tool` trait that all tools implement and the
//! `ToolContext` handed to every execution.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::cancellation::CancellationToken;
use crate::error::Result;
use crate::hooks::HookRegistry;

/// Dual-audience tool result.
///
/// Separates what the LLM sees (`for_llm`) from what the user sees (`for_user`).
/// Tools that should be silent to the user set `for_user: None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Content sent to the LLM as the tool result. Always required.
    pub for_llm: String,
    /// Content sent to the user. `None` = silent (user sees nothing).
    pub for_user: Option<String>,
    /// Whether this result represents an error condition.
    pub is_error: bool,
}

impl ToolOutput {
    /// LLM-only result. User sees nothing.
    pub fn llm_only(content: impl Into<String>) -> Self {
        Self {
            for_llm: content.into(),
            for_user: None,
            is_error: false,
        }
    }

    /// Both LLM and user see the same content.
    pub fn user_visible(content: impl Into<String>) -> Self {
        let s = content.into();
        Self {
            for_llm: s.clone(),
            for_user: Some(s),
            is_error: false,
        }
    }

    /// Error result. LLM sees the error; user sees nothing by default.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            for_llm: content.into(),
            for_user: None,
            is_error: true,
        }
    }
}

/// Trait that all tools must implement.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use agentkernel::tools::{Tool, ToolContext, ToolOutput};
/// use agentkernel::error::Result;
///
/// struct MyTool;
///
/// #[async_trait]
/// impl Tool for MyTool {
///     fn name(&self) -> &str { "my_tool" }
///     fn description(&self) -> &str { "Does something useful" }
///     fn parameters(&self) -> Value {
///         serde_json::json!({"type": "object", "properties": {}, "required": []})
///     }
///     async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
///         Ok(ToolOutput::llm_only("Done!"))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the LLM uses to request this tool. Unique within a registry.
    fn name(&self) -> &str;

    /// Description sent to the LLM.
    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments.
    fn parameters(&self) -> Value;

    /// Whether running the tool twice with the same arguments is harmless.
    ///
    /// Defaults to `false`.
    fn idempotent(&self) -> bool {
        false
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

/// Context provided to tools during execution.
///
/// Carries the session's identity, its cancellation token, and its hook
/// registry so long-running tools can observe cancellation and emit their
/// own events.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub session_id: String,
    /// Id of the tool call being executed.
    pub call_id: Option<String>,
    pub cancellation: CancellationToken,
    pub hooks: Arc<HookRegistry>,
}

impl ToolContext {
    pub fn new(session_id: &str, cancellation: CancellationToken, hooks: Arc<HookRegistry>) -> Self {
        Self {
            session_id: session_id.to_string(),
            call_id: None,
            cancellation,
            hooks,
        }
    }

    /// A context not attached to any session.
    ///
    /// # Example
    /// ```
    /// use agentkernel::tools::ToolContext;
    ///
    /// let ctx = ToolContext::detached().with_call_id("call_1");
    /// assert_eq!(ctx.call_id.as_deref(), Some("call_1"));
    /// ```
    pub fn detached() -> Self {
        let hooks = Arc::new(HookRegistry::detached("detached"));
        Self::new("detached", CancellationToken::new(), hooks)
    }

    pub fn with_call_id(mut self, call_id: &str) -> Self {
        self.call_id = Some(call_id.to_string());
        self
    }
}
