//! Hook/event kernel.
//!
//! Independently authored handlers observe, veto, transform, or pause agent
//! execution by registering against named events.
//!
//! - [`HookRegistry`]: per-session registration and dispatch
//! - [`events`]: canonical event names and pattern matching
//! - [`HookResult`] / [`HookAction`]: what a handler answers
//! - [`ActionResolver`]: turns `AskUser` into a decision and applies
//!   context injections
//!
//! # Example
//!
//! ```rust
//! use agentkernel::hooks::{events, HookRegistry, HookResult};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let hooks = HookRegistry::detached("session-1");
//! hooks.register_fn(events::TOOL_PRE, 100, Some("no-shell"), |_event, payload| {
//!     if payload["tool_name"] == "shell" {
//!         Ok(HookResult::deny("Shell is disabled in this workspace"))
//!     } else {
//!         Ok(HookResult::proceed())
//!     }
//! });
//!
//! let result = hooks
//!     .emit(events::TOOL_PRE, json!({"tool_name": "shell", "arguments": {}}))
//!     .await
//!     .unwrap();
//! assert!(result.is_denied());
//! # });
//! ```

pub mod events;
mod registry;
mod resolver;
mod types;

pub use registry::{FnHook, HookContext, HookHandle, HookHandler, HookRegistry};
pub use resolver::{apply_injections, ActionResolver, ApprovalProvider};
pub use types::{
    ApprovalDecision, ApprovalDefault, ApprovalRequest, ContextInjection, HookAction, HookResult,
    UserMessageLevel,
};
