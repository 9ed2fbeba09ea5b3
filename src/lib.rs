//! agentkernel - hook-driven agent kernel
//!
//! An extensible runtime that drives a conversational agent loop against
//! pluggable LLM providers. Third-party modules attach at defined extension
//! points:
//!
//! - [`hooks`]: handlers that observe, veto, transform or pause execution
//! - [`providers`]: the provider contract plus retry, backoff and repair
//! - [`agent`]: the orchestrator loop interleaving LLM turns and tools
//! - [`session`]: per-run history, event log and snapshots
//! - [`coordinator`]: per-session extension state and the module registry

pub mod agent;
pub mod cancellation;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod hooks;
pub mod providers;
pub mod session;
pub mod tools;
pub mod utils;

pub use agent::{AgentLoop, LoopOutcome, LoopState};
pub use cancellation::CancellationToken;
pub use config::Config;
pub use coordinator::{Coordinator, HookModule, ModuleRegistry};
pub use error::{ErrorKind, KernelError, ProviderError, ProviderFailure, Result};
pub use hooks::{HookAction, HookRegistry, HookResult};
pub use providers::{
    ChatOptions, LLMProvider, LLMResponse, LLMToolCall, ResilientProvider, ToolDefinition, Usage,
};
pub use session::{Message, Role, Session, ToolCall};
pub use tools::{Tool, ToolContext, ToolOutput, ToolRegistry};
