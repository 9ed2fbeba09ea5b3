//! Agent module - the orchestrator loop
//!
//! The agent drives one prompt to a final response:
//!
//! - Running the prompt past `prompt:submit` hooks
//! - Requesting completions through the resilient provider
//! - Letting hooks veto, rewrite or annotate each tool call
//! - Executing tools and feeding results back to the LLM
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌───────────────────┐
//! │   Session   │────>│  AgentLoop  │────>│ ResilientProvider │
//! │  (history)  │     │             │     │  (retry, repair)  │
//! └─────────────┘     └─────────────┘     └───────────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │ HookRegistry│     │    Tools    │
//!                     │  (events)   │     │  Registry   │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use agentkernel::agent::AgentLoop;
//! use agentkernel::config::Config;
//! use agentkernel::session::Session;
//! use agentkernel::tools::{EchoTool, ToolRegistry};
//!
//! async fn run_agent() {
//!     let mut tools = ToolRegistry::new();
//!     tools.register(Arc::new(EchoTool));
//!
//!     let agent = AgentLoop::from_config(Arc::new(my_provider), tools, &Config::default());
//!     let mut session = Session::new();
//!     let outcome = agent.run(&mut session, "Say hello").await.unwrap();
//!     println!("{}", outcome.response);
//! }
//! ```

mod r#loop;
mod state;

pub use r#loop::AgentLoop;
pub use state::{LoopOutcome, LoopState, TRUNCATION_MARKER};
