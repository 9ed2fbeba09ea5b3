//! Agent loop implementation
//!
//! This module provides the orchestrator loop that interleaves LLM turns
//! with tool execution under hook control.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{AgentDefaults, Config};
use crate::coordinator::Coordinator;
use crate::error::{KernelError, Result};
use crate::hooks::{apply_injections, events, HookRegistry, HookResult};
use crate::providers::{ChatOptions, LLMProvider, ResilientProvider};
use crate::session::{Message, Session, ToolCall};
use crate::tools::ToolRegistry;

use super::state::{LoopOutcome, LoopState, StateTracker, TRUNCATION_MARKER};

/// The orchestrator loop: drives one prompt to a final response.
///
/// The `AgentLoop` is responsible for:
/// - Running the prompt past `prompt:submit` hooks
/// - Requesting completions through the [`ResilientProvider`]
/// - Letting hooks veto or rewrite each proposed tool call
/// - Executing tools and feeding results back to the LLM
/// - Stopping at the iteration limit or on cancellation
///
/// # Example
///
/// ```rust,ignore
/// use agentkernel::agent::AgentLoop;
/// use agentkernel::config::Config;
/// use agentkernel::session::Session;
///
/// let agent = AgentLoop::from_config(Arc::new(my_provider), tools, &Config::default());
/// let mut session = Session::new();
/// let outcome = agent.run(&mut session, "What's in this directory?").await?;
/// println!("{}", outcome.response);
/// ```
pub struct AgentLoop {
    provider: ResilientProvider,
    tools: ToolRegistry,
    config: AgentDefaults,
    options: ChatOptions,
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("provider", &self.provider)
            .field("tools", &self.tools.names())
            .field("max_iterations", &self.config.max_iterations)
            .finish()
    }
}

/// Working state of one run.
struct RunState {
    states: StateTracker,
    ephemeral: Vec<Message>,
    notices: Vec<String>,
    iterations: u32,
}

/// How the run reached `Completed`.
struct Finish {
    response: String,
    truncated: bool,
    denied: Option<String>,
}

impl AgentLoop {
    pub fn new(provider: ResilientProvider, tools: ToolRegistry, config: AgentDefaults) -> Self {
        let options = config.chat_options();
        Self {
            provider,
            tools,
            config,
            options,
        }
    }

    /// Build a loop from the full configuration.
    pub fn from_config(provider: Arc<dyn LLMProvider>, tools: ToolRegistry, config: &Config) -> Self {
        let provider = ResilientProvider::from_config(provider, &config.retry)
            .with_model(config.agent.model.clone());
        Self::new(provider, tools, config.agent.clone())
    }

    pub fn provider(&self) -> &ResilientProvider {
        &self.provider
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// `None` when unlimited. A limit of `0` allows no completion requests.
    fn iteration_limit(&self) -> Option<u32> {
        u32::try_from(self.config.max_iterations).ok()
    }

    /// Drive `prompt` to a final response within `session`.
    ///
    /// Cancellation is not an error: the outcome has `cancelled = true`.
    ///
    /// # Errors
    /// Terminal provider failures ([`KernelError::Provider`]), history
    /// invariant violations, and tool failures other than those reported
    /// back to the LLM.
    pub async fn run(&self, session: &mut Session, prompt: &str) -> Result<LoopOutcome> {
        let span = info_span!("agent_run", session = %session.id());
        self.run_inner(session, prompt).instrument(span).await
    }

    async fn run_inner(&self, session: &mut Session, prompt: &str) -> Result<LoopOutcome> {
        let coordinator = session.coordinator().clone();
        let hooks = Arc::clone(coordinator.hooks());
        let mut run = RunState {
            states: StateTracker::new(),
            ephemeral: Vec::new(),
            notices: Vec::new(),
            iterations: 0,
        };

        // A previous turn's cancellation must not leak into this one.
        if coordinator.cancellation().reset() {
            debug!("Re-armed cancellation token from previous run");
        }

        hooks
            .notify(
                events::SESSION_START,
                json!({
                    "session_id": session.id(),
                    "message_count": session.history.len(),
                }),
            )
            .await;

        let (finish, cancelled) = match self.drive(session, prompt, &coordinator, &mut run).await {
            Ok(finish) => (finish, false),
            Err(e) if e.is_cancelled() => {
                self.unwind_cancelled(&coordinator, &mut run).await;
                let finish = Finish {
                    response: String::new(),
                    truncated: false,
                    denied: None,
                };
                (finish, true)
            }
            Err(e) => {
                warn!(error = %e, iterations = run.iterations, "Agent run failed");
                hooks
                    .notify(
                        events::SESSION_END,
                        json!({
                            "session_id": session.id(),
                            "iterations": run.iterations,
                            "error": e.summary(),
                        }),
                    )
                    .await;
                return Err(e);
            }
        };

        if run.states.current() != LoopState::Completed {
            run.states.advance(LoopState::Completed);
        }

        info!(
            iterations = run.iterations,
            truncated = finish.truncated,
            cancelled,
            "Agent run complete"
        );
        hooks
            .notify(
                events::ORCHESTRATOR_COMPLETE,
                json!({
                    "iterations": run.iterations,
                    "truncated": finish.truncated,
                    "cancelled": cancelled,
                }),
            )
            .await;
        hooks
            .notify(
                events::SESSION_END,
                json!({
                    "session_id": session.id(),
                    "iterations": run.iterations,
                }),
            )
            .await;

        Ok(LoopOutcome {
            response: finish.response,
            iterations: run.iterations,
            truncated: finish.truncated,
            cancelled,
            denied: finish.denied,
            notices: run.notices,
            transitions: run.states.into_visited(),
        })
    }

    async fn drive(
        &self,
        session: &mut Session,
        prompt: &str,
        coordinator: &Coordinator,
        run: &mut RunState,
    ) -> Result<Finish> {
        let hooks = coordinator.hooks();

        if session.history.is_empty() {
            if let Some(system) = self.config.system_prompt.as_deref() {
                session.history.push(Message::system(system));
            }
        }

        // AwaitingPrompt
        let submitted = hooks
            .emit(
                events::PROMPT_SUBMIT,
                json!({ "prompt": prompt, "session_id": session.id() }),
            )
            .await?;
        note(run, &submitted);
        if let Some(reason) = submitted.denial_reason() {
            info!(reason, "Prompt denied by hook");
            self.drain_injections(hooks, &mut session.history, run);
            run.states.advance(LoopState::Completed);
            return Ok(Finish {
                response: reason.to_string(),
                truncated: false,
                denied: Some(reason.to_string()),
            });
        }
        let prompt = submitted
            .modified_payload()
            .and_then(|p| p.get("prompt"))
            .and_then(Value::as_str)
            .unwrap_or(prompt);
        session.history.push(Message::user(prompt));
        self.drain_injections(hooks, &mut session.history, run);

        let mut last_content = String::new();
        loop {
            if let Some(limit) = self.iteration_limit() {
                if run.iterations >= limit {
                    warn!(
                        iterations = run.iterations,
                        limit, "Reached maximum iterations, truncating response"
                    );
                    run.states.advance(LoopState::Completed);
                    return Ok(Finish {
                        response: format!("{}{}", last_content, TRUNCATION_MARKER),
                        truncated: true,
                        denied: None,
                    });
                }
            }

            run.states.advance(LoopState::RequestingCompletion);
            coordinator.cancellation().check()?;

            let definitions = self.tools.definitions();
            let ephemeral = std::mem::take(&mut run.ephemeral);
            let response = self
                .provider
                .complete(
                    &mut session.history,
                    &ephemeral,
                    &definitions,
                    &self.options,
                    coordinator,
                )
                .await?;
            run.iterations += 1;
            session.iteration += 1;

            if !response.has_tool_calls() {
                session.history.push(Message::assistant(&response.content));
                run.states.advance(LoopState::Completed);
                return Ok(Finish {
                    response: response.content,
                    truncated: false,
                    denied: None,
                });
            }

            // SelectingTool: every call is vetted before the turn is recorded.
            run.states.advance(LoopState::SelectingTool);
            let mut calls = Vec::with_capacity(response.tool_calls.len());
            for proposed in &response.tool_calls {
                let selection = hooks
                    .emit(
                        events::TOOL_SELECTING,
                        json!({
                            "tool_name": proposed.name,
                            "tool_call_id": proposed.id,
                            "arguments": ToolCall::from(proposed.clone()).arguments_value(),
                        }),
                    )
                    .await?;
                note(run, &selection);

                if let Some(reason) = selection.denial_reason() {
                    info!(tool = %proposed.name, reason, "Tool selection vetoed, ending turn");
                    session.history.push(Message::assistant(&response.content));
                    self.drain_injections(hooks, &mut session.history, run);
                    run.states.advance(LoopState::Completed);
                    return Ok(Finish {
                        response: response.content,
                        truncated: false,
                        denied: None,
                    });
                }
                calls.push(selected_call(proposed.clone().into(), selection.modified_payload()));
            }
            session
                .history
                .push(Message::assistant_with_tools(&response.content, calls.clone()));

            run.states.advance(LoopState::ExecutingTool);
            for call in &calls {
                coordinator.cancellation().check()?;
                let result = self.execute_tool(call, coordinator, run).await?;
                session.history.push(Message::tool_result(&call.id, &result));
            }
            self.drain_injections(hooks, &mut session.history, run);
            last_content = response.content;
        }
    }

    /// Run one tool call through `tool:pre`, the tool, and `tool:post`.
    ///
    /// Returns the content recorded as the tool result. Denials and tool
    /// failures become results the LLM can read.
    async fn execute_tool(
        &self,
        call: &ToolCall,
        coordinator: &Coordinator,
        run: &mut RunState,
    ) -> Result<String> {
        let hooks = coordinator.hooks();
        let args = call.arguments_value();

        let pre = hooks
            .emit(
                events::TOOL_PRE,
                json!({
                    "tool_name": call.name,
                    "tool_call_id": call.id,
                    "arguments": args,
                }),
            )
            .await?;
        note(run, &pre);
        if let Some(reason) = pre.denial_reason() {
            info!(tool = %call.name, reason, "Tool execution denied by hook");
            return Ok(format!("Tool '{}' was denied: {}", call.name, reason));
        }
        let args = pre
            .modified_payload()
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or(args);

        let ctx = coordinator.tool_context().with_call_id(&call.id);
        debug!(tool = %call.name, id = %call.id, "Executing tool");
        match self.tools.execute(&call.name, args, &ctx).await {
            Ok(output) => {
                let post = hooks
                    .emit(
                        events::TOOL_POST,
                        json!({
                            "tool_name": call.name,
                            "tool_call_id": call.id,
                            "result": output.for_llm,
                            "is_error": output.is_error,
                        }),
                    )
                    .await?;
                note(run, &post);
                if let Some(user) = output.for_user {
                    run.notices.push(user);
                }
                let result = post
                    .modified_payload()
                    .and_then(|p| p.get("result"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or(output.for_llm);
                Ok(result)
            }
            Err(KernelError::Cancelled) => Err(KernelError::Cancelled),
            Err(e) => {
                hooks
                    .notify(
                        events::TOOL_ERROR,
                        json!({
                            "tool_name": call.name,
                            "tool_call_id": call.id,
                            "error": e.to_string(),
                        }),
                    )
                    .await;
                Ok(format!("Error: {}", e))
            }
        }
    }

    fn drain_injections(&self, hooks: &HookRegistry, history: &mut Vec<Message>, run: &mut RunState) {
        let injections = hooks.take_injections();
        if injections.is_empty() {
            return;
        }
        let applied = apply_injections(history, &mut run.ephemeral, injections);
        debug!(applied, "Applied context injections");
    }

    async fn unwind_cancelled(&self, coordinator: &Coordinator, run: &mut RunState) {
        let hooks = coordinator.hooks();
        info!(state = %run.states.current(), "Cancellation observed, unwinding");
        run.states.advance(LoopState::Cancelling);
        hooks
            .notify(
                events::CANCEL_REQUESTED,
                json!({ "state": run.states.current().as_str(), "iterations": run.iterations }),
            )
            .await;
        coordinator.cancellation().mark_completed();
        hooks
            .notify(
                events::CANCEL_COMPLETED,
                json!({ "iterations": run.iterations }),
            )
            .await;
        run.states.advance(LoopState::Completed);
    }
}

/// Apply a `tool:selecting` modification to a proposed call.
fn selected_call(mut call: ToolCall, modified: Option<&Value>) -> ToolCall {
    let Some(payload) = modified else {
        return call;
    };
    if let Some(name) = payload.get("tool_name").and_then(Value::as_str) {
        call.name = name.to_string();
    }
    if let Some(arguments) = payload.get("arguments") {
        call.arguments = match arguments {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };
    }
    call
}

fn note(run: &mut RunState, result: &HookResult) {
    if let Some(message) = &result.user_message {
        run.notices.push(message.clone());
    }
}
