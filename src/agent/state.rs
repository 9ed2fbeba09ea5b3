//! Orchestrator loop states and the outcome of a run.

use std::fmt;

use serde::Serialize;
use tracing::debug;

/// Appended to the response when the iteration limit stops the loop.
pub const TRUNCATION_MARKER: &str = "\n\n[Response truncated: maximum iterations reached]";

/// States of one orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingPrompt,
    RequestingCompletion,
    SelectingTool,
    ExecutingTool,
    Cancelling,
    Completed,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::AwaitingPrompt => "awaiting_prompt",
            LoopState::RequestingCompletion => "requesting_completion",
            LoopState::SelectingTool => "selecting_tool",
            LoopState::ExecutingTool => "executing_tool",
            LoopState::Cancelling => "cancelling",
            LoopState::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == LoopState::Completed
    }

    /// Whether the loop may move from `self` to `next`.
    ///
    /// `Cancelling` is reachable from every non-terminal state.
    pub fn can_transition_to(&self, next: LoopState) -> bool {
        use LoopState::*;
        if next == Cancelling {
            return !matches!(self, Completed | Cancelling);
        }
        matches!(
            (self, next),
            (AwaitingPrompt, RequestingCompletion)
                | (AwaitingPrompt, Completed)
                | (RequestingCompletion, SelectingTool)
                | (RequestingCompletion, Completed)
                | (SelectingTool, ExecutingTool)
                | (SelectingTool, Completed)
                | (ExecutingTool, RequestingCompletion)
                | (ExecutingTool, Completed)
                | (Cancelling, Completed)
        )
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records the states a run passes through.
#[derive(Debug)]
pub(crate) struct StateTracker {
    current: LoopState,
    visited: Vec<LoopState>,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: LoopState::AwaitingPrompt,
            visited: vec![LoopState::AwaitingPrompt],
        }
    }

    pub(crate) fn current(&self) -> LoopState {
        self.current
    }

    pub(crate) fn advance(&mut self, next: LoopState) {
        if !self.current.can_transition_to(next) {
            debug!(from = %self.current, to = %next, "Unexpected loop transition");
        }
        debug!(from = %self.current, to = %next, "Loop transition");
        self.current = next;
        self.visited.push(next);
    }

    pub(crate) fn into_visited(self) -> Vec<LoopState> {
        self.visited
    }
}

/// Result of [`AgentLoop::run`](super::AgentLoop::run).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopOutcome {
    /// Final response text shown to the user.
    pub response: String,
    /// Completion requests made during this run.
    pub iterations: u32,
    /// The iteration limit stopped the loop.
    pub truncated: bool,
    /// The run ended because cancellation was requested.
    pub cancelled: bool,
    /// Reason, if a hook denied the prompt.
    pub denied: Option<String>,
    /// Messages for the user, in emission order: hook messages and
    /// user-facing tool output.
    pub notices: Vec<String>,
    /// Every state visited, starting with `AwaitingPrompt`.
    pub transitions: Vec<LoopState>,
}

impl LoopOutcome {
    pub fn visited(&self, state: LoopState) -> bool {
        self.transitions.contains(&state)
    }
}
