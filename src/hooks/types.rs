//! Hook result types.
//!
//! A handler answers every event with a [`HookResult`]: exactly one
//! [`HookAction`] plus optional side-channel fields that do not affect
//! control flow.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KernelError, Result};
use crate::session::Role;

// ---------------------------------------------------------------------------
// Context injection
// ---------------------------------------------------------------------------

/// Text a hook wants added to the conversation.
///
/// Injections are queued while an event is dispatched and applied by the
/// orchestrator once `emit` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextInjection {
    pub text: String,
    /// Role of the injected message. Defaults to `system`.
    pub role: Role,
    /// Send with the next provider request only; never stored in history.
    pub ephemeral: bool,
    /// Append to the most recent tool result instead of adding a message.
    pub append_to_last_tool_result: bool,
}

impl ContextInjection {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: Role::System,
            ephemeral: false,
            append_to_last_tool_result: false,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn append_to_last_tool_result(mut self) -> Self {
        self.append_to_last_tool_result = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Approval
// ---------------------------------------------------------------------------

/// What an unanswered approval request resolves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDefault {
    Allow,
    #[default]
    Deny,
}

/// A user's answer to an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Allow,
    Deny,
}

impl From<ApprovalDefault> for ApprovalDecision {
    fn from(default: ApprovalDefault) -> Self {
        match default {
            ApprovalDefault::Allow => ApprovalDecision::Allow,
            ApprovalDefault::Deny => ApprovalDecision::Deny,
        }
    }
}

/// A request for the user to approve or reject the in-flight operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    pub prompt: String,
    pub options: Vec<String>,
    /// Overrides the configured approval timeout.
    pub timeout: Option<Duration>,
    /// Overrides the configured approval default.
    pub default: Option<ApprovalDefault>,
}

impl ApprovalRequest {
    /// Create an approval request.
    ///
    /// # Errors
    /// Returns [`KernelError::Hook`] if `prompt` is empty or whitespace.
    pub fn new(prompt: impl Into<String>) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(KernelError::Hook(
                "ask_user requires a non-empty prompt".to_string(),
            ));
        }
        Ok(Self {
            prompt,
            options: vec!["Allow".to_string(), "Deny".to_string()],
            timeout: None,
            default: None,
        })
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_default(mut self, default: ApprovalDefault) -> Self {
        self.default = Some(default);
        self
    }
}

// ---------------------------------------------------------------------------
// Hook action / result
// ---------------------------------------------------------------------------

/// The single control action a handler returns.
#[derive(Debug, Clone, PartialEq)]
pub enum HookAction {
    /// No effect; the next handler runs.
    Continue,
    /// Veto the operation. Stops dispatch immediately.
    Deny { reason: String },
    /// Replace the event payload for the remaining handlers and the caller.
    Modify { data: Value },
    /// Queue text to be added to the conversation.
    InjectContext(ContextInjection),
    /// Pause until the user approves or the approval times out.
    AskUser(ApprovalRequest),
}

impl HookAction {
    pub fn name(&self) -> &'static str {
        match self {
            HookAction::Continue => "continue",
            HookAction::Deny { .. } => "deny",
            HookAction::Modify { .. } => "modify",
            HookAction::InjectContext(_) => "inject_context",
            HookAction::AskUser(_) => "ask_user",
        }
    }
}

/// Severity of a message shown to the user alongside a hook result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserMessageLevel {
    #[default]
    Info,
    Warning,
    Error,
}

/// Outcome of a hook handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HookResult {
    pub action: HookAction,
    /// Hide the operation's output from the user.
    pub suppress_output: bool,
    /// Message to surface to the user, independent of the action.
    pub user_message: Option<String>,
    pub user_message_level: UserMessageLevel,
    /// Data contributed to `emit_and_collect`, independent of the action.
    pub data: Option<Value>,
}

impl Default for HookResult {
    fn default() -> Self {
        Self::from_action(HookAction::Continue)
    }
}

impl HookResult {
    fn from_action(action: HookAction) -> Self {
        Self {
            action,
            suppress_output: false,
            user_message: None,
            user_message_level: UserMessageLevel::Info,
            data: None,
        }
    }

    /// Let the operation proceed unchanged.
    pub fn proceed() -> Self {
        Self::from_action(HookAction::Continue)
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self::from_action(HookAction::Deny {
            reason: reason.into(),
        })
    }

    pub fn modify(data: Value) -> Self {
        Self::from_action(HookAction::Modify { data })
    }

    pub fn inject(injection: ContextInjection) -> Self {
        Self::from_action(HookAction::InjectContext(injection))
    }

    pub fn ask_user(request: ApprovalRequest) -> Self {
        Self::from_action(HookAction::AskUser(request))
    }

    pub fn with_user_message(mut self, message: impl Into<String>, level: UserMessageLevel) -> Self {
        self.user_message = Some(message.into());
        self.user_message_level = level;
        self
    }

    pub fn suppress_output(mut self) -> Self {
        self.suppress_output = true;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_denied(&self) -> bool {
        matches!(self.action, HookAction::Deny { .. })
    }

    pub fn denial_reason(&self) -> Option<&str> {
        match &self.action {
            HookAction::Deny { reason } => Some(reason),
            _ => None,
        }
    }

    /// The payload produced by a `Modify`, if any.
    pub fn modified_payload(&self) -> Option<&Value> {
        match &self.action {
            HookAction::Modify { data } => Some(data),
            _ => None,
        }
    }

    /// What this result contributes to `emit_and_collect`.
    pub fn collected_data(&self) -> Option<&Value> {
        self.modified_payload().or(self.data.as_ref())
    }
}
