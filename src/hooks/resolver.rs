//! Action resolution.
//!
//! Turns the actions handlers return into effects on in-flight state:
//! `AskUser` is resolved into `Continue`/`Deny` through an
//! [`ApprovalProvider`], and queued [`ContextInjection`]s are applied to the
//! conversation history.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cancellation::CancellationToken;
use crate::error::Result;
use crate::session::Message;

use super::types::{ApprovalDecision, ApprovalDefault, ApprovalRequest, ContextInjection, HookAction};

/// Presents approval requests to a user and returns their decision.
#[async_trait]
pub trait ApprovalProvider: Send + Sync {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<ApprovalDecision>;
}

/// Resolves `AskUser` actions with a bounded wait.
pub struct ActionResolver {
    approval: RwLock<Option<Arc<dyn ApprovalProvider>>>,
    approval_timeout: Duration,
    approval_default: ApprovalDefault,
}

impl std::fmt::Debug for ActionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionResolver")
            .field("has_approval_provider", &self.provider().is_some())
            .field("approval_timeout", &self.approval_timeout)
            .field("approval_default", &self.approval_default)
            .finish()
    }
}

impl ActionResolver {
    pub fn new(approval_timeout: Duration, approval_default: ApprovalDefault) -> Self {
        Self {
            approval: RwLock::new(None),
            approval_timeout,
            approval_default,
        }
    }

    pub fn set_approval_provider(&self, provider: Arc<dyn ApprovalProvider>) {
        let mut slot = self.approval.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(provider);
    }

    fn provider(&self) -> Option<Arc<dyn ApprovalProvider>> {
        self.approval
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Block until the user answers `request` or its timeout elapses.
    ///
    /// Returns `Continue` or `Deny`. An unanswered or failed request
    /// resolves to the request's default, falling back to the configured
    /// default.
    ///
    /// # Errors
    /// Returns [`KernelError::Cancelled`](crate::error::KernelError::Cancelled)
    /// if the session is cancelled while waiting.
    pub async fn resolve_approval(
        &self,
        request: &ApprovalRequest,
        cancellation: &CancellationToken,
    ) -> Result<HookAction> {
        let timeout = request.timeout.unwrap_or(self.approval_timeout);
        let default = request.default.unwrap_or(self.approval_default);

        let Some(provider) = self.provider() else {
            warn!(
                prompt = %request.prompt,
                default = ?default,
                "No approval provider registered, applying default"
            );
            return Ok(decision_to_action(default.into(), request, "no approval provider"));
        };

        let wait = tokio::time::timeout(timeout, provider.request_approval(request));
        let action = match cancellation.run_until_cancelled(wait).await? {
            Ok(Ok(decision)) => {
                debug!(prompt = %request.prompt, decision = ?decision, "Approval answered");
                decision_to_action(decision, request, "user decision")
            }
            Ok(Err(e)) => {
                warn!(error = %e, default = ?default, "Approval request failed, applying default");
                decision_to_action(default.into(), request, "approval failed")
            }
            Err(_) => {
                info!(
                    timeout_secs = timeout.as_secs_f64(),
                    default = ?default,
                    "Approval timed out, applying default"
                );
                decision_to_action(default.into(), request, "approval timed out")
            }
        };
        Ok(action)
    }
}

fn decision_to_action(
    decision: ApprovalDecision,
    request: &ApprovalRequest,
    source: &str,
) -> HookAction {
    match decision {
        ApprovalDecision::Allow => HookAction::Continue,
        ApprovalDecision::Deny => HookAction::Deny {
            reason: format!("Approval denied ({}): {}", source, request.prompt),
        },
    }
}

/// Apply queued injections to the conversation.
///
/// Ephemeral injections go to `ephemeral` (sent with the next request only);
/// the rest are written to `history`. Returns the number applied.
pub fn apply_injections(
    history: &mut Vec<Message>,
    ephemeral: &mut Vec<Message>,
    injections: Vec<ContextInjection>,
) -> usize {
    let count = injections.len();
    for injection in injections {
        if injection.append_to_last_tool_result {
            if let Some(last) = history.last_mut().filter(|m| m.is_tool_result()) {
                last.content.push_str("\n\n");
                last.content.push_str(&injection.text);
                continue;
            }
            debug!("No trailing tool result to append to, injecting as a message");
        }

        let message = Message::new(injection.role, &injection.text);
        if injection.ephemeral {
            ephemeral.push(message);
        } else {
            history.push(message);
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;
    use crate::session::Role;

    struct FixedApproval(ApprovalDecision);

    #[async_trait]
    impl ApprovalProvider for FixedApproval {
        async fn request_approval(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision> {
            Ok(self.0)
        }
    }

    struct NeverAnswers;

    #[async_trait]
    impl ApprovalProvider for NeverAnswers {
        async fn request_approval(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision> {
            std::future::pending().await
        }
    }

    struct Broken;

    #[async_trait]
    impl ApprovalProvider for Broken {
        async fn request_approval(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision> {
            Err(KernelError::Hook("terminal detached".into()))
        }
    }

    fn resolver() -> ActionResolver {
        ActionResolver::new(Duration::from_secs(300), ApprovalDefault::Deny)
    }

    #[tokio::test]
    async fn test_user_allows() {
        let r = resolver();
        r.set_approval_provider(Arc::new(FixedApproval(ApprovalDecision::Allow)));
        let req = ApprovalRequest::new("Delete file?").unwrap();
        let action = r
            .resolve_approval(&req, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(action, HookAction::Continue);
    }

    #[tokio::test]
    async fn test_user_denies() {
        let r = resolver();
        r.set_approval_provider(Arc::new(FixedApproval(ApprovalDecision::Deny)));
        let req = ApprovalRequest::new("Delete file?").unwrap();
        let action = r
            .resolve_approval(&req, &CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(action, HookAction::Deny { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_applies_configured_default() {
        let r = resolver();
        r.set_approval_provider(Arc::new(NeverAnswers));
        let req = ApprovalRequest::new("Deploy?").unwrap();

        let start = tokio::time::Instant::now();
        let action = r
            .resolve_approval(&req, &CancellationToken::new())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(300));
        match action {
            HookAction::Deny { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected deny, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_honours_request_override() {
        let r = resolver();
        r.set_approval_provider(Arc::new(NeverAnswers));
        let req = ApprovalRequest::new("Deploy?")
            .unwrap()
            .with_timeout(Duration::from_secs(5))
            .with_default(ApprovalDefault::Allow);

        let action = r
            .resolve_approval(&req, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(action, HookAction::Continue);
    }

    #[tokio::test]
    async fn test_missing_provider_uses_default() {
        let r = ActionResolver::new(Duration::from_secs(1), ApprovalDefault::Allow);
        let req = ApprovalRequest::new("ok?").unwrap();
        let action = r
            .resolve_approval(&req, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(action, HookAction::Continue);
    }

    #[tokio::test]
    async fn test_failed_provider_uses_default() {
        let r = resolver();
        r.set_approval_provider(Arc::new(Broken));
        let req = ApprovalRequest::new("ok?").unwrap();
        let action = r
            .resolve_approval(&req, &CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(action, HookAction::Deny { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_wait() {
        let r = resolver();
        r.set_approval_provider(Arc::new(NeverAnswers));
        let token = CancellationToken::new();
        token.cancel();
        let req = ApprovalRequest::new("ok?").unwrap();
        let result = r.resolve_approval(&req, &token).await;
        assert!(matches!(result, Err(KernelError::Cancelled)));
    }

    #[test]
    fn test_apply_injections_routes_by_flags() {
        let mut history = vec![
            Message::user("run the tests"),
            Message::tool_result("call_1", "2 failed"),
        ];
        let mut ephemeral = Vec::new();

        let applied = apply_injections(
            &mut history,
            &mut ephemeral,
            vec![
                ContextInjection::new("see CONTRIBUTING.md").append_to_last_tool_result(),
                ContextInjection::new("remember: be brief").ephemeral(),
                ContextInjection::new("linter output").with_role(Role::User),
            ],
        );

        assert_eq!(applied, 3);
        assert_eq!(history.len(), 3);
        assert!(history[1].content.ends_with("see CONTRIBUTING.md"));
        assert_eq!(history[2].role, Role::User);
        assert_eq!(ephemeral.len(), 1);
        assert_eq!(ephemeral[0].role, Role::System);
    }

    #[test]
    fn test_append_without_tool_result_falls_back_to_message() {
        let mut history = vec![Message::user("hi")];
        let mut ephemeral = Vec::new();
        apply_injections(
            &mut history,
            &mut ephemeral,
            vec![ContextInjection::new("note").append_to_last_tool_result()],
        );
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "note");
    }
}
