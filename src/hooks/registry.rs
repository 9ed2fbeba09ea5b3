//! Hook registry and event dispatch.
//!
//! One [`HookRegistry`] exists per session. Handlers are registered against
//! event patterns with a priority; dispatch runs matching handlers one at a
//! time, highest priority first, ties in registration order.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cancellation::CancellationToken;
use crate::config::HooksConfig;
use crate::error::Result;
use crate::session::EventLog;

use super::events;
use super::resolver::{ActionResolver, ApprovalProvider};
use super::types::{ContextInjection, HookAction, HookResult, UserMessageLevel};

/// Explicit context handed to every handler invocation.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub session_id: String,
    pub cancellation: CancellationToken,
}

/// A hook handler.
///
/// Handlers may be invoked zero or many times over a session and must not
/// assume anything about the task they run on.
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, event: &str, payload: &Value, ctx: &HookContext) -> Result<HookResult>;
}

/// Adapts a synchronous closure into a [`HookHandler`].
///
/// ```
/// use agentkernel::hooks::{FnHook, HookResult};
///
/// let hook = FnHook::new(|_event: &str, payload: &serde_json::Value| {
///     if payload["tool_name"] == "shell" {
///         Ok(HookResult::deny("shell is disabled"))
///     } else {
///         Ok(HookResult::proceed())
///     }
/// });
/// # let _ = hook;
/// ```
pub struct FnHook<F>(F);

impl<F> FnHook<F>
where
    F: Fn(&str, &Value) -> Result<HookResult> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> HookHandler for FnHook<F>
where
    F: Fn(&str, &Value) -> Result<HookResult> + Send + Sync,
{
    async fn handle(&self, event: &str, payload: &Value, _ctx: &HookContext) -> Result<HookResult> {
        (self.0)(event, payload)
    }
}

/// Identifies a registration so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

#[derive(Clone)]
struct Registration {
    handle: HookHandle,
    pattern: String,
    name: Option<String>,
    priority: i32,
    handler: Arc<dyn HookHandler>,
}

impl Registration {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// Per-session hook kernel.
pub struct HookRegistry {
    session_id: String,
    cancellation: CancellationToken,
    registrations: RwLock<Vec<Registration>>,
    next_seq: AtomicU64,
    pending_injections: Mutex<Vec<ContextInjection>>,
    injection_size_limit: Option<usize>,
    collect_timeout: Duration,
    resolver: ActionResolver,
    event_log: EventLog,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("session_id", &self.session_id)
            .field("handlers", &self.len())
            .finish()
    }
}

impl HookRegistry {
    pub fn new(
        session_id: impl Into<String>,
        cancellation: CancellationToken,
        config: &HooksConfig,
        event_log: EventLog,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            cancellation,
            registrations: RwLock::new(Vec::new()),
            next_seq: AtomicU64::new(0),
            pending_injections: Mutex::new(Vec::new()),
            injection_size_limit: config.injection_size_limit,
            collect_timeout: config.collect_timeout(),
            resolver: ActionResolver::new(
                Duration::from_secs(config.approval_timeout_secs),
                config.approval_default,
            ),
            event_log,
        }
    }

    /// A standalone registry with default configuration, useful in tests
    /// and for tools that need a scratch kernel.
    pub fn detached(session_id: impl Into<String>) -> Self {
        Self::new(
            session_id,
            CancellationToken::new(),
            &HooksConfig::default(),
            EventLog::new(),
        )
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn set_approval_provider(&self, provider: Arc<dyn ApprovalProvider>) {
        self.resolver.set_approval_provider(provider);
    }

    /// Register `handler` for events matching `pattern`.
    ///
    /// Higher `priority` runs first; equal priorities run in registration
    /// order. Names need not be unique.
    pub fn register(
        &self,
        pattern: &str,
        handler: Arc<dyn HookHandler>,
        priority: i32,
        name: Option<&str>,
    ) -> HookHandle {
        let handle = HookHandle(self.next_seq.fetch_add(1, Ordering::SeqCst));
        let registration = Registration {
            handle,
            pattern: pattern.to_string(),
            name: name.map(str::to_string),
            priority,
            handler,
        };

        let mut regs = self.write_regs();
        let idx = regs.partition_point(|r| r.priority >= priority);
        regs.insert(idx, registration);
        debug!(pattern, priority, hook = name.unwrap_or("<unnamed>"), "Registered hook");
        handle
    }

    /// Register a synchronous closure. See [`FnHook`].
    pub fn register_fn<F>(&self, pattern: &str, priority: i32, name: Option<&str>, f: F) -> HookHandle
    where
        F: Fn(&str, &Value) -> Result<HookResult> + Send + Sync + 'static,
    {
        self.register(pattern, Arc::new(FnHook::new(f)), priority, name)
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub fn unregister(&self, handle: HookHandle) -> bool {
        let mut regs = self.write_regs();
        let before = regs.len();
        regs.retain(|r| r.handle != handle);
        regs.len() != before
    }

    pub fn len(&self) -> usize {
        self.read_regs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any handler would receive `event`.
    pub fn has_handlers(&self, event: &str) -> bool {
        self.read_regs()
            .iter()
            .any(|r| events::matches_pattern(&r.pattern, event))
    }

    /// Drain context injections queued by handlers.
    pub fn take_injections(&self) -> Vec<ContextInjection> {
        let mut pending = self
            .pending_injections
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *pending)
    }

    /// Dispatch `event` and resolve the handlers' combined action.
    ///
    /// - `Deny` stops dispatch and is returned immediately.
    /// - `Modify` replaces the payload seen by later handlers; the final
    ///   payload is returned as `Modify { data }`.
    /// - `InjectContext` is queued (see [`take_injections`](Self::take_injections)).
    /// - `AskUser` blocks until approved, denied, or timed out.
    ///
    /// A handler that fails or panics is logged and treated as `Continue`.
    ///
    /// # Errors
    /// Only [`KernelError::Cancelled`](crate::error::KernelError::Cancelled),
    /// when cancellation arrives during an approval wait.
    pub async fn emit(&self, event: &str, payload: Value) -> Result<HookResult> {
        self.event_log.record(event, &payload);
        let handlers = self.matching(event);
        if handlers.is_empty() {
            return Ok(HookResult::proceed());
        }

        let ctx = self.context();
        let mut current = payload;
        let mut modified = false;
        let mut side = SideChannels::default();

        for reg in &handlers {
            let Some(result) = self.invoke(reg, event, &current, &ctx).await else {
                continue;
            };
            side.absorb(&result);

            let action = match result.action {
                HookAction::AskUser(request) => {
                    debug!(event, hook = reg.label(), "Hook requested user approval");
                    self.resolver
                        .resolve_approval(&request, &self.cancellation)
                        .await?
                }
                other => other,
            };

            match action {
                HookAction::Continue => {}
                HookAction::Deny { reason } => {
                    debug!(event, hook = reg.label(), reason = %reason, "Hook denied event");
                    return Ok(side.finish(HookAction::Deny { reason }));
                }
                HookAction::Modify { data } => {
                    debug!(event, hook = reg.label(), "Hook modified payload");
                    current = data;
                    modified = true;
                }
                HookAction::InjectContext(injection) => self.queue_injection(event, injection),
                HookAction::AskUser(_) => {}
            }
        }

        let action = if modified {
            HookAction::Modify { data: current }
        } else {
            HookAction::Continue
        };
        Ok(side.finish(action))
    }

    /// Dispatch an observational event.
    ///
    /// Every matching handler runs with the original payload and control
    /// actions are ignored, so no handler can block the caller.
    pub async fn notify(&self, event: &str, payload: Value) {
        self.event_log.record(event, &payload);
        let handlers = self.matching(event);
        if handlers.is_empty() {
            return;
        }
        let ctx = self.context();
        for reg in &handlers {
            if let Some(result) = self.invoke(reg, event, &payload, &ctx).await {
                if !matches!(result.action, HookAction::Continue) {
                    debug!(
                        event,
                        hook = reg.label(),
                        action = result.action.name(),
                        "Ignoring control action on observational event"
                    );
                }
            }
        }
    }

    /// Run every matching handler and collect the data each one supplies.
    ///
    /// Unlike [`emit`](Self::emit), a `Deny` does not stop collection. Each
    /// handler gets its own `timeout`; a handler that times out or fails is
    /// left out of the result.
    pub async fn emit_and_collect(&self, event: &str, payload: Value, timeout: Duration) -> Vec<Value> {
        self.event_log.record(event, &payload);
        let handlers = self.matching(event);
        let ctx = self.context();
        let mut collected = Vec::with_capacity(handlers.len());

        for reg in &handlers {
            match tokio::time::timeout(timeout, self.invoke(reg, event, &payload, &ctx)).await {
                Ok(Some(result)) => {
                    if let Some(data) = result.collected_data() {
                        collected.push(data.clone());
                    }
                }
                Ok(None) => {}
                Err(_) => warn!(
                    event,
                    hook = reg.label(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Hook timed out during collection, dropping its response"
                ),
            }
        }
        collected
    }

    /// [`emit_and_collect`](Self::emit_and_collect) with the configured
    /// per-handler timeout (`hooks.collect_timeout_ms`).
    pub async fn emit_and_collect_default(&self, event: &str, payload: Value) -> Vec<Value> {
        self.emit_and_collect(event, payload, self.collect_timeout).await
    }

    async fn invoke(
        &self,
        reg: &Registration,
        event: &str,
        payload: &Value,
        ctx: &HookContext,
    ) -> Option<HookResult> {
        let fut = reg.handler.handle(event, payload, ctx);
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(e)) => {
                warn!(event, hook = reg.label(), error = %e, "Hook handler failed, continuing");
                None
            }
            Err(_) => {
                warn!(event, hook = reg.label(), "Hook handler panicked, continuing");
                None
            }
        }
    }

    fn queue_injection(&self, event: &str, injection: ContextInjection) {
        if let Some(limit) = self.injection_size_limit {
            if injection.text.len() > limit {
                warn!(
                    event,
                    size = injection.text.len(),
                    limit,
                    "Context injection exceeds size limit, dropping"
                );
                return;
            }
        }
        self.pending_injections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(injection);
    }

    fn matching(&self, event: &str) -> Vec<Registration> {
        self.read_regs()
            .iter()
            .filter(|r| events::matches_pattern(&r.pattern, event))
            .cloned()
            .collect()
    }

    fn context(&self) -> HookContext {
        HookContext {
            session_id: self.session_id.clone(),
            cancellation: self.cancellation.clone(),
        }
    }

    fn read_regs(&self) -> std::sync::RwLockReadGuard<'_, Vec<Registration>> {
        self.registrations.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_regs(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Registration>> {
        self.registrations.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Side-channel fields folded across handlers.
#[derive(Default)]
struct SideChannels {
    suppress_output: bool,
    user_message: Option<(String, UserMessageLevel)>,
}

impl SideChannels {
    fn absorb(&mut self, result: &HookResult) {
        self.suppress_output |= result.suppress_output;
        if let Some(msg) = &result.user_message {
            self.user_message = Some((msg.clone(), result.user_message_level));
        }
    }

    fn finish(self, action: HookAction) -> HookResult {
        let mut result = HookResult {
            action,
            ..HookResult::default()
        };
        result.suppress_output = self.suppress_output;
        if let Some((msg, level)) = self.user_message {
            result = result.with_user_message(msg, level);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;
    use crate::hooks::types::ApprovalRequest;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn registry() -> HookRegistry {
        HookRegistry::detached("test-session")
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    // ---- emit ----

    #[tokio::test]
    async fn test_emit_without_handlers_is_continue() {
        let hooks = registry();
        let result = hooks.emit("tool:pre", json!({})).await.unwrap();
        assert_eq!(result.action, HookAction::Continue);
    }

    #[tokio::test]
    async fn test_deny_short_circuits_lower_priority() {
        let hooks = registry();
        let low_calls = counter();
        let calls = Arc::clone(&low_calls);

        hooks.register_fn("tool:pre", 10, Some("guard"), |_, _| {
            Ok(HookResult::deny("blocked by guard"))
        });
        hooks.register_fn("tool:pre", 5, Some("rewriter"), move |_, payload| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(HookResult::modify(payload.clone()))
        });

        let result = hooks.emit("tool:pre", json!({"tool_name": "shell"})).await.unwrap();
        assert_eq!(result.denial_reason(), Some("blocked by guard"));
        assert_eq!(low_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_modify_chains_in_priority_order() {
        let hooks = registry();
        let saw_a = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let saw = Arc::clone(&saw_a);

        // Registered low-priority first to prove ordering is by priority.
        hooks.register_fn("prompt:submit", 5, Some("add-b"), move |_, payload| {
            saw.store(payload.get("a").is_some(), Ordering::SeqCst);
            let mut next = payload.clone();
            next["b"] = json!(2);
            Ok(HookResult::modify(next))
        });
        hooks.register_fn("prompt:submit", 10, Some("add-a"), |_, payload| {
            let mut next = payload.clone();
            next["a"] = json!(1);
            Ok(HookResult::modify(next))
        });

        let result = hooks.emit("prompt:submit", json!({"prompt": "hi"})).await.unwrap();
        let data = result.modified_payload().unwrap();
        assert_eq!(data["a"], 1);
        assert_eq!(data["b"], 2);
        assert_eq!(data["prompt"], "hi");
        assert!(saw_a.load(Ordering::SeqCst), "priority-5 handler must see field a");
    }

    #[tokio::test]
    async fn test_equal_priority_runs_in_registration_order() {
        let hooks = registry();
        let order = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            hooks.register_fn("tool:post", 0, Some(label), move |_, _| {
                order.lock().unwrap().push(label);
                Ok(HookResult::proceed())
            });
        }
        hooks.emit("tool:post", json!({})).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_duplicate_names_both_fire() {
        let hooks = registry();
        let calls = counter();
        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            hooks.register_fn("tool:post", 0, Some("audit"), move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(HookResult::proceed())
            });
        }
        hooks.emit("tool:post", json!({})).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_handler_is_isolated() {
        let hooks = registry();
        let calls = counter();
        let c = Arc::clone(&calls);

        hooks.register_fn("tool:pre", 10, Some("broken"), |_, _| {
            Err(KernelError::Hook("boom".into()))
        });
        hooks.register_fn("tool:pre", 5, Some("healthy"), move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(HookResult::proceed())
        });

        let result = hooks.emit("tool:pre", json!({})).await.unwrap();
        assert_eq!(result.action, HookAction::Continue);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        let hooks = registry();
        hooks.register_fn("tool:pre", 10, Some("panics"), |_, _| panic!("handler bug"));
        hooks.register_fn("tool:pre", 5, Some("denies"), |_, _| Ok(HookResult::deny("nope")));

        let result = hooks.emit("tool:pre", json!({})).await.unwrap();
        assert!(result.is_denied());
    }

    #[tokio::test]
    async fn test_inject_context_is_queued_not_applied() {
        let hooks = registry();
        hooks.register_fn("tool:post", 0, None, |_, _| {
            Ok(HookResult::inject(ContextInjection::new("tests are red")))
        });
        hooks.register_fn("tool:post", 0, None, |_, _| {
            Ok(HookResult::inject(ContextInjection::new("lint is clean")))
        });

        let result = hooks.emit("tool:post", json!({})).await.unwrap();
        assert_eq!(result.action, HookAction::Continue);

        let injections = hooks.take_injections();
        assert_eq!(injections.len(), 2);
        assert_eq!(injections[0].text, "tests are red");
        assert!(hooks.take_injections().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_injection_is_dropped() {
        let config = HooksConfig {
            injection_size_limit: Some(8),
            ..Default::default()
        };
        let hooks = HookRegistry::new("s", CancellationToken::new(), &config, EventLog::new());
        hooks.register_fn("tool:post", 0, None, |_, _| {
            Ok(HookResult::inject(ContextInjection::new("far too long for the limit")))
        });
        hooks.emit("tool:post", json!({})).await.unwrap();
        assert!(hooks.take_injections().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ask_user_without_provider_resolves_to_default_deny() {
        let hooks = registry();
        let later = counter();
        let c = Arc::clone(&later);
        hooks.register_fn("tool:pre", 10, None, |_, _| {
            Ok(HookResult::ask_user(ApprovalRequest::new("Allow shell?")?))
        });
        hooks.register_fn("tool:pre", 0, None, move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(HookResult::proceed())
        });

        let result = hooks.emit("tool:pre", json!({})).await.unwrap();
        assert!(result.is_denied());
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_side_channels_fold() {
        let hooks = registry();
        hooks.register_fn("tool:post", 10, None, |_, _| {
            Ok(HookResult::proceed().suppress_output())
        });
        hooks.register_fn("tool:post", 5, None, |_, _| {
            Ok(HookResult::proceed().with_user_message("formatted 3 files", UserMessageLevel::Info))
        });
        let result = hooks.emit("tool:post", json!({})).await.unwrap();
        assert!(result.suppress_output);
        assert_eq!(result.user_message.as_deref(), Some("formatted 3 files"));
    }

    #[tokio::test]
    async fn test_wildcard_patterns() {
        let hooks = registry();
        let calls = counter();
        let c1 = Arc::clone(&calls);
        let c2 = Arc::clone(&calls);
        hooks.register_fn("*", 0, None, move |_, _| {
            c1.fetch_add(1, Ordering::SeqCst);
            Ok(HookResult::proceed())
        });
        hooks.register_fn("tool:*", 0, None, move |_, _| {
            c2.fetch_add(1, Ordering::SeqCst);
            Ok(HookResult::proceed())
        });

        hooks.emit("tool:pre", json!({})).await.unwrap();
        hooks.emit("session:start", json!({})).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unregister() {
        let hooks = registry();
        let handle = hooks.register_fn("tool:pre", 0, None, |_, _| Ok(HookResult::deny("x")));
        assert!(hooks.has_handlers("tool:pre"));
        assert!(hooks.unregister(handle));
        assert!(!hooks.unregister(handle));
        let result = hooks.emit("tool:pre", json!({})).await.unwrap();
        assert!(!result.is_denied());
    }

    #[tokio::test]
    async fn test_emissions_are_logged() {
        let hooks = registry();
        hooks.emit("session:start", json!({"a": 1})).await.unwrap();
        hooks.notify("provider:retry", json!({})).await;
        let names: Vec<_> = hooks.event_log().snapshot().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["session:start", "provider:retry"]);
    }

    // ---- notify ----

    #[tokio::test]
    async fn test_notify_ignores_deny() {
        let hooks = registry();
        let calls = counter();
        let c = Arc::clone(&calls);
        hooks.register_fn("provider:retry", 10, None, |_, _| Ok(HookResult::deny("stop")));
        hooks.register_fn("provider:retry", 0, None, move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(HookResult::proceed())
        });
        hooks.notify("provider:retry", json!({})).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // ---- emit_and_collect ----

    #[tokio::test]
    async fn test_collect_does_not_short_circuit_on_deny() {
        let hooks = registry();
        hooks.register_fn("decision:tool_resolution", 10, None, |_, _| {
            Ok(HookResult::proceed().with_data(json!("grep")))
        });
        hooks.register_fn("decision:tool_resolution", 5, None, |_, _| {
            Ok(HookResult::deny("veto").with_data(json!("none")))
        });
        hooks.register_fn("decision:tool_resolution", 1, None, |_, _| {
            Ok(HookResult::modify(json!("read_file")))
        });

        let collected = hooks
            .emit_and_collect("decision:tool_resolution", json!({}), Duration::from_secs(1))
            .await;
        assert_eq!(collected, vec![json!("grep"), json!("none"), json!("read_file")]);
    }

    struct Slow;

    #[async_trait]
    impl HookHandler for Slow {
        async fn handle(&self, _: &str, _: &Value, _: &HookContext) -> Result<HookResult> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(HookResult::proceed().with_data(json!("late")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_drops_timed_out_handler() {
        let hooks = registry();
        hooks.register("decision:*", Arc::new(Slow), 10, Some("slow"));
        hooks.register_fn("decision:*", 0, Some("fast"), |_, _| {
            Ok(HookResult::proceed().with_data(json!("on time")))
        });

        let collected = hooks
            .emit_and_collect("decision:pick", json!({}), Duration::from_secs(1))
            .await;
        assert_eq!(collected, vec![json!("on time")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_default_uses_configured_timeout() {
        let patient = HookRegistry::new(
            "patient",
            CancellationToken::new(),
            &HooksConfig {
                collect_timeout_ms: 120_000,
                ..Default::default()
            },
            EventLog::new(),
        );
        patient.register("decision:*", Arc::new(Slow), 0, Some("slow"));
        let collected = patient.emit_and_collect_default("decision:pick", json!({})).await;
        assert_eq!(collected, vec![json!("late")]);

        // Default config allows 5s, so the 60s handler is dropped.
        let hasty = registry();
        hasty.register("decision:*", Arc::new(Slow), 0, Some("slow"));
        let collected = hasty.emit_and_collect_default("decision:pick", json!({})).await;
        assert!(collected.is_empty());
        assert_eq!(hasty.event_log().count("decision:pick"), 1);
    }
}
