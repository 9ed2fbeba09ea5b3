//! Integration tests for agentkernel
//!
//! These tests drive the public API end to end: hook dispatch, provider
//! resilience, history repair and the orchestrator loop working together.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentkernel::{
    agent::{AgentLoop, LoopState, TRUNCATION_MARKER},
    config::{Config, HooksConfig},
    coordinator::{HookModule, ModuleRegistry},
    error::{ErrorKind, ProviderFailure, Result},
    hooks::{
        events, ApprovalDecision, ApprovalProvider, ApprovalRequest, HookRegistry, HookResult,
    },
    providers::{
        find_orphaned_tool_calls, repair_tool_sequence,
        retry::{apply_jitter, backoff_floor},
        ChatRequest, LLMProvider, LLMResponse, LLMToolCall, RetryPolicy,
        TOOL_RESULT_MISSING_MARKER,
    },
    session::{MemorySessionStore, Message, Session, SessionStore, ToolCall},
    tools::{EchoTool, ToolRegistry},
};
use async_trait::async_trait;
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

struct ScriptedProvider {
    script: Mutex<VecDeque<std::result::Result<LLMResponse, ProviderFailure>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(script: Vec<std::result::Result<LLMResponse, ProviderFailure>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-1"
    }

    async fn complete(
        &self,
        _request: &ChatRequest,
    ) -> std::result::Result<LLMResponse, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(LLMResponse::text("done")))
    }
}

fn echo_call(id: &str) -> LLMResponse {
    LLMResponse::with_tools(
        "",
        vec![LLMToolCall::new(id, "echo", r#"{"message":"hi"}"#)],
    )
}

fn agent(provider: Arc<ScriptedProvider>, max_iterations: i32) -> AgentLoop {
    let mut config = Config::default();
    config.agent.max_iterations = max_iterations;
    config.retry.min_retry_delay_ms = 10;
    config.retry.max_retry_delay_ms = 100;

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(EchoTool));
    AgentLoop::from_config(provider, tools, &config)
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 5,
        min_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(60),
        jitter_fraction: 0.2,
    }
}

// ============================================================================
// Backoff
// ============================================================================

#[test]
fn test_backoff_is_monotonic_and_bounded() {
    let policy = policy();
    let mut previous = Duration::ZERO;
    for attempt in 1..=20 {
        let floor = backoff_floor(attempt, &policy, 1.0, None);
        assert!(floor >= previous, "attempt {attempt} decreased");
        assert!(floor <= policy.max_delay);
        let worst = apply_jitter(floor, policy.jitter_fraction, 0.999_999);
        assert!(worst.as_secs_f64() <= policy.max_delay.as_secs_f64() * 1.2 + 1e-6);
        previous = floor;
    }
}

#[test]
fn test_overloaded_third_attempt_sleeps_between_32_and_48_seconds() {
    let policy = policy();
    let floor = backoff_floor(3, &policy, 10.0, None);
    assert_eq!(floor, Duration::from_secs(40));
    for sample in [0.0, 0.25, 0.5, 0.75, 0.999_999] {
        let sleep = apply_jitter(floor, policy.jitter_fraction, sample).as_secs_f64();
        assert!((31.999..=48.0).contains(&sleep), "sleep {sleep} out of range");
    }
}

// ============================================================================
// Hook kernel
// ============================================================================

#[tokio::test]
async fn test_deny_short_circuits_and_modify_chains() {
    let hooks = HookRegistry::detached("it-hooks");
    let low_ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&low_ran);

    hooks.register_fn("tool:pre", 50, Some("add-a"), |_, payload| {
        let mut data = payload.clone();
        data["trail"] = json!(format!("{}a", data["trail"].as_str().unwrap_or("")));
        Ok(HookResult::modify(data))
    });
    hooks.register_fn("tool:pre", 40, Some("add-b"), |_, payload| {
        let mut data = payload.clone();
        data["trail"] = json!(format!("{}b", data["trail"].as_str().unwrap_or("")));
        Ok(HookResult::modify(data))
    });
    let result = hooks.emit("tool:pre", json!({"trail": ""})).await.unwrap();
    assert_eq!(result.modified_payload().unwrap()["trail"], "ab");

    hooks.register_fn("tool:pre", 30, Some("deny"), |_, _| Ok(HookResult::deny("stop")));
    hooks.register_fn("tool:pre", 10, Some("never"), move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(HookResult::proceed())
    });
    let result = hooks.emit("tool:pre", json!({"trail": ""})).await.unwrap();
    assert_eq!(result.denial_reason(), Some("stop"));
    assert_eq!(low_ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_collect_runs_every_handler_despite_deny() {
    let hooks = HookRegistry::detached("it-collect");
    hooks.register_fn("decision:*", 3, None, |_, _| {
        Ok(HookResult::proceed().with_data(json!(1)))
    });
    hooks.register_fn("decision:*", 2, None, |_, _| {
        Ok(HookResult::deny("no").with_data(json!(2)))
    });
    hooks.register_fn("decision:*", 1, None, |_, _| Ok(HookResult::modify(json!(3))));

    let collected = hooks
        .emit_and_collect("decision:pick", json!({}), Duration::from_secs(1))
        .await;
    assert_eq!(collected.len(), 3);
}

struct SilentApprover;

#[async_trait]
impl ApprovalProvider for SilentApprover {
    async fn request_approval(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_ask_user_timeout_applies_default() {
    let session = Session::with_config(&HooksConfig {
        approval_timeout_secs: 5,
        ..Default::default()
    });
    let hooks = session.coordinator().hooks();
    hooks.set_approval_provider(Arc::new(SilentApprover));
    hooks.register_fn(events::TOOL_PRE, 0, Some("confirm"), |_, _| {
        Ok(HookResult::ask_user(ApprovalRequest::new("Run shell?")?))
    });

    let started = tokio::time::Instant::now();
    let result = hooks.emit(events::TOOL_PRE, json!({})).await.unwrap();
    assert!(result.is_denied());
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[test]
fn test_ask_user_requires_prompt() {
    assert!(ApprovalRequest::new("").is_err());
}

// ============================================================================
// Repair
// ============================================================================

#[test]
fn test_repair_inserts_one_result_and_is_idempotent() {
    let mut history = vec![
        Message::user("run it"),
        Message::assistant_with_tools("", vec![ToolCall::new("call_9", "shell", "{}")]),
        Message::user("well?"),
    ];

    let report = repair_tool_sequence(&mut history);
    assert_eq!(report.len(), 1);
    assert_eq!(history.len(), 4);
    assert_eq!(history[2].tool_call_id.as_deref(), Some("call_9"));
    assert!(history[2].content.starts_with(TOOL_RESULT_MISSING_MARKER));
    assert!(find_orphaned_tool_calls(&history).is_empty());

    let again = repair_tool_sequence(&mut history);
    assert!(again.is_empty());
    assert_eq!(history.len(), 4);
}

// ============================================================================
// Orchestrator
// ============================================================================

#[tokio::test]
async fn test_max_iterations_two_truncates() {
    let provider = ScriptedProvider::new(vec![
        Ok(echo_call("c1")),
        Ok(echo_call("c2")),
        Ok(echo_call("c3")),
    ]);
    let agent = agent(provider.clone(), 2);
    let mut session = Session::new();

    let outcome = agent.run(&mut session, "keep going").await.unwrap();
    assert!(outcome.truncated);
    assert!(outcome.response.contains(TRUNCATION_MARKER.trim()));
    assert_eq!(provider.calls(), 2);
    assert_eq!(outcome.transitions.last(), Some(&LoopState::Completed));
}

#[tokio::test]
async fn test_tool_veto_completes_without_executing() {
    let provider = ScriptedProvider::new(vec![Ok(echo_call("c1"))]);
    let agent = agent(provider.clone(), 10);
    let mut session = Session::new();
    session
        .coordinator()
        .hooks()
        .register_fn(events::TOOL_SELECTING, 0, None, |_, _| Ok(HookResult::deny("vetoed")));

    let outcome = agent.run(&mut session, "echo").await.unwrap();
    assert!(!outcome.visited(LoopState::ExecutingTool));
    assert_eq!(outcome.transitions.last(), Some(&LoopState::Completed));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_recover_inside_run() {
    let provider = ScriptedProvider::new(vec![
        Err(ProviderFailure::Overloaded {
            message: "overloaded".into(),
            retry_after: None,
        }),
        Ok(LLMResponse::text("recovered")),
    ]);
    let agent = agent(provider.clone(), 10);
    let mut session = Session::new();

    let outcome = agent.run(&mut session, "hi").await.unwrap();
    assert_eq!(outcome.response, "recovered");
    assert_eq!(provider.calls(), 2);
    assert_eq!(session.event_log().count(events::PROVIDER_RETRY), 1);
}

#[tokio::test]
async fn test_access_denied_surfaces_summary() {
    let provider = ScriptedProvider::new(vec![Err(ProviderFailure::Status {
        status: 403,
        message: "forbidden".into(),
        retry_after: None,
    })]);
    let agent = agent(provider.clone(), 10);
    let mut session = Session::new();

    let err = agent.run(&mut session, "hi").await.unwrap_err();
    assert_eq!(err.summary().kind, Some(ErrorKind::AccessDenied));
    assert_eq!(provider.calls(), 1);
}

// ============================================================================
// Modules and sessions
// ============================================================================

struct RedactModule;

impl HookModule for RedactModule {
    fn name(&self) -> &str {
        "redact"
    }

    fn events(&self) -> Vec<&'static str> {
        vec![events::TOOL_POST]
    }

    fn mount(&self, hooks: &HookRegistry) -> Result<()> {
        hooks.register_fn(events::TOOL_POST, 0, Some("redact"), |_, payload| {
            let mut data = payload.clone();
            data["result"] = json!("[redacted]");
            Ok(HookResult::modify(data))
        });
        Ok(())
    }
}

#[tokio::test]
async fn test_mounted_module_rewrites_tool_results() {
    let registry = ModuleRegistry::builder()
        .with_hook_module(Arc::new(RedactModule))
        .build();
    let provider = ScriptedProvider::new(vec![Ok(echo_call("c1")), Ok(LLMResponse::text("ok"))]);
    let agent = agent(provider, 10);
    let mut session = Session::new();
    registry.mount_all(session.coordinator()).unwrap();
    assert_eq!(session.coordinator().declared_events(), vec!["tool:post"]);

    agent.run(&mut session, "echo").await.unwrap();
    assert_eq!(session.history[2].content, "[redacted]");
}

#[tokio::test]
async fn test_fork_and_store_are_independent() {
    let provider = ScriptedProvider::new(vec![Ok(LLMResponse::text("first"))]);
    let agent = agent(provider, 10);
    let mut parent = Session::new();
    agent.run(&mut parent, "hello").await.unwrap();

    let mut child = parent.fork().await;
    child.history.push(Message::user("only in child"));
    assert_eq!(parent.history.len(), 2);
    assert_eq!(child.history.len(), 3);

    let store = MemorySessionStore::new();
    store.save(&parent.snapshot()).await.unwrap();
    store.save(&child.snapshot()).await.unwrap();
    let loaded = store.load(child.id()).await.unwrap();
    assert_eq!(loaded.parent_id.as_deref(), Some(parent.id()));
    assert_eq!(store.list().await.unwrap().len(), 2);
}

#[test]
fn test_config_file_drives_agent_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernel.json");
    std::fs::write(
        &path,
        r#"{"agent": {"max_iterations": 4}, "retry": {"max_retries": 1}}"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.agent.max_iterations, 4);
    assert_eq!(config.retry.max_retries, 1);
    assert_eq!(config.retry.min_retry_delay_ms, 1000);
}
