//! Resilient provider - bounded, observable retries around an [`LLMProvider`].
//!
//! [`ResilientProvider`] owns the whole lifecycle of one completion request:
//! it repairs and validates the tool-call sequence, throttles when the
//! provider reports low capacity, calls the provider with a per-attempt
//! deadline, translates raw failures exactly once, and retries the retryable
//! ones with exponential backoff and jitter.
//!
//! # Example
//!
//! ```rust,ignore
//! use agentkernel::providers::ResilientProvider;
//!
//! let provider = ResilientProvider::from_config(Arc::new(my_provider), &config.retry);
//! let response = provider
//!     .complete(&mut session.history, &[], &tools, &options, session.coordinator())
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::coordinator::Coordinator;
use crate::error::{KernelError, ProviderError, ProviderFailure, Result};
use crate::hooks::events;
use crate::session::Message;

use super::error_classifier::translate_failure;
use super::repair::{repair_tool_sequence, validate_tool_sequence};
use super::{ChatOptions, ChatRequest, LLMProvider, LLMResponse, ToolDefinition};

// ============================================================================
// Backoff
// ============================================================================

/// Retry limits and backoff shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Backoff base for the first retry.
    pub min_delay: Duration,
    /// Cap on the exponential term.
    pub max_delay: Duration,
    /// Jitter as a fraction of the floor, in `[0, 1]`.
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            min_delay: cfg.min_retry_delay(),
            max_delay: cfg.max_retry_delay(),
            jitter_fraction: cfg.jitter.clamp(0.0, 1.0),
        }
    }
}

/// Deterministic part of the backoff for retry `attempt` (1-indexed).
///
/// `min_delay * 2^(attempt-1)`, capped at `max_delay`, scaled by
/// `multiplier`, and never shorter than `retry_after`.
pub fn backoff_floor(
    attempt: u32,
    policy: &RetryPolicy,
    multiplier: f64,
    retry_after: Option<Duration>,
) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let base = policy.min_delay.saturating_mul(1u32 << exponent);
    let capped = base.min(policy.max_delay);
    let scaled = seconds(capped.as_secs_f64() * multiplier.max(0.0));
    scaled.max(retry_after.unwrap_or_default())
}

/// Spread `floor` uniformly over `floor ± floor * jitter_fraction`.
///
/// `sample` is a uniform draw from `[0, 1)`; `0.5` yields `floor` exactly.
pub fn apply_jitter(floor: Duration, jitter_fraction: f64, sample: f64) -> Duration {
    let offset = (sample.clamp(0.0, 1.0) * 2.0 - 1.0) * jitter_fraction.clamp(0.0, 1.0);
    seconds(floor.as_secs_f64() * (1.0 + offset).max(0.0))
}

/// Saturating float-to-`Duration` conversion; `retry_after` comes from the
/// provider and can be arbitrarily large.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Full sleep before retry `attempt` for `err`.
pub fn delay_for(attempt: u32, policy: &RetryPolicy, err: &ProviderError, sample: f64) -> Duration {
    let floor = backoff_floor(attempt, policy, err.delay_multiplier(), err.retry_after());
    apply_jitter(floor, policy.jitter_fraction, sample)
}

/// Pre-emptive throttling when the provider reports low capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottlePolicy {
    /// Remaining-capacity fraction below which to wait.
    pub threshold: f64,
    pub delay: Duration,
}

// ============================================================================
// ResilientProvider
// ============================================================================

/// Wraps an [`LLMProvider`] with repair, throttling, timeouts and retries.
pub struct ResilientProvider {
    inner: Arc<dyn LLMProvider>,
    policy: RetryPolicy,
    throttle: Option<ThrottlePolicy>,
    request_timeout: Option<Duration>,
    model: Option<String>,
}

impl std::fmt::Debug for ResilientProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientProvider")
            .field("inner", &self.inner.name())
            .field("policy", &self.policy)
            .field("throttle", &self.throttle)
            .field("request_timeout", &self.request_timeout)
            .field("model", &self.model)
            .finish()
    }
}

impl ResilientProvider {
    /// Wrap `inner` with the default policy and no throttling.
    pub fn new(inner: Arc<dyn LLMProvider>) -> Self {
        Self::from_config(inner, &RetryConfig::default())
    }

    pub fn from_config(inner: Arc<dyn LLMProvider>, cfg: &RetryConfig) -> Self {
        Self {
            inner,
            policy: RetryPolicy::from(cfg),
            throttle: cfg.throttle_threshold.map(|threshold| ThrottlePolicy {
                threshold,
                delay: Duration::from_millis(cfg.throttle_delay_ms),
            }),
            request_timeout: cfg.request_timeout(),
            model: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_throttle(mut self, throttle: Option<ThrottlePolicy>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the provider's default model. Empty strings are ignored.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|m| !m.is_empty());
        self
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// The model requests are sent with.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.inner.default_model())
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run one completion request against `history`.
    ///
    /// Orphaned tool calls in `history` are repaired in place before the
    /// first attempt. `ephemeral` messages are sent after the history for
    /// this request only.
    ///
    /// # Errors
    /// - [`KernelError::HistoryInvariant`] if the history is still invalid
    ///   after repair
    /// - [`KernelError::Provider`] for a non-retryable failure or once
    ///   retries are exhausted
    /// - [`KernelError::Cancelled`] if cancellation is observed while waiting
    pub async fn complete(
        &self,
        history: &mut Vec<Message>,
        ephemeral: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
        coordinator: &Coordinator,
    ) -> Result<LLMResponse> {
        let hooks = coordinator.hooks();
        let cancellation = coordinator.cancellation();

        let report = repair_tool_sequence(history);
        if !report.is_empty() {
            warn!(
                provider = self.name(),
                repaired = report.len(),
                tools = ?report.tool_names(),
                "Repaired orphaned tool calls before provider request"
            );
            hooks
                .notify(
                    events::PROVIDER_TOOL_SEQUENCE_REPAIRED,
                    report.to_event_payload(),
                )
                .await;
        }
        validate_tool_sequence(history)?;

        let mut messages = history.clone();
        messages.extend_from_slice(ephemeral);
        let request = ChatRequest::new(messages)
            .with_tools(tools.to_vec())
            .with_model(self.model.clone())
            .with_options(options.clone());

        let mut attempt: u32 = 0;
        loop {
            self.throttle_if_needed(coordinator).await?;
            cancellation.check()?;

            debug!(
                provider = self.name(),
                model = self.model(),
                attempt = attempt + 1,
                messages = request.messages.len(),
                "Sending completion request"
            );
            hooks
                .notify(
                    events::PROVIDER_REQUEST,
                    json!({
                        "provider": self.name(),
                        "model": self.model(),
                        "attempt": attempt + 1,
                        "message_count": request.messages.len(),
                        "tool_count": request.tools.len(),
                    }),
                )
                .await;

            let err = match self.call_once(&request).await {
                Ok(response) => {
                    hooks
                        .notify(
                            events::PROVIDER_RESPONSE,
                            json!({
                                "provider": self.name(),
                                "model": self.model(),
                                "attempt": attempt + 1,
                                "tool_calls": response.tool_calls.len(),
                                "usage": response.usage,
                            }),
                        )
                        .await;
                    return Ok(response);
                }
                Err(failure) => translate_failure(&failure),
            };

            if !err.is_retryable() || attempt >= self.policy.max_retries {
                warn!(
                    provider = self.name(),
                    kind = err.kind().as_str(),
                    attempts = attempt + 1,
                    error = %err,
                    "Provider request failed"
                );
                hooks
                    .notify(
                        events::PROVIDER_ERROR,
                        json!({
                            "provider": self.name(),
                            "model": self.model(),
                            "attempt": attempt + 1,
                            "error_kind": err.kind().as_str(),
                            "message": err.message(),
                            "retryable": err.is_retryable(),
                        }),
                    )
                    .await;
                return Err(KernelError::Provider(err));
            }

            attempt += 1;
            let delay = delay_for(attempt, &self.policy, &err, rand::thread_rng().gen::<f64>());
            warn!(
                provider = self.name(),
                attempt = attempt,
                max_retries = self.policy.max_retries,
                delay_secs = delay.as_secs_f64(),
                kind = err.kind().as_str(),
                "Retrying completion request after transient error"
            );
            hooks
                .notify(
                    events::PROVIDER_RETRY,
                    json!({
                        "provider": self.name(),
                        "model": self.model(),
                        "attempt": attempt,
                        "max_retries": self.policy.max_retries,
                        "delay": delay.as_secs_f64(),
                        "retry_after": err.retry_after().map(|d| d.as_secs_f64()),
                        "error_kind": err.kind().as_str(),
                        "message": err.message(),
                    }),
                )
                .await;
            cancellation.sleep(delay).await?;
        }
    }

    async fn call_once(
        &self,
        request: &ChatRequest,
    ) -> std::result::Result<LLMResponse, ProviderFailure> {
        match self.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.inner.complete(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderFailure::Timeout(format!(
                    "no response within {:.1}s",
                    limit.as_secs_f64()
                ))),
            },
            None => self.inner.complete(request).await,
        }
    }

    async fn throttle_if_needed(&self, coordinator: &Coordinator) -> Result<()> {
        let Some(throttle) = &self.throttle else {
            return Ok(());
        };
        let Some(remaining) = self.inner.remaining_capacity() else {
            return Ok(());
        };
        if remaining >= throttle.threshold {
            return Ok(());
        }

        crate::log_component!(
            info,
            "provider",
            "Provider capacity low, throttling",
            provider = self.name(),
            remaining = remaining,
            threshold = throttle.threshold,
        );
        coordinator
            .hooks()
            .notify(
                events::PROVIDER_THROTTLE,
                json!({
                    "provider": self.name(),
                    "remaining": remaining,
                    "threshold": throttle.threshold,
                    "delay": throttle.delay.as_secs_f64(),
                }),
            )
            .await;
        coordinator.cancellation().sleep(throttle.delay).await
    }
}
