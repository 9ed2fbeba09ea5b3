//! Configuration type definitions
//!
//! All types implement serde traits for JSON serialization and have
//! sensible defaults, so a partial config file only needs the fields it
//! changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hooks::ApprovalDefault;
use crate::providers::ChatOptions;

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Orchestrator loop defaults (model, iterations, sampling)
    pub agent: AgentDefaults,
    /// Provider resilience (retry, backoff, throttling, timeouts)
    pub retry: RetryConfig,
    /// Hook kernel settings (approval, injections, collection)
    pub hooks: HooksConfig,
    /// Logging output
    pub logging: LoggingConfig,
}

// ============================================================================
// Agent Configuration
// ============================================================================

/// Default max loop iterations.
pub const DEFAULT_MAX_ITERATIONS: i32 = 25;

/// Orchestrator loop defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Model override; `None` uses the provider's default model.
    pub model: Option<String>,
    /// Maximum number of completion requests per prompt. `-1` = unlimited.
    pub max_iterations: i32,
    /// System prompt prepended to a fresh history.
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub reasoning_effort: Option<String>,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: None,
            max_tokens: None,
            temperature: None,
            reasoning_effort: None,
        }
    }
}

impl AgentDefaults {
    /// Chat options derived from the configured sampling settings.
    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            reasoning_effort: self.reasoning_effort.clone(),
        }
    }
}

// ============================================================================
// Retry Configuration
// ============================================================================

/// Provider resilience settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (total calls = max_retries + 1).
    pub max_retries: u32,
    /// Backoff base for the first retry.
    pub min_retry_delay_ms: u64,
    /// Cap on the exponential term (before the delay multiplier).
    pub max_retry_delay_ms: u64,
    /// Jitter as a fraction of the computed delay, in `[0, 1]`.
    pub jitter: f64,
    /// Per-attempt deadline. `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// Sleep before an attempt when remaining capacity drops below this
    /// fraction. `None` disables throttling.
    pub throttle_threshold: Option<f64>,
    pub throttle_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_retry_delay_ms: 1_000,
            max_retry_delay_ms: 60_000,
            jitter: 0.2,
            request_timeout_secs: Some(300),
            throttle_threshold: None,
            throttle_delay_ms: 1_000,
        }
    }
}

impl RetryConfig {
    pub fn min_retry_delay(&self) -> Duration {
        Duration::from_millis(self.min_retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

// ============================================================================
// Hooks Configuration
// ============================================================================

/// Hook kernel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// How long an `ask_user` approval waits before applying the default.
    pub approval_timeout_secs: u64,
    /// What an unanswered approval resolves to.
    pub approval_default: ApprovalDefault,
    /// Injections larger than this many bytes are dropped. `None` = no limit.
    pub injection_size_limit: Option<usize>,
    /// Per-handler deadline for `emit_and_collect`.
    pub collect_timeout_ms: u64,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            approval_timeout_secs: 300,
            approval_default: ApprovalDefault::Deny,
            injection_size_limit: Some(10 * 1024),
            collect_timeout_ms: 5_000,
        }
    }
}

impl HooksConfig {
    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs)
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_millis(self.collect_timeout_ms)
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text
    Pretty,
    /// Compact text with a `component` field for per-subsystem filtering
    #[default]
    Component,
    /// Structured JSON lines
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Append logs to this file instead of stderr.
    pub file: Option<String>,
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            file: None,
            level: "info".to_string(),
        }
    }
}
