//! Configuration management
//!
//! Configuration is read from JSON, then environment variables of the form
//! `AGENTKERNEL_SECTION_KEY` override individual fields. Merging across
//! multiple files is left to the embedding application.

mod types;
pub mod validate;

pub use types::*;

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{KernelError, Result};
use crate::hooks::ApprovalDefault;

impl Config {
    /// Parse configuration from a JSON string. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(json)?;
        for diag in validate::validate_config(&raw) {
            if diag.level != validate::DiagnosticLevel::Ok {
                warn!(path = %diag.path, "{}", diag.message);
            }
        }
        Ok(serde_json::from_value(raw)?)
    }

    /// Load configuration from `path` and apply environment overrides.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_json_str(&content)?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `AGENTKERNEL_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Agent
        if let Some(val) = lookup("AGENTKERNEL_AGENT_MODEL") {
            self.agent.model = Some(val);
        }
        override_parsed(&lookup, "AGENTKERNEL_AGENT_MAX_ITERATIONS", &mut self.agent.max_iterations);

        // Retry
        override_parsed(&lookup, "AGENTKERNEL_RETRY_MAX_RETRIES", &mut self.retry.max_retries);
        override_parsed(
            &lookup,
            "AGENTKERNEL_RETRY_MIN_DELAY_MS",
            &mut self.retry.min_retry_delay_ms,
        );
        override_parsed(
            &lookup,
            "AGENTKERNEL_RETRY_MAX_DELAY_MS",
            &mut self.retry.max_retry_delay_ms,
        );
        override_parsed(&lookup, "AGENTKERNEL_RETRY_JITTER", &mut self.retry.jitter);

        // Hooks
        override_parsed(
            &lookup,
            "AGENTKERNEL_HOOKS_APPROVAL_TIMEOUT_SECS",
            &mut self.hooks.approval_timeout_secs,
        );
        if let Some(val) = lookup("AGENTKERNEL_HOOKS_APPROVAL_DEFAULT") {
            match val.to_ascii_lowercase().as_str() {
                "allow" => self.hooks.approval_default = ApprovalDefault::Allow,
                "deny" => self.hooks.approval_default = ApprovalDefault::Deny,
                other => warn!(value = other, "Ignoring invalid AGENTKERNEL_HOOKS_APPROVAL_DEFAULT"),
            }
        }

        // Logging
        if let Some(val) = lookup("AGENTKERNEL_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns [`KernelError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iterations < -1 || self.agent.max_iterations == 0 {
            return Err(KernelError::Config(format!(
                "agent.max_iterations must be -1 (unlimited) or positive, got {}",
                self.agent.max_iterations
            )));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(KernelError::Config(format!(
                "retry.jitter must be within [0, 1], got {}",
                self.retry.jitter
            )));
        }
        if self.retry.min_retry_delay_ms > self.retry.max_retry_delay_ms {
            return Err(KernelError::Config(format!(
                "retry.min_retry_delay_ms ({}) exceeds retry.max_retry_delay_ms ({})",
                self.retry.min_retry_delay_ms, self.retry.max_retry_delay_ms
            )));
        }
        if let Some(threshold) = self.retry.throttle_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(KernelError::Config(format!(
                    "retry.throttle_threshold must be within [0, 1], got {}",
                    threshold
                )));
            }
        }
        if self.retry.request_timeout_secs == Some(0) {
            return Err(KernelError::Config(
                "retry.request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(val) = lookup(key) {
        match val.parse() {
            Ok(v) => *target = v,
            Err(_) => warn!(key, value = %val, "Ignoring unparseable config override"),
        }
    }
}
