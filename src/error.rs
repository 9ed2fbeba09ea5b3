//! Error types for agentkernel
//!
//! This module defines all error types used throughout the kernel. Uses
//! `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Closed taxonomy of provider failures.
///
/// Every raw failure coming back from an [`LLMProvider`](crate::providers::LLMProvider)
/// is translated exactly once into one of these kinds before the retry
/// decision is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 429: Rate limit or quota exceeded
    RateLimit,
    /// 5xx / 529 / overloaded: provider cannot serve the request right now
    ProviderUnavailable,
    /// 401: Invalid API key or authentication failure
    Authentication,
    /// 400: Prompt exceeds the model's context window
    ContextLength,
    /// 400: Request or response blocked by a safety filter
    ContentFilter,
    /// 400: Bad request, malformed parameters
    InvalidRequest,
    /// 403: Credentials valid but not allowed to use the resource
    AccessDenied,
    /// 404: Model or endpoint not found
    NotFound,
    /// The call did not complete within its deadline
    Timeout,
    /// Anything else
    Generic,
}

impl ErrorKind {
    /// Stable snake_case identifier, used in event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::Authentication => "authentication",
            ErrorKind::ContextLength => "context_length",
            ErrorKind::ContentFilter => "content_filter",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Generic => "generic",
        }
    }

    /// Whether errors of this kind are retryable when nothing more specific
    /// is known about the failure.
    pub fn default_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimit | ErrorKind::ProviderUnavailable | ErrorKind::Timeout
        )
    }

    fn label(&self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "Rate limit error",
            ErrorKind::ProviderUnavailable => "Provider unavailable",
            ErrorKind::Authentication => "Authentication error",
            ErrorKind::ContextLength => "Context length exceeded",
            ErrorKind::ContentFilter => "Content filtered",
            ErrorKind::InvalidRequest => "Invalid request",
            ErrorKind::AccessDenied => "Access denied",
            ErrorKind::NotFound => "Not found",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Generic => "Provider error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw, unclassified failure reported by a provider implementation.
///
/// Providers return this from [`LLMProvider::complete`](crate::providers::LLMProvider::complete);
/// the resilience layer translates it into a [`ProviderError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderFailure {
    /// The remote API answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Server-supplied `Retry-After`, if any.
        retry_after: Option<Duration>,
    },
    /// The provider signalled overload without a dedicated status code.
    #[error("provider overloaded: {message}")]
    Overloaded {
        message: String,
        retry_after: Option<Duration>,
    },
    /// The call did not finish in time.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Connection reset, DNS failure, malformed stream, etc.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ProviderFailure {
    /// Server-supplied retry hint carried by this failure.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderFailure::Status { retry_after, .. }
            | ProviderFailure::Overloaded { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status, when the failure has one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The human-readable message without the status prefix.
    pub fn message(&self) -> &str {
        match self {
            ProviderFailure::Status { message, .. } | ProviderFailure::Overloaded { message, .. } => {
                message
            }
            ProviderFailure::Timeout(message) | ProviderFailure::Transport(message) => message,
        }
    }
}

/// A classified provider error.
///
/// Keeps the original [`ProviderFailure`] as its `source()` for diagnostics
/// while exposing only the kind, message and retry metadata to callers.
#[derive(Debug, Clone)]
pub struct ProviderError {
    kind: ErrorKind,
    message: String,
    retry_after: Option<Duration>,
    retryable: bool,
    delay_multiplier: f64,
    cause: ProviderFailure,
}

impl ProviderError {
    /// Create a provider error of `kind` caused by `cause`.
    ///
    /// Retryability defaults to [`ErrorKind::default_retryable`] and the
    /// delay multiplier to `1.0`.
    pub fn new(kind: ErrorKind, cause: ProviderFailure) -> Self {
        Self {
            kind,
            message: cause.message().to_string(),
            retry_after: cause.retry_after(),
            retryable: kind.default_retryable(),
            delay_multiplier: 1.0,
            cause,
        }
    }

    /// Override retryability.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Scale the backoff delay for this error (e.g. `10.0` for overload).
    pub fn with_delay_multiplier(mut self, multiplier: f64) -> Self {
        self.delay_multiplier = multiplier;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Returns `true` if this error is transient and the request should be retried.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn delay_multiplier(&self) -> f64 {
        self.delay_multiplier
    }

    /// The raw failure this error was translated from.
    pub fn cause(&self) -> &ProviderFailure {
        &self.cause
    }

    /// Returns the HTTP status code of the original failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.cause.status()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl From<ProviderError> for KernelError {
    fn from(err: ProviderError) -> Self {
        KernelError::Provider(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for agentkernel operations.
#[derive(Error, Debug)]
pub enum KernelError {
    /// Configuration-related errors (invalid values, unreadable file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classified provider error, surfaced after retries are exhausted or
    /// immediately for non-retryable kinds.
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// Tool execution errors (invalid parameters, execution failures, etc.)
    #[error("Tool error: {0}")]
    Tool(String),

    /// Hook construction or dispatch errors.
    #[error("Hook error: {0}")]
    Hook(String),

    /// Conversation history could not be brought back into a valid state.
    #[error("History invariant violated: {0}")]
    HistoryInvariant(String),

    /// The session was cancelled while waiting at a suspension point.
    #[error("Operation cancelled")]
    Cancelled,

    /// Session management errors (invalid state, persistence failures, etc.)
    #[error("Session error: {0}")]
    Session(String),

    /// Resource not found (sessions, tools, modules, etc.)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// User-visible description of a terminal failure.
///
/// Never contains a raw provider-specific error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSummary {
    pub kind: Option<ErrorKind>,
    pub message: String,
    pub retryable: bool,
}

impl KernelError {
    /// Summarize this error for display to the user.
    pub fn summary(&self) -> FailureSummary {
        match self {
            KernelError::Provider(err) => FailureSummary {
                kind: Some(err.kind()),
                message: err.to_string(),
                retryable: err.is_retryable(),
            },
            other => FailureSummary {
                kind: None,
                message: other.to_string(),
                retryable: false,
            },
        }
    }

    /// Whether this error is the cooperative cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KernelError::Cancelled)
    }
}

/// A specialized `Result` type for agentkernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
