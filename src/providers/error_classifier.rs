//! Translation of raw provider failures into classified errors.
//!
//! Status codes decide first; message patterns refine `400` responses and
//! detect overload signalled without a dedicated status.

use crate::error::{ErrorKind, ProviderError, ProviderFailure};

/// Backoff multiplier applied to overload errors.
pub const OVERLOAD_DELAY_MULTIPLIER: f64 = 10.0;

/// HTTP status some providers use for "overloaded".
pub const STATUS_OVERLOADED: u16 = 529;

const OVERLOAD_PATTERNS: &[&str] = &["overloaded_error", "overloaded", "server is busy"];

const CONTEXT_LENGTH_PATTERNS: &[&str] = &[
    "context length",
    "context_length",
    "context window",
    "maximum context",
    "too many tokens",
    "prompt is too long",
    "input is too long",
    "length exceeded",
    "exceeds the maximum",
];

const CONTENT_FILTER_PATTERNS: &[&str] = &[
    "content filter",
    "content_filter",
    "content policy",
    "safety",
    "flagged",
    "harmful",
];

/// Translate a raw failure into a [`ProviderError`].
///
/// | Condition | Kind | Retryable |
/// |---|---|---|
/// | 429 | `RateLimit` | yes |
/// | 529 or overloaded | `ProviderUnavailable` (x10 delay) | yes |
/// | 5xx | `ProviderUnavailable` | yes |
/// | 401 | `Authentication` | no |
/// | 400 | `ContextLength` / `ContentFilter` / `InvalidRequest` | no |
/// | 403 | `AccessDenied` | no |
/// | 404 | `NotFound` | no |
/// | other status | `Generic` | no |
/// | timeout | `Timeout` | yes |
/// | transport | `Generic` | yes |
pub fn translate_failure(failure: &ProviderFailure) -> ProviderError {
    let cause = failure.clone();
    match failure {
        ProviderFailure::Overloaded { .. } => overloaded(cause),
        ProviderFailure::Timeout(_) => ProviderError::new(ErrorKind::Timeout, cause),
        ProviderFailure::Transport(_) => {
            ProviderError::new(ErrorKind::Generic, cause).with_retryable(true)
        }
        ProviderFailure::Status {
            status, message, ..
        } => {
            let lower = message.to_lowercase();
            match *status {
                429 => ProviderError::new(ErrorKind::RateLimit, cause),
                STATUS_OVERLOADED => overloaded(cause),
                500..=599 if contains_any(&lower, OVERLOAD_PATTERNS) => overloaded(cause),
                500..=599 => ProviderError::new(ErrorKind::ProviderUnavailable, cause),
                401 => ProviderError::new(ErrorKind::Authentication, cause),
                400 => ProviderError::new(classify_bad_request(&lower), cause),
                403 => ProviderError::new(ErrorKind::AccessDenied, cause),
                404 => ProviderError::new(ErrorKind::NotFound, cause),
                _ => ProviderError::new(ErrorKind::Generic, cause).with_retryable(false),
            }
        }
    }
}

fn overloaded(cause: ProviderFailure) -> ProviderError {
    ProviderError::new(ErrorKind::ProviderUnavailable, cause)
        .with_delay_multiplier(OVERLOAD_DELAY_MULTIPLIER)
}

fn classify_bad_request(lower: &str) -> ErrorKind {
    if contains_any(lower, CONTEXT_LENGTH_PATTERNS) {
        ErrorKind::ContextLength
    } else if contains_any(lower, CONTENT_FILTER_PATTERNS) {
        ErrorKind::ContentFilter
    } else {
        ErrorKind::InvalidRequest
    }
}

fn contains_any(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| haystack.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn status(code: u16, message: &str) -> ProviderFailure {
        ProviderFailure::Status {
            status: code,
            message: message.to_string(),
            retry_after: None,
        }
    }

    #[test]
    fn test_rate_limit() {
        let err = translate_failure(&ProviderFailure::Status {
            status: 429,
            message: "Too many requests".into(),
            retry_after: Some(Duration::from_secs(7)),
        });
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(err.delay_multiplier(), 1.0);
    }

    #[test]
    fn test_529_is_overload_with_multiplier() {
        let err = translate_failure(&status(529, "Overloaded"));
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert!(err.is_retryable());
        assert_eq!(err.delay_multiplier(), OVERLOAD_DELAY_MULTIPLIER);
    }

    #[test]
    fn test_overloaded_variant_and_body() {
        let err = translate_failure(&ProviderFailure::Overloaded {
            message: "busy".into(),
            retry_after: None,
        });
        assert_eq!(err.delay_multiplier(), OVERLOAD_DELAY_MULTIPLIER);

        let err = translate_failure(&status(503, r#"{"type":"overloaded_error"}"#));
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert_eq!(err.delay_multiplier(), OVERLOAD_DELAY_MULTIPLIER);
    }

    #[test]
    fn test_5xx_is_retryable_unavailable() {
        for code in [500, 502, 503, 504] {
            let err = translate_failure(&status(code, "upstream error"));
            assert_eq!(err.kind(), ErrorKind::ProviderUnavailable, "status {code}");
            assert!(err.is_retryable());
            assert_eq!(err.delay_multiplier(), 1.0);
        }
    }

    #[test]
    fn test_auth_and_access() {
        assert_eq!(
            translate_failure(&status(401, "bad key")).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            translate_failure(&status(403, "nope")).kind(),
            ErrorKind::AccessDenied
        );
        assert_eq!(
            translate_failure(&status(404, "no such model")).kind(),
            ErrorKind::NotFound
        );
        assert!(!translate_failure(&status(401, "bad key")).is_retryable());
    }

    #[test]
    fn test_bad_request_refinement() {
        let err = translate_failure(&status(400, "prompt is too long: 210000 tokens"));
        assert_eq!(err.kind(), ErrorKind::ContextLength);
        assert!(!err.is_retryable());

        let err = translate_failure(&status(400, "Output blocked by content filter"));
        assert_eq!(err.kind(), ErrorKind::ContentFilter);

        let err = translate_failure(&status(400, "messages: field required"));
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_other_status_is_generic_not_retryable() {
        let err = translate_failure(&status(418, "teapot"));
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timeout_and_transport() {
        let err = translate_failure(&ProviderFailure::Timeout("60s".into()));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());

        let err = translate_failure(&ProviderFailure::Transport("connection reset".into()));
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_cause_is_preserved() {
        let failure = status(500, "boom");
        let err = translate_failure(&failure);
        assert_eq!(err.cause(), &failure);
        assert_eq!(err.status_code(), Some(500));
    }
}
