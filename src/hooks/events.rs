//! Canonical event names.
//!
//! Names follow a `namespace:action` convention. A `:debug` or `:raw` suffix
//! marks a more verbose variant of the same logical event; subscribers of the
//! base name do not receive the variants unless they subscribe to them (or to
//! a wildcard pattern).

pub const SESSION_START: &str = "session:start";
pub const SESSION_END: &str = "session:end";
pub const SESSION_FORK: &str = "session:fork";

pub const PROMPT_SUBMIT: &str = "prompt:submit";

pub const PROVIDER_REQUEST: &str = "provider:request";
pub const PROVIDER_RESPONSE: &str = "provider:response";
pub const PROVIDER_RETRY: &str = "provider:retry";
pub const PROVIDER_THROTTLE: &str = "provider:throttle";
pub const PROVIDER_ERROR: &str = "provider:error";
pub const PROVIDER_TOOL_SEQUENCE_REPAIRED: &str = "provider:tool_sequence_repaired";

pub const TOOL_SELECTING: &str = "tool:selecting";
pub const TOOL_PRE: &str = "tool:pre";
pub const TOOL_POST: &str = "tool:post";
pub const TOOL_ERROR: &str = "tool:error";

pub const CANCEL_REQUESTED: &str = "cancel:requested";
pub const CANCEL_COMPLETED: &str = "cancel:completed";

pub const ORCHESTRATOR_COMPLETE: &str = "orchestrator:complete";

/// Every event the kernel itself emits.
pub const ALL_EVENTS: &[&str] = &[
    SESSION_START,
    SESSION_END,
    SESSION_FORK,
    PROMPT_SUBMIT,
    PROVIDER_REQUEST,
    PROVIDER_RESPONSE,
    PROVIDER_RETRY,
    PROVIDER_THROTTLE,
    PROVIDER_ERROR,
    PROVIDER_TOOL_SEQUENCE_REPAIRED,
    TOOL_SELECTING,
    TOOL_PRE,
    TOOL_POST,
    TOOL_ERROR,
    CANCEL_REQUESTED,
    CANCEL_COMPLETED,
    ORCHESTRATOR_COMPLETE,
];

pub const DEBUG_SUFFIX: &str = ":debug";
pub const RAW_SUFFIX: &str = ":raw";

/// Strip a verbosity suffix, returning the logical event name.
///
/// ```
/// use agentkernel::hooks::events;
///
/// assert_eq!(events::base_name("provider:request:raw"), "provider:request");
/// assert_eq!(events::base_name("tool:pre"), "tool:pre");
/// ```
pub fn base_name(name: &str) -> &str {
    name.strip_suffix(DEBUG_SUFFIX)
        .or_else(|| name.strip_suffix(RAW_SUFFIX))
        .unwrap_or(name)
}

/// Whether `name` is a `:debug` / `:raw` variant of another event.
pub fn is_verbosity_variant(name: &str) -> bool {
    base_name(name) != name
}

/// The `:debug` variant of an event.
pub fn debug_variant(name: &str) -> String {
    format!("{}{}", base_name(name), DEBUG_SUFFIX)
}

/// The `:raw` variant of an event.
pub fn raw_variant(name: &str) -> String {
    format!("{}{}", base_name(name), RAW_SUFFIX)
}

/// Match an event name against a registration pattern.
///
/// Supported patterns: the exact name, `*` (everything) and `namespace:*`
/// (every event in the namespace, including verbosity variants).
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    if pattern == "*" || pattern == name {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) if prefix.ends_with(':') => name.starts_with(prefix),
        _ => false,
    }
}
