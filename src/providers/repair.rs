//! Tool-call sequence repair.
//!
//! Providers reject a history in which an assistant tool call has no
//! matching tool result. Interrupted executions and hook denials can leave
//! such orphans behind, so before every request the history is scanned and
//! each orphan gets a synthetic error result.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{KernelError, Result};
use crate::session::Message;

/// Prefix of every synthetic tool result.
pub const TOOL_RESULT_MISSING_MARKER: &str = "[SYSTEM ERROR: Tool result missing]";

/// A tool call with no result before the next assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedToolCall {
    /// Index of the assistant message that issued the call.
    pub message_index: usize,
    pub call_id: String,
    pub tool_name: String,
}

/// What a repair pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub repaired: Vec<OrphanedToolCall>,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        self.repaired.is_empty()
    }

    pub fn len(&self) -> usize {
        self.repaired.len()
    }

    pub fn call_ids(&self) -> Vec<&str> {
        self.repaired.iter().map(|o| o.call_id.as_str()).collect()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.repaired.iter().map(|o| o.tool_name.as_str()).collect()
    }

    /// Payload for the `provider:tool_sequence_repaired` event.
    pub fn to_event_payload(&self) -> Value {
        json!({
            "repair_count": self.len(),
            "repairs": self
                .repaired
                .iter()
                .map(|o| json!({"tool_call_id": o.call_id, "tool_name": o.tool_name}))
                .collect::<Vec<_>>(),
        })
    }
}

/// Find every tool call whose id has no tool result before the next
/// assistant message.
pub fn find_orphaned_tool_calls(history: &[Message]) -> Vec<OrphanedToolCall> {
    let mut orphans = Vec::new();

    for (idx, message) in history.iter().enumerate() {
        if !message.is_assistant() || !message.has_tool_calls() {
            continue;
        }

        let answered: Vec<&str> = history[idx + 1..]
            .iter()
            .take_while(|m| !m.is_assistant())
            .filter(|m| m.is_tool_result())
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        for call in message.tool_calls() {
            if !answered.contains(&call.id.as_str()) {
                orphans.push(OrphanedToolCall {
                    message_index: idx,
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                });
            }
        }
    }

    orphans
}

/// Insert a synthetic error result for every orphaned tool call.
///
/// Each synthetic result goes at the end of the contiguous block of tool
/// results that follows its assistant turn, in the order the calls were
/// issued. A history without orphans is left untouched.
pub fn repair_tool_sequence(history: &mut Vec<Message>) -> RepairReport {
    let orphans = find_orphaned_tool_calls(history);
    if orphans.is_empty() {
        return RepairReport::default();
    }

    // Walk assistant turns back to front so earlier indices stay valid.
    let mut turns: Vec<usize> = orphans.iter().map(|o| o.message_index).collect();
    turns.dedup();
    for &turn in turns.iter().rev() {
        let mut insert_at = turn + 1;
        while insert_at < history.len() && history[insert_at].is_tool_result() {
            insert_at += 1;
        }
        for orphan in orphans.iter().filter(|o| o.message_index == turn) {
            history.insert(insert_at, synthetic_result(orphan));
            insert_at += 1;
        }
    }

    warn!(
        repair_count = orphans.len(),
        tool_call_ids = ?orphans.iter().map(|o| o.call_id.as_str()).collect::<Vec<_>>(),
        "Repaired orphaned tool calls in conversation history"
    );

    RepairReport { repaired: orphans }
}

/// Strict check that every tool call has a result.
///
/// # Errors
/// Returns [`KernelError::HistoryInvariant`] naming the first orphan.
pub fn validate_tool_sequence(history: &[Message]) -> Result<()> {
    let orphans = find_orphaned_tool_calls(history);
    match orphans.first() {
        None => Ok(()),
        Some(first) => Err(KernelError::HistoryInvariant(format!(
            "{} tool call(s) without a result; first is '{}' ({}) at message {}",
            orphans.len(),
            first.tool_name,
            first.call_id,
            first.message_index
        ))),
    }
}

fn synthetic_result(orphan: &OrphanedToolCall) -> Message {
    let content = format!(
        "{} The result of tool '{}' (call {}) was lost, most likely because its \
         execution was interrupted. Do not assume it succeeded.",
        TOOL_RESULT_MISSING_MARKER, orphan.tool_name, orphan.call_id
    );
    Message::tool_result(&orphan.call_id, &content)
}
