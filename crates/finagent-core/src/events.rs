//! Normalized session event protocol.
//!
//! `SessionEvent` is the single event protocol both output paths consume:
//! the aggregator folds it into one result, the SSE publisher serializes it
//! message-by-message. Wire shape per event:
//! `{"type": "...", "data": {...}, "timestamp": "<RFC 3339>"}`.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::agent::types::{AgentMessage, ContentBlock, ResultStats};
use crate::config::AgentConfig;

/// Fallback aggregate response when a session completes without text output.
pub const NO_RESPONSE_FALLBACK: &str = "No response received";

/// Static agent identity attached to terminal events and aggregate results.
#[derive(Debug, Clone, Serialize)]
pub struct AgentIdentity {
    pub name: String,
    pub role: String,
}

impl From<&AgentConfig> for AgentIdentity {
    fn from(config: &AgentConfig) -> Self {
        Self {
            name: config.name.clone(),
            role: config.role.clone(),
        }
    }
}

/// Usage metadata surfaced on completion, mapped from [`ResultStats`].
#[derive(Debug, Clone, Serialize)]
pub struct UsageInfo {
    pub duration_ms: u64,
    pub total_cost_usd: Option<f64>,
    pub num_turns: u32,
    pub session_id: String,
}

impl From<&ResultStats> for UsageInfo {
    fn from(stats: &ResultStats) -> Self {
        Self {
            duration_ms: stats.duration_ms,
            total_cost_usd: stats.total_cost_usd,
            num_turns: stats.num_turns,
            session_id: stats.session_id.clone(),
        }
    }
}

/// Event kinds and their payloads; `Complete` and `Error` are terminal.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    Progress {
        message: String,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
    },
    ToolUse {
        tool: String,
        input: Value,
        message: String,
        status: String,
    },
    Response {
        content: String,
        partial: bool,
        message: String,
    },
    Complete {
        response: String,
        #[serde(serialize_with = "usage_or_empty")]
        usage: Option<UsageInfo>,
        status: String,
        message: String,
        agent_info: AgentIdentity,
    },
    Error {
        error: String,
        message: String,
        status: String,
    },
}

/// Missing usage goes out as an empty object, not `null`.
pub fn usage_or_empty<S>(usage: &Option<UsageInfo>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match usage {
        Some(usage) => usage.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// One normalized, timestamped unit of session progress.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Terminal events end the session; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.payload,
            EventPayload::Complete { .. } | EventPayload::Error { .. }
        )
    }

    pub fn error(detail: impl Into<String>) -> Self {
        let error = detail.into();
        Self::new(EventPayload::Error {
            message: format!("[ERROR] Error: {error}"),
            error,
            status: "failed".to_string(),
        })
    }
}

/// First bootstrap event, emitted on session start.
pub fn session_start_event(agent: &AgentConfig) -> SessionEvent {
    SessionEvent::new(EventPayload::Progress {
        message: format!("[AGENT] Starting {}...", agent.name),
        status: "initializing".to_string(),
        agent: Some(agent.name.clone()),
    })
}

/// Second bootstrap event, emitted before the driver is started.
pub fn processing_event() -> SessionEvent {
    SessionEvent::new(EventPayload::Progress {
        message: "[PROCESSING] Processing your request...".to_string(),
        status: "processing".to_string(),
        agent: None,
    })
}

/// Terminal completion event carrying the newline-joined response so far.
pub fn complete_event(
    parts: &[String],
    usage: Option<UsageInfo>,
    agent: &AgentIdentity,
) -> SessionEvent {
    let response = if parts.is_empty() {
        NO_RESPONSE_FALLBACK.to_string()
    } else {
        parts.join("\n")
    };
    SessionEvent::new(EventPayload::Complete {
        response,
        usage,
        status: "completed".to_string(),
        message: "[SUCCESS] Task completed successfully!".to_string(),
        agent_info: agent.clone(),
    })
}

/// Map one raw message to zero or more events, preserving block order.
///
/// Text block contents are appended to `parts` so the terminal `Complete`
/// event can carry the concatenated response.
pub fn normalize(
    message: &AgentMessage,
    parts: &mut Vec<String>,
    agent: &AgentIdentity,
) -> Vec<SessionEvent> {
    match message {
        AgentMessage::Assistant { content } => {
            let mut events = Vec::new();
            for block in content {
                match block {
                    ContentBlock::Text { text } => {
                        parts.push(text.clone());
                        events.push(SessionEvent::new(EventPayload::Response {
                            content: text.clone(),
                            partial: true,
                            message: "[THINKING] Agent thinking...".to_string(),
                        }));
                    }
                    ContentBlock::ToolUse { name, input } => {
                        events.push(SessionEvent::new(EventPayload::ToolUse {
                            tool: name.clone(),
                            input: input.clone(),
                            message: format!("[TOOL] Using {name} tool..."),
                            status: "executing".to_string(),
                        }));
                    }
                    ContentBlock::ToolResult { is_error, .. } => {
                        // Observed, not surfaced.
                        tracing::debug!(is_error = ?is_error, "tool result block received");
                    }
                }
            }
            events
        }
        AgentMessage::Result { stats } => {
            vec![complete_event(parts, Some(UsageInfo::from(stats)), agent)]
        }
    }
}
