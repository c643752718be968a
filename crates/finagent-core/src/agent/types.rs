//! Raw message protocol produced by the agent CLI.
//!
//! These are the wire shapes of the agent's stream-json output, reduced to
//! the pieces the pipeline consumes. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// One content block within an assistant message, in block order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    /// Observed in the stream but never surfaced as a public event.
    ToolResult {
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        is_error: Option<bool>,
    },
}

/// Usage and cost metadata carried by the agent's terminal result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultStats {
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub total_cost_usd: Option<f64>,
    #[serde(default)]
    pub num_turns: u32,
    #[serde(default)]
    pub session_id: String,
}

/// A single message pulled from a running agent session.
#[derive(Debug, Clone)]
pub enum AgentMessage {
    /// Assistant turn with ordered content blocks.
    Assistant { content: Vec<ContentBlock> },
    /// Terminal result; at most one per session, everything after it is
    /// ignored.
    Result { stats: ResultStats },
}

impl AgentMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result { .. })
    }
}
