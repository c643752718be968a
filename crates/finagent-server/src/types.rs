//! Request and response types for the API

use finagent_core::{AgentIdentity, UsageInfo};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ============================================================================
// Query Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Task for the agent.
    pub prompt: String,
    /// Upper bound on agentic turns.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

fn default_max_turns() -> u32 {
    20
}

impl QueryRequest {
    /// Reject malformed requests before the agent is ever invoked.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.prompt.trim().is_empty() {
            return Err(AppError::BadRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        if self.max_turns == 0 {
            return Err(AppError::BadRequest(
                "max_turns must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub status: String,
    pub response: String,
    #[serde(serialize_with = "finagent_core::events::usage_or_empty")]
    pub usage: Option<UsageInfo>,
    pub agent_info: AgentIdentity,
}

// ============================================================================
// File Types
// ============================================================================

#[derive(Serialize)]
pub struct FileEntry {
    pub filename: String,
    pub size: u64,
    pub modified: String,
}

#[derive(Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileEntry>,
    pub count: usize,
    /// Filesystem problem surfaced inline; the listing degrades instead of
    /// failing the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
