//! Agent identity and invocation settings.
//!
//! Built once at startup and shared read-only across sessions; nothing here
//! mutates after construction.

use std::path::PathBuf;

use serde::Serialize;

/// Tool execution permission mode passed through to the agent CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    Default,
    AcceptEdits,
    BypassPermissions,
}

impl PermissionMode {
    /// CLI flag value for `--permission-mode`.
    pub fn as_flag(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::AcceptEdits => "acceptEdits",
            Self::BypassPermissions => "bypassPermissions",
        }
    }
}

/// Immutable configuration for the external research agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentConfig {
    /// Display name used in progress events and the identity endpoint.
    pub name: String,
    /// Human-readable role description.
    pub role: String,
    /// Tools the agent is allowed to use.
    pub allowed_tools: Vec<String>,
    /// System prompt sent with every session.
    pub system_prompt: String,
    pub permission_mode: PermissionMode,
    /// Explicit path to the agent CLI; resolved from PATH when `None`.
    #[serde(skip)]
    pub binary: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Finance News Aggregator".to_string(),
            role: "Financial News Research and Data Export Specialist".to_string(),
            allowed_tools: ["WebSearch", "WebFetch", "Read", "Write", "Bash"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            permission_mode: PermissionMode::AcceptEdits,
            binary: None,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a finance-focused research and data aggregation specialist with an \
engineering mindset. Your personality is analytical, precise, and \
systematic, approaching tasks with technical rigor and efficiency.

Your primary objective is to:
1. Search the internet for the top 5 most recent and relevant finance news articles
2. Extract key information including: headline, source, publication date, summary, and URL
3. Structure the data in a clean, organized format
4. Export the compiled news data into an Excel file (.xlsx or .csv)

Your workflow:
- Use WebSearch to find current finance news from reputable sources
- Use WebFetch to retrieve and analyze article content when needed
- Process and structure the data systematically
- Use Bash commands (like python with pandas or similar tools) to create an Excel file
- Use Write to save the final output file

Approach each task with engineering precision: validate data quality, ensure \
proper formatting, handle errors gracefully, and deliver clean, structured \
output. Focus on accuracy, reliability, and producing actionable financial \
intelligence in an easily accessible format.";
