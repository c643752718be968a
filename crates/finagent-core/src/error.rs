//! Error types for agent sessions.

use std::path::PathBuf;

/// Failures raised by the session driver or the aggregation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent binary not found on PATH: {0}")]
    BinaryNotFound(String),

    #[error("failed to spawn agent binary {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("agent process has no stdout handle")]
    MissingStdout,

    #[error("failed to write prompt to agent stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("failed to read agent output: {0}")]
    Read(#[source] std::io::Error),

    #[error("malformed agent output: {0}")]
    Protocol(String),

    #[error("agent exited with status {code:?}: {stderr}")]
    Exited { code: Option<i32>, stderr: String },

    /// Terminal error event observed while aggregating a session.
    #[error("{0}")]
    Failed(String),
}
