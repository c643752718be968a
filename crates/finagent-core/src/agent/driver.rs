//! Agent session driver contract.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::agent::types::AgentMessage;
use crate::config::AgentConfig;
use crate::error::AgentError;

/// Messages buffered between the reader task and the consumer.
pub(crate) const RUN_CHANNEL_BUFFER: usize = 64;

/// A single live agent invocation.
///
/// The message sequence is lazy and non-restartable: each `next()` call may
/// suspend indefinitely while the agent works. Dropping the run cancels the
/// underlying invocation.
pub struct AgentRun {
    rx: mpsc::Receiver<Result<AgentMessage, AgentError>>,
    reader: Option<JoinHandle<()>>,
}

impl AgentRun {
    /// Wrap an already-running message channel.
    pub fn new(rx: mpsc::Receiver<Result<AgentMessage, AgentError>>) -> Self {
        Self { rx, reader: None }
    }

    /// Attach the reader task that owns the agent process; aborting it on
    /// drop releases the process.
    pub(crate) fn with_reader(
        rx: mpsc::Receiver<Result<AgentMessage, AgentError>>,
        reader: JoinHandle<()>,
    ) -> Self {
        Self {
            rx,
            reader: Some(reader),
        }
    }

    /// Pull the next raw message; `None` once the sequence is exhausted.
    pub async fn next(&mut self) -> Option<Result<AgentMessage, AgentError>> {
        self.rx.recv().await
    }
}

impl Drop for AgentRun {
    fn drop(&mut self) {
        // The reader task owns the child handle (spawned kill_on_drop), so
        // aborting it takes the agent process down with it.
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Starts one invocation of the external agent per call.
#[async_trait]
pub trait AgentDriver: Send + Sync {
    async fn start(
        &self,
        prompt: &str,
        max_turns: u32,
        config: &AgentConfig,
    ) -> Result<AgentRun, AgentError>;
}
