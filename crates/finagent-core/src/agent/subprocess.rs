//! CLI subprocess driver.
//!
//! Runs the agent CLI in non-interactive stream-json mode: prompt on stdin,
//! one JSON message per stdout line. The child is spawned with
//! `kill_on_drop`, so abandoning the run (client disconnect, early break)
//! releases the process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::agent::driver::{AgentDriver, AgentRun, RUN_CHANNEL_BUFFER};
use crate::agent::parser;
use crate::agent::types::AgentMessage;
use crate::config::AgentConfig;
use crate::error::AgentError;

const DEFAULT_BINARY: &str = "claude";

/// Drives the agent CLI as a subprocess.
#[derive(Debug, Clone, Default)]
pub struct CliDriver;

impl CliDriver {
    pub fn new() -> Self {
        Self
    }

    fn resolve_binary(config: &AgentConfig) -> Result<PathBuf, AgentError> {
        if let Some(path) = &config.binary {
            return Ok(path.clone());
        }
        which::which(DEFAULT_BINARY)
            .map_err(|_| AgentError::BinaryNotFound(DEFAULT_BINARY.to_string()))
    }

    fn build_command(binary: &Path, max_turns: u32, config: &AgentConfig) -> Command {
        let mut command = Command::new(binary);
        command
            .arg("-p")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose")
            .arg("--max-turns")
            .arg(max_turns.to_string())
            .arg("--permission-mode")
            .arg(config.permission_mode.as_flag())
            .arg("--system-prompt")
            .arg(&config.system_prompt);
        if !config.allowed_tools.is_empty() {
            command
                .arg("--allowed-tools")
                .arg(config.allowed_tools.join(","));
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl AgentDriver for CliDriver {
    async fn start(
        &self,
        prompt: &str,
        max_turns: u32,
        config: &AgentConfig,
    ) -> Result<AgentRun, AgentError> {
        let binary = Self::resolve_binary(config)?;
        let mut command = Self::build_command(&binary, max_turns, config);

        let mut child = command.spawn().map_err(|source| AgentError::Spawn {
            binary: binary.clone(),
            source,
        })?;
        tracing::debug!(binary = %binary.display(), max_turns, "agent process spawned");

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(AgentError::Stdin)?;
            stdin.shutdown().await.map_err(AgentError::Stdin)?;
        }

        let stdout = child.stdout.take().ok_or(AgentError::MissingStdout)?;
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::channel(RUN_CHANNEL_BUFFER);
        let reader = tokio::spawn(async move {
            // stderr must be drained while the process runs; a full stderr
            // pipe blocks the agent and stdout never reaches EOF.
            let stderr_task = stderr.map(|mut stderr| {
                tokio::spawn(async move {
                    let mut buf = String::new();
                    let _ = stderr.read_to_string(&mut buf).await;
                    buf
                })
            });

            let mut lines = BufReader::new(stdout).lines();
            let mut saw_result = false;

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match parser::parse_line(&line) {
                        Ok(Some(message)) => {
                            saw_result |= message.is_terminal();
                            if tx.send(Ok(message)).await.is_err() {
                                // Consumer stopped pulling.
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    },
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(AgentError::Read(e))).await;
                        return;
                    }
                }
            }

            // A failure exit without a terminal Result is an abnormal end of
            // the sequence; a failure after Result is ignored.
            match child.wait().await {
                Ok(status) if !status.success() && !saw_result => {
                    let stderr_text = captured_stderr(stderr_task).await;
                    let _ = tx
                        .send(Err(AgentError::Exited {
                            code: status.code(),
                            stderr: stderr_text,
                        }))
                        .await;
                }
                Ok(status) => {
                    tracing::debug!(code = ?status.code(), "agent process exited");
                }
                Err(e) => {
                    tracing::warn!("failed to reap agent process: {e}");
                }
            }
        });

        Ok(AgentRun::with_reader(rx, reader))
    }
}

async fn captured_stderr(task: Option<JoinHandle<String>>) -> String {
    let Some(task) = task else {
        return String::new();
    };
    task.await
        .map(|buf| buf.trim().to_string())
        .unwrap_or_default()
}
