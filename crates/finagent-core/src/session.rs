//! Per-session pipeline and aggregation.
//!
//! `run_session` pulls raw messages from one agent run, normalizes them, and
//! pushes events into a bounded channel one at a time. The channel is the
//! backpressure boundary: when the consumer (SSE writer or aggregator) falls
//! behind, `send().await` suspends the pull loop instead of buffering or
//! dropping. A closed receiver stops the loop and drops the run, cancelling
//! the agent invocation.

use tokio::sync::mpsc;

use crate::agent::driver::AgentDriver;
use crate::agent::types::AgentMessage;
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::events::{self, AgentIdentity, EventPayload, SessionEvent, UsageInfo};

/// Events buffered between the pipeline and a consumer.
pub const EVENT_CHANNEL_BUFFER: usize = 256;

/// Run one full agent session, publishing normalized events into `tx`.
///
/// Emits the two fixed bootstrap progress events unconditionally, then one
/// normalized event per raw message in emission order, ending with exactly
/// one terminal event (`Complete` or `Error`). Raw messages after the first
/// `Result` are never read: the loop breaks and the dropped run kills the
/// agent process.
pub async fn run_session(
    driver: &dyn AgentDriver,
    prompt: &str,
    max_turns: u32,
    agent: &AgentConfig,
    tx: mpsc::Sender<SessionEvent>,
) {
    let identity = AgentIdentity::from(agent);

    if tx.send(events::session_start_event(agent)).await.is_err() {
        return;
    }
    if tx.send(events::processing_event()).await.is_err() {
        return;
    }

    let mut run = match driver.start(prompt, max_turns, agent).await {
        Ok(run) => run,
        Err(e) => {
            tracing::error!("failed to start agent run: {e}");
            let _ = tx.send(SessionEvent::error(e.to_string())).await;
            return;
        }
    };

    let mut parts: Vec<String> = Vec::new();
    loop {
        match run.next().await {
            Some(Ok(message)) => {
                let terminal = matches!(message, AgentMessage::Result { .. });
                for event in events::normalize(&message, &mut parts, &identity) {
                    if tx.send(event).await.is_err() {
                        // Receiver gone (client disconnected): stop pulling.
                        return;
                    }
                }
                if terminal {
                    break;
                }
            }
            Some(Err(e)) => {
                tracing::error!("agent run failed: {e}");
                let _ = tx.send(SessionEvent::error(e.to_string())).await;
                break;
            }
            None => {
                // Exhausted without a Result: successful session, no usage.
                let _ = tx
                    .send(events::complete_event(&parts, None, &identity))
                    .await;
                break;
            }
        }
    }
}

/// Aggregate result for synchronous callers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryOutcome {
    pub response: String,
    pub usage: Option<UsageInfo>,
    pub agent_info: AgentIdentity,
}

/// Fold a session's event stream into one outcome.
///
/// Consumes events to the terminal one; an `Error` terminal fails the whole
/// aggregation rather than producing a partial success.
pub async fn aggregate(mut rx: mpsc::Receiver<SessionEvent>) -> Result<QueryOutcome, AgentError> {
    while let Some(event) = rx.recv().await {
        match event.payload {
            EventPayload::Complete {
                response,
                usage,
                agent_info,
                ..
            } => {
                return Ok(QueryOutcome {
                    response,
                    usage,
                    agent_info,
                });
            }
            EventPayload::Error { error, .. } => return Err(AgentError::Failed(error)),
            _ => {}
        }
    }
    Err(AgentError::Failed(
        "agent session ended without a terminal event".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::driver::AgentRun;
    use crate::agent::types::{ContentBlock, ResultStats};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Driver that replays a fixed message script through a fresh channel.
    struct ScriptedDriver {
        script: Mutex<Option<Vec<Result<AgentMessage, AgentError>>>>,
    }

    impl ScriptedDriver {
        fn new(script: Vec<Result<AgentMessage, AgentError>>) -> Self {
            Self {
                script: Mutex::new(Some(script)),
            }
        }
    }

    #[async_trait]
    impl AgentDriver for ScriptedDriver {
        async fn start(
            &self,
            _prompt: &str,
            _max_turns: u32,
            _config: &AgentConfig,
        ) -> Result<AgentRun, AgentError> {
            let script = self
                .script
                .lock()
                .unwrap()
                .take()
                .expect("scripted driver supports one run");
            let (tx, rx) = mpsc::channel(8);
            tokio::spawn(async move {
                for item in script {
                    if tx.send(item).await.is_err() {
                        break;
                    }
                }
            });
            Ok(AgentRun::new(rx))
        }
    }

    /// Driver whose start always fails.
    struct BrokenDriver;

    #[async_trait]
    impl AgentDriver for BrokenDriver {
        async fn start(
            &self,
            _prompt: &str,
            _max_turns: u32,
            _config: &AgentConfig,
        ) -> Result<AgentRun, AgentError> {
            Err(AgentError::BinaryNotFound("claude".to_string()))
        }
    }

    fn text(s: &str) -> ContentBlock {
        ContentBlock::Text {
            text: s.to_string(),
        }
    }

    fn assistant(blocks: Vec<ContentBlock>) -> Result<AgentMessage, AgentError> {
        Ok(AgentMessage::Assistant { content: blocks })
    }

    fn result(session_id: &str) -> Result<AgentMessage, AgentError> {
        Ok(AgentMessage::Result {
            stats: ResultStats {
                duration_ms: 100,
                total_cost_usd: Some(0.01),
                num_turns: 2,
                session_id: session_id.to_string(),
            },
        })
    }

    async fn collect_events(driver: &dyn AgentDriver) -> Vec<SessionEvent> {
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let config = AgentConfig::default();
        run_session(driver, "find news", 20, &config, tx).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn aggregate_joins_text_in_emission_order() {
        let driver = ScriptedDriver::new(vec![
            assistant(vec![text("first")]),
            assistant(vec![
                text("second"),
                ContentBlock::ToolUse {
                    name: "Write".to_string(),
                    input: json!({"path": "news.csv"}),
                },
            ]),
            result("sess-1"),
        ]);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let config = AgentConfig::default();
        tokio::spawn(async move {
            run_session(&driver, "find news", 20, &config, tx).await;
        });

        let outcome = aggregate(rx).await.unwrap();
        assert_eq!(outcome.response, "first\nsecond");
        assert_eq!(outcome.usage.unwrap().session_id, "sess-1");
        assert_eq!(outcome.agent_info.name, "Finance News Aggregator");
    }

    #[tokio::test]
    async fn stream_emits_bootstrap_pair_then_single_terminal() {
        let driver = ScriptedDriver::new(vec![
            assistant(vec![text("working")]),
            result("sess-2"),
        ]);

        let events = collect_events(&driver).await;

        assert!(
            matches!(&events[0].payload, EventPayload::Progress { status, .. }
                if status == "initializing")
        );
        assert!(
            matches!(&events[1].payload, EventPayload::Progress { status, .. }
                if status == "processing")
        );
        let terminal_count = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminal_count, 1);
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn abnormal_termination_yields_error_terminal() {
        let driver = ScriptedDriver::new(vec![
            assistant(vec![text("partial")]),
            Err(AgentError::Exited {
                code: Some(1),
                stderr: "agent crashed".to_string(),
            }),
        ]);

        let events = collect_events(&driver).await;
        let last = events.last().unwrap();
        assert!(matches!(&last.payload, EventPayload::Error { error, .. }
                if !error.is_empty()));

        // Same script through the aggregate path fails the request.
        let driver = ScriptedDriver::new(vec![Err(AgentError::Exited {
            code: Some(1),
            stderr: "agent crashed".to_string(),
        })]);
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let config = AgentConfig::default();
        tokio::spawn(async move {
            run_session(&driver, "find news", 20, &config, tx).await;
        });
        assert!(matches!(aggregate(rx).await, Err(AgentError::Failed(_))));
    }

    #[tokio::test]
    async fn no_text_blocks_yields_fallback_response() {
        let driver = ScriptedDriver::new(vec![
            assistant(vec![ContentBlock::ToolUse {
                name: "WebSearch".to_string(),
                input: json!({}),
            }]),
            result("sess-3"),
        ]);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let config = AgentConfig::default();
        tokio::spawn(async move {
            run_session(&driver, "find news", 20, &config, tx).await;
        });

        let outcome = aggregate(rx).await.unwrap();
        assert_eq!(outcome.response, events::NO_RESPONSE_FALLBACK);
        assert!(outcome.usage.is_some());
    }

    #[tokio::test]
    async fn messages_after_first_result_are_ignored() {
        let driver = ScriptedDriver::new(vec![
            result("sess-4"),
            assistant(vec![text("late text")]),
        ]);

        let events = collect_events(&driver).await;
        assert!(events.last().unwrap().is_terminal());
        assert!(!events
            .iter()
            .any(|e| matches!(&e.payload, EventPayload::Response { .. })));
    }

    #[tokio::test]
    async fn exhaustion_without_result_completes_without_usage() {
        let driver = ScriptedDriver::new(vec![assistant(vec![text("only text")])]);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let config = AgentConfig::default();
        tokio::spawn(async move {
            run_session(&driver, "find news", 20, &config, tx).await;
        });

        let outcome = aggregate(rx).await.unwrap();
        assert_eq!(outcome.response, "only text");
        assert!(outcome.usage.is_none());
    }

    #[tokio::test]
    async fn driver_start_failure_follows_both_bootstrap_events() {
        let events = collect_events(&BrokenDriver).await;
        assert_eq!(events.len(), 3);
        assert!(
            matches!(&events[0].payload, EventPayload::Progress { status, .. }
                if status == "initializing")
        );
        assert!(
            matches!(&events[1].payload, EventPayload::Progress { status, .. }
                if status == "processing")
        );
        assert!(matches!(&events[2].payload, EventPayload::Error { .. }));
    }

    #[tokio::test]
    async fn concurrent_sessions_do_not_interleave_channels() {
        let driver_a = ScriptedDriver::new(vec![assistant(vec![text("alpha")]), result("sess-a")]);
        let driver_b = ScriptedDriver::new(vec![assistant(vec![text("beta")]), result("sess-b")]);

        let (events_a, events_b) =
            tokio::join!(collect_events(&driver_a), collect_events(&driver_b));

        let responses = |events: &[SessionEvent]| -> Vec<String> {
            events
                .iter()
                .filter_map(|e| match &e.payload {
                    EventPayload::Response { content, .. } => Some(content.clone()),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(responses(&events_a), vec!["alpha".to_string()]);
        assert_eq!(responses(&events_b), vec!["beta".to_string()]);

        let session_of = |events: &[SessionEvent]| -> String {
            events
                .iter()
                .find_map(|e| match &e.payload {
                    EventPayload::Complete { usage, .. } => {
                        usage.as_ref().map(|u| u.session_id.clone())
                    }
                    _ => None,
                })
                .unwrap()
        };
        assert_eq!(session_of(&events_a), "sess-a");
        assert_eq!(session_of(&events_b), "sess-b");
    }
}
