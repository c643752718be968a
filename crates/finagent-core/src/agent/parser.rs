//! Line-oriented parser for the agent CLI's stream-json output.
//!
//! Each stdout line is one JSON object tagged with a `type` field. Lines the
//! pipeline does not consume (`system`, `user`, partial stream events) are
//! skipped; malformed JSON is an error.

use serde_json::Value;

use crate::agent::types::{AgentMessage, ContentBlock, ResultStats};
use crate::error::AgentError;

/// Parse one stdout line into a message, `None` for blank or skipped lines.
pub fn parse_line(line: &str) -> Result<Option<AgentMessage>, AgentError> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line)
        .map_err(|e| AgentError::Protocol(format!("invalid JSON line: {e}")))?;

    match value.get("type").and_then(Value::as_str) {
        Some("assistant") => Ok(Some(parse_assistant(&value))),
        Some("result") => {
            let stats: ResultStats = serde_json::from_value(value)
                .map_err(|e| AgentError::Protocol(format!("invalid result message: {e}")))?;
            Ok(Some(AgentMessage::Result { stats }))
        }
        Some(_) => Ok(None),
        None => Err(AgentError::Protocol(
            "message missing type field".to_string(),
        )),
    }
}

fn parse_assistant(value: &Value) -> AgentMessage {
    let mut content = Vec::new();
    if let Some(blocks) = value.pointer("/message/content").and_then(Value::as_array) {
        for block in blocks {
            match serde_json::from_value::<ContentBlock>(block.clone()) {
                Ok(parsed) => content.push(parsed),
                Err(_) => {
                    // Thinking blocks and other block kinds the pipeline
                    // does not consume.
                    tracing::debug!(
                        block_type = ?block.get("type"),
                        "skipping unsupported content block"
                    );
                }
            }
        }
    }
    AgentMessage::Assistant { content }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assistant_message_in_block_order() {
        let line = r#"{"type":"assistant","message":{"content":[
            {"type":"text","text":"checking markets"},
            {"type":"tool_use","name":"WebSearch","input":{"query":"finance news"}},
            {"type":"text","text":"done"}
        ]}}"#
            .replace('\n', "");

        let message = parse_line(&line).unwrap().unwrap();
        let AgentMessage::Assistant { content } = message else {
            panic!("expected assistant message");
        };
        assert_eq!(content.len(), 3);
        assert!(matches!(&content[0], ContentBlock::Text { text } if text == "checking markets"));
        assert!(matches!(&content[1], ContentBlock::ToolUse { name, .. } if name == "WebSearch"));
        assert!(matches!(&content[2], ContentBlock::Text { text } if text == "done"));
    }

    #[test]
    fn parses_result_message_stats() {
        let line = r#"{"type":"result","subtype":"success","duration_ms":4182,"total_cost_usd":0.031,"num_turns":6,"session_id":"sess-1"}"#;
        let message = parse_line(line).unwrap().unwrap();
        let AgentMessage::Result { stats } = message else {
            panic!("expected result message");
        };
        assert_eq!(stats.duration_ms, 4182);
        assert_eq!(stats.total_cost_usd, Some(0.031));
        assert_eq!(stats.num_turns, 6);
        assert_eq!(stats.session_id, "sess-1");
    }

    #[test]
    fn skips_system_and_blank_lines() {
        assert!(parse_line(r#"{"type":"system","subtype":"init"}"#)
            .unwrap()
            .is_none());
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("\r").unwrap().is_none());
    }

    #[test]
    fn skips_unsupported_content_blocks() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"hmm"},{"type":"text","text":"ok"}]}}"#;
        let AgentMessage::Assistant { content } = parse_line(line).unwrap().unwrap() else {
            panic!("expected assistant message");
        };
        assert_eq!(content.len(), 1);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(
            parse_line("{not-json}"),
            Err(AgentError::Protocol(_))
        ));
        assert!(matches!(
            parse_line(r#"{"no_type":true}"#),
            Err(AgentError::Protocol(_))
        ));
    }
}
