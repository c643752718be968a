//! Core library for the finance news agent gateway.
//!
//! Owns the agent session driver contract and its CLI subprocess
//! implementation, the event normalizer, the aggregator, and the per-session
//! pipeline. HTTP transport lives in `finagent-server`.

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod session;

pub use agent::driver::{AgentDriver, AgentRun};
pub use agent::subprocess::CliDriver;
pub use agent::types::{AgentMessage, ContentBlock, ResultStats};
pub use config::{AgentConfig, PermissionMode};
pub use error::AgentError;
pub use events::{AgentIdentity, EventPayload, SessionEvent, UsageInfo};
pub use session::{aggregate, run_session, QueryOutcome, EVENT_CHANNEL_BUFFER};
