//! Agent session driver: contract, CLI subprocess implementation, and the
//! raw message protocol.

pub mod driver;
pub mod parser;
pub mod subprocess;
pub mod types;

pub use driver::{AgentDriver, AgentRun};
pub use subprocess::CliDriver;
pub use types::{AgentMessage, ContentBlock, ResultStats};
