//! Newline-delimited JSON bridge to the platform helper over stdio.
//!
//! The helper owns the accessibility APIs; this process only classifies and
//! decides. Logging goes to stderr so stdout stays a clean command stream.

pub mod protocol;
pub mod reader;

pub use protocol::{AgentCommand, CommandWriter, HostMessage, StdioBackAction, StdioNotifier};
pub use reader::{read_host_messages, LatestSnapshot, SnapshotSink};
