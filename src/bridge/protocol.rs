use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::a11y::{BackAction, Notifier, ScreenSnapshot};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// One line read from the host.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostMessage {
    Snapshot(ScreenSnapshot),
    /// The host could not read the foreground tree this time.
    Unavailable,
}

/// One line written to the host.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AgentCommand<'a> {
    Back,
    Notify { message: &'a str },
}

pub fn parse_host_line(line: &str) -> Result<HostMessage> {
    serde_json::from_str(line).context("malformed host message")
}

/// Newline-delimited JSON sink shared by the back action and the notifier.
pub struct CommandWriter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl CommandWriter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn send(&self, command: &AgentCommand<'_>) -> Result<()> {
        let line = serde_json::to_string(command)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow!("command writer lock poisoned"))?;
        writeln!(out, "{line}").context("failed to write host command")?;
        out.flush().context("failed to flush host command")
    }
}

pub struct StdioBackAction {
    writer: Arc<CommandWriter>,
}

impl StdioBackAction {
    pub fn new(writer: Arc<CommandWriter>) -> Self {
        Self { writer }
    }
}

impl BackAction for StdioBackAction {
    fn invoke_back(&self) {
        if let Err(err) = self.writer.send(&AgentCommand::Back) {
            log_warn!("back press not delivered: {err:#}");
        }
    }
}

pub struct StdioNotifier {
    writer: Arc<CommandWriter>,
}

impl StdioNotifier {
    pub fn new(writer: Arc<CommandWriter>) -> Self {
        Self { writer }
    }
}

impl Notifier for StdioNotifier {
    fn notify(&self, message: &str) {
        log_info!("notify: {message}");
        if let Err(err) = self.writer.send(&AgentCommand::Notify { message }) {
            log_warn!("notification not delivered: {err:#}");
        }
    }
}
