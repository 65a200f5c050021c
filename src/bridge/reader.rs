use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::a11y::{ElementTreeSource, ScreenSnapshot};

use super::protocol::{parse_host_line, HostMessage};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub type SnapshotSlot = Option<Arc<ScreenSnapshot>>;

/// Latest snapshot published by the host, read by the timer driver.
pub struct LatestSnapshot {
    rx: watch::Receiver<SnapshotSlot>,
}

impl LatestSnapshot {
    pub fn new(rx: watch::Receiver<SnapshotSlot>) -> Self {
        Self { rx }
    }
}

impl ElementTreeSource for LatestSnapshot {
    fn foreground_snapshot(&self) -> Option<Arc<ScreenSnapshot>> {
        self.rx.borrow().clone()
    }
}

/// Where parsed host snapshots go, depending on the driver mode.
pub enum SnapshotSink {
    /// Overwrite a single slot; the timer driver samples it.
    Latest(watch::Sender<SnapshotSlot>),
    /// Queue every notification for the event driver.
    Events(mpsc::Sender<SnapshotSlot>),
}

impl SnapshotSink {
    /// Returns `false` once nobody is listening any more.
    async fn publish(&self, slot: SnapshotSlot) -> bool {
        match self {
            SnapshotSink::Latest(tx) => {
                tx.send_replace(slot);
                true
            }
            SnapshotSink::Events(tx) => tx.send(slot).await.is_ok(),
        }
    }
}

/// Reads host messages line by line until end of stream, then cancels
/// `shutdown`. Malformed lines are skipped.
pub async fn read_host_messages<R>(reader: R, sink: SnapshotSink, shutdown: CancellationToken)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => {
                log_debug!("host reader cancelled");
                return;
            }
            next = lines.next_line() => next,
        };

        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => {
                log_info!("host closed its end of the bridge");
                break;
            }
            Err(err) => {
                log_error!("failed to read from host: {err}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let slot = match parse_host_line(&line) {
            Ok(HostMessage::Snapshot(snapshot)) => Some(Arc::new(snapshot)),
            Ok(HostMessage::Unavailable) => None,
            Err(err) => {
                log_warn!("skipping host line: {err:#}");
                continue;
            }
        };

        if !sink.publish(slot).await {
            log_warn!("driver stopped listening, host reader exiting");
            break;
        }
    }

    shutdown.cancel();
}
