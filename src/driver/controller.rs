use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::a11y::{ElementTreeSource, ScreenSnapshot};
use crate::enforcement::{DeadlineStore, EnforcementController};

use super::loop_worker::{event_loop, timer_loop, SystemClock};

/// Owns the single driver task. At most one runs at a time, so ticks are
/// never processed concurrently.
pub struct DriverHandle {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl DriverHandle {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start_timer<S, T>(
        &mut self,
        controller: EnforcementController<S>,
        source: T,
        period: Duration,
    ) -> Result<()>
    where
        S: DeadlineStore + 'static,
        T: ElementTreeSource + 'static,
    {
        let cancel_token = self.prepare()?;
        info!("Starting timer driver ({}ms period)", period.as_millis());
        self.handle = Some(tokio::spawn(timer_loop(
            controller,
            source,
            SystemClock,
            period,
            cancel_token,
        )));
        Ok(())
    }

    pub fn start_event<S>(
        &mut self,
        controller: EnforcementController<S>,
        events: mpsc::Receiver<Option<Arc<ScreenSnapshot>>>,
    ) -> Result<()>
    where
        S: DeadlineStore + 'static,
    {
        let cancel_token = self.prepare()?;
        info!("Starting event driver");
        self.handle = Some(tokio::spawn(event_loop(
            controller,
            events,
            SystemClock,
            cancel_token,
        )));
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("driver task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }

    fn prepare(&mut self) -> Result<CancellationToken> {
        if self.handle.is_some() {
            bail!("driver already active");
        }
        let cancel_token = CancellationToken::new();
        self.cancel_token = Some(cancel_token.clone());
        Ok(cancel_token)
    }
}

impl Default for DriverHandle {
    fn default() -> Self {
        Self::new()
    }
}
