use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use tokio::time::Duration;

use crate::a11y::{BackAction, Notifier, ScreenSnapshot};
use crate::db::models::BlockRecord;
use crate::detection::{Classifier, Verdict};

use super::engine::{minutes_left, Enforcer, Notice, TickOutcome};
use super::store::DeadlineStore;

// Runs once per tick; flip off to quiet the per-second debug lines.
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Upper bound on any single store call; a stalled store counts as failed.
const STORE_TIMEOUT: Duration = Duration::from_secs(5);

async fn bounded<T>(call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(STORE_TIMEOUT, call).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "deadline store did not answer within {}s",
            STORE_TIMEOUT.as_secs()
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    /// No snapshot this tick; nothing changed.
    Skipped,
    Processed {
        verdict: Verdict,
        outcome: TickOutcome,
    },
}

/// One classification-and-decision cycle per call, plus the side effects the
/// engine asks for. Owned exclusively by the driver task.
pub struct EnforcementController<S: DeadlineStore> {
    classifier: Classifier,
    enforcer: Enforcer,
    store: S,
    back: Arc<dyn BackAction>,
    notifier: Arc<dyn Notifier>,
    /// Last deadline read from the store, used when a read fails.
    known_deadline: Option<DateTime<Utc>>,
    /// Deadline whose write failed; retried at the start of each tick.
    pending_deadline: Option<DateTime<Utc>>,
}

impl<S: DeadlineStore> EnforcementController<S> {
    pub fn new(
        classifier: Classifier,
        enforcer: Enforcer,
        store: S,
        back: Arc<dyn BackAction>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            classifier,
            enforcer,
            store,
            back,
            notifier,
            known_deadline: None,
            pending_deadline: None,
        }
    }

    pub fn enforcer(&self) -> &Enforcer {
        &self.enforcer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tells the user about a cooldown carried over from an earlier run.
    pub async fn announce_carried_cooldown(&mut self, now: DateTime<Utc>) -> Result<()> {
        let blocked_until = bounded(self.store.blocked_until())
            .await
            .context("failed to read block deadline at start-up")?;
        self.known_deadline = Some(blocked_until);

        if now < blocked_until {
            let notice = Notice::CooldownResumed {
                minutes_left: minutes_left(now, blocked_until),
            };
            log_info!(
                "Cooldown carried over from a previous run, blocked until {}",
                blocked_until.to_rfc3339()
            );
            self.notifier.notify(&notice.message());
        }

        Ok(())
    }

    /// Processes one tick. `now` is captured once by the caller and used for
    /// every comparison in the tick.
    pub async fn process(
        &mut self,
        snapshot: Option<&ScreenSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<TickReport> {
        let Some(snapshot) = snapshot else {
            log_debug!("No foreground snapshot, skipping tick");
            return Ok(TickReport::Skipped);
        };

        let verdict = self
            .classifier
            .inspect(Some(&snapshot.root), snapshot.effective_screen_width());

        self.flush_pending_deadline().await;
        let blocked_until = self.current_deadline().await?;

        let outcome = self.enforcer.tick(verdict, now, blocked_until);
        log_debug!(
            "tick verdict={:?} phase={:?} accumulated={}ms",
            verdict,
            outcome.phase,
            self.enforcer.usage().accumulated_ms
        );

        for _ in 0..outcome.back_presses {
            self.back.invoke_back();
        }

        if let Some(deadline) = outcome.new_deadline {
            log_info!(
                "Budget exhausted after {}ms, blocking until {}",
                outcome.watched_ms,
                deadline.to_rfc3339()
            );
            self.persist_deadline(now, deadline, outcome.watched_ms).await;
        }

        for notice in &outcome.notices {
            self.notifier.notify(&notice.message());
        }

        Ok(TickReport::Processed { verdict, outcome })
    }

    async fn current_deadline(&mut self) -> Result<DateTime<Utc>> {
        let stored = match bounded(self.store.blocked_until()).await {
            Ok(deadline) => {
                self.known_deadline = Some(deadline);
                deadline
            }
            Err(err) => match self.known_deadline {
                Some(known) => {
                    log_warn!("Block deadline read failed, using last known value: {err:#}");
                    known
                }
                None => return Err(err.context("no block deadline known yet")),
            },
        };

        Ok(self.pending_deadline.map_or(stored, |pending| stored.max(pending)))
    }

    async fn persist_deadline(
        &mut self,
        now: DateTime<Utc>,
        deadline: DateTime<Utc>,
        watched_ms: u64,
    ) {
        match bounded(self.store.set_blocked_until(deadline)).await {
            Ok(()) => {
                self.known_deadline = Some(deadline);
                self.pending_deadline = None;
                let record = BlockRecord::new(now, deadline, watched_ms);
                if let Err(err) = bounded(self.store.record_block(record)).await {
                    log_warn!("Failed to record block history: {err:#}");
                }
            }
            Err(err) => {
                log_error!(
                    "Failed to persist block deadline {}: {err:#}",
                    deadline.to_rfc3339()
                );
                self.pending_deadline = Some(deadline);
            }
        }
    }

    async fn flush_pending_deadline(&mut self) {
        let Some(deadline) = self.pending_deadline else {
            return;
        };

        match bounded(self.store.set_blocked_until(deadline)).await {
            Ok(()) => {
                log_info!("Persisted previously failed block deadline {}", deadline.to_rfc3339());
                self.pending_deadline = None;
            }
            Err(err) => log_warn!("Block deadline still not persisted: {err:#}"),
        }
    }
}
