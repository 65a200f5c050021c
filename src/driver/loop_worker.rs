use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::a11y::{ElementTreeSource, ScreenSnapshot};
use crate::enforcement::{DeadlineStore, EnforcementController, TickReport};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Where a tick gets its single `now`.
pub trait Clock: Send + 'static {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed-period driver: classifies whatever the host last reported, changed
/// or not, once per `period`.
pub async fn timer_loop<S, T, C>(
    mut controller: EnforcementController<S>,
    source: T,
    clock: C,
    period: Duration,
    cancel_token: CancellationToken,
) where
    S: DeadlineStore,
    T: ElementTreeSource,
    C: Clock,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = source.foreground_snapshot();
                run_tick(&mut controller, snapshot.as_deref(), clock.now()).await;
            }
            _ = cancel_token.cancelled() => {
                log_info!("timer driver shutting down");
                break;
            }
        }
    }
}

/// Event driver: one tick per host notification, in arrival order. `None`
/// entries are notifications whose snapshot could not be read.
pub async fn event_loop<S, C>(
    mut controller: EnforcementController<S>,
    mut events: mpsc::Receiver<Option<Arc<ScreenSnapshot>>>,
    clock: C,
    cancel_token: CancellationToken,
) where
    S: DeadlineStore,
    C: Clock,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("event driver shutting down");
                break;
            }
            event = events.recv() => match event {
                Some(snapshot) => run_tick(&mut controller, snapshot.as_deref(), clock.now()).await,
                None => {
                    log_info!("event source closed, event driver exiting");
                    break;
                }
            },
        }
    }
}

/// Tick boundary: nothing that goes wrong inside a tick stops the driver.
/// Store calls carry their own timeout, so a tick always runs to completion.
async fn run_tick<S: DeadlineStore>(
    controller: &mut EnforcementController<S>,
    snapshot: Option<&ScreenSnapshot>,
    now: DateTime<Utc>,
) {
    let started = Instant::now();

    match controller.process(snapshot, now).await {
        Ok(TickReport::Processed { outcome, .. }) if outcome.exhausted() => {
            log_info!(
                "budget exhausted, cooldown started (tick took {}ms)",
                started.elapsed().as_millis()
            );
        }
        Ok(_) => log_debug!("tick took {}ms", started.elapsed().as_millis()),
        Err(err) => log_error!("tick failed: {err:#}"),
    }
}
