use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementPhase {
    /// Nothing accrued and not blocked.
    Idle,
    /// Budget accruing.
    Watching,
    /// Blocked until the persisted deadline.
    Cooldown,
}

impl Default for EnforcementPhase {
    fn default() -> Self {
        EnforcementPhase::Idle
    }
}

/// In-memory watch-time record, owned by the driver for the life of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageState {
    pub accumulated_ms: u64,
    /// Last tick at which short-form content was on screen.
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Last tick of any kind; bounds how much a single tick can credit.
    pub last_tick_at: Option<DateTime<Utc>>,
}

/// Result of feeding one classification into the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualStep {
    Credited(u64),
    /// Negative tick inside the grace window (or with nothing to expire).
    Held,
    /// Negative tick past the grace window; the session was cleared.
    Expired,
}

/// Milliseconds from `earlier` to `later`, zero if the clock went backwards.
pub fn ms_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> u64 {
    (later - earlier).num_milliseconds().max(0) as u64
}

/// Watch-time accumulator with a grace window for classification gaps.
#[derive(Debug, Clone)]
pub struct UsageAccumulator {
    state: UsageState,
    quantum_ms: u64,
    grace_ms: u64,
}

impl UsageAccumulator {
    pub fn new(quantum_ms: u64, grace_ms: u64) -> Self {
        Self {
            state: UsageState::default(),
            quantum_ms,
            grace_ms,
        }
    }

    pub fn state(&self) -> &UsageState {
        &self.state
    }

    pub fn accumulated_ms(&self) -> u64 {
        self.state.accumulated_ms
    }

    /// One driver cycle.
    ///
    /// A positive tick credits the time since the previous tick, capped at one
    /// quantum so a stalled process never books its sleep as watch time. The
    /// very first tick credits a full quantum.
    pub fn tick(&mut self, is_target: bool, now: DateTime<Utc>) -> AccrualStep {
        let elapsed = self
            .state
            .last_tick_at
            .map(|previous| ms_between(previous, now));
        self.state.last_tick_at = Some(now);

        if is_target {
            let credit = elapsed.map_or(self.quantum_ms, |ms| ms.min(self.quantum_ms));
            self.state.last_seen_at = Some(now);
            self.state.accumulated_ms = self.state.accumulated_ms.saturating_add(credit);
            return AccrualStep::Credited(credit);
        }

        match self.state.last_seen_at {
            Some(seen) if self.state.accumulated_ms > 0 && ms_between(seen, now) > self.grace_ms => {
                self.state.accumulated_ms = 0;
                AccrualStep::Expired
            }
            _ => AccrualStep::Held,
        }
    }

    /// Records a tick that bypassed accrual (cooldown, foreign app).
    pub fn mark_tick(&mut self, now: DateTime<Utc>) {
        self.state.last_tick_at = Some(now);
    }

    pub fn reset(&mut self) {
        self.state.accumulated_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(second: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(second)
    }

    #[test]
    fn first_positive_tick_credits_a_quantum() {
        let mut acc = UsageAccumulator::new(1_000, 10_000);
        assert_eq!(acc.tick(true, at(0)), AccrualStep::Credited(1_000));
        assert_eq!(acc.accumulated_ms(), 1_000);
        assert_eq!(acc.state().last_seen_at, Some(at(0)));
    }

    #[test]
    fn stall_is_clamped_to_quantum() {
        let mut acc = UsageAccumulator::new(1_000, 10_000);
        acc.tick(true, at(0));
        assert_eq!(acc.tick(true, at(30)), AccrualStep::Credited(1_000));
        assert_eq!(acc.accumulated_ms(), 2_000);
    }

    #[test]
    fn short_interval_credits_only_elapsed_time() {
        let mut acc = UsageAccumulator::new(1_000, 10_000);
        acc.tick(true, at(0));
        let soon = at(0) + Duration::milliseconds(250);
        assert_eq!(acc.tick(true, soon), AccrualStep::Credited(250));
        assert_eq!(acc.accumulated_ms(), 1_250);
    }

    #[test]
    fn clock_going_backwards_credits_nothing() {
        let mut acc = UsageAccumulator::new(1_000, 10_000);
        acc.tick(true, at(10));
        assert_eq!(acc.tick(true, at(5)), AccrualStep::Credited(0));
        assert_eq!(acc.accumulated_ms(), 1_000);
    }

    #[test]
    fn scroll_gap_inside_grace_window_keeps_progress() {
        let mut acc = UsageAccumulator::new(1_000, 10_000);
        let mut second = 0;

        for _ in 0..65 {
            acc.tick(true, at(second));
            second += 1;
        }
        for _ in 0..5 {
            assert_eq!(acc.tick(false, at(second)), AccrualStep::Held);
            second += 1;
        }
        acc.tick(true, at(second));

        assert_eq!(second + 1, 71);
        assert_eq!(acc.accumulated_ms(), 66_000);
    }

    #[test]
    fn reset_happens_once_when_grace_window_is_crossed() {
        let mut acc = UsageAccumulator::new(1_000, 10_000);
        acc.tick(true, at(0));
        acc.tick(true, at(1));
        assert_eq!(acc.accumulated_ms(), 2_000);

        let mut expirations = Vec::new();
        for second in 2..=20 {
            if acc.tick(false, at(second)) == AccrualStep::Expired {
                expirations.push(second);
            }
            if second <= 11 {
                assert_eq!(acc.accumulated_ms(), 2_000, "reset too early at {second}");
            }
        }

        // Last seen at 1s; 12s is the first tick more than 10s later.
        assert_eq!(expirations, vec![12]);
        assert_eq!(acc.accumulated_ms(), 0);
    }

    #[test]
    fn mark_tick_bounds_next_credit() {
        let mut acc = UsageAccumulator::new(1_000, 10_000);
        acc.mark_tick(at(0));
        let soon = at(0) + Duration::milliseconds(400);
        assert_eq!(acc.tick(true, soon), AccrualStep::Credited(400));
    }
}
