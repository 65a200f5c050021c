use chrono::{DateTime, Duration, Utc};

use crate::detection::Verdict;

use super::state::{ms_between, EnforcementPhase, UsageAccumulator, UsageState};

/// Budget and cooldown knobs, resolved from settings once at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementPolicy {
    pub allowed_budget_ms: u64,
    pub cooldown_duration_ms: u64,
    pub grace_window_ms: u64,
    pub tick_period_ms: u64,
    /// 0 disables progress notices.
    pub progress_notice_interval_ms: u64,
    pub cooldown_notice_interval_ms: u64,
    pub exhaustion_back_count: u32,
    pub cooldown_back_count: u32,
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self {
            allowed_budget_ms: 60_000,
            cooldown_duration_ms: 20 * 60_000,
            grace_window_ms: 10_000,
            tick_period_ms: 1_000,
            progress_notice_interval_ms: 10_000,
            cooldown_notice_interval_ms: 5_000,
            exhaustion_back_count: 2,
            cooldown_back_count: 1,
        }
    }
}

/// User-facing message produced by a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SessionStarted { remaining_ms: u64 },
    Progress { used_ms: u64, budget_ms: u64 },
    LimitReached { cooldown_minutes: u64 },
    Cooldown { minutes_left: u64 },
    CooldownResumed { minutes_left: u64 },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::SessionStarted { remaining_ms } => {
                format!("Shorts detected. {}s remaining.", remaining_ms.div_ceil(1_000))
            }
            Notice::Progress { used_ms, budget_ms } => {
                format!("Used: {}s / {}s", used_ms / 1_000, budget_ms / 1_000)
            }
            Notice::LimitReached { cooldown_minutes } => {
                format!("Time's up! Shorts blocked for {cooldown_minutes} min.")
            }
            Notice::Cooldown { minutes_left } => {
                format!("Blocked! {minutes_left}m cooldown left.")
            }
            Notice::CooldownResumed { minutes_left } => {
                format!("Shorts cooldown still active: {minutes_left}m left.")
            }
        }
    }
}

/// Side effects one tick asks the controller to carry out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub phase: EnforcementPhase,
    pub back_presses: u32,
    /// Set only on the tick that exhausts the budget.
    pub new_deadline: Option<DateTime<Utc>>,
    /// Watch time that exhausted the budget.
    pub watched_ms: u64,
    pub notices: Vec<Notice>,
}

impl TickOutcome {
    fn in_phase(phase: EnforcementPhase) -> Self {
        Self {
            phase,
            ..Self::default()
        }
    }

    pub fn exhausted(&self) -> bool {
        self.new_deadline.is_some()
    }
}

pub fn minutes_left(now: DateTime<Utc>, blocked_until: DateTime<Utc>) -> u64 {
    ms_between(now, blocked_until).div_ceil(60_000)
}

/// Budget/cooldown state machine. Pure: all I/O is left to the caller.
#[derive(Debug, Clone)]
pub struct Enforcer {
    policy: EnforcementPolicy,
    usage: UsageAccumulator,
    last_cooldown_notice_at: Option<DateTime<Utc>>,
}

impl Enforcer {
    pub fn new(policy: EnforcementPolicy) -> Self {
        let usage = UsageAccumulator::new(policy.tick_period_ms, policy.grace_window_ms);
        Self {
            policy,
            usage,
            last_cooldown_notice_at: None,
        }
    }

    pub fn usage(&self) -> &UsageState {
        self.usage.state()
    }

    /// Feeds one classification through the state machine.
    ///
    /// `now` must be the single timestamp captured for this tick and
    /// `blocked_until` the persisted deadline read in the same tick.
    pub fn tick(
        &mut self,
        verdict: Verdict,
        now: DateTime<Utc>,
        blocked_until: DateTime<Utc>,
    ) -> TickOutcome {
        if now < blocked_until {
            return self.cooldown_tick(verdict, now, blocked_until);
        }

        if verdict == Verdict::ForeignApp {
            self.usage.reset();
            self.usage.mark_tick(now);
            return TickOutcome::in_phase(EnforcementPhase::Idle);
        }

        let before = self.usage.accumulated_ms();
        self.usage.tick(verdict.is_target(), now);
        let after = self.usage.accumulated_ms();

        if after >= self.policy.allowed_budget_ms {
            return self.exhaust(now, after);
        }

        let mut outcome = TickOutcome::in_phase(if after > 0 {
            EnforcementPhase::Watching
        } else {
            EnforcementPhase::Idle
        });

        let interval = self.policy.progress_notice_interval_ms;
        if before == 0 && after > 0 {
            outcome.notices.push(Notice::SessionStarted {
                remaining_ms: self.policy.allowed_budget_ms - after,
            });
        } else if interval > 0 && after / interval > before / interval {
            outcome.notices.push(Notice::Progress {
                used_ms: after,
                budget_ms: self.policy.allowed_budget_ms,
            });
        }

        outcome
    }

    fn cooldown_tick(
        &mut self,
        verdict: Verdict,
        now: DateTime<Utc>,
        blocked_until: DateTime<Utc>,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::in_phase(EnforcementPhase::Cooldown);

        if verdict.is_target() {
            outcome.back_presses = self.policy.cooldown_back_count;

            // Accrual in flight when the block landed always gets a notice;
            // repeat visits are throttled.
            let fresh_entry = self.usage.accumulated_ms() > 0;
            let notice_due = self.last_cooldown_notice_at.map_or(true, |at| {
                ms_between(at, now) >= self.policy.cooldown_notice_interval_ms
            });

            if fresh_entry || notice_due {
                outcome.notices.push(Notice::Cooldown {
                    minutes_left: minutes_left(now, blocked_until),
                });
                self.last_cooldown_notice_at = Some(now);
            }
        }

        self.usage.reset();
        self.usage.mark_tick(now);
        outcome
    }

    fn exhaust(&mut self, now: DateTime<Utc>, watched_ms: u64) -> TickOutcome {
        let cooldown_ms = self.policy.cooldown_duration_ms;
        let deadline = now
            .checked_add_signed(Duration::milliseconds(cooldown_ms.min(i64::MAX as u64) as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.usage.reset();
        self.last_cooldown_notice_at = Some(now);

        TickOutcome {
            phase: EnforcementPhase::Cooldown,
            back_presses: self.policy.exhaustion_back_count,
            new_deadline: Some(deadline),
            watched_ms,
            notices: vec![Notice::LimitReached {
                cooldown_minutes: cooldown_ms.div_ceil(60_000),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Signal;
    use chrono::TimeZone;

    const TARGET: Verdict = Verdict::Target(Signal::Geometry);

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn at(second: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(second)
    }

    fn policy() -> EnforcementPolicy {
        EnforcementPolicy {
            allowed_budget_ms: 60_000,
            cooldown_duration_ms: 1_200_000,
            exhaustion_back_count: 1,
            ..EnforcementPolicy::default()
        }
    }

    #[test]
    fn budget_exhaustion_blocks_once() {
        let mut enforcer = Enforcer::new(policy());
        let mut blocked_until = epoch();
        let mut back_presses = 0;
        let mut exhaustions = Vec::new();

        for second in 0..61 {
            let outcome = enforcer.tick(TARGET, at(second), blocked_until);
            back_presses += outcome.back_presses;
            if let Some(deadline) = outcome.new_deadline {
                exhaustions.push(second);
                assert_eq!(deadline, at(second) + Duration::milliseconds(1_200_000));
                assert_eq!(outcome.watched_ms, 60_000);
                assert_eq!(
                    outcome.notices,
                    vec![Notice::LimitReached {
                        cooldown_minutes: 20
                    }]
                );
                blocked_until = deadline;
            }
        }

        // 60 credited seconds land on the 60th tick; the 61st is a cooldown tick.
        assert_eq!(exhaustions, vec![59]);
        assert_eq!(back_presses, 2);
        assert_eq!(enforcer.usage().accumulated_ms, 0);
    }

    #[test]
    fn exhaustion_uses_configured_back_count() {
        let mut enforcer = Enforcer::new(EnforcementPolicy {
            allowed_budget_ms: 3_000,
            exhaustion_back_count: 2,
            ..EnforcementPolicy::default()
        });

        let presses: Vec<u32> = (0..3)
            .map(|second| enforcer.tick(TARGET, at(second), epoch()).back_presses)
            .collect();

        assert_eq!(presses, vec![0, 0, 2]);
    }

    #[test]
    fn no_accrual_until_deadline_passes() {
        let mut enforcer = Enforcer::new(policy());
        let blocked_until = at(30);

        for second in 0..30 {
            let outcome = enforcer.tick(TARGET, at(second), blocked_until);
            assert_eq!(outcome.phase, EnforcementPhase::Cooldown);
            assert_eq!(enforcer.usage().accumulated_ms, 0);
        }

        let outcome = enforcer.tick(TARGET, at(30), blocked_until);
        assert_eq!(outcome.phase, EnforcementPhase::Watching);
        assert_eq!(outcome.back_presses, 0);
        assert_eq!(enforcer.usage().accumulated_ms, 1_000);
    }

    #[test]
    fn cooldown_reverses_every_positive_tick() {
        let mut enforcer = Enforcer::new(policy());
        let blocked_until = at(300);

        for second in 0..10 {
            let outcome = enforcer.tick(TARGET, at(second), blocked_until);
            assert_eq!(outcome.back_presses, 1);
            assert!(outcome.new_deadline.is_none());
            assert_eq!(enforcer.usage().accumulated_ms, 0);
        }
    }

    #[test]
    fn cooldown_ignores_negative_ticks() {
        let mut enforcer = Enforcer::new(policy());
        let blocked_until = at(300);

        for verdict in [Verdict::Clear, Verdict::ForeignApp] {
            let outcome = enforcer.tick(verdict, at(0), blocked_until);
            assert_eq!(outcome.back_presses, 0);
            assert!(outcome.notices.is_empty());
            assert_eq!(outcome.phase, EnforcementPhase::Cooldown);
        }
    }

    #[test]
    fn cooldown_notice_reports_rounded_up_minutes_and_is_throttled() {
        let mut enforcer = Enforcer::new(policy());
        let blocked_until = at(0) + Duration::milliseconds(4 * 60_000 + 1);

        let first = enforcer.tick(TARGET, at(0), blocked_until);
        assert_eq!(first.notices, vec![Notice::Cooldown { minutes_left: 5 }]);

        let second = enforcer.tick(TARGET, at(1), blocked_until);
        assert!(second.notices.is_empty());

        let later = enforcer.tick(TARGET, at(5), blocked_until);
        assert_eq!(later.notices, vec![Notice::Cooldown { minutes_left: 4 }]);
    }

    #[test]
    fn accrual_in_flight_when_block_lands_is_notified() {
        let mut enforcer = Enforcer::new(policy());
        enforcer.tick(TARGET, at(0), epoch());
        let first = enforcer.tick(TARGET, at(1), at(100));
        assert_eq!(first.notices.len(), 1);

        enforcer.tick(TARGET, at(2), epoch());
        assert_eq!(enforcer.usage().accumulated_ms, 1_000);

        // Inside the throttle window, but the deadline landed mid-accrual.
        let outcome = enforcer.tick(TARGET, at(3), at(100));
        assert_eq!(outcome.notices.len(), 1);
        assert_eq!(enforcer.usage().accumulated_ms, 0);
    }

    #[test]
    fn foreign_app_resets_session() {
        let mut enforcer = Enforcer::new(policy());
        enforcer.tick(TARGET, at(0), epoch());
        enforcer.tick(TARGET, at(1), epoch());
        assert_eq!(enforcer.usage().accumulated_ms, 2_000);

        let outcome = enforcer.tick(Verdict::ForeignApp, at(2), epoch());
        assert_eq!(outcome.phase, EnforcementPhase::Idle);
        assert_eq!(enforcer.usage().accumulated_ms, 0);
    }

    #[test]
    fn progress_notices_at_milestones() {
        let mut enforcer = Enforcer::new(policy());
        let mut notices = Vec::new();

        for second in 0..25 {
            let outcome = enforcer.tick(TARGET, at(second), epoch());
            notices.extend(outcome.notices);
        }

        assert_eq!(
            notices,
            vec![
                Notice::SessionStarted {
                    remaining_ms: 59_000
                },
                Notice::Progress {
                    used_ms: 10_000,
                    budget_ms: 60_000
                },
                Notice::Progress {
                    used_ms: 20_000,
                    budget_ms: 60_000
                },
            ]
        );
    }

    #[test]
    fn notice_messages() {
        assert_eq!(
            Notice::Progress {
                used_ms: 10_000,
                budget_ms: 60_000
            }
            .message(),
            "Used: 10s / 60s"
        );
        assert_eq!(
            Notice::Cooldown { minutes_left: 3 }.message(),
            "Blocked! 3m cooldown left."
        );
    }
}
