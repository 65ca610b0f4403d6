use std::time::Duration;

/// Fixed-rate tick scheduler.
///
/// Deadlines advance by whole periods from the previous deadline; if a tick
/// runs late by more than a period the schedule restarts from `now` instead
/// of bursting to catch up.
#[derive(Debug, Clone)]
pub struct Pacer {
    period: Duration,
    next: Duration,
    last_tick: Option<Duration>,
}

impl Pacer {
    pub fn new(rate_hz: f64) -> Self {
        Self {
            period: Self::period_for(rate_hz),
            next: Duration::ZERO,
            last_tick: None,
        }
    }

    pub fn period_for(rate_hz: f64) -> Duration {
        if rate_hz > 0.0 {
            Duration::from_secs_f64(1.0 / rate_hz)
        } else {
            Duration::ZERO
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Changes the rate; the next deadline is pulled in if the new period is shorter.
    pub fn set_rate(&mut self, rate_hz: f64) {
        let period = Self::period_for(rate_hz);
        if period == self.period {
            return;
        }
        self.period = period;
        if let Some(last) = self.last_tick {
            self.next = self.next.min(last + period);
        }
    }

    pub fn is_due(&self, now: Duration) -> bool {
        now >= self.next
    }

    pub fn next_deadline(&self) -> Duration {
        self.next
    }

    /// Marks a tick at `now`; returns the time since the previous tick.
    pub fn tick(&mut self, now: Duration) -> Option<Duration> {
        let since_last = self.last_tick.map(|last| now.saturating_sub(last));
        self.last_tick = Some(now);
        let scheduled = self.next + self.period;
        self.next = if scheduled < now { now + self.period } else { scheduled };
        since_last
    }

    pub fn until_due(&self, now: Duration) -> Duration {
        self.next.saturating_sub(now)
    }
}
