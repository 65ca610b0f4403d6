use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic session clock.
///
/// Timestamps are offsets from the clock's origin so that events, tick times
/// and trial deadlines share one timebase. Clones share that origin.
pub trait Timer: Clone {
    fn now(&self) -> Duration;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn pacing_stats(&self) -> PacingStats;

    fn elapsed(&self, since: Duration) -> Duration {
        self.now().saturating_sub(since)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PacingStats {
    pub samples: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_hz: f64,
}

impl PacingStats {
    pub fn from_samples<'a>(frame_times: impl IntoIterator<Item = &'a Duration>) -> Self {
        let times: Vec<f64> = frame_times
            .into_iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        if times.is_empty() {
            return Self::default();
        }
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            samples: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_hz: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

/// Bounded ring of recent tick durations.
#[derive(Debug, Clone)]
struct FrameSamples {
    times: VecDeque<Duration>,
    max_samples: usize,
}

impl FrameSamples {
    fn new(max_samples: usize) -> Self {
        Self {
            times: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn push(&mut self, d: Duration) {
        if self.times.len() >= self.max_samples {
            self.times.pop_front();
        }
        self.times.push_back(d);
    }
}

/// Wall-clock timer backed by `Instant`, with sub-millisecond sleeps where
/// the platform offers them.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
    frames: FrameSamples,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }

    fn record_frame(&mut self, d: Duration) {
        self.frames.push(d);
    }

    fn pacing_stats(&self) -> PacingStats {
        PacingStats::from_samples(&self.frames.times)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frames: FrameSamples::new(1000),
        }
    }

    /// Converts a session timestamp back into an `Instant` for event-loop deadlines.
    pub fn instant_at(&self, ts: Duration) -> Instant {
        self.start + ts
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        // SAFETY: `req` is a valid timespec and the remainder pointer may be null.
        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand-advanced clock for deterministic tests. Sleeping advances it.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
    frames: Vec<Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, t: Duration) {
        self.now_ns.store(t.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::SeqCst))
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }

    fn record_frame(&mut self, d: Duration) {
        self.frames.push(d);
    }

    fn pacing_stats(&self) -> PacingStats {
        PacingStats::from_samples(&self.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_timer_clones_share_time() {
        let a = ManualTimer::new();
        let b = a.clone();
        a.advance(Duration::from_millis(5));
        b.sleep(Duration::from_millis(2));
        assert_eq!(a.now(), Duration::from_millis(7));
        assert_eq!(a.elapsed(Duration::from_millis(3)), Duration::from_millis(4));
        assert_eq!(a.elapsed(Duration::from_secs(1)), Duration::ZERO);
    }

    #[test]
    fn stats_of_steady_ticks_have_no_jitter() {
        let stats = PacingStats::from_samples(&[Duration::from_millis(1); 10]);
        assert_eq!(stats.samples, 10);
        assert!(stats.jitter_ns.abs() < 1e-6);
        assert!((stats.effective_hz - 1000.0).abs() < 1e-6);
        assert_eq!(
            PacingStats::from_samples(&[] as &[Duration]),
            PacingStats::default()
        );
    }

    #[test]
    fn frame_samples_are_bounded() {
        let mut frames = FrameSamples::new(3);
        for ms in 1..=5 {
            frames.push(Duration::from_millis(ms));
        }
        assert_eq!(
            frames.times,
            [
                Duration::from_millis(3),
                Duration::from_millis(4),
                Duration::from_millis(5)
            ]
        );
    }

    #[test]
    fn full_sample_ring_keeps_the_newest_ticks() {
        let mut timer = HighPrecisionTimer::new();
        for us in 1..=1500u64 {
            timer.record_frame(Duration::from_micros(us));
        }
        let stats = timer.pacing_stats();
        assert_eq!(stats.samples, 1000);
        assert_eq!(stats.min_frame_time_ns, 501_000.0);
        assert_eq!(stats.max_frame_time_ns, 1_500_000.0);
    }

    #[test]
    fn high_precision_timer_is_monotonic() {
        let t = HighPrecisionTimer::new();
        let a = t.now();
        t.sleep(Duration::from_micros(200));
        assert!(t.now() >= a + Duration::from_micros(200));
        assert_eq!(
            t.instant_at(Duration::from_millis(3)) - t.instant_at(Duration::ZERO),
            Duration::from_millis(3)
        );
    }
}
