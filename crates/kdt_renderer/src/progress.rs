//! Render progress with smoothed throughput and ETA.
//!
//! Every pixel bumps an atomic counter. Only the task that wins `try_lock` on
//! the smoothing state after the report interval has elapsed does any more
//! work, so the other tasks never wait on each other.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Snapshot emitted at most once per report interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub completed: usize,
    pub total: usize,
    /// In [0, 1]
    pub fraction: f64,
    /// Exponential moving average of the throughput
    pub pixels_per_second: f64,
    /// `None` until a rate is known
    pub eta: Option<Duration>,
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}% ({}/{}) {:.0} px/s",
            self.fraction * 100.0,
            self.completed,
            self.total,
            self.pixels_per_second
        )?;
        match self.eta {
            Some(eta) => write!(f, " ETA {:.1}s", eta.as_secs_f64()),
            None => write!(f, " ETA ?"),
        }
    }
}

#[derive(Debug)]
struct RateState {
    last_report: Instant,
    last_completed: usize,
    rate: Option<f64>,
}

/// Shared between all render tasks of one pass.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    completed: AtomicUsize,
    interval: Duration,
    /// Weight of the newest rate measurement, in (0, 1]
    smoothing: f64,
    start: Instant,
    state: Mutex<RateState>,
}

impl ProgressTracker {
    pub fn new(total: usize, interval: Duration, smoothing: f64) -> Self {
        Self::starting_at(total, interval, smoothing, Instant::now())
    }

    pub fn starting_at(total: usize, interval: Duration, smoothing: f64, start: Instant) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            interval,
            smoothing: smoothing.clamp(f64::EPSILON, 1.0),
            start,
            state: Mutex::new(RateState {
                last_report: start,
                last_completed: 0,
                rate: None,
            }),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Record one finished pixel. Returns a report when one is due.
    pub fn complete_one(&self) -> Option<ProgressReport> {
        self.complete_one_at(Instant::now())
    }

    /// [`ProgressTracker::complete_one`] with an explicit clock reading.
    pub fn complete_one_at(&self, now: Instant) -> Option<ProgressReport> {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        let finished = completed >= self.total;

        // The final pixel always reports; everyone else skips if busy
        let mut state = if finished {
            self.state.lock().ok()?
        } else {
            self.state.try_lock().ok()?
        };

        let since_last = now.saturating_duration_since(state.last_report);
        if !finished && since_last < self.interval {
            return None;
        }
        if completed <= state.last_completed && !finished {
            return None;
        }

        let measured = if since_last.is_zero() {
            let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
            (elapsed > 0.0).then(|| completed as f64 / elapsed)
        } else {
            Some(completed.saturating_sub(state.last_completed) as f64 / since_last.as_secs_f64())
        };

        let rate = match (state.rate, measured) {
            (Some(prev), Some(sample)) => Some(prev + self.smoothing * (sample - prev)),
            (prev, sample) => sample.or(prev),
        };

        state.last_report = now;
        state.last_completed = state.last_completed.max(completed);
        state.rate = rate;

        let remaining = self.total.saturating_sub(completed);
        let pixels_per_second = rate.unwrap_or(0.0);
        let eta = if remaining == 0 {
            Some(Duration::ZERO)
        } else {
            rate.filter(|r| *r > 0.0)
                .map(|r| Duration::from_secs_f64(remaining as f64 / r))
        };

        Some(ProgressReport {
            completed,
            total: self.total,
            fraction: if self.total == 0 {
                1.0
            } else {
                completed.min(self.total) as f64 / self.total as f64
            },
            pixels_per_second,
            eta,
        })
    }
}
