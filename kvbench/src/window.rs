//! Windowed latency and throughput aggregation.
//!
//! A [`Window`] accumulates the latency of completed round trips until its configured duration
//! has elapsed, then closes into a [`WindowReport`] and starts over. Windows are contiguous: the
//! instant a window closes is the start of the next one. Memory use is constant regardless of
//! how many operations are recorded.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Nominal length of a reporting window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(2);

/// Resolution at which the length of a closed window is measured for throughput.
pub const HUNDREDTH_OF_SECOND: Duration = Duration::from_millis(10);

/// Aggregated statistics of one closed window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowReport {
    /// Mean round-trip latency of all operations in the window, in microseconds.
    pub avg_latency_us: u64,
    /// Operations per second, scaled from the actual elapsed length of the window.
    pub throughput: u64,
    /// Zero-based index of the window within its client's run.
    pub index: u64,
    /// Number of operations completed within the window.
    pub requests: u64,
}

impl fmt::Display for WindowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.avg_latency_us, self.throughput, self.index)
    }
}

/// Operations recorded in the last window that never reached its boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Residual {
    /// Number of operations in the unreported window.
    pub requests: u64,
    /// Summed latency of those operations, in microseconds.
    pub latency_us: u64,
}

/// Per-client accumulator for the current reporting window.
#[derive(Debug)]
pub struct Window {
    duration: Duration,
    start: Instant,
    latency_us: u64,
    requests: u64,
    index: u64,
}

impl Window {
    /// Opens the first window at `start`.
    ///
    /// Durations shorter than [`HUNDREDTH_OF_SECOND`] are raised to it, so that every closed
    /// window has a measurable length.
    pub fn new(duration: Duration, start: Instant) -> Self {
        Self {
            duration: duration.max(HUNDREDTH_OF_SECOND),
            start,
            latency_us: 0,
            requests: 0,
            index: 0,
        }
    }

    /// Records the round trip of one completed operation.
    ///
    /// Latency is truncated to whole microseconds.
    pub fn record(&mut self, start: Instant, end: Instant) {
        let latency = end.saturating_duration_since(start);
        self.latency_us += latency.as_micros() as u64;
        self.requests += 1;
    }

    /// Closes the current window if its duration has elapsed at `now`.
    ///
    /// Returns a report for the closed window, or `None` if the window is still open. A window
    /// that closes without any recorded operations is skipped: it produces no report and does not
    /// consume an index, but the next window still starts at `now`.
    pub fn observe(&mut self, now: Instant) -> Option<WindowReport> {
        let elapsed = now.saturating_duration_since(self.start);
        if elapsed < self.duration {
            return None;
        }

        let report = self.report(elapsed);
        if report.is_some() {
            self.index += 1;
        }

        self.start = now;
        self.latency_us = 0;
        self.requests = 0;

        report
    }

    fn report(&self, elapsed: Duration) -> Option<WindowReport> {
        if self.requests == 0 {
            return None;
        }

        // At least one, since windows never close before a hundredth of a second.
        let hundredths = elapsed.as_nanos() / HUNDREDTH_OF_SECOND.as_nanos();
        let throughput = u128::from(self.requests) * 100 / hundredths;

        Some(WindowReport {
            avg_latency_us: self.latency_us / self.requests,
            throughput: throughput as u64,
            index: self.index,
            requests: self.requests,
        })
    }

    /// The number of reports emitted so far.
    pub fn reports(&self) -> u64 {
        self.index
    }

    /// Ends aggregation, returning the operations of the unreported last window.
    pub fn finish(self) -> Residual {
        Residual {
            requests: self.requests,
            latency_us: self.latency_us,
        }
    }
}
