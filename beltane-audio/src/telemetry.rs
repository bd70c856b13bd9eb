//! Polling loop telemetry for latency and jitter monitoring.
//!
//! Collects poll durations in a fixed-size ring buffer, allocation-free,
//! plus a count of cycles scheduled in the current window. A poll that
//! runs longer than the tick interval eats into the lookahead margin, so
//! overruns are the number to watch.

use std::time::Duration;

/// Ring buffer size for poll duration samples.
const POLL_BUFFER_SIZE: usize = 256;

pub struct PollTelemetry {
    poll_durations_us: [u32; POLL_BUFFER_SIZE],
    poll_idx: usize,
    max_poll_us: u32,
    overrun_count: u64,
    sample_count: usize,
    cycles_scheduled: u64,
}

impl Default for PollTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl PollTelemetry {
    pub fn new() -> Self {
        Self {
            poll_durations_us: [0; POLL_BUFFER_SIZE],
            poll_idx: 0,
            max_poll_us: 0,
            overrun_count: 0,
            sample_count: 0,
            cycles_scheduled: 0,
        }
    }

    /// Record one poll: its duration, the tick budget, and how many
    /// cycles it scheduled.
    #[inline]
    pub fn record(&mut self, duration: Duration, budget_us: u32, cycles: usize) {
        let us = duration.as_micros().min(u32::MAX as u128) as u32;

        self.poll_durations_us[self.poll_idx] = us;
        self.poll_idx = (self.poll_idx + 1) % POLL_BUFFER_SIZE;

        if self.sample_count < POLL_BUFFER_SIZE {
            self.sample_count += 1;
        }

        if us > self.max_poll_us {
            self.max_poll_us = us;
        }

        if us > budget_us {
            self.overrun_count += 1;
        }

        self.cycles_scheduled += cycles as u64;
    }

    /// Summarize the current window and reset per-window counters.
    /// Returns (avg_us, max_us, p95_us, overruns, cycles_scheduled);
    /// the overrun count stays cumulative.
    pub fn take_summary(&mut self) -> (u32, u32, u32, u64, u64) {
        if self.sample_count == 0 {
            return (0, 0, 0, self.overrun_count, 0);
        }

        let sum: u64 = self.poll_durations_us[..self.sample_count]
            .iter()
            .map(|&x| x as u64)
            .sum();
        let avg = (sum / self.sample_count as u64) as u32;

        let mut sorted = self.poll_durations_us;
        sorted[..self.sample_count].sort_unstable();
        let p95_idx = (self.sample_count * 95 / 100).max(1) - 1;
        let p95 = sorted[p95_idx.min(self.sample_count - 1)];

        let max = self.max_poll_us;
        let overruns = self.overrun_count;
        let cycles = self.cycles_scheduled;

        self.max_poll_us = 0;
        self.cycles_scheduled = 0;

        (avg, max, p95, overruns, cycles)
    }
}
