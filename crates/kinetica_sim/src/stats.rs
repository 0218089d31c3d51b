//! # Step Timing
//!
//! Every step is timed per phase. [`StepStats`] keeps a running summary
//! so the shell can print one line instead of one per frame.

use std::time::Duration;

/// Wall time spent in each phase of one step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepTimings {
    /// Grid rebuild.
    pub partition_ms: f64,
    /// Boundary reflection and pairwise collision response.
    pub collision_ms: f64,
    /// Position update.
    pub integration_ms: f64,
}

impl StepTimings {
    /// Builds timings from phase durations.
    #[must_use]
    pub fn from_durations(partition: Duration, collision: Duration, integration: Duration) -> Self {
        Self {
            partition_ms: partition.as_secs_f64() * 1000.0,
            collision_ms: collision.as_secs_f64() * 1000.0,
            integration_ms: integration.as_secs_f64() * 1000.0,
        }
    }

    /// Sum of all phases.
    #[inline]
    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.partition_ms + self.collision_ms + self.integration_ms
    }
}

/// Running step statistics.
#[derive(Clone, Copy, Debug)]
pub struct StepStats {
    /// Steps recorded.
    pub steps: u64,
    /// Fastest step total.
    pub min_ms: f64,
    /// Slowest step total.
    pub max_ms: f64,
    /// Rolling average of step totals.
    pub avg_ms: f64,
    /// Timings of the most recent step.
    pub last: StepTimings,
}

impl Default for StepStats {
    fn default() -> Self {
        Self {
            steps: 0,
            min_ms: f64::MAX,
            max_ms: 0.0,
            avg_ms: 0.0,
            last: StepTimings::default(),
        }
    }
}

impl StepStats {
    /// Folds one step into the summary.
    pub fn record(&mut self, timings: StepTimings) {
        let total = timings.total_ms();
        self.min_ms = self.min_ms.min(total);
        self.max_ms = self.max_ms.max(total);
        // Rolling average: (avg * 15 + sample) / 16, seeded by the first sample.
        self.avg_ms = if self.steps == 0 {
            total
        } else {
            (self.avg_ms * 15.0 + total) / 16.0
        };
        self.steps += 1;
        self.last = timings;
    }

    /// Forgets everything recorded so far.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
