//! Progress logging at record-count intervals.

use log::info;

/// Logs progress each time the running count crosses an interval boundary.
///
/// Record processing is sequential, so the tracker is a plain counter.
///
/// # Example
/// ```
/// use juncfilt_lib::progress::ProgressTracker;
///
/// let mut tracker = ProgressTracker::new("Processed records").with_interval(100);
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // logs at 100 and 200
/// }
/// tracker.log_final(); // logs "Processed records 250 (complete)"
/// ```
pub struct ProgressTracker {
    interval: u64,
    message: String,
    count: u64,
}

impl ProgressTracker {
    /// Creates a tracker with a default interval of 1,000,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 1_000_000, message: message.into(), count: 0 }
    }

    /// Sets the logging interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Adds to the count, logging each interval boundary crossed.
    pub fn log_if_needed(&mut self, additional: u64) {
        let previous = self.count;
        self.count += additional;

        for crossed in (previous / self.interval + 1)..=(self.count / self.interval) {
            info!("{} {}", self.message, crossed * self.interval);
        }
    }

    /// Logs the final count unless it landed exactly on an interval.
    pub fn log_final(&self) {
        if self.count % self.interval != 0 {
            info!("{} {} (complete)", self.message, self.count);
        }
    }

    /// The running count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}
