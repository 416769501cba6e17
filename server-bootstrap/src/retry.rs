use log::{info, warn};
use std::time::Duration;

/// Whole-unit retry: every attempt waits `delay` first, then runs the unit
/// from the top. Sub-steps are never retried on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted {
    pub attempts: u32,
}

impl RetryPolicy {
    /// Returns the 1-based attempt number that succeeded.
    pub fn run<S, F>(&self, label: &str, mut sleep: S, mut unit: F) -> Result<u32, Exhausted>
    where
        S: FnMut(Duration),
        F: FnMut(u32) -> std::io::Result<()>,
    {
        for attempt in 1..=self.max_attempts {
            info!(
                "{label}: attempt {attempt}/{}, waiting {}s",
                self.max_attempts,
                self.delay.as_secs()
            );
            sleep(self.delay);
            match unit(attempt) {
                Ok(()) => return Ok(attempt),
                Err(e) => warn!("{label}: attempt {attempt} failed: {e}"),
            }
        }
        Err(Exhausted {
            attempts: self.max_attempts,
        })
    }
}
