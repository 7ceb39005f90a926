//! Host clocks.
use std::{
    thread,
    time::{Duration, Instant},
};

/// Timer to pace the host loop against a fixed period.
///
/// When the VM yields control back to the caller, time elapses until
/// it is resumed. The elapsed time is taken into account when
/// determining the next cycle.
pub struct Clock {
    start: Instant,
    period: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    ///
    /// A zero period never blocks and ticks on every check.
    pub fn new(period: impl Into<Duration>) -> Self {
        Self {
            start: Instant::now(),
            period: period.into(),
        }
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Check whether a period has elapsed, without blocking.
    ///
    /// Restarts the period when it returns `true`.
    pub fn tick(&mut self) -> bool {
        if self.start.elapsed() >= self.period {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        while self.start.elapsed() < self.period {
            // Sleep does not have enough resolution at instruction rates,
            // and spinning burns a core. Yielding is the compromise.
            thread::yield_now();
        }

        // Reset back to zero, rather than trying to catch up after a stall.
        self.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_period() {
        let mut clock = Clock::new(Duration::ZERO);
        assert!(clock.tick());
        assert!(clock.tick());
        clock.wait();
    }

    #[test]
    fn test_long_period() {
        let mut clock = Clock::new(Duration::from_secs(3600));
        assert!(!clock.tick());
    }

    #[test]
    fn test_wait_blocks_for_period() {
        let period = Duration::from_millis(5);
        let mut clock = Clock::new(period);
        let start = Instant::now();
        clock.wait();
        assert!(start.elapsed() >= period);
    }
}
