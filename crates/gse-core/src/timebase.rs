use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Session clock. Every sample and journal entry of one dashboard session
/// is stamped from the same start instant.
///
/// The wall-clock anchor is read once; later wall-clock stamps are derived
/// from the monotonic clock so they never step backwards mid-session.
#[derive(Debug, Clone, Copy)]
pub struct TimeBase {
    start: Instant,
    start_unix_us: u64,
}

impl TimeBase {
    pub fn new() -> Self {
        let start_unix_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;
        Self {
            start: Instant::now(),
            start_unix_us,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Seconds since start. Sample timestamps come from here.
    pub fn now_s(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn now_us(&self) -> u64 {
        self.elapsed().as_micros() as u64
    }

    /// Session start plus monotonic elapsed time, in Unix microseconds.
    pub fn unix_us(&self) -> u64 {
        self.start_unix_us + self.now_us()
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clocks_advance_together() {
        let tb = TimeBase::new();
        let (s0, unix0) = (tb.now_s(), tb.unix_us());
        std::thread::sleep(Duration::from_millis(5));
        let (s1, unix1) = (tb.now_s(), tb.unix_us());
        assert!(s0 >= 0.0);
        assert!(s1 - s0 >= 0.005);
        assert!(unix1 - unix0 >= 5_000);
    }
}
