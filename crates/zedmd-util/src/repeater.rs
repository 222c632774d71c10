use std::time::{Duration, Instant};

/// Fires at most once per `interval`. Used for TCP keepalive pacing and
/// USB autodiscovery retry pacing.
#[derive(Clone, Copy, Debug)]
pub struct Repeater {
    interval: Duration,
    last_acted: Instant,
}

impl Repeater {
    #[inline]
    pub fn every(interval: Duration) -> Self {
        Self { interval, last_acted: Instant::now() - interval }
    }

    #[inline]
    pub fn fired(&mut self) -> bool {
        let el = self.last_acted.elapsed();
        if el >= self.interval {
            self.last_acted = Instant::now();
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.last_acted = Instant::now();
    }

    #[inline]
    pub fn force_fire(&mut self) {
        self.last_acted = self.last_acted.checked_sub(self.interval).unwrap_or(self.last_acted);
    }
}
