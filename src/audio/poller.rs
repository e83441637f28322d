use std::time::{Duration, Instant};

/// Timer for sampling the engine position while a file is playing.
///
/// The poller itself only decides *when* to sample; the session reads the
/// engine status and reports it. Cancelling is synchronous: once `cancel`
/// returns, `due` stays false until the next `start`.
#[derive(Debug)]
pub struct ProgressPoller {
    interval: Duration,
    next_due: Option<Instant>,
}

impl ProgressPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    /// Arm the poller; the first sample is due immediately.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Whether a sample is due at `now`. Consumes the tick and schedules the
    /// next one.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(at) if now >= at => {
                // Don't try to catch up on missed ticks.
                let mut next = at + self.interval;
                if next <= now {
                    next = now + self.interval;
                }
                self.next_due = Some(next);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_poller_is_never_due() {
        let mut p = ProgressPoller::new(Duration::from_millis(100));
        assert!(!p.is_running());
        assert!(!p.due(Instant::now()));
    }

    #[test]
    fn ticks_at_the_configured_interval() {
        let mut p = ProgressPoller::new(Duration::from_millis(100));
        let t0 = Instant::now();
        p.start(t0);

        assert!(p.due(t0));
        assert!(!p.due(t0 + Duration::from_millis(50)));
        assert!(p.due(t0 + Duration::from_millis(100)));
        assert!(!p.due(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn skips_missed_ticks_instead_of_bursting() {
        let mut p = ProgressPoller::new(Duration::from_millis(100));
        let t0 = Instant::now();
        p.start(t0);
        assert!(p.due(t0));

        let late = t0 + Duration::from_millis(1_000);
        assert!(p.due(late));
        assert!(!p.due(late + Duration::from_millis(10)));
    }

    #[test]
    fn cancel_takes_effect_immediately() {
        let mut p = ProgressPoller::new(Duration::from_millis(100));
        let t0 = Instant::now();
        p.start(t0);
        p.cancel();
        assert!(!p.is_running());
        assert!(!p.due(t0 + Duration::from_secs(5)));
    }
}
