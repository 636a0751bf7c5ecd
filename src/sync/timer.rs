//! Cancellable timers for the session loop. Both are inert until started and pend forever
//! while stopped, so they can sit in a `select!` unconditionally.

use std::future;
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};

/// One-shot deadline (debounce, idle timeout). Re-arming moves the deadline.
#[derive(Debug, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn arm(&mut self, after: Duration) {
        self.at = Some(Instant::now() + after);
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Completes at the deadline. The caller must `cancel` or re-`arm` after it fires.
    pub async fn fired(&self) {
        match self.at {
            Some(at) => time::sleep_until(at).await,
            None => future::pending().await,
        }
    }
}

/// Repeating timer (viewer polling). The first tick comes one full period after `start`.
#[derive(Debug, Default)]
pub struct Ticker {
    interval: Option<Interval>,
}

impl Ticker {
    pub fn start(&mut self, period: Duration) {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rearming_moves_the_deadline() {
        let start = Instant::now();
        let mut deadline = Deadline::default();
        assert!(!deadline.is_armed());

        deadline.arm(Duration::from_millis(500));
        time::sleep(Duration::from_millis(300)).await;
        deadline.arm(Duration::from_millis(500));
        deadline.fired().await;
        assert_eq!(start.elapsed(), Duration::from_millis(800));

        deadline.cancel();
        assert!(!deadline.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_waits_a_full_period_before_the_first_tick() {
        let start = Instant::now();
        let mut ticker = Ticker::default();
        ticker.start(Duration::from_secs(10));
        assert!(ticker.is_running());

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(20));

        ticker.stop();
        assert!(!ticker.is_running());
    }
}
