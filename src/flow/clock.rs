//! Time source for the flow scheduler.
//!
//! Flow time is a `Duration` offset from the moment the clock was created.
//! The engine never reads wall-clock time itself; callers pass `clock.now()`
//! into every operation, which keeps transcripts reproducible under a
//! [`ManualClock`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current logical time.
    fn now(&self) -> Duration;

    /// Resolve once `now() >= deadline`.
    async fn sleep_until(&self, deadline: Duration);
}

/// Real time, backed by the tokio timer.
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep_until(&self, deadline: Duration) {
        tokio::time::sleep_until(self.origin + deadline).await;
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    tx: watch::Sender<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Duration::ZERO);
        Self { tx }
    }

    /// Move time forward, waking any sleeper whose deadline has passed.
    pub fn advance(&self, by: Duration) {
        self.tx.send_modify(|now| *now += by);
    }

    /// Jump to an absolute time. Never moves backwards.
    pub fn set(&self, to: Duration) {
        self.tx.send_modify(|now| {
            if to > *now {
                *now = to;
            }
        });
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.tx.borrow()
    }

    async fn sleep_until(&self, deadline: Duration) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so `changed` only errors if
        // the clock is dropped mid-sleep.
        while *rx.borrow_and_update() < deadline {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn manual_clock_moves_forward_only() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now(), Duration::from_millis(1500));
        clock.set(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::from_millis(1500));
        clock.set(Duration::from_secs(3));
        assert_eq!(clock.now(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn manual_sleep_resolves_after_advance() {
        let clock = Arc::new(ManualClock::new());
        let sleeper = {
            let clock = Arc::clone(&clock);
            tokio::spawn(async move { clock.sleep_until(Duration::from_secs(2)).await })
        };

        clock.advance(Duration::from_secs(1));
        tokio::task::yield_now().await;
        assert!(!sleeper.is_finished());

        clock.advance(Duration::from_secs(1));
        tokio::time::timeout(Duration::from_secs(1), sleeper)
            .await
            .expect("sleeper should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn past_deadline_returns_immediately() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(5));
        tokio::time::timeout(Duration::from_millis(100), clock.sleep_until(Duration::from_secs(1)))
            .await
            .expect("deadline already passed");
    }
}
