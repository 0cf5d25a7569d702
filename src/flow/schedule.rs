//! Ordered queue of pending assistant emissions.
//!
//! Every entry is due strictly after the previous one, so draining the queue
//! in order replays the assistant's messages exactly as declared regardless
//! of how often it is polled.

use std::collections::VecDeque;
use std::time::Duration;

use crate::config::TimingConfig;

/// Something the scheduler will do once its time comes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// Append an assistant message.
    Say(String),
    /// Hand the finished result to the parent.
    Handoff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    pub due: Duration,
    pub emission: Emission,
}

#[derive(Debug, Clone)]
pub struct EmissionQueue {
    timing: TimingConfig,
    items: VecDeque<Scheduled>,
    /// Due time of the last queued entry.
    cursor: Duration,
}

impl EmissionQueue {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            timing,
            items: VecDeque::new(),
            cursor: Duration::ZERO,
        }
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// How long the assistant "types" a message before it appears.
    pub fn typing_delay(&self, text: &str) -> Duration {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        self.timing
            .typing_per_char
            .saturating_mul(chars)
            .max(self.timing.typing_floor)
    }

    /// Queue an assistant message after everything already queued.
    /// Returns the time it will appear.
    pub fn say(&mut self, now: Duration, text: impl Into<String>) -> Duration {
        let text = text.into();
        let due = self.cursor.max(now) + self.timing.message_gap + self.typing_delay(&text);
        self.push(due, Emission::Say(text));
        due
    }

    /// Queue the result handoff after everything already queued.
    pub fn handoff(&mut self, now: Duration) -> Duration {
        let due = self.cursor.max(now) + self.timing.handoff_delay;
        self.push(due, Emission::Handoff);
        due
    }

    fn push(&mut self, due: Duration, emission: Emission) {
        self.cursor = due;
        self.items.push_back(Scheduled { due, emission });
    }

    /// Pop the head entry if it is due at `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<Scheduled> {
        if self.items.front().is_some_and(|s| s.due <= now) {
            self.items.pop_front()
        } else {
            None
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.items.front().map(|s| s.due)
    }

    /// Whether an assistant message is still waiting to appear.
    pub fn has_pending_messages(&self) -> bool {
        self.items
            .iter()
            .any(|s| matches!(s.emission, Emission::Say(_)))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop everything pending.
    pub fn clear(&mut self, now: Duration) {
        self.items.clear();
        self.cursor = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> TimingConfig {
        TimingConfig {
            typing_floor: Duration::from_millis(1000),
            typing_per_char: Duration::from_millis(25),
            message_gap: Duration::from_millis(500),
            handoff_delay: Duration::from_millis(2000),
        }
    }

    #[test]
    fn typing_delay_has_a_floor() {
        let queue = EmissionQueue::new(timing());
        assert_eq!(queue.typing_delay("Hi"), Duration::from_millis(1000));
        let long = "x".repeat(100);
        assert_eq!(queue.typing_delay(&long), Duration::from_millis(2500));
    }

    #[test]
    fn entries_are_strictly_sequential() {
        let mut queue = EmissionQueue::new(timing());
        let first = queue.say(Duration::ZERO, "short");
        let second = queue.say(Duration::ZERO, "x".repeat(80));
        let third = queue.handoff(Duration::ZERO);

        assert_eq!(first, Duration::from_millis(1500));
        assert_eq!(second, first + Duration::from_millis(500 + 2000));
        assert_eq!(third, second + Duration::from_millis(2000));
    }

    #[test]
    fn pop_respects_due_time_and_order() {
        let mut queue = EmissionQueue::new(timing());
        queue.say(Duration::ZERO, "one");
        queue.say(Duration::ZERO, "two");

        assert!(queue.pop_due(Duration::from_millis(1499)).is_none());
        // Even far in the future, entries come out one at a time, in order.
        let late = Duration::from_secs(60);
        assert_eq!(queue.pop_due(late).unwrap().emission, Emission::Say("one".into()));
        assert_eq!(queue.pop_due(late).unwrap().emission, Emission::Say("two".into()));
        assert!(queue.pop_due(late).is_none());
    }

    #[test]
    fn idle_queue_schedules_from_now() {
        let mut queue = EmissionQueue::new(timing());
        let due = queue.say(Duration::from_secs(10), "hello");
        assert_eq!(due, Duration::from_millis(11_500));
    }

    #[test]
    fn pending_messages_ignore_handoff() {
        let mut queue = EmissionQueue::new(timing());
        queue.handoff(Duration::ZERO);
        assert!(!queue.has_pending_messages());
        queue.say(Duration::ZERO, "bye");
        assert!(queue.has_pending_messages());
        queue.clear(Duration::ZERO);
        assert!(queue.is_empty());
    }
}
