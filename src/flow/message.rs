//! Transcript of a flow: what the assistant said and what the user answered.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Assistant,
    User,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Assistant => write!(f, "assistant"),
            Self::User => write!(f, "user"),
        }
    }
}

/// One transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the transcript, starting at 1.
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    /// Logical flow time at which the message appeared, in milliseconds.
    pub created_at_ms: u64,
}

impl Message {
    pub fn created_at(&self) -> Duration {
        Duration::from_millis(self.created_at_ms)
    }

    pub fn is_assistant(&self) -> bool {
        self.sender == Sender::Assistant
    }
}

/// Append-only, insertion-ordered message store.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return a copy of it.
    pub(crate) fn append(&mut self, sender: Sender, text: impl Into<String>, at: Duration) -> Message {
        let message = Message {
            id: self.messages.len() as u64 + 1,
            sender,
            text: text.into(),
            created_at_ms: at.as_millis() as u64,
        };
        self.messages.push(message.clone());
        message
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Texts of all assistant messages, in order.
    pub fn assistant_texts(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.is_assistant())
            .map(|m| m.text.as_str())
            .collect()
    }

    /// Messages appended after the one with id `after` (exclusive).
    pub fn since(&self, after: u64) -> &[Message] {
        let start = (after as usize).min(self.messages.len());
        &self.messages[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_order_is_kept() {
        let mut log = MessageLog::new();
        log.append(Sender::Assistant, "Hello there!", Duration::from_millis(1000));
        log.append(Sender::User, "Jane Doe", Duration::from_millis(4000));
        log.append(Sender::Assistant, "Nice to meet you", Duration::from_millis(5500));

        let ids: Vec<u64> = log.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(log.assistant_texts(), vec!["Hello there!", "Nice to meet you"]);
        assert_eq!(log.last().unwrap().created_at(), Duration::from_millis(5500));
    }

    #[test]
    fn since_returns_tail() {
        let mut log = MessageLog::new();
        for i in 0..4 {
            log.append(Sender::Assistant, format!("m{i}"), Duration::ZERO);
        }
        assert_eq!(log.since(2).len(), 2);
        assert_eq!(log.since(2)[0].text, "m2");
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn sender_serde_matches_display() {
        for sender in [Sender::Assistant, Sender::User] {
            let json = serde_json::to_string(&sender).unwrap();
            assert_eq!(json, format!("\"{sender}\""));
        }
    }
}
