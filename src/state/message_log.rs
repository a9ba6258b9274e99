//! Append-only chat message log

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::watch;

/// Retained messages plus the number ever appended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHistory {
    messages: VecDeque<String>,
    total: u64,
}

impl MessageHistory {
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.messages.back().map(String::as_str)
    }

    /// Messages appended since start, including evicted ones
    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Message log shared by every chat session
///
/// With a capacity the oldest entries are evicted first; without one the log
/// grows for the lifetime of the process.
#[derive(Clone)]
pub struct MessageLog {
    tx: Arc<watch::Sender<MessageHistory>>,
    capacity: Option<usize>,
}

impl MessageLog {
    pub fn new(capacity: Option<usize>) -> Self {
        let (tx, _) = watch::channel(MessageHistory::default());
        Self {
            tx: Arc::new(tx),
            capacity: capacity.filter(|&c| c > 0),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Append a message, returning its 1-based sequence number
    pub fn append(&self, text: impl Into<String>) -> u64 {
        let text = text.into();
        let capacity = self.capacity;
        let mut seq = 0;

        self.tx.send_modify(|history| {
            history.messages.push_back(text);
            if let Some(cap) = capacity {
                while history.messages.len() > cap {
                    history.messages.pop_front();
                }
            }
            history.total += 1;
            seq = history.total;
        });

        seq
    }

    /// Owned copy of the retained messages, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.tx.borrow().messages.iter().cloned().collect()
    }

    pub fn history(&self) -> MessageHistory {
        self.tx.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    pub fn total(&self) -> u64 {
        self.tx.borrow().total
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn subscribe(&self) -> watch::Receiver<MessageHistory> {
        self.tx.subscribe()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::unbounded()
    }
}
