//! Outbound queue
//!
//! FIFO of messages waiting to leave the bridge. A failed delivery goes back
//! to the tail, so one unreachable destination cannot starve the others.

use std::collections::VecDeque;
use std::time::Instant;
use types::{Address, Message};

#[derive(Debug, Clone)]
pub struct OutboundQueueEntry {
    pub destination: Address,
    pub message: Message,
    pub enqueued_at: Instant,
    /// Failed delivery attempts so far
    pub attempts: u32,
}

impl OutboundQueueEntry {
    pub fn new(destination: Address, message: Message) -> Self {
        Self {
            destination,
            message,
            enqueued_at: Instant::now(),
            attempts: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct OutboundQueue {
    entries: VecDeque<OutboundQueueEntry>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: OutboundQueueEntry) {
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<OutboundQueueEntry> {
        self.entries.pop_front()
    }

    /// Put a failed entry back at the tail with its attempt count bumped
    pub fn requeue(&mut self, mut entry: OutboundQueueEntry) {
        entry.attempts += 1;
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
