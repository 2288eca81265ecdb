use std::collections::VecDeque;

/// Deferred work posted by the stack to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMessage {
    /// Everything that was waiting on a window has cleared; run the stop sweep.
    IdleNow,
}

/// In-order queue of deferred stack messages.
///
/// Lives inside the locked stack; handling a message happens under the
/// same lock that posted it.
#[derive(Debug)]
pub struct MessageQueue {
    pending: VecDeque<StackMessage>,
    capacity: usize,
    coalesced: u64,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            capacity: capacity.max(1),
            coalesced: 0,
        }
    }

    /// Enqueue a message. Once the queue is full a message equal to one
    /// already queued is folded into it; returns false in that case.
    pub fn post(&mut self, message: StackMessage) -> bool {
        if self.pending.len() >= self.capacity && self.pending.contains(&message) {
            self.coalesced += 1;
            return false;
        }
        self.pending.push_back(message);
        true
    }

    pub fn pop(&mut self) -> Option<StackMessage> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// Drop everything still queued. Returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}
