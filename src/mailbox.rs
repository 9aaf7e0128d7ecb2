//! In-memory mailbox holding undelivered messages.
//!
//! The mailbox is an ordered sequence of [`StoredMessage`]s, insertion
//! order = arrival order. It is owned by the server's accept loop and
//! mutated only through [`Mailbox::append`] and [`Mailbox::take_for`], so
//! no locking is involved anywhere.
//!
//! Retrieval is destructive: a message is visible to exactly one read by
//! its recipient and removed the moment it is selected.

use crate::core::wire::{StoredMessage, MAX_BATCH};

/// The server's holding area for undelivered messages.
///
/// Lives for the server process's lifetime; created empty, never persisted.
#[derive(Debug, Default)]
pub struct Mailbox {
    messages: Vec<StoredMessage>,
}

impl Mailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message at the end of the sequence. Always succeeds.
    pub fn append(&mut self, message: StoredMessage) {
        self.messages.push(message);
    }

    /// Remove and return up to [`MAX_BATCH`] messages addressed to
    /// `username`, oldest first.
    ///
    /// The whole store is scanned even after the cap is reached so the
    /// returned flag can report whether matches remain queued. Messages
    /// left behind, matching or not, keep their relative order.
    pub fn take_for(&mut self, username: &str) -> (Vec<StoredMessage>, bool) {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.messages.len());
        let mut more_available = false;

        for message in self.messages.drain(..) {
            if message.recipient == username && taken.len() < MAX_BATCH {
                taken.push(message);
            } else {
                if message.recipient == username {
                    more_available = true;
                }
                kept.push(message);
            }
        }

        self.messages = kept;
        (taken, more_available)
    }

    /// Number of undelivered messages, across all recipients.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if no messages are queued.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
