//! Bounded memory of recently handled messages.
//!
//! Keys are kept in insertion order; once the set grows past the high-water mark it is pruned
//! to the most recently inserted entries. Membership is in-memory only.

use crate::channels::InboundMessage;
use std::collections::{HashSet, VecDeque};

/// Dedup identity: sender and raw content, compared without normalization.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct MessageKey {
    pub sender: String,
    pub content: String,
}

impl MessageKey {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }

    pub fn of(msg: &InboundMessage) -> Self {
        Self::new(msg.sender.clone(), msg.content.clone())
    }
}

/// Insertion-ordered handled set with high-water pruning.
#[derive(Debug)]
pub struct Deduplicator {
    order: VecDeque<MessageKey>,
    members: HashSet<MessageKey>,
    high_water: usize,
    retain: usize,
}

impl Deduplicator {
    /// `high_water`: size that triggers pruning; `retain`: entries kept after pruning.
    pub fn new(high_water: usize, retain: usize) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            high_water,
            retain: retain.min(high_water),
        }
    }

    /// False when `key` was already handled and not yet evicted.
    pub fn should_process(&self, key: &MessageKey) -> bool {
        !self.members.contains(key)
    }

    /// Record `key` as handled; prunes to the most recent `retain` entries past the high-water mark.
    pub fn mark_handled(&mut self, key: MessageKey) {
        if !self.members.insert(key.clone()) {
            return;
        }
        self.order.push_back(key);
        if self.order.len() > self.high_water {
            let evict = self.order.len() - self.retain;
            for old in self.order.drain(..evict) {
                self.members.remove(&old);
            }
            log::debug!("dedup: pruned {} handled entries", evict);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(300, 200)
    }
}
