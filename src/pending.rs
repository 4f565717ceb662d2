//! Bounded delivery queue with lifetime de-duplication.
//!
//! Owned by exactly one subscription loop, so nothing here is synchronised.

use std::collections::{HashSet, VecDeque};

use crate::item::Item;

/// Items waiting for the consumer, plus every identity ever accepted.
#[derive(Debug)]
pub(crate) struct PendingQueue {
    items: VecDeque<Item>,
    /// Identities already enqueued or delivered.  Never pruned.
    seen: HashSet<String>,
    capacity: usize,
}

/// What [`PendingQueue::admit`] did with a batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Admitted {
    pub(crate) queued: usize,
    pub(crate) duplicates: usize,
    /// New items that did not fit.  They stay unseen so a later fetch that
    /// repeats them can still queue them.
    pub(crate) deferred: usize,
}

impl PendingQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            seen: HashSet::new(),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn has_room(&self) -> bool {
        self.items.len() < self.capacity
    }

    /// Append unseen items in batch order, skipping identities already seen
    /// (including repeats inside the batch itself).
    pub(crate) fn admit(&mut self, batch: Vec<Item>) -> Admitted {
        let mut admitted = Admitted::default();
        for item in batch {
            if self.seen.contains(&item.identity) {
                admitted.duplicates += 1;
            } else if !self.has_room() {
                admitted.deferred += 1;
            } else {
                self.seen.insert(item.identity.clone());
                self.items.push_back(item);
                admitted.queued += 1;
            }
        }
        admitted
    }

    pub(crate) fn pop_front(&mut self) -> Option<Item> {
        self.items.pop_front()
    }
}
