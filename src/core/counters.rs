//! Per-priority counters for re-reservations and delay scheduling.

use std::collections::{BTreeMap, HashMap};

use crate::util::Priority;

/// Multiset of priorities: a non-negative count per priority, zero when unseen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityCounter {
    counts: BTreeMap<Priority, u32>,
}

impl PriorityCounter {
    /// Create an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count.
    #[must_use]
    pub fn count(&self, priority: Priority) -> u32 {
        self.counts.get(&priority).copied().unwrap_or(0)
    }

    /// Overwrite the count. Zero removes the entry.
    pub fn set(&mut self, priority: Priority, count: u32) {
        if count == 0 {
            self.counts.remove(&priority);
        } else {
            self.counts.insert(priority, count);
        }
    }

    /// Add one and return the new count.
    pub fn increment(&mut self, priority: Priority) -> u32 {
        let next = self.count(priority).saturating_add(1);
        self.set(priority, next);
        next
    }

    /// Subtract one, floored at zero, and return the new count.
    pub fn decrement(&mut self, priority: Priority) -> u32 {
        let next = self.count(priority).saturating_sub(1);
        self.set(priority, next);
        next
    }

    /// Reset to zero.
    pub fn reset(&mut self, priority: Priority) {
        self.counts.remove(&priority);
    }
}

/// Delay-scheduling state: how many chances each priority has been given
/// since it last placed a container, and when that last placement happened.
#[derive(Debug, Clone, Default)]
pub struct OpportunityCounters {
    opportunities: PriorityCounter,
    last_scheduled: HashMap<Priority, u64>,
}

impl OpportunityCounters {
    /// Create empty counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more scheduling opportunity.
    pub fn add(&mut self, priority: Priority) -> u32 {
        self.opportunities.increment(priority)
    }

    /// Take back one opportunity, never going below zero.
    pub fn subtract(&mut self, priority: Priority) -> u32 {
        self.opportunities.decrement(priority)
    }

    /// Zero the count and remember when the priority last scheduled.
    pub fn reset(&mut self, priority: Priority, timestamp_ms: u64) {
        self.last_scheduled.insert(priority, timestamp_ms);
        self.opportunities.reset(priority);
    }

    /// Opportunities since the last successful placement.
    #[must_use]
    pub fn count(&self, priority: Priority) -> u32 {
        self.opportunities.count(priority)
    }

    /// Last-scheduled timestamps.
    #[must_use]
    pub const fn last_scheduled(&self) -> &HashMap<Priority, u64> {
        &self.last_scheduled
    }

    /// Replace the last-scheduled timestamps wholesale.
    pub fn replace_last_scheduled(&mut self, last_scheduled: HashMap<Priority, u64>) {
        self.last_scheduled = last_scheduled;
    }

    /// Move the last-scheduled timestamps out, leaving an empty map.
    pub fn take_last_scheduled(&mut self) -> HashMap<Priority, u64> {
        std::mem::take(&mut self.last_scheduled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrement_floors_at_zero() {
        let mut counter = PriorityCounter::new();
        let p = Priority(1);
        for _ in 0..3 {
            counter.increment(p);
        }
        for _ in 0..4 {
            counter.decrement(p);
        }
        assert_eq!(counter.count(p), 0);
    }

    #[test]
    fn test_unseen_priority_is_zero() {
        let counter = PriorityCounter::new();
        assert_eq!(counter.count(Priority(9)), 0);
    }

    #[test]
    fn test_reset_records_timestamp() {
        let mut counters = OpportunityCounters::new();
        let p = Priority(2);
        counters.add(p);
        counters.add(p);
        counters.reset(p, 1234);

        assert_eq!(counters.count(p), 0);
        assert_eq!(counters.last_scheduled().get(&p), Some(&1234));
    }
}
