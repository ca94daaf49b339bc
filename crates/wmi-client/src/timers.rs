//! Keyed debounce timers
//!
//! The page runs on a single event loop, so timers are plain deadlines the
//! loop polls with [`Debouncer::take_due`]. Scheduling a key that already
//! has a pending timer replaces it: only the latest request survives.
//! Time is always passed in by the caller, which keeps tests deterministic.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A pending timer
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending<T> {
    deadline: Instant,
    seq: u64,
    payload: T,
}

/// Cancel-and-replace timers keyed by logical operation
#[derive(Debug, Clone)]
pub struct Debouncer<K, T> {
    pending: HashMap<K, Pending<T>>,
    seq: u64,
}

impl<K, T> Default for Debouncer<K, T> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            seq: 0,
        }
    }
}

impl<K: Eq + Hash + Clone, T> Debouncer<K, T> {
    /// Create an empty timer set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` under `key`, replacing any pending timer for it.
    /// Returns true when an earlier timer was cancelled.
    pub fn schedule(&mut self, key: K, now: Instant, delay: Duration, payload: T) -> bool {
        self.seq += 1;
        self.pending
            .insert(
                key,
                Pending {
                    deadline: now + delay,
                    seq: self.seq,
                    payload,
                },
            )
            .is_some()
    }

    /// Drop the pending timer for `key`
    pub fn cancel(&mut self, key: &K) -> Option<T> {
        self.pending.remove(key).map(|p| p.payload)
    }

    /// Drop every pending timer whose key matches; returns how many
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|k, _| !pred(k));
        before - self.pending.len()
    }

    /// Whether `key` has a pending timer
    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of pending timers
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest pending deadline
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every timer whose deadline is at or before `now`,
    /// in deadline order (scheduling order on ties).
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, T)> {
        let due_keys: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut due: Vec<(K, Pending<T>)> = due_keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (k, p)))
            .collect();
        due.sort_by_key(|(_, p)| (p.deadline, p.seq));
        due.into_iter().map(|(k, p)| (k, p.payload)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_latest_schedule_wins() {
        let t0 = Instant::now();
        let mut timers = Debouncer::new();
        assert!(!timers.schedule("users", t0, 500 * MS, 1));
        assert!(timers.schedule("users", t0 + 100 * MS, 500 * MS, 2));
        assert_eq!(timers.len(), 1);

        assert!(timers.take_due(t0 + 550 * MS).is_empty());
        assert_eq!(timers.take_due(t0 + 600 * MS), vec![("users", 2)]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_keys_are_independent() {
        let t0 = Instant::now();
        let mut timers = Debouncer::new();
        timers.schedule("users", t0, 500 * MS, ());
        timers.schedule("groups", t0, 200 * MS, ());
        assert_eq!(timers.next_deadline(), Some(t0 + 200 * MS));

        let due: Vec<_> = timers.take_due(t0 + 500 * MS).into_iter().map(|(k, ())| k).collect();
        assert_eq!(due, vec!["groups", "users"]);
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut timers = Debouncer::new();
        timers.schedule(1, t0, MS, "a");
        assert!(timers.is_pending(&1));
        assert_eq!(timers.cancel(&1), Some("a"));
        assert_eq!(timers.cancel(&1), None);
        assert!(timers.take_due(t0 + 10 * MS).is_empty());
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn test_cancel_where() {
        let t0 = Instant::now();
        let mut timers = Debouncer::new();
        timers.schedule("field:gecos", t0, MS, ());
        timers.schedule("field:shell", t0, MS, ());
        timers.schedule("sort:users", t0, MS, ());
        assert_eq!(timers.cancel_where(|k| k.starts_with("field:")), 2);
        assert!(timers.is_pending(&"sort:users"));
    }
}
