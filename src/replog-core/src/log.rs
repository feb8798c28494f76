// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The append-only, densely-ordered log store shared by the master and
//! every secondary.
//!
//! `Log` is deliberately not internally synchronized: callers own a mutex
//! around it sized to the atomicity their component actually needs (the
//! master's append critical section is just the log; a secondary's ingest
//! critical section spans the log, its reorder buffer, and `expectedOrder`
//! together). See `replog-master::state` and `replog-secondary::state`.

use std::collections::HashSet;

use uuid::Uuid;

use crate::types::LogEntry;

/// An append-only sequence of [`LogEntry`] values, densely ordered from
/// zero (invariant L1 on the master, invariant L2 as a prefix on a
/// secondary).
#[derive(Debug, Default)]
pub struct Log {
    entries: Vec<LogEntry>,
    ids: HashSet<String>,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of entries in the log, and therefore the next `order`
    /// that will be assigned.
    pub fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if an entry with this `id` or this `order` has already been
    /// appended (invariant L3's idempotence key).
    pub fn contains(&self, id: &str, order: u64) -> bool {
        self.ids.contains(id) || order < self.len()
    }

    /// Appends a brand-new entry, assigning it a fresh id and the next
    /// dense `order`. Master-only: this is the single step that folds id
    /// generation and order assignment together (see SPEC_FULL.md §9).
    pub fn append_new(&mut self, message: String) -> LogEntry {
        let entry = LogEntry {
            id: Uuid::new_v4().to_string(),
            order: self.len(),
            message,
        };
        self.push_in_order(entry.clone());
        entry
    }

    /// Appends an entry already assigned an `order`, which must equal the
    /// log's current length. Used by a secondary delivering an entry that
    /// has reached the head of its reorder buffer, and during initial sync.
    pub fn push_in_order(&mut self, entry: LogEntry) {
        debug_assert_eq!(
            entry.order,
            self.len(),
            "push_in_order called out of order: log has {} entries, entry.order = {}",
            self.len(),
            entry.order
        );
        self.ids.insert(entry.id.clone());
        self.entries.push(entry);
    }

    /// Payloads only, in `order` ascending, for `GET /messages`.
    pub fn list(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    /// Full entries, in `order` ascending, for `GET /full_messages`.
    pub fn full(&self) -> Vec<LogEntry> {
        self.entries.clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_new_assigns_dense_orders() {
        let mut log = Log::new();
        let a = log.append_new("a".into());
        let b = log.append_new("b".into());
        assert_eq!(a.order, 0);
        assert_eq!(b.order, 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.list(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn contains_matches_by_id_or_order() {
        let mut log = Log::new();
        let a = log.append_new("a".into());
        assert!(log.contains(&a.id, 999));
        assert!(log.contains("unrelated-id", 0));
        assert!(!log.contains("unrelated-id", 1));
    }

    #[test]
    fn clear_resets_everything() {
        let mut log = Log::new();
        log.append_new("a".into());
        log.clear();
        assert_eq!(log.len(), 0);
        assert!(log.full().is_empty());
    }
}
