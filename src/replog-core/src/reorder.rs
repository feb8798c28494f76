// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The secondary-side reorder buffer and the delivery-advance algorithm
//! that drains it.

use std::collections::BTreeMap;

use crate::log::Log;
use crate::types::LogEntry;

/// Holds entries whose `order` exceeds `expectedOrder`, keyed by `order`,
/// until contiguous delivery catches up to them.
#[derive(Debug, Default)]
pub struct ReorderBuffer {
    buffered: BTreeMap<u64, LogEntry>,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, order: u64) -> bool {
        self.buffered.contains_key(&order)
    }

    pub fn len(&self) -> usize {
        self.buffered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffered.is_empty()
    }

    pub fn insert(&mut self, entry: LogEntry) {
        self.buffered.insert(entry.order, entry);
    }

    pub fn clear(&mut self) {
        self.buffered.clear();
    }

    /// Applies an arrival that the caller has already determined is not a
    /// dedup no-op (§4.3 steps 2-3): if it is the next expected entry,
    /// appends it and drains every buffered entry that becomes contiguous
    /// as a result; otherwise it is out of order and gets buffered.
    pub fn ingest(&mut self, log: &mut Log, expected_order: &mut u64, entry: LogEntry) {
        if entry.order == *expected_order {
            log.push_in_order(entry);
            *expected_order += 1;
            while let Some(next) = self.buffered.remove(expected_order) {
                log.push_in_order(next);
                *expected_order += 1;
            }
        } else {
            debug_assert!(entry.order > *expected_order);
            self.buffered.insert(entry.order, entry);
        }
    }
}
