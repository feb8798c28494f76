// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Secondary-side state: the delivered log, the reorder buffer, and
//! `expectedOrder`, all guarded by a single mutex (§4.3: "under a
//! per-Secondary lock") since the ingest algorithm's dedup-check,
//! deliver, and drain steps must be atomic together.

use std::sync::Mutex;

use rand::Rng;
use replog_core::{Log, LogEntry, ReorderBuffer};

struct SecondaryInner {
    log: Log,
    buffer: ReorderBuffer,
    expected_order: u64,
}

/// Outcome of an ingest attempt against `/replicate`.
pub enum IngestOutcome {
    /// Accepted (possibly as a dedup no-op); the caller should respond
    /// `200 ACK`.
    Ack,
    /// The fault injector fired; the caller should respond `500` without
    /// having touched any state, exercising the master's retry path.
    FaultInjected,
}

pub struct SecondaryState {
    inner: Mutex<SecondaryInner>,
    /// Probability in `[0, 1]` that an ingest is rejected before touching
    /// state, per §4.3's optional fault-injection test hook. Zero by
    /// default, so production behavior is unaffected.
    fault_probability: f64,
}

impl SecondaryState {
    pub fn new(fault_probability: f64) -> Self {
        SecondaryState {
            inner: Mutex::new(SecondaryInner {
                log: Log::new(),
                buffer: ReorderBuffer::new(),
                expected_order: 0,
            }),
            fault_probability,
        }
    }

    /// §4.3's replicate-ingest algorithm.
    pub fn ingest(&self, entry: LogEntry) -> IngestOutcome {
        if self.fault_probability > 0.0 && rand::thread_rng().gen_bool(self.fault_probability) {
            return IngestOutcome::FaultInjected;
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.log.contains(&entry.id, entry.order) || inner.buffer.contains(entry.order) {
            // Already delivered, already buffered, or (order < expectedOrder
            // and not found above, which is impossible under L1-L3): all
            // dedup no-ops.
            return IngestOutcome::Ack;
        }
        if entry.order < inner.expected_order {
            return IngestOutcome::Ack;
        }
        inner
            .buffer
            .ingest(&mut inner.log, &mut inner.expected_order, entry);
        IngestOutcome::Ack
    }

    /// Applies the master's full ordered snapshot during initial sync,
    /// appending every entry whose `order >= expectedOrder` (§4.4 step 2).
    /// The master's snapshot is already dense and sorted by `order`, so
    /// each qualifying entry is immediately contiguous.
    pub fn apply_initial_sync(&self, entries: Vec<LogEntry>) {
        let mut inner = self.inner.lock().unwrap();
        for entry in entries {
            if entry.order >= inner.expected_order {
                inner
                    .buffer
                    .ingest(&mut inner.log, &mut inner.expected_order, entry);
            }
        }
    }

    pub fn list(&self) -> Vec<String> {
        self.inner.lock().unwrap().log.list()
    }

    pub fn expected_order(&self) -> u64 {
        self.inner.lock().unwrap().expected_order
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.log.clear();
        inner.buffer.clear();
        inner.expected_order = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(order: u64, id: &str, message: &str) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            message: message.to_string(),
            order,
        }
    }

    #[test]
    fn dedups_on_id_and_order() {
        let state = SecondaryState::new(0.0);
        assert!(matches!(
            state.ingest(entry(0, "dup-1", "X-dedup")),
            IngestOutcome::Ack
        ));
        assert!(matches!(
            state.ingest(entry(0, "dup-1", "X-dedup")),
            IngestOutcome::Ack
        ));
        assert_eq!(state.list(), vec!["X-dedup".to_string()]);
    }

    #[test]
    fn buffers_then_delivers_contiguously() {
        let state = SecondaryState::new(0.0);
        state.ingest(entry(0, "a", "msg0"));
        state.ingest(entry(1, "b", "msg1"));
        state.ingest(entry(3, "d", "msg3"));
        assert_eq!(
            state.list(),
            vec!["msg0".to_string(), "msg1".to_string()]
        );
        state.ingest(entry(2, "c", "msg2"));
        assert_eq!(
            state.list(),
            vec![
                "msg0".to_string(),
                "msg1".to_string(),
                "msg2".to_string(),
                "msg3".to_string()
            ]
        );
    }

    #[test]
    fn clear_resets_expected_order() {
        let state = SecondaryState::new(0.0);
        state.ingest(entry(0, "a", "msg0"));
        state.clear();
        assert_eq!(state.expected_order(), 0);
        assert!(state.list().is_empty());
    }
}
