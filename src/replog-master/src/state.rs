// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Master-side state: the log, one `PendingQueue`/dispatcher link per
//! secondary, and the broadcast channel the write-concern coordinator
//! observes.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::collections::VecDeque;

use replog_core::{Log, LogEntry};
use tokio::sync::{broadcast, Notify};

/// A successful ack, published by a dispatcher after a secondary
/// acknowledges `order`. The write-concern coordinator only ever
/// *observes* this channel (see REDESIGN FLAGS R2 in SPEC_FULL.md); it
/// never performs sends itself.
#[derive(Debug, Clone, Copy)]
pub struct AckEvent {
    pub secondary: usize,
    pub order: u64,
}

/// One secondary's outbound replication link: its name, base URL, FIFO
/// `PendingQueue`, and the `lastAcked` high-water mark. The dispatcher
/// task owned by `dispatcher::run` is the only writer of `last_acked`.
pub struct SecondaryLink {
    pub name: String,
    pub url: String,
    pub queue: Mutex<VecDeque<LogEntry>>,
    pub notify: Notify,
    /// -1 means "nothing acked yet"; otherwise the highest acked `order`.
    last_acked: AtomicI64,
}

impl SecondaryLink {
    pub fn new(name: String, url: String) -> Self {
        SecondaryLink {
            name,
            url,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            last_acked: AtomicI64::new(-1),
        }
    }

    pub fn record_ack(&self, order: u64) {
        self.last_acked.fetch_max(order as i64, Ordering::SeqCst);
    }

    pub fn has_acked(&self, order: u64) -> bool {
        let la = self.last_acked.load(Ordering::SeqCst);
        la >= 0 && la as u64 >= order
    }

    /// Appends `entry` to the tail of this link's pending queue and wakes
    /// its dispatcher.
    pub fn enqueue(&self, entry: LogEntry) {
        self.queue.lock().unwrap().push_back(entry);
        self.notify.notify_one();
    }
}

/// Shared master state, injected into every handler via
/// `axum::extract::State<Arc<MasterState>>`.
pub struct MasterState {
    pub log: Mutex<Log>,
    pub secondaries: Vec<std::sync::Arc<SecondaryLink>>,
    pub ack_tx: broadcast::Sender<AckEvent>,
    /// The write-concern wait's fallback deadline, used only when an
    /// append doesn't supply its own `timeout_ms` (§4.1 step 4). A
    /// per-request `timeout_ms` ties the wait to that caller's own
    /// deadline instead, so a client willing to wait longer than this
    /// default isn't cut off by it; see `http::handle_append`.
    pub write_concern_timeout: std::time::Duration,
    pub per_attempt_timeout: std::time::Duration,
}

impl MasterState {
    pub fn new(
        secondaries: Vec<(String, String)>,
        write_concern_timeout: std::time::Duration,
        per_attempt_timeout: std::time::Duration,
    ) -> Self {
        let (ack_tx, _rx) = broadcast::channel(1024);
        MasterState {
            log: Mutex::new(Log::new()),
            secondaries: secondaries
                .into_iter()
                .map(|(name, url)| std::sync::Arc::new(SecondaryLink::new(name, url)))
                .collect(),
            ack_tx,
            write_concern_timeout,
            per_attempt_timeout,
        }
    }

    pub fn secondary_by_name(&self, name: &str) -> Option<&SecondaryLink> {
        self.secondaries.iter().find(|s| s.name == name)
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
        for s in &self.secondaries {
            s.queue.lock().unwrap().clear();
            s.last_acked.store(-1, Ordering::SeqCst);
        }
    }
}
