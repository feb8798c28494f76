// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The per-secondary dispatcher: one long-lived task per secondary that
//! owns that secondary's `PendingQueue` for the lifetime of the master
//! process, transmitting entries to it in strict `order` ascending
//! (dispatcher guarantee O1 / concurrency guarantee G2).

use std::sync::Arc;
use std::time::Duration;

use replog_core::{LogEntry, Retry};
use tracing::{info, warn};

use crate::state::{AckEvent, MasterState, SecondaryLink};

/// Runs forever, dequeuing (without removing) the head of `link`'s pending
/// queue, transmitting it, and retrying with capped exponential backoff on
/// failure. Named `"dispatcher:{name}"` in its tracing span, the spiritual
/// equivalent of `mz_ore`'s `"description" => future` spawn-naming
/// convention used by `replica_task` in `compute-client`.
pub async fn run(idx: usize, link: Arc<SecondaryLink>, state: Arc<MasterState>) {
    let span = tracing::info_span!("dispatcher", secondary = %link.name);
    let _enter = span.enter();
    info!("starting dispatcher for secondary {}", link.name);
    let client = reqwest::Client::new();

    loop {
        let entry = match next_head(&link).await {
            Some(entry) => entry,
            None => continue,
        };

        let mut retry = Retry::default().into_retry_state();
        loop {
            match send_replicate(&client, &link.url, &entry, state.per_attempt_timeout).await {
                Ok(()) => {
                    link.record_ack(entry.order);
                    link.queue.lock().unwrap().pop_front();
                    let _ = state.ack_tx.send(AckEvent {
                        secondary: idx,
                        order: entry.order,
                    });
                    break;
                }
                Err(err) => {
                    warn!(
                        order = entry.order,
                        attempt = retry.attempt(),
                        "failed to replicate to {}: {err}",
                        link.name
                    );
                    if retry.exhausted() {
                        warn!(
                            order = entry.order,
                            "exhausted retries for {}; backing off until the next activation",
                            link.name
                        );
                        link.notify.notified().await;
                        retry = Retry::default().into_retry_state();
                    } else {
                        retry.sleep().await;
                    }
                }
            }
        }
    }
}

/// Waits until the queue is non-empty, then returns a clone of the head
/// entry without removing it (it is only removed on a successful ack).
async fn next_head(link: &SecondaryLink) -> Option<LogEntry> {
    if let Some(entry) = link.queue.lock().unwrap().front().cloned() {
        return Some(entry);
    }
    link.notify.notified().await;
    link.queue.lock().unwrap().front().cloned()
}

async fn send_replicate(
    client: &reqwest::Client,
    base_url: &str,
    entry: &LogEntry,
    timeout: Duration,
) -> anyhow::Result<()> {
    let url = format!("{}/replicate", base_url.trim_end_matches('/'));
    let body = replog_core::ReplicateRequest {
        id: entry.id.clone(),
        message: entry.message.clone(),
        order: entry.order,
    };
    let resp = client.post(url).json(&body).timeout(timeout).send().await?;
    if resp.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("secondary responded with status {}", resp.status())
    }
}
