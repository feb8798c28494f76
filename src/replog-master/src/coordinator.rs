// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The write-concern coordinator: waits, per append, until enough
//! distinct secondaries have acked a given `order`. It never sends
//! anything itself (that's the dispatcher's job — see REDESIGN FLAGS R2
//! in SPEC_FULL.md) and never holds a lock across its wait, so a blocked
//! high-`w` append cannot stall a concurrent low-`w` append.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::state::MasterState;

/// Blocks until `needed` distinct secondaries have acked `order`, or
/// `timeout` elapses. Returns the number of distinct acks observed.
pub async fn wait_for_acks(state: &MasterState, order: u64, needed: usize, timeout: Duration) -> usize {
    if needed == 0 {
        return 0;
    }

    // Subscribe before taking the snapshot: any ack published after this
    // point is guaranteed to be observed on `rx`, and the snapshot below
    // covers everything published before it. No ack can fall in the gap.
    let mut rx = state.ack_tx.subscribe();
    let mut acked = snapshot(state, order);
    if acked.len() >= needed {
        return acked.len();
    }

    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return acked.len();
        }
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Ok(event)) if event.order >= order => {
                acked.insert(event.secondary);
                if acked.len() >= needed {
                    return acked.len();
                }
            }
            Ok(Ok(_)) => {}
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => {
                acked = snapshot(state, order);
                if acked.len() >= needed {
                    return acked.len();
                }
            }
            Ok(Err(broadcast::error::RecvError::Closed)) => return acked.len(),
            Err(_elapsed) => return acked.len(),
        }
    }
}

fn snapshot(state: &MasterState, order: u64) -> HashSet<usize> {
    state
        .secondaries
        .iter()
        .enumerate()
        .filter(|(_, s)| s.has_acked(order))
        .map(|(i, _)| i)
        .collect()
}
