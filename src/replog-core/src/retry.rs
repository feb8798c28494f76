// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A small exponential-backoff stepper for dispatcher-shaped retry loops,
//! in the shape of `mz_ore::retry::Retry`: a builder that produces a
//! stateful stepper the caller drives one attempt at a time.

use std::time::Duration;

/// Builder for a capped exponential backoff sequence.
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    initial_backoff: Duration,
    clamp_backoff: Duration,
    max_tries: usize,
}

impl Default for Retry {
    fn default() -> Self {
        Retry {
            initial_backoff: Duration::from_secs(2),
            clamp_backoff: Duration::from_secs(10),
            max_tries: 5,
        }
    }
}

impl Retry {
    pub fn initial_backoff(mut self, d: Duration) -> Self {
        self.initial_backoff = d;
        self
    }

    pub fn clamp_backoff(mut self, d: Duration) -> Self {
        self.clamp_backoff = d;
        self
    }

    pub fn max_tries(mut self, n: usize) -> Self {
        self.max_tries = n;
        self
    }

    pub fn into_retry_state(self) -> RetryState {
        RetryState {
            retry: self,
            attempt: 0,
        }
    }
}

/// Tracks the in-progress attempt count for one activation of a retry
/// loop. A fresh `RetryState` is created each time the dispatcher picks up
/// a head-of-queue entry to (re)transmit from attempt zero; see
/// `replog-master::dispatcher`.
#[derive(Debug, Clone, Copy)]
pub struct RetryState {
    retry: Retry,
    attempt: usize,
}

impl RetryState {
    /// Attempts already consumed.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// True once `max_tries` attempts have been made without success.
    pub fn exhausted(&self) -> bool {
        self.attempt >= self.retry.max_tries
    }

    /// The backoff duration for the *next* attempt: `min(initial * 2^attempt, clamp)`.
    pub fn backoff(&self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt as u32).unwrap_or(u32::MAX);
        self.retry
            .initial_backoff
            .saturating_mul(factor)
            .min(self.retry.clamp_backoff)
    }

    /// Sleeps for the current backoff and advances to the next attempt.
    pub async fn sleep(&mut self) {
        tokio::time::sleep(self.backoff()).await;
        self.attempt += 1;
    }
}
