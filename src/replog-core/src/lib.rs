// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Shared types and primitives for the primary-backup replicated log:
//! wire types and errors, a `400`-on-rejection JSON extractor, the
//! append-only log store, the secondary-side reorder buffer, a
//! retry/backoff stepper, and common CLI fragments. Consumed by the
//! `replog-master` and `replog-secondary` binaries.

pub mod config;
pub mod extract;
pub mod log;
pub mod reorder;
pub mod retry;
pub mod types;

pub use extract::BadRequestJson;
pub use log::Log;
pub use reorder::ReorderBuffer;
pub use retry::{Retry, RetryState};
pub use types::{
    AppendRequest, AppendResponse, FullListResponse, ListResponse, LogEntry, ReplicateRequest,
    ReplicateResponse, ReplogError, Result, SyncRequest,
};
