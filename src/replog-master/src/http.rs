// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The master's HTTP surface, implemented with `axum::Router`, sharing
//! state via `axum::extract::State<Arc<MasterState>>` rather than any
//! global (see REDESIGN FLAGS / SPEC_FULL.md §9).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use replog_core::{
    AppendRequest, AppendResponse, BadRequestJson, FullListResponse, ListResponse, ReplogError,
    Result, SyncRequest,
};
use serde_json::{json, Value};
use tracing::info;

use crate::coordinator;
use crate::state::MasterState;

pub fn router(state: Arc<MasterState>) -> Router {
    Router::new()
        .route("/messages", post(handle_append).get(handle_list))
        .route("/full_messages", get(handle_full_messages))
        .route("/sync", post(handle_sync))
        .route("/clear", post(handle_clear))
        .route("/api/livez", get(replog_core::config::handle_liveness_check))
        .with_state(state)
}

async fn handle_append(
    State(state): State<Arc<MasterState>>,
    BadRequestJson(req): BadRequestJson<AppendRequest>,
) -> Result<Json<AppendResponse>> {
    if req.message.is_empty() {
        return Err(ReplogError::BadRequest("message must be non-empty".into()));
    }
    let max_w = 1 + state.secondaries.len();
    if req.w < 1 || req.w > max_w {
        return Err(ReplogError::BadRequest(format!(
            "w must be between 1 and {max_w}, got {}",
            req.w
        )));
    }

    // §4.1 step 1: generate id + assign order + append, under a single
    // critical section serialised across concurrent appends (L1).
    let entry = {
        let mut log = state.log.lock().unwrap();
        log.append_new(req.message)
    };

    // §4.1 step 2: enqueue to every secondary's dispatcher.
    for secondary in &state.secondaries {
        secondary.enqueue(entry.clone());
    }

    // §4.1 step 3: the master itself counts as one ack toward w.
    let needed = req.w.saturating_sub(1);
    if needed == 0 {
        return Ok(Json(AppendResponse {
            status: "ok",
            message_id: entry.id,
            order: entry.order,
        }));
    }

    // §4.1 step 4 / §5: the wait is bounded by *this caller's* deadline
    // when given one, not a single master-wide constant, so a client
    // willing to wait longer than the default isn't cut off early.
    let timeout = req
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(state.write_concern_timeout);
    let acked = coordinator::wait_for_acks(&state, entry.order, needed, timeout).await;
    if acked >= needed {
        Ok(Json(AppendResponse {
            status: "ok",
            message_id: entry.id,
            order: entry.order,
        }))
    } else {
        // Retain-and-converge (see DESIGN.md): the entry stays in the
        // master's log and dispatchers keep retrying in the background;
        // the client sees a failure but nothing is rolled back.
        Err(ReplogError::InsufficientReplicas {
            have: acked,
            need: needed,
        })
    }
}

async fn handle_list(State(state): State<Arc<MasterState>>) -> Json<ListResponse> {
    let messages = state.log.lock().unwrap().list();
    Json(ListResponse { messages })
}

async fn handle_full_messages(State(state): State<Arc<MasterState>>) -> Json<FullListResponse> {
    let messages = state.log.lock().unwrap().full();
    Json(FullListResponse { messages })
}

async fn handle_sync(
    State(state): State<Arc<MasterState>>,
    BadRequestJson(req): BadRequestJson<SyncRequest>,
) -> Result<Json<Value>> {
    let secondary = state
        .secondary_by_name(&req.secondary)
        .ok_or_else(|| ReplogError::BadRequest(format!("unknown secondary {:?}", req.secondary)))?;
    info!("sync signal received for {}; draining its queue now", secondary.name);
    secondary.notify.notify_one();
    Ok(Json(json!({ "status": "ok" })))
}

async fn handle_clear(State(state): State<Arc<MasterState>>) -> Json<Value> {
    state.clear();
    Json(json!({ "status": "cleared" }))
}
