// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The secondary's HTTP surface.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use replog_core::{
    BadRequestJson, ListResponse, LogEntry, ReplicateRequest, ReplicateResponse, ReplogError,
    Result,
};
use serde_json::{json, Value};

use crate::state::{IngestOutcome, SecondaryState};

pub fn router(state: Arc<SecondaryState>) -> Router {
    Router::new()
        .route("/replicate", post(handle_replicate))
        .route("/messages", get(handle_list))
        .route("/clear", post(handle_clear))
        .route("/api/livez", get(replog_core::config::handle_liveness_check))
        .with_state(state)
}

async fn handle_replicate(
    State(state): State<Arc<SecondaryState>>,
    BadRequestJson(req): BadRequestJson<ReplicateRequest>,
) -> Result<Json<ReplicateResponse>> {
    if req.id.is_empty() || req.message.is_empty() {
        return Err(ReplogError::BadRequest(
            "id and message must be non-empty".into(),
        ));
    }
    let entry = LogEntry {
        id: req.id,
        message: req.message,
        order: req.order,
    };
    match state.ingest(entry) {
        IngestOutcome::Ack => Ok(Json(ReplicateResponse { status: "ACK" })),
        IngestOutcome::FaultInjected => {
            Err(ReplogError::Internal(anyhow::anyhow!("simulated fault")))
        }
    }
}

async fn handle_list(State(state): State<Arc<SecondaryState>>) -> Json<ListResponse> {
    Json(ListResponse {
        messages: state.list(),
    })
}

async fn handle_clear(State(state): State<Arc<SecondaryState>>) -> Json<Value> {
    state.clear();
    Json(json!({ "status": "cleared" }))
}
