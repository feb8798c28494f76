// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Wire types shared by the master and secondary binaries.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A single entry in the replicated log.
///
/// Derives `Serialize`/`Deserialize` directly so it doubles as the wire
/// representation of a `full_messages` entry and a `/replicate` body; there
/// is no separate DTO layer for this simple a protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub message: String,
    pub order: u64,
}

/// Body of `POST /messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppendRequest {
    pub message: String,
    pub w: usize,
    /// Overrides how long the write-concern coordinator waits for `w - 1`
    /// secondary acks before giving up, in milliseconds. Ties the wait to
    /// *this caller's* deadline (SPEC_FULL.md §4.1 step 4, §5) rather than
    /// a single master-wide constant; omitted requests fall back to the
    /// master's configured default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Response body of a successful `POST /messages`.
#[derive(Debug, Clone, Serialize)]
pub struct AppendResponse {
    pub status: &'static str,
    pub message_id: String,
    pub order: u64,
}

/// Response body of `GET /messages`.
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub messages: Vec<String>,
}

/// Response body of `GET /full_messages`.
#[derive(Debug, Clone, Serialize)]
pub struct FullListResponse {
    pub messages: Vec<LogEntry>,
}

/// Body of `POST /replicate`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplicateRequest {
    pub id: String,
    pub message: String,
    pub order: u64,
}

/// Response body of a successful `POST /replicate`.
#[derive(Debug, Clone, Serialize)]
pub struct ReplicateResponse {
    pub status: &'static str,
}

/// Body of `POST /sync`.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncRequest {
    pub secondary: String,
}

/// Errors raised anywhere in the replicated-log protocol, mapped to HTTP
/// status codes at the edge via [`IntoResponse`] so handlers can `?`-propagate
/// instead of hand-building `Response` values for every error path.
#[derive(Debug, thiserror::Error)]
pub enum ReplogError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("insufficient replicas: have {have}, need {need}")]
    InsufficientReplicas { have: usize, need: usize },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ReplogError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ReplogError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ReplogError::InsufficientReplicas { have, need } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("insufficient replicas: have {have}, need {need}"),
            ),
            ReplogError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };
        (status, Json(json!({ "status": "error", "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ReplogError>;
