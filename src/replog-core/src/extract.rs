// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A `Json`-like extractor that maps every rejection — malformed body,
//! wrong content type, or valid JSON missing a required field — to
//! `ReplogError::BadRequest`, and therefore a `400`.
//!
//! `axum::Json<T>` renders a missing-field rejection as a `422`, but
//! SPEC_FULL.md §6/§7 (and the original `master.py`/`secondary.py`, which
//! check `'field' not in data` by hand before doing anything else) both
//! require `400` on a missing or malformed field.

use axum::body::HttpBody;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Json};
use axum::http::Request;
use axum::{async_trait, BoxError};
use serde::de::DeserializeOwned;

use crate::types::ReplogError;

/// Wraps `axum::Json<T>`, converting its rejection into a `400 BadRequest`
/// instead of axum's default `422`.
pub struct BadRequestJson<T>(pub T);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for BadRequestJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = ReplogError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ReplogError::BadRequest(rejection.to_string()))?;
        Ok(BadRequestJson(value))
    }
}
