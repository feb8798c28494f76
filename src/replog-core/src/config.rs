// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Shared `clap`-derived argument fragments, `#[clap(flatten)]`-ed into
//! both binaries' `Args` structs, mirroring `clusterd::Args`'s flattened
//! `TracingCliArgs`.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Liveness probe shared by both binaries, matching the
/// `mz_http_util::handle_liveness_check` convention.
pub async fn handle_liveness_check() -> impl axum::response::IntoResponse {
    (axum::http::StatusCode::OK, "Liveness check successful!")
}

/// Logging configuration common to the master and secondary binaries.
#[derive(Debug, Clone, clap::Args)]
pub struct LoggingArgs {
    /// The `tracing_subscriber::EnvFilter` directive controlling log
    /// verbosity, e.g. `info` or `replog_master=debug,info`.
    #[clap(long, env = "LOG_FILTER", default_value = "info")]
    pub log_filter: String,
}

impl LoggingArgs {
    /// Installs a `tracing_subscriber` registry writing to stderr,
    /// filtered by `log_filter`. Call once, at the top of `main`.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_new(&self.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .finish()
            .init();
    }
}
