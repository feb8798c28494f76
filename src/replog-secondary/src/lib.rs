// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A secondary of a primary-backup replicated log.
//!
//! Library surface consumed by `src/bin/replog-secondary.rs` and by the
//! `tests/` integration scenarios.

pub mod http;
pub mod state;
pub mod sync;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::state::SecondaryState;

/// Command-line / environment configuration for a secondary.
#[derive(Debug, clap::Parser)]
#[clap(name = "replog-secondary")]
pub struct Args {
    /// The port on which to serve this secondary's HTTP surface.
    #[clap(long, env = "HTTP_PORT", default_value = "5001")]
    pub http_port: u16,

    /// The master's base URL, used for `/replicate` acks, initial sync,
    /// and (optionally) the startup sync signal.
    #[clap(long, env = "MASTER_URL", default_value = "http://master:5000")]
    pub master_url: String,

    /// This secondary's name, as configured in the master's `--secondaries`
    /// table; required to send the explicit `POST /sync` indication.
    #[clap(long, env = "SECONDARY_NAME")]
    pub secondary_name: Option<String>,

    /// Skip sending the optional `POST /sync` startup indication to the
    /// master (§4.4). By default it is sent.
    #[clap(long, env = "SKIP_SYNC_SIGNAL")]
    pub skip_sync_signal: bool,

    /// Probability in `[0, 1]` that `/replicate` rejects an otherwise
    /// valid request with `500` before touching any state, to exercise
    /// the master's retry path. Zero by default.
    #[clap(long, env = "FAULT_PROBABILITY", default_value = "0.0")]
    pub fault_probability: f64,

    /// Timeout applied to the initial-sync pull and the sync signal.
    #[clap(long, env = "MASTER_REQUEST_TIMEOUT_SECS", default_value = "5")]
    pub master_request_timeout_secs: u64,

    #[clap(flatten)]
    pub logging: replog_core::config::LoggingArgs,
}

/// Runs a secondary: performs initial sync against the master, optionally
/// announces itself via the sync signal, then serves `/replicate` and
/// friends until the process is killed.
pub async fn run(args: Args) -> anyhow::Result<()> {
    args.logging.init_tracing();

    if !(0.0..=1.0).contains(&args.fault_probability) {
        anyhow::bail!(
            "fault-probability must be in [0, 1], got {}",
            args.fault_probability
        );
    }

    let state = Arc::new(SecondaryState::new(args.fault_probability));
    let timeout = Duration::from_secs(args.master_request_timeout_secs);

    // §4.4 step 1-3: pull the master's full log before accepting
    // replicate requests.
    sync::initial_sync(&state, &args.master_url, timeout).await;

    if !args.skip_sync_signal {
        if let Some(name) = &args.secondary_name {
            sync::send_sync_signal(&args.master_url, name, timeout).await;
        } else {
            tracing::warn!(
                "no --secondary-name configured; skipping the startup sync signal"
            );
        }
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", args.http_port).parse()?;
    let listener = std::net::TcpListener::bind(addr)
        .with_context(|| format!("binding to {addr}"))?;
    info!("serving on {addr}");
    axum::Server::from_tcp(listener)?
        .serve(http::router(state).into_make_service())
        .await
        .context("secondary HTTP server failed")?;
    Ok(())
}
