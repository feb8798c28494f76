// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The master of a primary-backup replicated log.
//!
//! Library surface consumed by `src/bin/replog-master.rs` and by the
//! `tests/` integration scenarios: `Args` for configuration, `run` to
//! wire everything up and serve, plus the constituent modules for
//! anything a test wants to drive directly.

pub mod coordinator;
pub mod dispatcher;
pub mod http;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::state::MasterState;

/// Command-line / environment configuration for the master.
#[derive(Debug, clap::Parser)]
#[clap(name = "replog-master")]
pub struct Args {
    /// The address on which to serve the master's HTTP surface.
    #[clap(long, env = "LISTEN_ADDR", value_name = "HOST:PORT", default_value = "127.0.0.1:5000")]
    pub listen_addr: SocketAddr,

    /// The fixed set of secondaries, as a comma-separated `name=url` list,
    /// e.g. `secondary1=http://127.0.0.1:5001,secondary2=http://127.0.0.1:5002`.
    #[clap(long, env = "SECONDARIES", value_name = "NAME=URL,...", default_value = "")]
    pub secondaries: String,

    /// The fallback deadline the write-concern coordinator waits for
    /// `w - 1` secondary acks before replying with `InsufficientReplicas`,
    /// used only for appends that don't supply their own `timeout_ms`
    /// (§4.1 step 4: the wait is bound to *the caller's* deadline, not a
    /// single master-wide constant).
    #[clap(long, env = "WRITE_CONCERN_TIMEOUT_SECS", default_value = "5")]
    pub write_concern_timeout_secs: u64,

    /// The per-attempt network timeout a dispatcher applies to each
    /// `/replicate` send.
    #[clap(long, env = "DISPATCH_TIMEOUT_SECS", default_value = "2")]
    pub per_attempt_timeout_secs: u64,

    #[clap(flatten)]
    pub logging: replog_core::config::LoggingArgs,
}

/// Parses `name=url,name=url` into an ordered list, rejecting malformed
/// entries and duplicate names so the `/sync` name table stays unambiguous.
pub fn parse_secondaries(raw: &str) -> anyhow::Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, url) = part
            .split_once('=')
            .with_context(|| format!("malformed secondary entry {part:?}, expected NAME=URL"))?;
        if out.iter().any(|(n, _): &(String, String)| n == name) {
            anyhow::bail!("duplicate secondary name {name:?}");
        }
        out.push((name.to_string(), url.to_string()));
    }
    Ok(out)
}

pub fn build_state(args: &Args) -> anyhow::Result<Arc<MasterState>> {
    let secondaries = parse_secondaries(&args.secondaries)?;
    Ok(Arc::new(MasterState::new(
        secondaries,
        Duration::from_secs(args.write_concern_timeout_secs),
        Duration::from_secs(args.per_attempt_timeout_secs),
    )))
}

/// Spawns one long-lived dispatcher task per configured secondary. Each
/// runs for the lifetime of the process.
pub fn spawn_dispatchers(state: &Arc<MasterState>) {
    for idx in 0..state.secondaries.len() {
        let link = Arc::clone(&state.secondaries[idx]);
        let state = Arc::clone(state);
        tokio::spawn(dispatcher::run(idx, link, state));
    }
}

/// Runs the master: parses the secondary table, spawns one dispatcher per
/// secondary, and serves the HTTP surface until the process is killed.
pub async fn run(args: Args) -> anyhow::Result<()> {
    args.logging.init_tracing();

    let state = build_state(&args)?;
    info!(
        "master starting with {} configured secondaries",
        state.secondaries.len()
    );

    spawn_dispatchers(&state);

    let listener = std::net::TcpListener::bind(args.listen_addr)
        .with_context(|| format!("binding to {}", args.listen_addr))?;
    info!("serving on {}", args.listen_addr);
    axum::Server::from_tcp(listener)?
        .serve(http::router(state).into_make_service())
        .await
        .context("master HTTP server failed")?;
    Ok(())
}
