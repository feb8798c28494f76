// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::process;

use clap::Parser;
use replog_secondary::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(err) = replog_secondary::run(args).await {
        eprintln!("replog-secondary: fatal: {err:#}");
        process::exit(1);
    }
}
