// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lazy `tracing` subscriber installation, shared by both engines.
//!
//! Host processes that embed this library never configure a subscriber of
//! their own, so one is installed on first use, controlled by `CULOG_LOG`
//! (default `warn`). This is separate from the unconditional `eprintln!`
//! fault diagnostics mandated for the report writers, which must be visible
//! even if a host silences this subscriber entirely.

use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the global `tracing` subscriber, if one hasn't been installed
/// yet. Safe to call repeatedly and from multiple threads.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_env("CULOG_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
