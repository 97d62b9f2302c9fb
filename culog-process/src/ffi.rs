// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `LD_PRELOAD` load/unload hooks. Unlike the function-trace engine, the
//! process-trace engine exposes no other callable surface: its entire
//! lifecycle is the pair of constructor/destructor calls.

use crate::engine;
use std::panic;

fn guard<F: FnOnce() + panic::UnwindSafe>(f: F) {
    if let Err(payload) = panic::catch_unwind(f) {
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic");
        eprintln!("culog: internal panic caught at FFI boundary: {message}");
    }
}

#[ctor::ctor]
fn cup_init() {
    if std::env::var_os("LD_PRELOAD").is_none() {
        return;
    }
    culog_common::logging::init();
    guard(engine::on_load);
}

#[ctor::dtor]
fn cup_fini() {
    if std::env::var_os("LD_PRELOAD").is_none() {
        return;
    }
    guard(engine::on_unload);
}
