// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! End-to-end coverage for an unwritable output path: tracing must degrade
//! to a single stderr diagnostic, with no crash and no partial report
//! file.

use culog_trace::engine;
use culog_trace::event::EventKind;
use std::sync::Mutex;

// `engine` holds process-wide statics; serialize this test against any
// other test in the binary that also drives start/stop.
static LOCK: Mutex<()> = Mutex::new(());

#[test]
fn unwritable_output_directory_degrades_gracefully() {
    let _guard = LOCK.lock().unwrap();

    std::env::set_var("CU_MAX_SAMPLES", "10");
    std::env::set_var("CU_FILE", "/nonexistent-directory/report.json");
    engine::init_main_thread();

    engine::start();
    engine::log_event(0x1, EventKind::Enter);
    // stop() must not panic even though the report path cannot be opened.
    engine::stop();

    assert!(!std::path::Path::new("/nonexistent-directory/report.json").exists());

    std::env::remove_var("CU_MAX_SAMPLES");
    std::env::remove_var("CU_FILE");
}
