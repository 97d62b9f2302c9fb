// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-trace lifecycle: one pass at library load, one at unload.
//! Unlike the function-trace engine there is no hot path — this runs
//! exactly twice per process — so plain `Mutex`-guarded statics are fine;
//! nothing here is ever called from a signal handler.

use crate::config::ProcessConfig;
use crate::coordination::report_file_missing;
use crate::{cmdline, writer};
use culog_common::clock;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

static IS_ROOT: AtomicBool = AtomicBool::new(false);
static EXPAND_PROCESSES: AtomicBool = AtomicBool::new(false);
static BEGIN_TS: AtomicI64 = AtomicI64::new(0);
static REPORT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Runs at library load.
///
/// The original implementation hands the root-process flag to its own
/// unload phase via an inherited environment variable, working around a
/// reported issue retaining a plain `static` across the two calls. A
/// process-wide Rust `static` does not have that problem, so the flag is
/// simply kept here instead.
pub fn on_load() {
    let cfg = ProcessConfig::from_env();
    let pid = std::process::id() as i32;
    let path = cfg.resolved_report_path(pid);

    EXPAND_PROCESSES.store(cfg.expand_processes, Ordering::Relaxed);

    let is_root = report_file_missing(&path);
    if is_root {
        if let Err(e) = writer::write_header(&path) {
            eprintln!("culog: unable to write to output path '{path}': {e}");
        }
    }
    IS_ROOT.store(is_root, Ordering::Relaxed);

    *REPORT_PATH.lock().unwrap_or_else(|e| e.into_inner()) = Some(path);
    BEGIN_TS.store(clock::now_us(), Ordering::Relaxed);
}

/// Runs at library unload.
pub fn on_unload() {
    let path = REPORT_PATH
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    let Some(path) = path else {
        // on_load never ran (e.g. not actually LD_PRELOADed); nothing to do.
        return;
    };

    let end_ts = clock::now_us();
    let begin_ts = BEGIN_TS.load(Ordering::Relaxed);
    let pid = std::process::id() as i32;
    let command = cmdline::capture(pid);
    let is_root = IS_ROOT.load(Ordering::Relaxed);
    let expand_processes = EXPAND_PROCESSES.load(Ordering::Relaxed);

    if let Err(e) = writer::write_event(&path, is_root, begin_ts, end_ts, expand_processes, pid, &command) {
        eprintln!("culog: unable to append to output path '{path}': {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    static TEST_LOCK: StdMutex<()> = StdMutex::new(());

    fn reset() {
        IS_ROOT.store(false, Ordering::SeqCst);
        EXPAND_PROCESSES.store(false, Ordering::SeqCst);
        BEGIN_TS.store(0, Ordering::SeqCst);
        *REPORT_PATH.lock().unwrap() = None;
    }

    #[test]
    fn single_process_load_unload_produces_valid_root_report() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proc.json");
        std::env::set_var("CU_FILE", path.to_str().unwrap());

        on_load();
        assert!(IS_ROOT.load(Ordering::SeqCst));
        on_unload();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let events = value["traceEvents"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["ph"], "X");

        std::env::remove_var("CU_FILE");
        reset();
    }

    #[test]
    fn child_finishing_before_root_still_yields_valid_aggregate_json() {
        // Root starts first (file missing), a child starts second (file
        // already exists, so it is not root). The root writes the closing
        // array/object brackets, so — as with the original implementation
        // — correctness depends on the root being the last to unload,
        // mirroring a parent process that waits for its children.
        let _guard = TEST_LOCK.lock().unwrap();
        reset();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.json");
        std::env::set_var("CU_FILE", path.to_str().unwrap());

        on_load(); // root
        let root_is_root = IS_ROOT.load(Ordering::SeqCst);
        assert!(root_is_root);
        let root_begin = BEGIN_TS.load(Ordering::SeqCst);

        // Simulate a second, non-root process by resetting only the
        // per-process flags (not the shared report file) and loading again.
        IS_ROOT.store(false, Ordering::SeqCst);
        BEGIN_TS.store(0, Ordering::SeqCst);
        on_load(); // child: sees the file already exists
        assert!(!IS_ROOT.load(Ordering::SeqCst));
        on_unload(); // child finishes first

        // Restore root's own state and let it finish last.
        IS_ROOT.store(true, Ordering::SeqCst);
        BEGIN_TS.store(root_begin, Ordering::SeqCst);
        on_unload();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let events = value["traceEvents"].as_array().unwrap();
        assert_eq!(events.len(), 2);

        std::env::remove_var("CU_FILE");
        reset();
    }
}
