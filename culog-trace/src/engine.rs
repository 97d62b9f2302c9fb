// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Engine lifecycle and the hot-path event logger.
//!
//! All process-wide state lives in statics guarded by atomics, never a
//! blocking `Mutex`, so that `log_event` — called on every instrumented
//! function boundary — never blocks on a kernel syscall and so that
//! `start`/`stop` remain callable from a signal handler in `manual` mode.
//! This mirrors `libdd-crashtracker`'s use of `AtomicPtr` swaps instead of a
//! `Mutex` around data a signal handler must touch.

use crate::buffer::{AppendOutcome, EventBuffer};
use crate::config::EngineConfiguration;
use crate::event::{Event, EventKind};
use crate::report;
use crate::symbol::SymbolCache;
use culog_common::{clock, threading, CulogError};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicPtr, AtomicUsize, Ordering};
use std::sync::Mutex;

static ENABLED: AtomicBool = AtomicBool::new(false);
static MAIN_THREAD_ONLY: AtomicBool = AtomicBool::new(false);
static MIN_TIME_US: AtomicI64 = AtomicI64::new(0);
static MAIN_THREAD_ID: AtomicI64 = AtomicI64::new(i64::MIN);
static BUFFER_PTR: AtomicPtr<EventBuffer> = AtomicPtr::new(ptr::null_mut());
static WRITERS_IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
static REPORT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Records the identity of the loading thread as "the main thread" for
/// `main_thread_only` filtering. Must be called once, from the thread that
/// loaded the library, before tracing starts.
pub fn init_main_thread() {
    MAIN_THREAD_ID.store(threading::get_current_thread_id(), Ordering::Relaxed);
}

/// Starts tracing. Idempotent: if already started, configuration is
/// re-read but already-buffered events are kept.
pub fn start() {
    let cfg = EngineConfiguration::from_env();
    MAIN_THREAD_ONLY.store(cfg.main_thread_only, Ordering::Relaxed);
    MIN_TIME_US.store(cfg.min_time_us, Ordering::Relaxed);
    *REPORT_PATH.lock().unwrap_or_else(|e| e.into_inner()) = cfg.report_path.clone();

    if BUFFER_PTR.load(Ordering::Acquire).is_null() {
        let capacity = cfg.max_samples.max(1);
        let buffer = Box::new(EventBuffer::new(capacity));
        BUFFER_PTR.store(Box::into_raw(buffer), Ordering::Release);
        tracing::debug!(capacity, "allocated new event buffer");
    } else {
        tracing::debug!("start() called while already started; keeping buffered data");
    }

    ENABLED.store(true, Ordering::SeqCst);
}

/// Stops tracing and emits a report. Idempotent: a second call with no
/// buffer in place is a no-op.
pub fn stop() {
    ENABLED.store(false, Ordering::SeqCst);

    let ptr = BUFFER_PTR.swap(ptr::null_mut(), Ordering::AcqRel);
    if ptr.is_null() {
        return;
    }

    // Any thread that had already incremented WRITERS_IN_FLIGHT before our
    // swap above is guaranteed to hold (or be about to use) the pointer we
    // just took; it will decrement once finished. Any thread that
    // increments *after* our swap will observe a null BUFFER_PTR and never
    // dereference `ptr`. Waiting for the counter to reach zero therefore
    // guarantees no writer is touching `ptr`'s memory once we proceed.
    while WRITERS_IN_FLIGHT.load(Ordering::Acquire) != 0 {
        std::hint::spin_loop();
    }

    // SAFETY: `ptr` was produced by `Box::into_raw` in `start()`, and the
    // wait above established no other thread still references it.
    let buffer = unsafe { Box::from_raw(ptr) };
    let events = buffer.drain();
    drop(buffer);

    emit_report(&events);
}

/// The hot path: called once per instrumented function entry/exit and once
/// per explicit scoped begin/end.
pub fn log_event(address: usize, kind: EventKind) {
    // Step 1: lock-free enabled check.
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let main_thread_only = MAIN_THREAD_ONLY.load(Ordering::Relaxed);
    let thread = threading::get_current_thread_id();

    // Step 2: thread filter.
    if main_thread_only && thread != MAIN_THREAD_ID.load(Ordering::Relaxed) {
        return;
    }

    // Step 3: build the event on the stack.
    let timestamp = clock::now_us();
    let event = Event {
        kind,
        address,
        thread,
        timestamp,
    };

    // Register intent to touch the buffer before loading the pointer, so
    // that `stop()`'s quiescence wait (above) cannot observe zero writers
    // while we still hold a valid pointer.
    WRITERS_IN_FLIGHT.fetch_add(1, Ordering::AcqRel);

    let ptr = BUFFER_PTR.load(Ordering::Acquire);
    if ptr.is_null() {
        WRITERS_IN_FLIGHT.fetch_sub(1, Ordering::AcqRel);
        return;
    }

    // SAFETY: `ptr` is non-null, and WRITERS_IN_FLIGHT has already been
    // incremented, so `stop()` cannot free it out from under us until we
    // decrement below.
    let buffer = unsafe { &*ptr };

    // Min-time coalescing is restricted to main_thread_only mode; append,
    // then auto-disable once capacity is reached.
    let outcome = buffer.append_or_coalesce(event, main_thread_only, MIN_TIME_US.load(Ordering::Relaxed));
    if outcome == AppendOutcome::StoredAtCapacity {
        ENABLED.store(false, Ordering::SeqCst);
    }

    WRITERS_IN_FLIGHT.fetch_sub(1, Ordering::AcqRel);
}

/// Current process id, used for the report's `pid` field and default
/// output path.
fn current_pid() -> i32 {
    std::process::id() as i32
}

fn emit_report(events: &[Event]) {
    let path = REPORT_PATH
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    let pid = current_pid();
    let resolved = path.unwrap_or_else(|| format!("./culog-{pid}.json"));

    if let Err(e) = write_report_to(&resolved, events, pid) {
        eprintln!("culog: {e}");
    }
}

fn write_report_to(path: &str, events: &[Event], pid: i32) -> Result<(), CulogError> {
    let file = std::fs::File::create(path).map_err(CulogError::OutputOpen)?;
    let mut writer = std::io::BufWriter::new(file);
    let mut cache = SymbolCache::new();
    report::write_trace(&mut writer, events, pid, &mut cache)
}
