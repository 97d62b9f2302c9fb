// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Command-line capture for the current process, grounded on
//! `cupmain.cpp::cup_getproccmd`.
//!
//! Prefers the native `/proc/<pid>/cmdline` interface where available,
//! falling back to shelling out to `ps` — the only option on platforms
//! without `/proc`.

use culog_common::report::escape_json;
use culog_common::CulogError;
use std::io::{Read, Write};
use std::process::Command;

/// Returns the JSON-escaped command line for `pid`, or `[<pid>]` if it
/// cannot be determined by any method.
pub fn capture(pid: i32) -> String {
    if let Some(cmd) = read_proc_cmdline(pid) {
        return escape_json(&cmd);
    }
    if let Some(cmd) = capture_via_ps(pid) {
        return escape_json(&cmd);
    }
    format!("[{pid}]")
}

/// Reads `/proc/<pid>/cmdline`, whose contents are NUL-separated argv
/// entries with a trailing NUL. Returns `None` on any platform without
/// `/proc` or if the file is empty/unreadable.
fn read_proc_cmdline(pid: i32) -> Option<String> {
    let raw = std::fs::read(format!("/proc/{pid}/cmdline")).ok()?;
    if raw.is_empty() {
        return None;
    }
    let joined = raw
        .split(|&b| b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Captures `ps -p <pid> -o args`'s output into a temp file and returns its
/// second line (the first is the `ARGS` column header), matching
/// `cup_getproccmd` exactly.
fn capture_via_ps(pid: i32) -> Option<String> {
    let mut temp = tempfile::NamedTempFile::new().ok()?;
    let output = match Command::new("ps")
        .args(["-p", &pid.to_string(), "-o", "args"])
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            let fault = CulogError::CommandLineCapture(e.to_string());
            tracing::debug!(pid, %fault, "failed to spawn ps");
            return None;
        }
    };
    if !output.status.success() {
        tracing::debug!(pid, status = ?output.status, "ps exited unsuccessfully");
        return None;
    }
    temp.write_all(&output.stdout).ok()?;
    temp.flush().ok()?;

    let mut contents = String::new();
    temp.reopen().ok()?.read_to_string(&mut contents).ok()?;
    contents.lines().nth(1).map(str::to_string)
}
