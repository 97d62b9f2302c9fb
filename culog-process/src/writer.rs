// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Header and event writers for the process-trace report, matching
//! `cupmain.cpp::cup_writeheader` / `cup_writeevent` field-for-field.

use crate::coordination::ExclusiveLock;
use culog_common::report::write_other_data;
use culog_common::CulogError;
use std::fs::OpenOptions;
use std::io::Write;

/// Creates the report file and writes the `otherData` envelope plus the
/// opening `"traceEvents": [` array prefix. Called once, by the root
/// process only.
pub fn write_header(path: &str) -> Result<(), CulogError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(CulogError::OutputOpen)?;
    let _lock = ExclusiveLock::acquire(&file).map_err(CulogError::Lock)?;

    let mut w = &file;
    write_other_data(&mut w)?;
    write!(w, "\"traceEvents\": [\n  ")?;
    w.flush()?;
    Ok(())
}

/// Appends one `X`-phase event for this process and, if `is_root`, the
/// trailing `\n]\n}\n` that closes the array and outer object.
pub fn write_event(
    path: &str,
    is_root: bool,
    begin_ts: i64,
    end_ts: i64,
    expand_processes: bool,
    pid: i32,
    command: &str,
) -> Result<(), CulogError> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(CulogError::OutputOpen)?;
    let _lock = ExclusiveLock::acquire(&file).map_err(CulogError::Lock)?;

    let mut w = &file;
    let tid = if expand_processes { pid } else { 0 };
    let dur = end_ts - begin_ts;
    write!(
        w,
        "{{ \"ph\":\"X\", \"cat\":\"perf\", \"pid\":0, \"tid\":{tid}, \"ts\":{begin_ts}, \"dur\":{dur}, \"name\":\"{command}\" }}",
    )?;

    if is_root {
        write!(w, "\n]\n}}\n")?;
    } else {
        write!(w, ",\n  ")?;
    }

    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_followed_by_single_root_event_parses_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.json");
        let path_str = path.to_str().unwrap();

        write_header(path_str).unwrap();
        write_event(path_str, true, 1_000, 2_500, false, 42, "my-proc").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let events = value["traceEvents"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["ph"], "X");
        assert_eq!(events[0]["dur"], 1500);
        assert_eq!(events[0]["pid"], 0);
        assert_eq!(events[0]["tid"], 0);
    }

    #[test]
    fn expand_processes_uses_pid_as_tid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expand.json");
        let path_str = path.to_str().unwrap();

        write_header(path_str).unwrap();
        write_event(path_str, true, 0, 100, true, 777, "proc").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["traceEvents"][0]["tid"], 777);
    }

    #[test]
    fn multiple_events_then_root_closes_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.json");
        let path_str = path.to_str().unwrap();

        write_header(path_str).unwrap();
        // Root writes first (it starts first), then a non-root descendant
        // finishes and appends before the root's own dtor runs.
        write_event(path_str, false, 10, 20, false, 1, "child").unwrap();
        write_event(path_str, true, 0, 50, false, 0, "root").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let events = value["traceEvents"].as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["name"], "child");
        assert_eq!(events[1]["name"], "root");
    }
}
