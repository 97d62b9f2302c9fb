// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Chrome Trace Format report emission.
//!
//! Field layout and quoting follow the reference implementation's
//! `cu_trace_report` exactly: `pid` and `tid` are JSON strings (not
//! numbers), samples are separated by `,\n  `, and the file ends with a
//! bare `\n` before the closing `]`.

use crate::event::Event;
use crate::symbol::SymbolCache;
use culog_common::report::write_other_data;
use culog_common::CulogError;
use std::io::Write;

/// Writes the full report — `otherData` envelope followed by `traceEvents`
/// — for `events`, resolving each event's address through `cache`.
pub fn write_trace(
    w: &mut impl Write,
    events: &[Event],
    pid: i32,
    cache: &mut SymbolCache,
) -> Result<(), CulogError> {
    write_other_data(w)?;

    writeln!(w, "\"traceEvents\": [")?;
    for (i, event) in events.iter().enumerate() {
        if i == 0 {
            write!(w, "  ")?;
        } else {
            write!(w, ",\n  ")?;
        }
        let name = cache.resolve(event.address);
        write!(
            w,
            "{{ \"ph\":\"{}\", \"cat\":\"perf\", \"pid\":\"{}\", \"tid\":\"{}\", \"name\":\"{}\", \"ts\":{} }}",
            event.kind.phase(),
            pid,
            event.thread,
            name,
            event.timestamp,
        )?;
    }
    writeln!(w)?;
    writeln!(w, "]")?;
    writeln!(w, "}}")?;

    Ok(())
}
