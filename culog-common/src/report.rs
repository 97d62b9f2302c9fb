// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The `otherData` envelope shared by both writers, and JSON string
//! escaping for free-form text (symbol names, captured command lines).

use chrono::Local;
use std::io::{self, Write};

/// Formats the current local time as `YYYY-MM-DD HH:MM:SS ±ZZZZ`, matching
/// `strftime("%Y-%m-%d %H:%M:%S %z", ...)` in the reference implementation.
pub fn timestamp_str() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string()
}

/// Returns `"<sysname> <release>"`, e.g. `"Linux 6.8.0"`. Empty string if
/// `uname(2)` fails.
pub fn os_str() -> String {
    // SAFETY: `uts` is a plain-old-data struct; `uname` only writes into it.
    unsafe {
        let mut uts: libc::utsname = std::mem::zeroed();
        if libc::uname(&mut uts) != 0 {
            return String::new();
        }
        let sysname = cstr_field(&uts.sysname);
        let release = cstr_field(&uts.release);
        format!("{sysname} {release}")
    }
}

unsafe fn cstr_field(field: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Number of logical cores visible to this process, as a string (the wire
/// format represents `cores` as a JSON string, not a number).
pub fn cores_str() -> String {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .to_string()
}

/// Writes the shared `"otherData": { ... }` object, including the trailing
/// comma that precedes `"traceEvents"` in both writers.
pub fn write_other_data(w: &mut impl Write) -> io::Result<()> {
    writeln!(w, "{{")?;
    writeln!(w, "\"otherData\": {{")?;
    writeln!(w, "  \"timestamp\":\"{}\",", timestamp_str())?;
    writeln!(w, "  \"os\":\"{}\",", os_str())?;
    writeln!(w, "  \"cores\":\"{}\"", cores_str())?;
    writeln!(w, "}},")?;
    Ok(())
}

/// Escapes control characters, `"` and `\` as `\u00XX`, matching the
/// reference implementation's `cup_escapejson`. Characters above U+001F
/// pass through unescaped (including non-ASCII UTF-8, which is already
/// valid inside a JSON string).
pub fn escape_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch == '"' || ch == '\\' || (ch as u32) <= 0x1f {
            out.push_str(&format!("\\u{:04x}", ch as u32));
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_json("a\"b\\c"), "a\\u0022b\\u005cc");
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_json("a\nb\tc"), "a\\u000ab\\u0009c");
    }

    #[test]
    fn leaves_ordinary_text_unescaped() {
        assert_eq!(escape_json("hello world"), "hello world");
    }

    #[test]
    fn cores_str_is_positive_integer() {
        let cores: u64 = cores_str().parse().expect("cores must be numeric");
        assert!(cores >= 1);
    }

    #[test]
    fn os_str_is_nonempty_on_supported_platforms() {
        assert!(!os_str().is_empty());
    }

    #[test]
    fn other_data_envelope_is_well_formed_prefix() {
        let mut buf = Vec::new();
        write_other_data(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("{\n\"otherData\": {\n"));
        assert!(text.trim_end().ends_with("},"));
        assert!(text.contains("\"cores\":"));
    }
}
