// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Environment-variable parsing helpers shared by both engines'
//! configuration loaders. A configuration fault (missing variable, or a
//! value that fails to parse) is never an error to the caller: it silently
//! falls back to a default.

use std::env;

/// Reads `name` and parses it as `i64`. Returns `None` if unset or
/// unparsable; the caller is expected to substitute its own default.
pub fn var_i64(name: &str) -> Option<i64> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::debug!(var = name, value = %raw, "ignoring unparsable integer env var");
            None
        }
    }
}

/// Reads `name` as a boolean flag. Only the literal value `"1"` is
/// truthy, matching the reference implementation's `strncmp(v, "1", 1)`
/// convention; anything else (including unset) is `false`.
pub fn var_flag(name: &str) -> bool {
    matches!(env::var(name), Ok(v) if v.trim_start().starts_with('1'))
}

/// Reads `name` as a path-like string. Returns `None` if unset.
pub fn var_string(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Returns true if `name` is set in the environment at all, regardless of
/// its value — used for the loader-injection indicator, whose presence
/// (not content) is the signal.
pub fn var_present(name: &str) -> bool {
    env::var_os(name).is_some()
}
