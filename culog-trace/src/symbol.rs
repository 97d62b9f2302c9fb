// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lazy, report-time-only address-to-symbol resolution.
//!
//! Resolution never happens on the hot path: this cache is only ever
//! touched while building a report, after tracing has been disabled.

use std::collections::HashMap;
use symbolic_common::Name;
use symbolic_demangle::{Demangle, DemangleOptions};

/// A mapping from raw event address to its resolved, human-readable
/// symbol string. Entries are stable once inserted.
#[derive(Default)]
pub struct SymbolCache {
    entries: HashMap<usize, String>,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `addr`, consulting the cache first and falling back to the
    /// symbol backend (here, `backtrace::resolve`) on a miss.
    pub fn resolve(&mut self, addr: usize) -> String {
        if let Some(cached) = self.entries.get(&addr) {
            return cached.clone();
        }
        let resolved = resolve_uncached(addr);
        self.entries.insert(addr, resolved.clone());
        resolved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Queries the symbol backend for the nearest exported symbol covering
/// `addr`, demangles it if it looks mangled, and appends the signed byte
/// offset from the symbol's base address. Falls back to `0x<hex>` if the
/// backend has no symbol for this address.
fn resolve_uncached(addr: usize) -> String {
    let mut found: Option<(String, usize)> = None;
    backtrace::resolve(addr as *mut std::ffi::c_void, |symbol| {
        if found.is_some() {
            return;
        }
        if let Some(name) = symbol.name() {
            let raw = name.as_str().unwrap_or_default().to_string();
            // `symbol.addr()` is the resolved symbol's own base address,
            // which may differ from `addr` when `addr` falls inside the
            // body of the function rather than at its entry point.
            let base = symbol.addr().map(|p| p as usize).unwrap_or(addr);
            found = Some((raw, base));
        }
    });

    match found {
        Some((raw_name, base)) => {
            let display_name = demangle_if_mangled(&raw_name);
            let offset = addr as isize - base as isize;
            format!("{display_name} + {offset}")
        }
        None => format!("0x{addr:x}"),
    }
}

/// Demangles `name` when it looks like a mangled Itanium C++ (`_Z...`) or
/// Rust (`_R...`) symbol; returns the input unchanged otherwise, or if
/// demangling fails.
fn demangle_if_mangled(name: &str) -> String {
    if !(name.starts_with("_Z") || name.starts_with("_R") || name.starts_with("__Z")) {
        return name.to_string();
    }
    let demangled = Name::from(name).demangle(DemangleOptions::complete());
    demangled.unwrap_or_else(|| name.to_string())
}
