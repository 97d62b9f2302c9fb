// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The Event (Sample) record.

/// Whether an event marks a function/scope entry or exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Enter,
    Exit,
}

impl EventKind {
    /// Chrome Trace Format phase letter: `B` for Enter, `E` for Exit.
    pub fn phase(self) -> char {
        match self {
            EventKind::Enter => 'B',
            EventKind::Exit => 'E',
        }
    }
}

/// An immutable enter/exit record. Constructed entirely on the stack on the
/// hot path — no heap allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub address: usize,
    pub thread: i64,
    pub timestamp: i64,
}
