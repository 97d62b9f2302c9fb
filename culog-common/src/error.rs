// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Internal error type shared by both engines' fallible, non-hot-path
//! operations (opening the report file, acquiring its lock, formatting a
//! sub-process command line). None of these ever cross the FFI boundary:
//! every caller at the `extern "C"` surface matches on the `Result` and
//! degrades to a documented fallback instead of propagating it further.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CulogError {
    #[error("failed to open output path: {0}")]
    OutputOpen(std::io::Error),

    #[error("failed to lock output path: {0}")]
    Lock(std::io::Error),

    #[error("I/O error writing report: {0}")]
    Io(#[from] std::io::Error),

    #[error("command-line capture failed: {0}")]
    CommandLineCapture(String),
}
