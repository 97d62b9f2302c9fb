// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Function-Trace Engine: compiler-instrumented enter/exit capture, emitted
//! as a Chrome Trace Format report.

pub mod buffer;
pub mod config;
pub mod engine;
pub mod event;
pub mod report;
pub mod symbol;

mod ffi;

pub use ffi::ScopedEvent;
