// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-Trace Engine: records each participating process's wall-clock
//! duration and aggregates them, across a process tree, into a single
//! Chrome Trace Format report.

pub mod cmdline;
pub mod config;
pub mod coordination;
pub mod engine;
pub mod writer;

mod ffi;
