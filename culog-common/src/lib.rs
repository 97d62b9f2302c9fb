// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Primitives shared by the function-trace and process-trace engines:
//! wall-clock microseconds, an opaque thread identity, environment-variable
//! parsing with silent fallback to defaults, JSON string escaping, and the
//! common Chrome Trace Format `otherData` envelope.

pub mod clock;
pub mod env;
pub mod error;
pub mod logging;
pub mod report;
pub mod threading;

pub use error::CulogError;
