// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-trace engine configuration, read from environment variables.

use culog_common::env;

/// Configuration read once, at library load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    pub report_path: Option<String>,
    pub expand_processes: bool,
}

impl ProcessConfig {
    /// Reads `CU_FILE` and `CU_EXPAND_PROCESSES`. Missing or unparsable
    /// values silently fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            report_path: env::var_string("CU_FILE"),
            expand_processes: env::var_flag("CU_EXPAND_PROCESSES"),
        }
    }

    /// Resolves the output path, applying the `./culog-<pid>.json` default.
    pub fn resolved_report_path(&self, pid: i32) -> String {
        self.report_path
            .clone()
            .unwrap_or_else(|| format!("./culog-{pid}.json"))
    }
}
