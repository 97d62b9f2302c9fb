// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Engine configuration, read from environment variables.

use culog_common::env;
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_SAMPLES: i64 = 1_000_000;

/// Configuration read at `start()` time. Re-read on every `start()` call
/// (including a restart of an already-started engine), so an updated
/// environment takes effect without reloading the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfiguration {
    pub max_samples: usize,
    pub min_time_us: i64,
    pub main_thread_only: bool,
    pub manual: bool,
    pub report_path: Option<String>,
}

impl Default for EngineConfiguration {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES as usize,
            min_time_us: 0,
            main_thread_only: false,
            manual: false,
            report_path: None,
        }
    }
}

impl EngineConfiguration {
    /// Reads `CU_MAX_SAMPLES`, `CU_MIN_TIME`, `CU_MAIN_THREAD_ONLY`,
    /// `CU_MANUAL` and `CU_FILE`. Any individual variable that is missing
    /// or fails to parse silently falls back to its default.
    pub fn from_env() -> Self {
        let max_samples = env::var_i64("CU_MAX_SAMPLES")
            .filter(|v| *v > 0)
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_SAMPLES as usize);

        let min_time_us = env::var_i64("CU_MIN_TIME")
            .filter(|v| *v >= 0)
            .unwrap_or(0);

        Self {
            max_samples,
            min_time_us,
            main_thread_only: env::var_flag("CU_MAIN_THREAD_ONLY"),
            manual: env::var_flag("CU_MANUAL"),
            report_path: env::var_string("CU_FILE"),
        }
    }

    /// Resolves the output path, applying the `./culog-<pid>.json` default.
    pub fn resolved_report_path(&self, pid: i32) -> String {
        self.report_path
            .clone()
            .unwrap_or_else(|| format!("./culog-{pid}.json"))
    }
}
