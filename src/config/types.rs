// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Configuration types for daylog

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DaylogConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub flush: FlushConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where day files live and what they contain
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory; each day gets a `yyyy_MM_dd` sub-directory
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// Database file name inside each day directory
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Table holding the log records
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            file_name: default_file_name(),
            table_name: default_table_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlushConfig {
    /// Period between flush ticks
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl FlushConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,  // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String,  // "text", "compact"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_base_path() -> PathBuf { PathBuf::from("./data/logs") }
fn default_file_name() -> String { "filter.db".to_string() }
fn default_table_name() -> String { "logs".to_string() }
fn default_interval_ms() -> u64 { 1000 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }
