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

// Log record model shared by producers, the flush cycle and the query path

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp format stored in the `date` column
pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A single application log record.
///
/// Records are append-only. The `date` is assigned when the record is
/// created and never changes afterwards; the row identifier is owned by
/// storage and is not part of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub board_id: String,
    pub system: String,
    pub module: String,
    pub log: String,
    pub date: String,
}

impl LogRecord {
    /// Create a record stamped with the current local time
    pub fn new(
        board_id: impl Into<String>,
        system: impl Into<String>,
        module: impl Into<String>,
        log: impl Into<String>,
    ) -> Self {
        Self::stamped(board_id, system, module, log, Local::now().naive_local())
    }

    /// Create a record stamped with an explicit timestamp
    pub fn stamped(
        board_id: impl Into<String>,
        system: impl Into<String>,
        module: impl Into<String>,
        log: impl Into<String>,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            board_id: board_id.into(),
            system: system.into(),
            module: module.into(),
            log: log.into(),
            date: at.format(RECORD_DATE_FORMAT).to_string(),
        }
    }

    /// Render the record the way the query path returns it
    pub fn format_line(&self) -> String {
        format_line(&self.date, &self.module, &self.log)
    }
}

/// `[date] [module] log`
pub fn format_line(date: &str, module: &str, log: &str) -> String {
    format!("[{}] [{}] {}", date, module, log)
}
