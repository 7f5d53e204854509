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

// Storage error taxonomy

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the storage layer.
///
/// `Open` and `Schema` abort the remainder of a flush tick. `Insert` only
/// affects the record being written. `Query` never leaves the query path.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The day's database file could not be opened.
    #[error("failed to open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The day's storage directory could not be created.
    #[error("failed to prepare storage directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The log table could not be created.
    #[error("failed to create table '{table}': {source}")]
    Schema {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A single record could not be inserted.
    #[error("insert failed: {0}")]
    Insert(#[source] rusqlite::Error),

    /// A lookup against a day file failed.
    #[error("query failed: {0}")]
    Query(#[source] rusqlite::Error),

    /// Table names are spliced into SQL and must be plain identifiers.
    #[error("invalid table name '{0}'")]
    InvalidTableName(String),

    /// No connection is open.
    #[error("no open connection")]
    NotOpen,

    /// Internal error (e.g., task join failure).
    #[error("internal error: {0}")]
    Internal(String),
}
