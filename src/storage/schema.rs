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

// Lazy creation of the per-day log table

use regex::Regex;
use rusqlite::{params, Connection};
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::storage::StorageError;

/// Column layout of the log table. `{table}` is replaced by a validated
/// identifier.
const LOG_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS "{table}" (
    id      INTEGER PRIMARY KEY,
    boardid TEXT,
    system  TEXT,
    module  TEXT,
    log     TEXT,
    date    TEXT
);
"#;

static TABLE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("table name pattern is valid")
});

/// Reject anything that is not a plain SQL identifier.
///
/// Table names cannot be bound as parameters, so this is the only thing
/// standing between configuration and the statement text.
pub fn validate_table_name(table: &str) -> Result<(), StorageError> {
    if TABLE_NAME_PATTERN.is_match(table) {
        Ok(())
    } else {
        Err(StorageError::InvalidTableName(table.to_string()))
    }
}

/// Check the catalog for `table`. Any failure reads as "absent".
pub fn table_exists(conn: &Connection, table: &str) -> bool {
    let result = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get::<_, i64>(0),
    );

    match result {
        Ok(count) => count > 0,
        Err(e) => {
            warn!(table, error = %e, "Catalog lookup failed, treating table as missing");
            false
        }
    }
}

/// Create the log table unless it already exists on this connection
pub fn ensure_table(conn: &Connection, table: &str) -> Result<(), StorageError> {
    if table_exists(conn, table) {
        return Ok(());
    }

    validate_table_name(table)?;
    conn.execute_batch(&LOG_TABLE_DDL.replace("{table}", table))
        .map_err(|source| StorageError::Schema {
            table: table.to_string(),
            source,
        })?;

    info!(table, "Log table created");
    Ok(())
}
