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

// Keyed lookups against a day's log table

use chrono::NaiveDate;
use rusqlite::{params, Connection, OpenFlags};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::record::format_line;
use crate::storage::{validate_table_name, DirectoryResolver, StorageError};

const READ_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Lines for `(board_id, system, module)` in insertion order.
///
/// Failures are logged and produce an empty result.
pub fn query_lines(
    conn: &Connection,
    table: &str,
    board_id: &str,
    system: &str,
    module: &str,
) -> Vec<String> {
    match try_query_lines(conn, table, board_id, system, module) {
        Ok(lines) => lines,
        Err(e) => {
            warn!(table, board_id, system, module, error = %e, "Log query failed");
            Vec::new()
        }
    }
}

fn try_query_lines(
    conn: &Connection,
    table: &str,
    board_id: &str,
    system: &str,
    module: &str,
) -> Result<Vec<String>, StorageError> {
    validate_table_name(table)?;

    let sql = format!(
        "SELECT date, module, log FROM \"{}\"
         WHERE boardid = ?1 AND system = ?2 AND module = ?3
         ORDER BY id ASC",
        table
    );
    let mut stmt = conn.prepare(&sql).map_err(StorageError::Query)?;
    let rows = stmt
        .query_map(params![board_id, system, module], |row| {
            let date: Option<String> = row.get(0)?;
            let module: Option<String> = row.get(1)?;
            let log: Option<String> = row.get(2)?;
            Ok(format_line(
                date.as_deref().unwrap_or_default(),
                module.as_deref().unwrap_or_default(),
                log.as_deref().unwrap_or_default(),
            ))
        })
        .map_err(StorageError::Query)?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::Query)
}

/// Read side of the day storage.
///
/// Opens its own short-lived connection per lookup and never touches the
/// flush cycle's connection.
#[derive(Clone)]
pub struct LogQuery {
    resolver: Arc<dyn DirectoryResolver>,
    clock: Arc<dyn Clock>,
    file_name: String,
    table: String,
}

impl LogQuery {
    pub fn new(
        resolver: Arc<dyn DirectoryResolver>,
        clock: Arc<dyn Clock>,
        file_name: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            clock,
            file_name: file_name.into(),
            table: table.into(),
        }
    }

    /// Look up today's records
    pub fn query(&self, board_id: &str, system: &str, module: &str) -> Vec<String> {
        self.query_day(self.clock.today(), board_id, system, module)
    }

    /// Look up the records of a specific day
    pub fn query_day(
        &self,
        day: NaiveDate,
        board_id: &str,
        system: &str,
        module: &str,
    ) -> Vec<String> {
        let path = self.path_for(day);
        if !path.exists() {
            debug!(path = %path.display(), "No storage for day, empty result");
            return Vec::new();
        }

        match open_for_read(&path) {
            Ok(conn) => query_lines(&conn, &self.table, board_id, system, module),
            Err(e) => {
                warn!(error = %e, "Log query failed");
                Vec::new()
            }
        }
    }

    /// Database file for `day`
    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.resolver.directory_for(day).join(&self.file_name)
    }
}

impl std::fmt::Debug for LogQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogQuery")
            .field("file_name", &self.file_name)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

fn open_for_read(path: &std::path::Path) -> Result<Connection, StorageError> {
    let open_err = |source| StorageError::Open {
        path: path.to_path_buf(),
        source,
    };
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(open_err)?;
    conn.busy_timeout(READ_BUSY_TIMEOUT).map_err(open_err)?;
    Ok(conn)
}
