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

// Flush cycle: drain the ingest queue and persist each record

use rusqlite::{params, Connection};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::queue::IngestQueue;
use crate::record::LogRecord;
use crate::storage::{ensure_table, ConnectionManager, DirectoryResolver, StorageError};

/// Outcome of one flush tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records removed from the queue
    pub drained: usize,
    /// Records committed to storage
    pub written: usize,
    /// Records whose insert failed
    pub dropped: usize,
    /// Records abandoned after an open or schema failure
    pub lost: usize,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.dropped == 0 && self.lost == 0
    }
}

/// Insert one record using bound parameters for every field
pub fn insert_record(
    conn: &Connection,
    table: &str,
    record: &LogRecord,
) -> Result<(), StorageError> {
    let sql = format!(
        "INSERT INTO \"{}\" (boardid, system, module, log, date) VALUES (?1, ?2, ?3, ?4, ?5)",
        table
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(StorageError::Insert)?;
    stmt.execute(params![
        record.board_id,
        record.system,
        record.module,
        record.log,
        record.date
    ])
    .map_err(StorageError::Insert)?;
    Ok(())
}

/// Persists drained records into the current day's table.
///
/// Delivery is at-most-once: a failed insert is logged and discarded, and
/// an open or schema failure abandons the rest of the tick.
pub struct LogWriter {
    connections: ConnectionManager,
    table: String,
}

impl LogWriter {
    /// The caller is expected to have validated `table`
    pub fn new(connections: ConnectionManager, table: impl Into<String>) -> Self {
        Self {
            connections,
            table: table.into(),
        }
    }

    pub fn from_parts(
        resolver: Arc<dyn DirectoryResolver>,
        clock: Arc<dyn Clock>,
        file_name: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self::new(ConnectionManager::new(resolver, clock, file_name), table)
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Run one flush tick against `queue`
    pub fn flush(&mut self, queue: &IngestQueue) -> FlushReport {
        let batch = queue.drain();
        let mut report = FlushReport {
            drained: batch.len(),
            ..FlushReport::default()
        };

        if batch.is_empty() {
            return report;
        }

        for (index, record) in batch.iter().enumerate() {
            // Rollover is checked per record so a flush spanning midnight
            // lands each record in the day it was written
            let conn = match self.connections.switch_connection() {
                Ok(conn) => conn,
                Err(e) => {
                    report.lost = batch.len() - index;
                    error!(error = %e, lost = report.lost, "Cannot open day storage, abandoning tick");
                    break;
                }
            };

            if let Err(e) = ensure_table(conn, &self.table) {
                report.lost = batch.len() - index;
                error!(
                    table = %self.table,
                    error = %e,
                    lost = report.lost,
                    "Cannot ensure log table, abandoning tick"
                );
                break;
            }

            match insert_record(conn, &self.table, record) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    report.dropped += 1;
                    warn!(
                        board = %record.board_id,
                        system = %record.system,
                        module = %record.module,
                        error = %e,
                        "Dropping log record"
                    );
                }
            }
        }

        debug!(
            drained = report.drained,
            written = report.written,
            dropped = report.dropped,
            lost = report.lost,
            day = self.connections.day_label().unwrap_or("-"),
            "Flush tick complete"
        );

        report
    }

    /// Release the storage connection
    pub fn close(&mut self) {
        self.connections.close();
    }
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("table", &self.table)
            .field("connections", &self.connections)
            .finish()
    }
}
