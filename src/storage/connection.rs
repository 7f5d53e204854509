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

// Per-day connection ownership and rollover

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::{day_label, Clock};
use crate::storage::{DirectoryResolver, StorageError};

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) a day database in WAL mode
pub fn open_database(path: &Path) -> Result<Connection, StorageError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            debug!("Creating storage directory: {}", dir.display());
            std::fs::create_dir_all(dir).map_err(|source| StorageError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
        }
    }

    let open_err = |source| StorageError::Open {
        path: path.to_path_buf(),
        source,
    };

    let conn = Connection::open(path).map_err(open_err)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(open_err)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .map_err(open_err)?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(open_err)?;

    Ok(conn)
}

/// The open handle and the day it belongs to
struct ConnectionState {
    conn: Connection,
    day_label: String,
    path: PathBuf,
}

/// Owns the current day's connection for the flush cycle.
///
/// Only the flush cycle touches this, so it needs no locking of its own.
pub struct ConnectionManager {
    resolver: Arc<dyn DirectoryResolver>,
    clock: Arc<dyn Clock>,
    file_name: String,
    state: Option<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(
        resolver: Arc<dyn DirectoryResolver>,
        clock: Arc<dyn Clock>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            clock,
            file_name: file_name.into(),
            state: None,
        }
    }

    /// Return a connection for today, reopening if the day has changed.
    ///
    /// The storage directory is resolved again only when a reopen is needed;
    /// a directory change within the same day does not trigger one.
    pub fn switch_connection(&mut self) -> Result<&Connection, StorageError> {
        let today = self.clock.today();
        let label = day_label(today);

        let current = self
            .state
            .as_ref()
            .is_some_and(|state| state.day_label == label);

        if !current {
            if let Some(previous) = self.state.as_ref() {
                info!(
                    from = %previous.day_label,
                    to = %label,
                    "Day rollover, switching storage file"
                );
            }
            self.close();

            let path = self.resolver.directory_for(today).join(&self.file_name);
            let conn = open_database(&path)?;
            info!(day = %label, path = %path.display(), "Opened day storage");

            self.state = Some(ConnectionState {
                conn,
                day_label: label,
                path,
            });
        }

        self.state
            .as_ref()
            .map(|state| &state.conn)
            .ok_or(StorageError::NotOpen)
    }

    /// Day label of the open connection, if any
    pub fn day_label(&self) -> Option<&str> {
        self.state.as_ref().map(|state| state.day_label.as_str())
    }

    /// Path of the open database file, if any
    pub fn path(&self) -> Option<&Path> {
        self.state.as_ref().map(|state| state.path.as_path())
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Close the current connection, if one is open
    pub fn close(&mut self) {
        if let Some(state) = self.state.take() {
            if let Err((_, e)) = state.conn.close() {
                warn!(day = %state.day_label, error = %e, "Error closing storage connection");
            } else {
                debug!(day = %state.day_label, "Closed storage connection");
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("file_name", &self.file_name)
            .field("day_label", &self.day_label())
            .finish_non_exhaustive()
    }
}
