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

// Application-facing service that wires queue, scheduler and query path

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigLoader, DaylogConfig};
use crate::queue::IngestQueue;
use crate::query::LogQuery;
use crate::record::LogRecord;
use crate::scheduler::{FlushScheduler, SchedulerStats};
use crate::storage::{DatedDirectory, DirectoryResolver};
use crate::writer::{FlushReport, LogWriter};

/// One explicitly constructed persistence service.
///
/// The application root owns it and hands producers either a reference
/// or the shared queue from [`LogService::ingest_handle`].
pub struct LogService {
    queue: Arc<IngestQueue>,
    scheduler: FlushScheduler,
    query: LogQuery,
    clock: Arc<dyn Clock>,
}

impl LogService {
    /// Start with the wall clock and dated directories under `storage.base_path`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &DaylogConfig) -> Result<Self> {
        let resolver = Arc::new(DatedDirectory::new(&config.storage.base_path));
        Self::with_collaborators(config, resolver, Arc::new(SystemClock))
    }

    /// Start with explicit directory resolver and clock
    pub fn with_collaborators(
        config: &DaylogConfig,
        resolver: Arc<dyn DirectoryResolver>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        ConfigLoader::validate(config).context("Invalid daylog configuration")?;

        let storage = &config.storage;
        let queue = Arc::new(IngestQueue::new());
        let writer = LogWriter::from_parts(
            resolver.clone(),
            clock.clone(),
            storage.file_name.clone(),
            storage.table_name.clone(),
        );
        let scheduler = FlushScheduler::start(config.flush.interval(), writer, queue.clone());
        let query = LogQuery::new(
            resolver,
            clock.clone(),
            storage.file_name.clone(),
            storage.table_name.clone(),
        );

        info!(
            base_path = %storage.base_path.display(),
            table = %storage.table_name,
            "Log service started"
        );

        Ok(Self {
            queue,
            scheduler,
            query,
            clock,
        })
    }

    /// Fire-and-forget ingestion
    pub fn enqueue(&self, record: LogRecord) {
        self.queue.enqueue(record);
    }

    /// Build a record stamped with the service clock and enqueue it
    pub fn log(
        &self,
        board_id: impl Into<String>,
        system: impl Into<String>,
        module: impl Into<String>,
        log: impl Into<String>,
    ) {
        self.enqueue(LogRecord::stamped(
            board_id,
            system,
            module,
            log,
            self.clock.now(),
        ));
    }

    /// Shared queue for producers that outlive a borrow of the service
    pub fn ingest_handle(&self) -> Arc<IngestQueue> {
        self.queue.clone()
    }

    /// Today's lines for `(board_id, system, module)`
    pub fn query(&self, board_id: &str, system: &str, module: &str) -> Vec<String> {
        self.query.query(board_id, system, module)
    }

    /// Lines for `(board_id, system, module)` on a given day
    pub fn query_day(
        &self,
        day: NaiveDate,
        board_id: &str,
        system: &str,
        module: &str,
    ) -> Vec<String> {
        self.query.query_day(day, board_id, system, module)
    }

    /// Flush immediately, waiting for any running flush first
    pub async fn flush_now(&self) -> Result<FlushReport> {
        Ok(self.scheduler.flush_now().await?)
    }

    /// Records waiting for the next tick
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Stop the scheduler after one last drain-and-flush
    pub async fn shutdown(self) -> Result<FlushReport> {
        let report = self
            .scheduler
            .stop()
            .await
            .context("Failed to stop flush scheduler")?;
        info!(pending = self.queue.len(), "Log service shut down");
        Ok(report)
    }
}

impl std::fmt::Debug for LogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogService")
            .field("pending", &self.pending())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
