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

// Periodic flush scheduling with non-overlapping execution

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, Notify, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::queue::IngestQueue;
use crate::storage::StorageError;
use crate::writer::{FlushReport, LogWriter};

/// Point-in-time scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub flushes: u64,
    pub skipped: u64,
    pub written: u64,
    pub dropped: u64,
    pub lost: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    flushes: AtomicU64,
    skipped: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    lost: AtomicU64,
}

impl Counters {
    fn record(&self, report: &FlushReport) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.written.fetch_add(report.written as u64, Ordering::Relaxed);
        self.dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);
        self.lost.fetch_add(report.lost as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            lost: self.lost.load(Ordering::Relaxed),
        }
    }
}

/// Runs [`LogWriter::flush`] on a fixed period.
///
/// The writer sits behind an async mutex. A tick that finds it locked is
/// skipped rather than queued, so two flushes never overlap on the same
/// connection. The flush itself runs on the blocking pool.
pub struct FlushScheduler {
    writer: Arc<Mutex<LogWriter>>,
    queue: Arc<IngestQueue>,
    counters: Arc<Counters>,
    trigger: Arc<Notify>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl FlushScheduler {
    /// Spawn the flush loop. Must be called from within a tokio runtime.
    pub fn start(interval: Duration, writer: LogWriter, queue: Arc<IngestQueue>) -> Self {
        let writer = Arc::new(Mutex::new(writer));
        let counters = Arc::new(Counters::default());
        let trigger = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run_loop(
            interval,
            writer.clone(),
            queue.clone(),
            counters.clone(),
            trigger.clone(),
            shutdown_rx,
        ));

        info!(interval_ms = interval.as_millis() as u64, "Flush scheduler started");

        Self {
            writer,
            queue,
            counters,
            trigger,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    /// Request an out-of-band tick
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Flush now, waiting for any in-flight flush to finish first
    pub async fn flush_now(&self) -> Result<FlushReport, StorageError> {
        let guard = self.writer.clone().lock_owned().await;
        run_flush(guard, self.queue.clone(), self.counters.clone()).await
    }

    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }

    /// Stop ticking, then drain and flush whatever is still queued.
    ///
    /// The storage connection is closed afterwards.
    pub async fn stop(mut self) -> Result<FlushReport, StorageError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        (&mut self.task)
            .await
            .map_err(|e| StorageError::Internal(format!("flush loop failed: {}", e)))?;

        let mut guard = self.writer.clone().lock_owned().await;
        let queue = self.queue.clone();
        let report = tokio::task::spawn_blocking(move || {
            let report = guard.flush(&queue);
            guard.close();
            report
        })
        .await
        .map_err(|e| StorageError::Internal(format!("final flush failed: {}", e)))?;

        self.counters.record(&report);
        info!(
            written = report.written,
            dropped = report.dropped,
            lost = report.lost,
            "Flush scheduler stopped"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for FlushScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushScheduler")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

async fn run_loop(
    interval: Duration,
    writer: Arc<Mutex<LogWriter>>,
    queue: Arc<IngestQueue>,
    counters: Arc<Counters>,
    trigger: Arc<Notify>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
            _ = trigger.notified() => {}
        }

        counters.ticks.fetch_add(1, Ordering::Relaxed);

        match writer.clone().try_lock_owned() {
            Ok(guard) => {
                let queue = queue.clone();
                let counters = counters.clone();
                tokio::spawn(async move {
                    if let Err(e) = run_flush(guard, queue, counters).await {
                        error!("Flush task failed: {}", e);
                    }
                });
            }
            Err(_) => {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                debug!("Previous flush still running, skipping tick");
            }
        }
    }

    debug!("Flush loop exited");
}

async fn run_flush(
    mut guard: OwnedMutexGuard<LogWriter>,
    queue: Arc<IngestQueue>,
    counters: Arc<Counters>,
) -> Result<FlushReport, StorageError> {
    let report = tokio::task::spawn_blocking(move || guard.flush(&queue))
        .await
        .map_err(|e| StorageError::Internal(format!("flush panicked: {}", e)))?;
    counters.record(&report);
    Ok(report)
}
