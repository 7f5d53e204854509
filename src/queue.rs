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

// Ingest queue between producer threads and the flush cycle

use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::record::LogRecord;

/// Lock-free FIFO of records waiting for the next flush.
///
/// Any number of producers may call [`IngestQueue::enqueue`] concurrently.
/// Only the flush cycle calls [`IngestQueue::drain`].
#[derive(Default)]
pub struct IngestQueue {
    inner: SegQueue<LogRecord>,
    total_enqueued: AtomicU64,
}

impl IngestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the tail. Never blocks and never fails.
    pub fn enqueue(&self, record: LogRecord) {
        self.inner.push(record);
        self.total_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove and return the records queued at the moment of the call.
    ///
    /// The length is captured first, so records pushed while draining wait
    /// for the next cycle.
    pub fn drain(&self) -> Vec<LogRecord> {
        let pending = self.inner.len();
        let mut batch = Vec::with_capacity(pending);
        for _ in 0..pending {
            match self.inner.pop() {
                Some(record) => batch.push(record),
                None => break,
            }
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Records accepted since creation
    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for IngestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
