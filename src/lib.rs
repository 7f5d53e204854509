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

// Batched per-day log persistence
//
// Producers push log records into a lock-free queue without ever blocking.
// A background flush cycle drains the queue on a fixed period and writes
// each record into the SQLite file of the current calendar day:
// - Storage files roll over at midnight, checked per record
// - The log table is created lazily on each day file
// - Every statement binds its values as parameters
// - Keyed lookups read the day files independently of the writer

pub mod clock;
pub mod config;
pub mod query;
pub mod queue;
pub mod record;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod writer;

// Re-export main types
pub use clock::{day_label, Clock, ManualClock, SystemClock};
pub use config::{load_config, load_config_with_env, DaylogConfig};
pub use query::{query_lines, LogQuery};
pub use queue::IngestQueue;
pub use record::LogRecord;
pub use scheduler::{FlushScheduler, SchedulerStats};
pub use service::LogService;
pub use storage::{ConnectionManager, DatedDirectory, DirectoryResolver, StorageError};
pub use writer::{FlushReport, LogWriter};
