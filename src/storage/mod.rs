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

// Storage module
//
// Owns everything that touches the per-day SQLite files on the write side:
// directory resolution, the rollover-aware connection, and lazy creation
// of the log table.

pub mod connection;
pub mod error;
pub mod path;
pub mod schema;

pub use connection::{open_database, ConnectionManager};
pub use error::StorageError;
pub use path::{DatedDirectory, DirectoryResolver};
pub use schema::{ensure_table, table_exists, validate_table_name};
