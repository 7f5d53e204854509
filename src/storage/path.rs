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

// Day-specific storage directory resolution

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::clock::{day_label, Clock};

/// Resolves the directory that holds a given day's database file
pub trait DirectoryResolver: Send + Sync {
    fn directory_for(&self, day: NaiveDate) -> PathBuf;

    fn directory_for_today(&self, clock: &dyn Clock) -> PathBuf {
        self.directory_for(clock.today())
    }
}

/// One sub-directory per calendar day under a fixed base path
#[derive(Debug, Clone)]
pub struct DatedDirectory {
    base_path: PathBuf,
}

impl DatedDirectory {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl DirectoryResolver for DatedDirectory {
    fn directory_for(&self, day: NaiveDate) -> PathBuf {
        self.base_path.join(day_label(day))
    }
}
