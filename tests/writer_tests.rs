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

use chrono::{Duration, NaiveDate, NaiveDateTime};
use daylog::clock::{Clock, ManualClock};
use daylog::storage::DatedDirectory;
use daylog::{FlushReport, IngestQueue, LogQuery, LogRecord, LogWriter};
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup(temp_dir: &TempDir, clock: Arc<dyn Clock>) -> (LogWriter, LogQuery) {
    let resolver = Arc::new(DatedDirectory::new(temp_dir.path()));
    let writer = LogWriter::from_parts(resolver.clone(), clock.clone(), "filter.db", "logs");
    let query = LogQuery::new(resolver, clock, "filter.db", "logs");
    (writer, query)
}

fn day_file(temp_dir: &TempDir, label: &str) -> std::path::PathBuf {
    temp_dir.path().join(label).join("filter.db")
}

fn row_count(path: &Path) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))
        .unwrap()
}

/// Reports the first day for a fixed number of calls, then the next day
struct SteppingClock {
    calls: AtomicUsize,
    switch_after: usize,
    before: NaiveDateTime,
    after: NaiveDateTime,
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.switch_after {
            self.before
        } else {
            self.after
        }
    }
}

#[test]
fn test_flush_persists_every_queued_record() {
    for n in [0usize, 1, 7, 50] {
        let temp_dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(at(2025, 4, 2, 12, 0, 0)));
        let (mut writer, _) = setup(&temp_dir, clock);
        let queue = IngestQueue::new();

        for i in 0..n {
            queue.enqueue(LogRecord::new("A", "B", "C", format!("record {}", i)));
        }

        let report = writer.flush(&queue);
        assert_eq!(report.drained, n);
        assert_eq!(report.written, n);
        assert!(queue.is_empty());

        let path = day_file(&temp_dir, "2025_04_02");
        if n == 0 {
            assert!(!path.exists());
        } else {
            assert_eq!(row_count(&path), n as i64);
        }
    }
}

#[test]
fn test_record_queued_before_midnight_lands_in_new_day() {
    let temp_dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(2025, 4, 2, 23, 59, 59)));
    let (mut writer, query) = setup(&temp_dir, clock.clone());
    let queue = IngestQueue::new();

    // Open the old day first so a real rollover has to happen
    queue.enqueue(LogRecord::stamped("A", "B", "C", "early", clock.now()));
    writer.flush(&queue);
    assert_eq!(writer.connections().day_label(), Some("2025_04_02"));

    queue.enqueue(LogRecord::stamped("A", "B", "C", "late", clock.now()));
    clock.advance(Duration::seconds(2));
    let report = writer.flush(&queue);

    assert_eq!(report.written, 1);
    assert_eq!(writer.connections().day_label(), Some("2025_04_03"));
    assert_eq!(
        query.query_day(day(2025, 4, 3), "A", "B", "C"),
        vec!["[2025-04-02 23:59:59.000] [C] late".to_string()]
    );
    assert_eq!(
        query.query_day(day(2025, 4, 2), "A", "B", "C"),
        vec!["[2025-04-02 23:59:59.000] [C] early".to_string()]
    );
}

#[test]
fn test_rollover_is_detected_per_record_within_a_flush() {
    let temp_dir = TempDir::new().unwrap();
    let clock = Arc::new(SteppingClock {
        calls: AtomicUsize::new(0),
        switch_after: 2,
        before: at(2025, 4, 2, 23, 59, 59),
        after: at(2025, 4, 3, 0, 0, 1),
    });
    let (mut writer, query) = setup(&temp_dir, clock);
    let queue = IngestQueue::new();

    for i in 0..4 {
        queue.enqueue(LogRecord::new("A", "B", "C", format!("r{}", i)));
    }

    let report = writer.flush(&queue);
    assert_eq!(report.written, 4);

    let old_day = query.query_day(day(2025, 4, 2), "A", "B", "C");
    let new_day = query.query_day(day(2025, 4, 3), "A", "B", "C");
    assert_eq!(old_day.len(), 2);
    assert_eq!(new_day.len(), 2);
    assert!(old_day[0].ends_with("r0") && old_day[1].ends_with("r1"));
    assert!(new_day[0].ends_with("r2") && new_day[1].ends_with("r3"));
}

#[test]
fn test_hostile_log_text_is_stored_verbatim() {
    let temp_dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(2025, 4, 2, 8, 0, 0)));
    let (mut writer, query) = setup(&temp_dir, clock.clone());
    let queue = IngestQueue::new();

    let hostile = "it's done'); DELETE FROM logs; --\nsecond line";
    queue.enqueue(LogRecord::stamped("A", "B", "C", "before", clock.now()));
    queue.enqueue(LogRecord::stamped("A", "B", "C", hostile, clock.now()));
    queue.enqueue(LogRecord::stamped("A", "B", "C", "after", clock.now()));

    let report = writer.flush(&queue);
    assert_eq!(report.written, 3);
    assert!(report.is_clean());

    let lines = query.query("A", "B", "C");
    assert_eq!(
        lines,
        vec![
            "[2025-04-02 08:00:00.000] [C] before".to_string(),
            format!("[2025-04-02 08:00:00.000] [C] {}", hostile),
            "[2025-04-02 08:00:00.000] [C] after".to_string(),
        ]
    );
    assert_eq!(row_count(&day_file(&temp_dir, "2025_04_02")), 3);
}

#[test]
fn test_query_matches_only_exact_module() {
    let temp_dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(2025, 4, 2, 8, 0, 0)));
    let (mut writer, query) = setup(&temp_dir, clock.clone());
    let queue = IngestQueue::new();

    let first = LogRecord::stamped("A", "B", "C", "x1", clock.now());
    let expected = format!("[{}] [C] x1", first.date);
    queue.enqueue(first);
    queue.enqueue(LogRecord::stamped("A", "B", "D", "x2", clock.now()));
    writer.flush(&queue);

    assert_eq!(query.query("A", "B", "C"), vec![expected]);
    assert_eq!(query.query("A", "B", "D").len(), 1);
    assert!(query.query("A", "X", "C").is_empty());
}

#[test]
fn test_concurrent_producers_single_flush() {
    let temp_dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(2025, 4, 2, 8, 0, 0)));
    let (mut writer, _) = setup(&temp_dir, clock);
    let queue = Arc::new(IngestQueue::new());

    let producers: Vec<_> = (0..10)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    queue.enqueue(LogRecord::new(
                        format!("board{}", p),
                        "sys",
                        "mod",
                        format!("{}-{}", p, i),
                    ));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let report = writer.flush(&queue);
    assert_eq!(report.written, 100);

    let conn = Connection::open(day_file(&temp_dir, "2025_04_02")).unwrap();
    let mut stmt = conn
        .prepare("SELECT boardid, log FROM logs ORDER BY id")
        .unwrap();
    let rows: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rows.len(), 100);
    let unique: HashSet<_> = rows.iter().map(|(_, log)| log.clone()).collect();
    assert_eq!(unique.len(), 100);

    // Each producer's own sequence keeps its order
    for p in 0..10 {
        let board = format!("board{}", p);
        let seq: Vec<_> = rows
            .iter()
            .filter(|(b, _)| *b == board)
            .map(|(_, log)| log.clone())
            .collect();
        let expected: Vec<_> = (0..10).map(|i| format!("{}-{}", p, i)).collect();
        assert_eq!(seq, expected);
    }
}

#[test]
fn test_open_failure_loses_tick_and_retries() {
    let temp_dir = TempDir::new().unwrap();
    let blocked = temp_dir.path().join("blocked");
    std::fs::write(&blocked, b"file in the way").unwrap();

    let clock = Arc::new(ManualClock::new(at(2025, 4, 2, 8, 0, 0)));
    let mut writer = LogWriter::from_parts(
        Arc::new(DatedDirectory::new(&blocked)),
        clock,
        "filter.db",
        "logs",
    );
    let queue = IngestQueue::new();
    for i in 0..3 {
        queue.enqueue(LogRecord::new("A", "B", "C", format!("{}", i)));
    }

    let report = writer.flush(&queue);
    assert_eq!(
        report,
        FlushReport {
            drained: 3,
            written: 0,
            dropped: 0,
            lost: 3,
        }
    );
    assert!(queue.is_empty());

    // The next tick tries again from scratch
    queue.enqueue(LogRecord::new("A", "B", "C", "again"));
    let report = writer.flush(&queue);
    assert_eq!(report.lost, 1);
    assert!(!writer.connections().is_open());

    // Once the obstruction is gone the writer recovers
    std::fs::remove_file(&blocked).unwrap();
    queue.enqueue(LogRecord::new("A", "B", "C", "recovered"));
    let report = writer.flush(&queue);
    assert_eq!(report.written, 1);
}

#[test]
fn test_schema_failure_loses_tick_and_retries() {
    let temp_dir = TempDir::new().unwrap();
    let path = day_file(&temp_dir, "2025_04_02");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    {
        // An index already owns the table's name, so creating it fails
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE other(x); CREATE INDEX logs ON other(x);")
            .unwrap();
    }

    let clock = Arc::new(ManualClock::new(at(2025, 4, 2, 8, 0, 0)));
    let (mut writer, query) = setup(&temp_dir, clock);
    let queue = IngestQueue::new();
    for i in 0..3 {
        queue.enqueue(LogRecord::new("A", "B", "C", format!("{}", i)));
    }

    let report = writer.flush(&queue);
    assert_eq!(
        report,
        FlushReport {
            drained: 3,
            written: 0,
            dropped: 0,
            lost: 3,
        }
    );
    assert!(queue.is_empty());

    Connection::open(&path)
        .unwrap()
        .execute_batch("DROP INDEX logs;")
        .unwrap();

    queue.enqueue(LogRecord::new("A", "B", "C", "after repair"));
    let report = writer.flush(&queue);
    assert_eq!(report.written, 1);
    assert_eq!(report.lost, 0);
    assert_eq!(query.query("A", "B", "C").len(), 1);
}
