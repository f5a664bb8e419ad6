//! Tests for the file-backed transaction log
//!
//! These tests verify:
//! - Events written through the logger are replayed in order
//! - Reopening the file resumes sequences
//! - Gaps in sequences are tolerated
//! - Corrupt and out-of-order lines fail the replay
//! - A partial trailing line is ignored

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use kvlog::tlog::{encode_line, Event, EventType, FileBackend, TransactionLogger};
use kvlog::KvError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("transaction.log");
    (temp_dir, path)
}

async fn open_logger(path: &Path) -> TransactionLogger {
    let backend = FileBackend::open(path).await.unwrap();
    TransactionLogger::new(Box::new(backend), 16, 16)
}

async fn collect_replay(logger: &TransactionLogger) -> (Vec<Event>, Option<KvError>) {
    let (mut events, mut errors) = logger.read_events();
    let mut replayed = Vec::new();
    while let Some(event) = events.recv().await {
        replayed.push(event);
    }
    (replayed, errors.recv().await)
}

fn write_raw_lines(path: &Path, events: &[Event]) {
    let mut file = fs::File::create(path).unwrap();
    for event in events {
        file.write_all(encode_line(event).as_bytes()).unwrap();
    }
    file.sync_all().unwrap();
}

// =============================================================================
// Write / Replay Tests
// =============================================================================

#[tokio::test]
async fn test_replay_empty_log() {
    let (_temp, path) = setup_temp_log();
    let logger = open_logger(&path).await;

    let (events, error) = collect_replay(&logger).await;

    assert!(events.is_empty());
    assert!(error.is_none());
    assert_eq!(logger.last_sequence(), 0);
}

#[tokio::test]
async fn test_written_events_replay_in_order() {
    let (_temp, path) = setup_temp_log();

    {
        let logger = open_logger(&path).await;
        logger.run().unwrap();

        logger.write_put("a", "1").await.unwrap().wait().await.unwrap();
        logger.write_put("b", "2").await.unwrap().wait().await.unwrap();
        logger.write_delete("a").await.unwrap().wait().await.unwrap();
        let last = logger.write_put("a", "3").await.unwrap().wait().await.unwrap();

        assert_eq!(last, 4);
        assert_eq!(logger.last_sequence(), 4);
    }

    let logger = open_logger(&path).await;
    let (events, error) = collect_replay(&logger).await;

    assert!(error.is_none());
    let summary: Vec<(u64, EventType, &str, &str)> = events
        .iter()
        .map(|e| (e.sequence, e.event_type, e.key.as_str(), e.value.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (1, EventType::Put, "a", "1"),
            (2, EventType::Put, "b", "2"),
            (3, EventType::Delete, "a", ""),
            (4, EventType::Put, "a", "3"),
        ]
    );
    assert_eq!(logger.last_sequence(), 4);
}

#[tokio::test]
async fn test_values_with_separators_survive() {
    let (_temp, path) = setup_temp_log();
    let awkward = "line one\nline\ttwo\\three\r\n";

    {
        let logger = open_logger(&path).await;
        logger.run().unwrap();
        logger.write_put("k\te\ny", awkward).await.unwrap().wait().await.unwrap();
    }

    let logger = open_logger(&path).await;
    let (events, error) = collect_replay(&logger).await;

    assert!(error.is_none());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key, "k\te\ny");
    assert_eq!(events[0].value, awkward);
}

#[tokio::test]
async fn test_reopen_continues_sequence() {
    let (_temp, path) = setup_temp_log();

    {
        let logger = open_logger(&path).await;
        logger.run().unwrap();
        logger.write_put("a", "1").await.unwrap().wait().await.unwrap();
        logger.write_put("b", "2").await.unwrap().wait().await.unwrap();
    }

    let logger = open_logger(&path).await;
    logger.run().unwrap();
    let sequence = logger.write_put("c", "3").await.unwrap().wait().await.unwrap();

    assert_eq!(sequence, 3);
}

#[tokio::test]
async fn test_replay_is_repeatable() {
    let (_temp, path) = setup_temp_log();
    write_raw_lines(
        &path,
        &[
            Event::put("a", "1").with_sequence(1),
            Event::put("b", "2").with_sequence(2),
        ],
    );

    let logger = open_logger(&path).await;
    let (first, _) = collect_replay(&logger).await;
    let (second, _) = collect_replay(&logger).await;

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[tokio::test]
async fn test_sequence_gaps_are_tolerated() {
    let (_temp, path) = setup_temp_log();
    write_raw_lines(
        &path,
        &[
            Event::put("a", "1").with_sequence(1),
            Event::put("b", "2").with_sequence(5),
            Event::put("c", "3").with_sequence(9),
        ],
    );

    let logger = open_logger(&path).await;
    let (events, error) = collect_replay(&logger).await;

    assert!(error.is_none());
    assert_eq!(events.len(), 3);
    assert_eq!(logger.last_sequence(), 9);
}

#[tokio::test]
async fn test_out_of_order_sequence_fails_replay() {
    let (_temp, path) = setup_temp_log();
    write_raw_lines(
        &path,
        &[
            Event::put("a", "1").with_sequence(1),
            Event::put("b", "2").with_sequence(3),
            Event::put("c", "3").with_sequence(2),
        ],
    );

    let logger = open_logger(&path).await;
    let (events, error) = collect_replay(&logger).await;

    assert_eq!(events.len(), 2);
    assert!(matches!(
        error,
        Some(KvError::OutOfOrder { previous: 3, found: 2 })
    ));
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[tokio::test]
async fn test_corrupt_line_fails_replay() {
    let (_temp, path) = setup_temp_log();
    let good = encode_line(&Event::put("a", "1").with_sequence(1));
    let bad = encode_line(&Event::put("b", "2").with_sequence(2)).replacen("\tb\t", "\tX\t", 1);
    let tail = encode_line(&Event::put("c", "3").with_sequence(3));
    fs::write(&path, format!("{}{}{}", good, bad, tail)).unwrap();

    let logger = open_logger(&path).await;
    let (events, error) = collect_replay(&logger).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key, "a");
    assert!(matches!(error, Some(KvError::Corrupt { line: 2, .. })));
}

#[tokio::test]
async fn test_partial_trailing_line_is_ignored() {
    let (_temp, path) = setup_temp_log();
    write_raw_lines(&path, &[Event::put("a", "1").with_sequence(1)]);

    // Open first so the tail scan does not truncate what we append next.
    let logger = open_logger(&path).await;
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"2\t1\tb\tpartial").unwrap();
    }

    let (events, error) = collect_replay(&logger).await;

    assert!(error.is_none());
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_corrupt_last_line_fails_open() {
    let (_temp, path) = setup_temp_log();
    fs::write(&path, "not a log line\n").unwrap();

    let result = FileBackend::open(&path).await;

    assert!(matches!(result, Err(KvError::Corrupt { line: 1, .. })));
}
