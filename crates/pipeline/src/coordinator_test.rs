//! Tests for the file coordinator

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use appsload_protocol::{BinaryCodec, ProtobufCodec};
use appsload_store::ShardMap;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::coordinator::{FileCoordinator, PipelineSettings, done_path, is_marked_done};
use crate::error::PipelineError;
use crate::metrics::FileOutcome;
use crate::retry::RetryPolicy;
use crate::test_util::{
    FlakyStore, RecordingStore, bad_line, mixed_lines, valid_line, write_gz, write_plain,
};

fn settings() -> PipelineSettings {
    PipelineSettings {
        retry: RetryPolicy::new(3, Duration::from_millis(10)),
        ..PipelineSettings::default()
    }
}

fn coordinator(store: &Arc<RecordingStore>) -> FileCoordinator {
    let shards = ShardMap::new().with("idfa", store.clone());
    FileCoordinator::new(settings(), shards, Arc::new(ProtobufCodec)).unwrap()
}

// =============================================================================
// Done marker
// =============================================================================

#[test]
fn test_done_path_prefixes_file_name() {
    assert_eq!(
        done_path(Path::new("/data/appsinstalled/a.tsv.gz")),
        Path::new("/data/appsinstalled/.a.tsv.gz")
    );
    assert_eq!(done_path(Path::new("a.tsv.gz")), Path::new(".a.tsv.gz"));
}

#[test]
fn test_is_marked_done() {
    assert!(is_marked_done(Path::new("/data/.a.tsv.gz")));
    assert!(!is_marked_done(Path::new("/data/a.tsv.gz")));
    assert!(!is_marked_done(Path::new("/data/.hidden/a.tsv.gz")));
    assert!(is_marked_done(&done_path(Path::new("/data/a.tsv.gz"))));
}

#[cfg(unix)]
#[test]
fn test_is_marked_done_non_utf8_name() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = Path::new("/data");
    assert!(is_marked_done(&dir.join(OsStr::from_bytes(b".\xff\xfe.tsv.gz"))));
    assert!(!is_marked_done(&dir.join(OsStr::from_bytes(b"\xff\xfe.tsv.gz"))));
}

#[test]
fn test_new_rejects_empty_shards() {
    let result = FileCoordinator::new(
        PipelineSettings::default(),
        ShardMap::new(),
        Arc::new(ProtobufCodec),
    );
    assert!(matches!(result, Err(PipelineError::NoShards)));
}

// =============================================================================
// Processing
// =============================================================================

#[tokio::test]
async fn test_process_writes_and_marks_done() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..50).map(|i| valid_line("idfa", i)).collect();
    let path = write_gz(dir.path(), "a.tsv.gz", &lines);

    let store = Arc::new(RecordingStore::default());
    let report = coordinator(&store).process(&path).await.unwrap();

    assert_eq!(report.outcome, FileOutcome::Completed);
    assert_eq!(report.metrics.lines_read, 50);
    assert_eq!(report.metrics.written, 50);
    assert!(report.metrics.is_balanced());
    assert_eq!(store.keys().len(), 50);

    let done = dir.path().join(".a.tsv.gz");
    assert_eq!(report.marked_as.as_deref(), Some(done.as_path()));
    assert!(done.exists());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_process_stores_decodable_payload() {
    let dir = TempDir::new().unwrap();
    let path = write_gz(
        dir.path(),
        "a.tsv.gz",
        &["idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23".to_string()],
    );

    let store = Arc::new(RecordingStore::default());
    coordinator(&store).process(&path).await.unwrap();

    let puts = store.puts.lock().unwrap();
    assert_eq!(puts[0].0, "idfa:1rfw452y52g2gq4g");
    let decoded = ProtobufCodec.decode(&puts[0].1).unwrap();
    assert_eq!(decoded.lat, Some(55.55));
    assert_eq!(decoded.lon, Some(42.42));
    assert_eq!(decoded.apps, vec![1423, 43, 567, 3, 7, 23]);
}

#[tokio::test]
async fn test_process_plain_text_input() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..5).map(|i| valid_line("idfa", i)).collect();
    let path = write_plain(dir.path(), "a.tsv", &lines);

    let store = Arc::new(RecordingStore::default());
    let report = coordinator(&store).process(&path).await.unwrap();

    assert_eq!(report.outcome, FileOutcome::Completed);
    assert_eq!(report.metrics.written, 5);
    assert!(dir.path().join(".a.tsv").exists());
}

#[tokio::test]
async fn test_gate_leaves_file_unmarked() {
    let dir = TempDir::new().unwrap();
    let path = write_gz(dir.path(), "a.tsv.gz", &mixed_lines(989, 11));

    let store = Arc::new(RecordingStore::default());
    let report = coordinator(&store).process(&path).await.unwrap();

    assert_eq!(report.outcome, FileOutcome::ErrorRateExceeded);
    assert_eq!(report.metrics.parsed, 989);
    assert_eq!(report.metrics.malformed, 10);
    assert_eq!(report.metrics.written, 989);
    assert!(report.metrics.is_balanced());
    assert!(!report.is_marked_done());
    assert!(path.exists());
    assert!(!done_path(&path).exists());
}

#[tokio::test]
async fn test_only_malformed_lines_drains_and_marks() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..20).map(bad_line).collect();
    let path = write_gz(dir.path(), "a.tsv.gz", &lines);

    let store = Arc::new(RecordingStore::default());
    let report = coordinator(&store).process(&path).await.unwrap();

    assert_eq!(report.outcome, FileOutcome::Completed);
    assert_eq!(report.metrics.malformed, 20);
    assert_eq!(report.metrics.parsed, 0);
    assert_eq!(store.calls(), 0);
    assert!(report.is_marked_done());
}

#[tokio::test]
async fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.tsv.gz");

    let store = Arc::new(RecordingStore::default());
    let err = coordinator(&store).process(&path).await.unwrap_err();

    assert!(matches!(err, PipelineError::FileOpen { .. }));
    assert!(!done_path(&path).exists());
}

#[tokio::test]
async fn test_corrupt_gzip_is_an_error_and_not_renamed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.tsv.gz");
    std::fs::write(&path, [0x1f, 0x8b, 0xff, 0xff, 0x00, 0x01]).unwrap();

    let store = Arc::new(RecordingStore::default());
    let err = coordinator(&store).process(&path).await.unwrap_err();

    assert!(matches!(err, PipelineError::Decompression { .. }));
    assert!(path.exists());
    assert!(!done_path(&path).exists());
}

#[tokio::test]
async fn test_truncated_gzip_drains_and_stays_unmarked() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..5000).map(|i| valid_line("idfa", i)).collect();
    let full = write_gz(dir.path(), "full.tsv.gz", &lines);

    let bytes = std::fs::read(&full).unwrap();
    let path = dir.path().join("a.tsv.gz");
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let store = Arc::new(RecordingStore::default());
    let report = coordinator(&store).process(&path).await.unwrap();

    assert_eq!(report.outcome, FileOutcome::ReadFailed);
    assert!(report.metrics.lines_read < 5000);
    assert_eq!(report.metrics.malformed, 0);
    assert!(report.metrics.is_balanced());
    assert_eq!(report.metrics.written, report.metrics.parsed);
    assert_eq!(store.calls() as u64, report.metrics.written);
    assert!(!report.is_marked_done());
    assert!(path.exists());
    assert!(!done_path(&path).exists());
}

#[tokio::test]
async fn test_failed_writes_still_drain_and_mark() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..4).map(|i| valid_line("idfa", i)).collect();
    let path = write_gz(dir.path(), "a.tsv.gz", &lines);

    let store = Arc::new(FlakyStore::always_failing());
    let shards = ShardMap::new().with("idfa", store.clone());
    let coordinator = FileCoordinator::new(settings(), shards, Arc::new(ProtobufCodec)).unwrap();
    let report = coordinator.process(&path).await.unwrap();

    assert_eq!(report.outcome, FileOutcome::Completed);
    assert_eq!(report.metrics.failed, 4);
    assert_eq!(report.metrics.write_attempts, 12);
    assert_eq!(store.calls(), 12);
    assert!(report.metrics.is_balanced());
    assert!(report.is_marked_done());
}

#[tokio::test]
async fn test_unknown_shard_counted_and_file_marked() {
    let dir = TempDir::new().unwrap();
    let lines = vec![valid_line("idfa", 1), valid_line("other", 2)];
    let path = write_gz(dir.path(), "a.tsv.gz", &lines);

    let store = Arc::new(RecordingStore::default());
    let report = coordinator(&store).process(&path).await.unwrap();

    assert_eq!(report.metrics.written, 1);
    assert_eq!(report.metrics.unknown_shard, 1);
    assert!(report.metrics.is_balanced());
    assert!(report.is_marked_done());
}

#[tokio::test]
async fn test_dry_run_marks_without_writing() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..3).map(|i| valid_line("idfa", i)).collect();
    let path = write_gz(dir.path(), "a.tsv.gz", &lines);

    let store = Arc::new(RecordingStore::default());
    let shards = ShardMap::new().with("idfa", store.clone());
    let settings = PipelineSettings {
        dry_run: true,
        ..settings()
    };
    let coordinator = FileCoordinator::new(settings, shards, Arc::new(ProtobufCodec)).unwrap();
    let report = coordinator.process(&path).await.unwrap();

    assert_eq!(report.metrics.dry_run, 3);
    assert_eq!(report.metrics.write_attempts, 0);
    assert_eq!(store.calls(), 0);
    assert!(report.is_marked_done());
}

#[tokio::test]
async fn test_cancelled_file_left_unmarked() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..100).map(|i| valid_line("idfa", i)).collect();
    let path = write_gz(dir.path(), "a.tsv.gz", &lines);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let store = Arc::new(RecordingStore::default());
    let report = coordinator(&store)
        .with_cancellation(cancel)
        .process(&path)
        .await
        .unwrap();

    assert_eq!(report.outcome, FileOutcome::Cancelled);
    assert!(!report.is_marked_done());
    assert!(path.exists());
}
