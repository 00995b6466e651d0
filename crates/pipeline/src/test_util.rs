//! Shared helpers for pipeline tests

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use appsload_store::{KeyValueStore, StoreError};
use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;

/// Store that records every successful put
#[derive(Default)]
pub struct RecordingStore {
    pub puts: Mutex<Vec<(String, Vec<u8>)>>,
    pub calls: AtomicU32,
}

impl RecordingStore {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.puts.lock().unwrap().iter().map(|(k, _)| k.clone()).collect();
        keys.sort();
        keys
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    fn endpoint(&self) -> &str {
        "recording"
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.puts.lock().unwrap().push((key.to_string(), value.to_vec()));
        Ok(())
    }
}

/// Store that fails the first `failures` puts, then succeeds
pub struct FlakyStore {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyStore {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    /// Store that never succeeds
    pub fn always_failing() -> Self {
        Self::new(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    fn endpoint(&self) -> &str {
        "flaky"
    }

    async fn put(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(StoreError::ConnectionClosed)
        } else {
            Ok(())
        }
    }
}

/// Write `lines` gzip-compressed into `dir/name`
pub fn write_gz(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    for line in lines {
        writeln!(encoder, "{}", line).unwrap();
    }
    encoder.finish().unwrap();
    path
}

/// Write `lines` as plain text into `dir/name`
pub fn write_plain(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut contents = lines.join("\n");
    contents.push('\n');
    std::fs::write(&path, contents).unwrap();
    path
}

/// A valid line for device `idx` of the given type
pub fn valid_line(device_type: &str, idx: usize) -> String {
    format!("{}\tdev{}\t55.55\t37.37\t{},{},{}", device_type, idx, idx, idx + 1, idx + 2)
}

/// A line with a non-numeric latitude
pub fn bad_line(idx: usize) -> String {
    format!("idfa\tbad{}\tnot-a-number\t37.37\t1", idx)
}

/// `valid` good lines followed by `bad` malformed ones
pub fn mixed_lines(valid: usize, bad: usize) -> Vec<String> {
    let mut lines: Vec<String> = (0..valid).map(|i| valid_line("idfa", i)).collect();
    lines.extend((0..bad).map(bad_line));
    lines
}

/// Store that refuses every write with a server rejection
#[derive(Default)]
pub struct RejectingStore {
    calls: AtomicU32,
}

impl RejectingStore {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for RejectingStore {
    fn endpoint(&self) -> &str {
        "rejecting"
    }

    async fn put(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Rejected("SERVER_ERROR object too large for cache".to_string()))
    }
}
