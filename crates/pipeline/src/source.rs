//! Line source - streams text lines out of one input file
//!
//! Files are read with blocking I/O on the blocking thread pool. Gzip input
//! is detected from its magic bytes, anything else is read as plain text.
//! Both the open and the gzip header check happen in `open`, so a file that
//! cannot be read at all fails before any other stage starts.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// Leading bytes of every gzip stream
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// How the line sequence ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// End of file reached
    Eof,
    /// Read or decompression failed mid-file
    ReadError(String),
    /// Downstream dropped its receiver (gate tripped or shutdown)
    Closed,
}

/// Summary returned when the source stops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    /// Non-empty lines sent downstream
    pub lines: u64,

    /// Why the source stopped
    pub outcome: SourceOutcome,
}

/// Streams non-empty lines from a gzip or plain text file
///
/// Lines are yielded without their trailing `\n` / `\r\n`. Empty lines are
/// skipped and not counted. Invalid UTF-8 is replaced rather than treated
/// as a read error.
pub struct LineSource {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    compressed: bool,
    buf: Vec<u8>,
}

impl LineSource {
    /// Open a file and validate its container format
    ///
    /// # Errors
    ///
    /// `PipelineError::FileOpen` if the file cannot be opened or read, and
    /// `PipelineError::Decompression` if it starts like gzip but the stream
    /// header cannot be decoded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| PipelineError::FileOpen {
            path: path.clone(),
            source,
        })?;

        let mut buffered = BufReader::new(file);
        let compressed = buffered
            .fill_buf()
            .map_err(|source| PipelineError::FileOpen {
                path: path.clone(),
                source,
            })?
            .starts_with(&GZIP_MAGIC);

        let reader: Box<dyn BufRead + Send> = if compressed {
            let mut decoder = BufReader::new(MultiGzDecoder::new(buffered));
            decoder
                .fill_buf()
                .map_err(|source| PipelineError::Decompression {
                    path: path.clone(),
                    source,
                })?;
            Box::new(decoder)
        } else {
            Box::new(buffered)
        };

        Ok(Self {
            path,
            reader,
            compressed,
            buf: Vec::with_capacity(512),
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file is gzip-compressed
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Read the next non-empty line, `Ok(None)` at end of file
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }

            let line = trim_newline(&self.buf);
            if !line.is_empty() {
                return Ok(Some(String::from_utf8_lossy(line).into_owned()));
            }
        }
    }

    /// Send every line to `tx` until EOF, a read error, or the receiver closes
    ///
    /// Blocking; run it with `tokio::task::spawn_blocking`. Logs progress
    /// every `progress_interval` lines (0 disables).
    pub fn run(mut self, tx: mpsc::Sender<String>, progress_interval: u64) -> SourceReport {
        let mut lines = 0u64;

        let outcome = loop {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break SourceOutcome::Eof,
                Err(e) => {
                    warn!(
                        file = %self.path.display(),
                        lines,
                        error = %e,
                        "read failed, ending line stream early"
                    );
                    break SourceOutcome::ReadError(e.to_string());
                }
            };

            if tx.blocking_send(line).is_err() {
                debug!(
                    file = %self.path.display(),
                    lines,
                    "line receiver closed, stopping read"
                );
                break SourceOutcome::Closed;
            }

            lines += 1;
            if progress_interval > 0 && lines % progress_interval == 0 {
                info!(file = %self.path.display(), lines, "read progress");
            }
        };

        SourceReport { lines, outcome }
    }
}

impl std::fmt::Debug for LineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSource")
            .field("path", &self.path)
            .field("compressed", &self.compressed)
            .finish()
    }
}

/// Strip a trailing `\n` or `\r\n`
fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
