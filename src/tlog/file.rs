//! File Backend
//!
//! Append-only text file, one event per line (see [`super::line`]).

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};

use crate::error::{KvError, Result};

use super::line::{decode_line, encode_line};
use super::{Event, LogBackend, ReplaySink};

/// File-backed transaction log
pub struct FileBackend {
    path: PathBuf,

    /// Append handle, positioned at the end of the last complete line
    file: File,

    /// Sequence of the last line written
    last_sequence: u64,

    /// Byte length up to the end of the last complete line
    valid_len: u64,

    /// A failed append could not be rolled back; retry before the next write
    needs_rollback: bool,

    /// Next write stops after this many bytes and fails
    #[cfg(test)]
    fail_next_write: Option<usize>,
}

/// What the open-time scan found
struct TailScan {
    /// Byte length of the file up to and including the last newline
    valid_len: u64,
    last_sequence: u64,
}

impl FileBackend {
    /// Open or create the log file
    ///
    /// On open:
    /// 1. Create parent directories and the file if missing
    /// 2. Find the last complete line and resume its sequence
    /// 3. Truncate a partial trailing line left by a crash mid-append
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .await?;

        let scan = scan_tail(&path).await?;
        let file_len = file.metadata().await?.len();

        if file_len > scan.valid_len {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = file_len - scan.valid_len,
                "Truncating partial trailing line in transaction log"
            );
            file.set_len(scan.valid_len).await?;
            file.sync_all().await?;
        }

        file.seek(SeekFrom::Start(scan.valid_len)).await?;

        tracing::debug!(
            path = %path.display(),
            last_sequence = scan.last_sequence,
            "File transaction log opened"
        );

        Ok(Self {
            path,
            file,
            last_sequence: scan.last_sequence,
            valid_len: scan.valid_len,
            needs_rollback: false,
            #[cfg(test)]
            fail_next_write: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence the next appended event will receive
    pub fn next_sequence(&self) -> u64 {
        self.last_sequence + 1
    }

    /// Write one encoded line and make it durable
    async fn write_line(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        #[cfg(test)]
        if let Some(limit) = self.fail_next_write.take() {
            self.file.write_all(&bytes[..limit.min(bytes.len())]).await?;
            self.file.flush().await?;
            return Err(std::io::Error::other("injected short write"));
        }

        self.file.write_all(bytes).await?;
        self.file.flush().await?;
        self.file.sync_data().await
    }

    /// Drop anything past the last complete line and reposition the handle
    async fn roll_back(&mut self) -> std::io::Result<()> {
        self.file.set_len(self.valid_len).await?;
        self.file.seek(SeekFrom::Start(self.valid_len)).await?;
        self.needs_rollback = false;
        Ok(())
    }
}

/// Walk the file once, remembering where the last complete line ends
async fn scan_tail(path: &Path) -> Result<TailScan> {
    let mut reader = BufReader::new(File::open(path).await?);
    let mut buf = Vec::new();
    let mut valid_len = 0u64;
    let mut line_no = 0u64;
    let mut last_line: Option<(u64, Vec<u8>)> = None;

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).await?;
        if n == 0 || buf.last() != Some(&b'\n') {
            break;
        }
        line_no += 1;
        valid_len += n as u64;
        last_line = Some((line_no, std::mem::take(&mut buf)));
    }

    let last_sequence = match last_line {
        Some((line_no, bytes)) => decode_bytes(line_no, &bytes)?.sequence,
        None => 0,
    };

    Ok(TailScan {
        valid_len,
        last_sequence,
    })
}

fn decode_bytes(line_no: u64, bytes: &[u8]) -> Result<Event> {
    let text = std::str::from_utf8(bytes).map_err(|_| KvError::Corrupt {
        line: line_no,
        reason: "line is not valid UTF-8".to_string(),
    })?;
    decode_line(line_no, text.trim_end_matches('\n'))
}

#[async_trait]
impl LogBackend for FileBackend {
    async fn append(&mut self, event: &Event) -> Result<u64> {
        if self.needs_rollback {
            self.roll_back().await?;
        }

        let sequence = self.last_sequence + 1;
        let line = encode_line(&event.clone().with_sequence(sequence));

        // A failed append leaves no bytes behind and does not consume its sequence.
        if let Err(e) = self.write_line(line.as_bytes()).await {
            tracing::warn!(sequence, error = %e, "Append failed, rolling back partial line");
            if let Err(rollback_err) = self.roll_back().await {
                tracing::error!(
                    error = %rollback_err,
                    valid_len = self.valid_len,
                    "Rollback failed, retrying before next append"
                );
                self.needs_rollback = true;
            }
            return Err(e.into());
        }

        self.valid_len += line.len() as u64;
        self.last_sequence = sequence;
        Ok(sequence)
    }

    async fn replay(&mut self, sink: &mut ReplaySink) -> Result<()> {
        let mut reader = BufReader::new(File::open(&self.path).await?);
        let mut buf = Vec::new();
        let mut line_no = 0u64;

        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).await?;
            if n == 0 {
                break;
            }
            if buf.last() != Some(&b'\n') {
                tracing::warn!(line = line_no + 1, "Ignoring partial trailing line during replay");
                break;
            }
            line_no += 1;

            let event = decode_bytes(line_no, &buf)?;
            if !sink.push(event).await? {
                tracing::debug!("Replay consumer went away, stopping early");
                break;
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
