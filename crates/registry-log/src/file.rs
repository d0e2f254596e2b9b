// Single-file durable log.
use bytes::Bytes;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::frame::{RecordHeader, decode_body, encode_record};
use crate::{AppendOnlyLog, BoxFuture, LogError, LogRecord, Offset, ReadRange, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FsyncMode {
    /// Flush to the OS only; a host crash can lose the newest records.
    #[default]
    None,
    /// `sync_data` after every append.
    OnAppend,
}

#[derive(Debug)]
struct FileState {
    file: File,
    /// Byte position of every record, indexed by offset.
    positions: Vec<u64>,
    len: u64,
    closed: bool,
}

impl FileState {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(LogError::Closed);
        }
        Ok(())
    }

    // Drop bytes past the last complete record. A log that cannot do so is closed.
    async fn rollback(&mut self, path: &Path) {
        if let Err(err) = self.file.set_len(self.len).await {
            tracing::error!(
                path = %path.display(),
                error = %err,
                "failed to roll back partial append; closing log"
            );
            self.closed = true;
        }
    }
}

async fn write_frame(file: &mut File, frame: &[u8], fsync: FsyncMode) -> std::io::Result<()> {
    file.write_all(frame).await?;
    file.flush().await?;
    if fsync == FsyncMode::OnAppend {
        file.sync_data().await?;
    }
    Ok(())
}

/// Append-only log stored in one file of framed records.
///
/// Opening scans the whole file to rebuild the offset index. A torn trailing record left
/// by a crash mid-append is truncated away; any other framing or checksum failure is
/// reported as corruption and the log refuses to open.
///
/// A failed append is rolled back to the end of the last complete record. If the rollback
/// itself fails the log is closed and every later call returns [`LogError::Closed`].
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    fsync: FsyncMode,
    state: Mutex<FileState>,
}

impl FileLog {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, FsyncMode::default()).await
    }

    pub async fn open_with(path: impl AsRef<Path>, fsync: FsyncMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        let (positions, valid_len) = scan(&bytes)?;
        if valid_len < bytes.len() {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = bytes.len() - valid_len,
                "truncating torn record at end of log"
            );
            let file = OpenOptions::new().write(true).open(&path).await?;
            file.set_len(valid_len as u64).await?;
            file.sync_all().await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        tracing::debug!(path = %path.display(), records = positions.len(), "opened file log");
        Ok(Self {
            path,
            fsync,
            state: Mutex::new(FileState {
                file,
                positions,
                len: valid_len as u64,
                closed: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Walk the frames and return the record positions plus the length of the valid prefix.
fn scan(bytes: &[u8]) -> Result<(Vec<u64>, usize)> {
    let mut positions = Vec::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let remaining = &bytes[pos..];
        let header = match RecordHeader::decode(remaining) {
            Ok(header) => header,
            Err(LogError::Incomplete) => break,
            Err(err) => return Err(corruption(positions.len(), err)),
        };
        // The header checksum passed, so a body running past the end is a torn final write.
        let end = RecordHeader::LEN + header.body_len();
        if remaining.len() < end {
            break;
        }
        decode_body(
            &header,
            Bytes::copy_from_slice(&remaining[RecordHeader::LEN..end]),
        )
        .map_err(|err| corruption(positions.len(), err))?;
        positions.push(pos as u64);
        pos += end;
    }
    Ok((positions, pos))
}

fn corruption(offset: usize, err: LogError) -> LogError {
    LogError::Corruption {
        offset: offset as Offset,
        reason: err.to_string(),
    }
}

impl AppendOnlyLog for FileLog {
    fn append(&self, key: Bytes, value: Option<Bytes>) -> BoxFuture<'_, Result<Offset>> {
        Box::pin(async move {
            let frame = encode_record(&key, value.as_deref())?;
            let mut state = self.state.lock().await;
            state.ensure_open()?;
            if let Err(err) = write_frame(&mut state.file, &frame, self.fsync).await {
                state.rollback(&self.path).await;
                return Err(err.into());
            }
            let offset = state.positions.len() as Offset;
            let position = state.len;
            state.positions.push(position);
            state.len += frame.len() as u64;
            Ok(offset)
        })
    }

    fn read_range(&self, range: ReadRange) -> BoxFuture<'_, Result<Vec<LogRecord>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            state.ensure_open()?;
            let start = range.start as usize;
            if start >= state.positions.len() || range.max_records == 0 {
                return Ok(Vec::new());
            }
            let end = state
                .positions
                .len()
                .min(start.saturating_add(range.max_records));
            let byte_start = state.positions[start];
            let byte_end = state.positions.get(end).copied().unwrap_or(state.len);

            let mut reader = File::open(&self.path).await?;
            reader.seek(SeekFrom::Start(byte_start)).await?;
            let mut buf = vec![0u8; (byte_end - byte_start) as usize];
            reader.read_exact(&mut buf).await?;
            drop(state);

            let buf = Bytes::from(buf);
            let mut records = Vec::with_capacity(end - start);
            let mut cursor = 0usize;
            for offset in start..end {
                let header = RecordHeader::decode(&buf[cursor..])
                    .map_err(|err| corruption(offset, err))?;
                let body_start = cursor + RecordHeader::LEN;
                let body_end = body_start + header.body_len();
                if body_end > buf.len() {
                    return Err(corruption(offset, LogError::Incomplete));
                }
                let (key, value) = decode_body(&header, buf.slice(body_start..body_end))
                    .map_err(|err| corruption(offset, err))?;
                records.push(LogRecord {
                    offset: offset as Offset,
                    key,
                    value,
                });
                cursor = body_end;
            }
            Ok(records)
        })
    }

    fn earliest_offset(&self) -> BoxFuture<'_, Result<Offset>> {
        Box::pin(async move {
            self.state.lock().await.ensure_open()?;
            Ok(0)
        })
    }

    fn tail_offset(&self) -> BoxFuture<'_, Result<Offset>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            state.ensure_open()?;
            Ok(state.positions.len() as Offset)
        })
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.log");
        {
            let log = FileLog::open(&path).await.expect("open");
            log.append(Bytes::from_static(b"a"), Some(Bytes::from_static(b"1")))
                .await
                .expect("append");
            log.append(Bytes::from_static(b"a"), None)
                .await
                .expect("tombstone");
            log.append(Bytes::from_static(b"b"), Some(Bytes::from_static(b"2")))
                .await
                .expect("append");
        }

        let log = FileLog::open(&path).await.expect("reopen");
        assert_eq!(log.tail_offset().await.expect("tail"), 3);
        let records = log
            .read_range(ReadRange::from_start(10))
            .await
            .expect("read");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].value, Some(Bytes::from_static(b"1")));
        assert!(records[1].is_tombstone());
        assert_eq!(records[2].key, Bytes::from_static(b"b"));

        let offset = log
            .append(Bytes::from_static(b"c"), Some(Bytes::from_static(b"3")))
            .await
            .expect("append after reopen");
        assert_eq!(offset, 3);
    }

    #[tokio::test]
    async fn paged_reads_cover_the_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = FileLog::open_with(dir.path().join("paged.log"), FsyncMode::OnAppend)
            .await
            .expect("open");
        for i in 0..5u8 {
            log.append(Bytes::from(vec![i]), Some(Bytes::from(vec![i; 3])))
                .await
                .expect("append");
        }
        let page = log
            .read_range(ReadRange {
                start: 2,
                max_records: 2,
            })
            .await
            .expect("page");
        let offsets: Vec<_> = page.iter().map(|record| record.offset).collect();
        assert_eq!(offsets, vec![2, 3]);
        assert_eq!(page[1].value, Some(Bytes::from(vec![3u8; 3])));

        let past_end = log
            .read_range(ReadRange {
                start: 5,
                max_records: 2,
            })
            .await
            .expect("past end");
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn torn_tail_is_truncated_on_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("torn.log");
        {
            let log = FileLog::open(&path).await.expect("open");
            log.append(Bytes::from_static(b"k"), Some(Bytes::from_static(b"v")))
                .await
                .expect("append");
        }
        let good_len = std::fs::metadata(&path).expect("metadata").len();
        let partial = encode_record(b"k2", Some(b"value")).expect("encode");
        let mut bytes = std::fs::read(&path).expect("read");
        bytes.extend_from_slice(&partial[..partial.len() - 2]);
        std::fs::write(&path, &bytes).expect("write");

        let log = FileLog::open(&path).await.expect("reopen");
        assert_eq!(log.tail_offset().await.expect("tail"), 1);
        assert_eq!(std::fs::metadata(&path).expect("metadata").len(), good_len);
    }

    #[tokio::test]
    async fn checksum_failure_refuses_to_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("corrupt.log");
        {
            let log = FileLog::open(&path).await.expect("open");
            log.append(Bytes::from_static(b"k"), Some(Bytes::from_static(b"value")))
                .await
                .expect("append");
        }
        let mut bytes = std::fs::read(&path).expect("read");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, &bytes).expect("write");

        let err = FileLog::open(&path).await.expect_err("corrupt");
        assert!(matches!(err, LogError::Corruption { offset: 0, .. }));
    }

    #[tokio::test]
    async fn corrupted_length_refuses_to_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("length.log");
        {
            let log = FileLog::open(&path).await.expect("open");
            for key in [b"a", b"b", b"c"] {
                log.append(Bytes::from_static(key), Some(Bytes::from_static(b"value")))
                    .await
                    .expect("append");
            }
        }
        let mut bytes = std::fs::read(&path).expect("read");
        let before = bytes.len() as u64;
        // High byte of the first record's value_len.
        bytes[12] ^= 0x01;
        std::fs::write(&path, &bytes).expect("write");

        let err = FileLog::open(&path).await.expect_err("corrupt header");
        assert!(matches!(err, LogError::Corruption { offset: 0, .. }));
        assert_eq!(std::fs::metadata(&path).expect("metadata").len(), before);
    }

    #[tokio::test]
    async fn rollback_discards_partial_frame() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("partial.log");
        let log = FileLog::open(&path).await.expect("open");
        log.append(Bytes::from_static(b"a"), Some(Bytes::from_static(b"1")))
            .await
            .expect("append");
        {
            let mut state = log.state.lock().await;
            let frame = encode_record(b"lost", Some(b"write")).expect("encode");
            state
                .file
                .write_all(&frame[..frame.len() - 3])
                .await
                .expect("partial write");
            state.file.flush().await.expect("flush");
            state.rollback(&log.path).await;
            assert!(!state.closed);
        }

        let offset = log
            .append(Bytes::from_static(b"b"), Some(Bytes::from_static(b"2")))
            .await
            .expect("append after rollback");
        assert_eq!(offset, 1);
        let records = log
            .read_range(ReadRange::from_start(10))
            .await
            .expect("read");
        let keys: Vec<_> = records.iter().map(|record| record.key.clone()).collect();
        assert_eq!(keys, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
        drop(log);

        let log = FileLog::open(&path).await.expect("reopen");
        assert_eq!(log.tail_offset().await.expect("tail"), 2);
    }

    #[tokio::test]
    async fn failed_append_closes_log_when_rollback_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("readonly.log");
        let log = FileLog::open(&path).await.expect("open");
        log.append(Bytes::from_static(b"a"), Some(Bytes::from_static(b"1")))
            .await
            .expect("append");
        // Writes and truncation both fail on a read-only handle.
        log.state.lock().await.file = File::open(&path).await.expect("read-only handle");

        let err = log
            .append(Bytes::from_static(b"b"), Some(Bytes::from_static(b"2")))
            .await
            .expect_err("write through read-only handle");
        assert!(matches!(err, LogError::Io(_)));
        assert!(matches!(
            log.append(Bytes::from_static(b"c"), None).await,
            Err(LogError::Closed)
        ));
        assert!(matches!(log.tail_offset().await, Err(LogError::Closed)));
        drop(log);

        let log = FileLog::open(&path).await.expect("reopen");
        assert_eq!(log.tail_offset().await.expect("tail"), 1);
    }
}
