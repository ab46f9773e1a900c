//! On-the-fly zip archives of a directory subtree.
//!
//! The archive is never materialized: [`write_archive`] walks the tree
//! lazily and deflates one file at a time into any tokio `AsyncWrite`.
//! [`stream_archive`] plugs that writer into a bounded in-memory pipe whose
//! read half is handed to the HTTP body, so the client's pull rate drives
//! the filesystem reads and a disconnect stops the producer.
//!
//! Entry names are relative to the parent of the requested directory:
//! archiving `Music/Disco` yields entries `Disco/...`.

use crate::error::{ArchiveError, FilesError};
use crate::path::ResolvedPath;
use async_zip::{Compression, ZipDateTime, ZipEntryBuilder, base::write::ZipFileWriter};
use chrono::{DateTime, TimeZone, Utc};
use futures::io::AsyncWriteExt as _;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use tokio::fs::File;
use tokio::io::{AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _, DuplexStream};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Bytes buffered between the zip writer task and the HTTP body
const PIPE_CAPACITY: usize = 64 * 1024;
/// Read size when copying a source file into its entry
const CHUNK_SIZE: usize = 32 * 1024;

/// A file to store, and the name it gets in the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub source: ResolvedPath,
    pub name: String,
}

struct Frame {
    dir: ResolvedPath,
    prefix: String,
    children: VecDeque<OsString>,
}

/// Depth-first walk yielding one [`ArchiveEntry`] per regular file.
///
/// Each directory is read when the walk enters it, and its children are
/// visited in name order. Directory symlinks are not followed; file
/// symlinks are kept when they resolve inside the root.
pub struct ArchiveWalker {
    stack: Vec<Frame>,
}

impl ArchiveWalker {
    pub async fn new(dir: &ResolvedPath) -> Result<Self, FilesError> {
        let frame = Frame {
            dir: dir.clone(),
            prefix: archive_root_name(dir),
            children: read_children(dir).await?,
        };
        Ok(Self { stack: vec![frame] })
    }

    /// Next file in walk order, `None` once the subtree is exhausted.
    pub async fn next_entry(&mut self) -> Option<ArchiveEntry> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(name) = frame.children.pop_front() else {
                self.stack.pop();
                continue;
            };

            let entry_name = format!("{}/{}", frame.prefix, name.to_string_lossy());
            let link = frame.dir.as_path().join(&name);

            let file_type = match tokio::fs::symlink_metadata(&link).await {
                Ok(m) => m.file_type(),
                Err(e) => {
                    warn!(entry = %entry_name, error = %e, "Entry vanished during archive walk");
                    continue;
                }
            };

            let child = match frame.dir.child_async(&name).await {
                Ok(child) => child,
                Err(e) => {
                    debug!(entry = %entry_name, error = %e, "Skipping entry outside the root");
                    continue;
                }
            };

            if file_type.is_dir() {
                match read_children(&child).await {
                    Ok(children) => self.stack.push(Frame {
                        dir: child,
                        prefix: entry_name,
                        children,
                    }),
                    Err(e) => {
                        warn!(entry = %entry_name, error = %e, "Skipping unreadable directory")
                    }
                }
            } else if file_type.is_file()
                || (file_type.is_symlink() && child.is_file_async().await)
            {
                return Some(ArchiveEntry {
                    source: child,
                    name: entry_name,
                });
            }
        }
    }
}

async fn read_children(dir: &ResolvedPath) -> Result<VecDeque<OsString>, FilesError> {
    let mut read_dir = tokio::fs::read_dir(dir.as_path())
        .await
        .map_err(FilesError::from_lookup)?;
    let mut names = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        names.push(entry.file_name());
    }
    names.sort();
    Ok(names.into())
}

/// Top-level folder name inside the archive.
fn archive_root_name(dir: &ResolvedPath) -> String {
    let name = dir.name();
    if name.is_empty() {
        "archive".to_string()
    } else {
        name
    }
}

/// `<dirname>.zip`, used for the download file name.
pub fn archive_file_name(dir: &ResolvedPath) -> String {
    format!("{}.zip", archive_root_name(dir))
}

/// Writes the zip archive of `dir` into `writer` and shuts it down.
///
/// Files that disappear between the walk and the open are skipped. Any
/// other I/O failure aborts the archive, leaving the output truncated.
/// Returns the writer once the central directory has been written.
pub async fn write_archive<W>(dir: &ResolvedPath, writer: W) -> Result<W, ArchiveError>
where
    W: AsyncWrite + Unpin,
{
    let mut walker = ArchiveWalker::new(dir).await?;
    let mut zip = ZipFileWriter::with_tokio(writer);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut count = 0usize;

    while let Some(entry) = walker.next_entry().await {
        let mut file = match File::open(entry.source.as_path()).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(entry = %entry.name, "File vanished before it could be archived");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let modified: DateTime<Utc> = file
            .metadata()
            .await
            .and_then(|m| m.modified())
            .map(DateTime::from)
            .unwrap_or_else(|_| Utc::now());

        let builder = ZipEntryBuilder::new(entry.name.clone().into(), Compression::Deflate)
            .last_modification_date(zip_timestamp(modified));
        let mut entry_writer = zip.write_entry_stream(builder).await?;

        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            entry_writer.write_all(&buf[..n]).await?;
        }
        entry_writer.close().await?;
        count += 1;
    }

    let mut inner = zip.close().await?.into_inner();
    inner.shutdown().await?;

    debug!(path = %dir, entries = count, "Archive complete");
    Ok(inner)
}

/// Starts writing the archive of `dir` in a background task and returns the
/// byte stream to send to the client.
///
/// Dropping the stream closes the pipe; the writer task then fails with a
/// broken pipe and releases its open file.
pub fn stream_archive(dir: ResolvedPath) -> ReaderStream<DuplexStream> {
    spawn_archive(dir).0
}

/// [`stream_archive`], also returning the handle of the writer task.
///
/// The task resolves once the archive is complete or the stream is dropped.
pub fn spawn_archive(
    dir: ResolvedPath,
) -> (ReaderStream<DuplexStream>, JoinHandle<Result<(), ArchiveError>>) {
    let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);

    let task = tokio::spawn(async move {
        let result = write_archive(&dir, writer).await.map(drop);
        match &result {
            Ok(()) => info!(path = %dir, "Archive streamed"),
            Err(e) if e.is_disconnect() => {
                debug!(path = %dir, "Client went away during archive streaming")
            }
            Err(e) => error!(path = %dir, error = %e, "Archive streaming failed"),
        }
        result
    });

    (ReaderStream::new(reader), task)
}

/// Zip timestamps start in 1980; older dates are pinned to that epoch.
fn zip_timestamp(modified: DateTime<Utc>) -> ZipDateTime {
    let epoch = Utc
        .with_ymd_and_hms(1980, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(modified);
    ZipDateTime::from_chrono(&modified.max(epoch))
}
