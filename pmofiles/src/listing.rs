//! Directory listings.
//!
//! [`list`] enumerates the immediate children of a resolved directory and
//! returns a pure data structure; rendering is left to the caller.

use crate::audio::AudioFormat;
use crate::error::FilesError;
use crate::metadata;
use crate::path::{ResolvedPath, join_relative};
use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use tracing::{debug, warn};

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[cfg_attr(feature = "pmoserver", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// One child of a listed directory.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "pmoserver", derive(utoipa::ToSchema))]
pub struct DirEntry {
    pub name: String,
    /// Path relative to the root, `/`-separated
    pub path: String,
    pub kind: EntryKind,
    /// Size in bytes (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Number of immediate children (directories only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_count: Option<usize>,
    pub is_audio: bool,
    /// Album tag for audio files, "" when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Human readable size, `None` for directories.
    pub fn human_size(&self) -> Option<String> {
        self.size.map(human_size)
    }
}

/// Content of one directory, ready to be rendered.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "pmoserver", derive(utoipa::ToSchema))]
pub struct Listing {
    /// Relative path of the listed directory, "" for the root
    pub path: String,
    pub name: String,
    /// Relative path of the parent directory, absent at the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub entries: Vec<DirEntry>,
}

/// Lists the immediate children of `dir`.
///
/// Directories come first, then files; each group is sorted by name,
/// case-insensitively. Children that vanish during the enumeration, or that
/// are symlinks leading out of the root, are left out.
///
/// Blocking: call from `spawn_blocking` in async contexts.
pub fn list(dir: &ResolvedPath) -> Result<Listing, FilesError> {
    if !dir.is_dir() {
        return Err(FilesError::NotADirectory);
    }

    let rel = dir.relative();
    let mut entries = Vec::new();

    for item in fs::read_dir(dir.as_path()).map_err(FilesError::from_lookup)? {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };

        let file_name = item.file_name();
        let child = match dir.child(&file_name) {
            Ok(child) => child,
            Err(FilesError::Traversal) => {
                debug!(name = ?file_name, "Skipping symlink leading outside the root");
                continue;
            }
            Err(e) => {
                debug!(name = ?file_name, error = %e, "Skipping vanished entry");
                continue;
            }
        };

        let name = file_name.to_string_lossy().into_owned();
        let path = join_relative(&rel, &name);

        if child.is_dir() {
            let child_count = fs::read_dir(child.as_path())
                .map(|it| it.count())
                .unwrap_or(0);
            entries.push(DirEntry {
                name,
                path,
                kind: EntryKind::Directory,
                size: None,
                child_count: Some(child_count),
                is_audio: false,
                album: None,
            });
        } else if child.is_file() {
            let size = match fs::metadata(child.as_path()) {
                Ok(m) => m.len(),
                Err(e) => {
                    debug!(name = %name, error = %e, "Skipping vanished file");
                    continue;
                }
            };
            let is_audio = AudioFormat::from_name(&name).is_some();
            let album = is_audio.then(|| metadata::album(&child));
            entries.push(DirEntry {
                name,
                path,
                kind: EntryKind::File,
                size: Some(size),
                child_count: None,
                is_audio,
                album,
            });
        }
    }

    entries.sort_by(compare_entries);

    Ok(Listing {
        name: dir.name(),
        parent: dir.parent_relative(),
        path: rel,
        entries,
    })
}

/// Directories first, then case-insensitive name, then exact name so the
/// order stays total when two names differ only by case.
fn compare_entries(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.kind
        .cmp(&b.kind)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Formats a byte count with one decimal: `2048` gives `"2.0KB"`.
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = SIZE_UNITS[0];
    for u in SIZE_UNITS {
        unit = u;
        if value < 1024.0 || u == "TB" {
            break;
        }
        value /= 1024.0;
    }
    format!("{:.1}{}", value, unit)
}
