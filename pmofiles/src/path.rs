//! Resolution of client-supplied relative paths against the shared root.
//!
//! [`Root::resolve`] is the only way to obtain a [`ResolvedPath`]. Every
//! downstream operation (listing, metadata, archive) takes a `ResolvedPath`,
//! so a path that escapes the root cannot reach them.
//!
//! ```no_run
//! use pmofiles::Root;
//!
//! # fn main() -> Result<(), pmofiles::FilesError> {
//! let root = Root::new("/srv/music")?;
//! let album = root.resolve("Artist/Album%20One")?.into_dir()?;
//! assert!(root.resolve("../../etc/passwd").is_err());
//! # Ok(())
//! # }
//! ```

use crate::error::FilesError;
use percent_encoding::percent_decode_str;
use std::{
    ffi::OsStr,
    fmt,
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tracing::warn;

/// The canonical directory the server is allowed to expose.
///
/// Cheap to clone; immutable for the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Root {
    path: Arc<PathBuf>,
}

impl Root {
    /// Canonicalizes `path` and checks that it is a directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, FilesError> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path)
            .map_err(|e| FilesError::InvalidRoot(format!("{}: {}", path.display(), e)))?;
        if !canonical.is_dir() {
            return Err(FilesError::InvalidRoot(format!(
                "{} is not a directory",
                canonical.display()
            )));
        }
        Ok(Self {
            path: Arc::new(canonical),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves a client-supplied relative path.
    ///
    /// `rel` is percent-decoded once, backslashes are treated as separators,
    /// `.`/`..` segments are folded lexically (a `..` above the root is a
    /// traversal), then the joined path is canonicalized, which follows
    /// symlinks, and must still lie under the root.
    pub fn resolve(&self, rel: &str) -> Result<ResolvedPath, FilesError> {
        let decoded = percent_decode_str(rel).decode_utf8_lossy();

        let segments = match normalize(&decoded) {
            Ok(segments) => segments,
            Err(FilesError::Traversal) => {
                warn!(requested = %rel, "Path traversal attempt rejected");
                return Err(FilesError::Traversal);
            }
            Err(e) => return Err(e),
        };

        let mut candidate = self.path.to_path_buf();
        candidate.extend(segments);

        self.admit(&candidate).inspect_err(|e| {
            if matches!(e, FilesError::Traversal) {
                warn!(requested = %rel, "Path escapes the shared root through a symlink");
            }
        })
    }

    /// Canonicalizes `candidate` and checks it against the root.
    fn admit(&self, candidate: &Path) -> Result<ResolvedPath, FilesError> {
        let canonical = std::fs::canonicalize(candidate).map_err(FilesError::from_lookup)?;
        self.contain(canonical)
    }

    /// Same as [`Root::admit`], without blocking the runtime.
    async fn admit_async(&self, candidate: &Path) -> Result<ResolvedPath, FilesError> {
        let canonical = tokio::fs::canonicalize(candidate)
            .await
            .map_err(FilesError::from_lookup)?;
        self.contain(canonical)
    }

    fn contain(&self, canonical: PathBuf) -> Result<ResolvedPath, FilesError> {
        if canonical.starts_with(self.path.as_path()) {
            Ok(ResolvedPath {
                root: self.clone(),
                path: canonical,
            })
        } else {
            Err(FilesError::Traversal)
        }
    }
}

/// Splits a decoded relative path into plain segments.
fn normalize(rel: &str) -> Result<Vec<&str>, FilesError> {
    if rel.contains('\0') {
        return Err(FilesError::NotFound);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in rel.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(FilesError::Traversal);
                }
            }
            s => segments.push(s),
        }
    }
    Ok(segments)
}

/// An absolute, canonical path that is the root or one of its descendants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    root: Root,
    path: PathBuf,
}

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn is_root(&self) -> bool {
        self.path == *self.root.path
    }

    /// Last component of the path (the root's own directory name for the root).
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lower-cased extension, without the dot.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// Path relative to the root, `/`-separated, empty for the root itself.
    pub fn relative(&self) -> String {
        let rel = self.path.strip_prefix(self.root.path()).unwrap_or(Path::new(""));
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Relative path of the parent directory, `None` at the root.
    pub fn parent_relative(&self) -> Option<String> {
        if self.is_root() {
            return None;
        }
        let rel = self.relative();
        Some(match rel.rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => String::new(),
        })
    }

    /// Resolves an immediate child by name.
    ///
    /// The child is canonicalized again, so a symlink pointing outside the
    /// root yields [`FilesError::Traversal`].
    pub fn child(&self, name: &OsStr) -> Result<ResolvedPath, FilesError> {
        if !is_single_component(name) {
            return Err(FilesError::NotFound);
        }
        self.root.admit(&self.path.join(name))
    }

    /// Async [`ResolvedPath::child`], for walks running on the tokio runtime.
    pub async fn child_async(&self, name: &OsStr) -> Result<ResolvedPath, FilesError> {
        if !is_single_component(name) {
            return Err(FilesError::NotFound);
        }
        self.root.admit_async(&self.path.join(name)).await
    }

    pub fn is_dir(&self) -> bool {
        self.path.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.path.is_file()
    }

    pub async fn is_file_async(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .is_ok_and(|m| m.is_file())
    }

    /// Keeps the path only if it is a directory.
    pub fn into_dir(self) -> Result<Self, FilesError> {
        if self.is_dir() {
            Ok(self)
        } else if self.path.exists() {
            Err(FilesError::NotADirectory)
        } else {
            Err(FilesError::NotFound)
        }
    }

    /// Keeps the path only if it is a regular file.
    pub fn into_file(self) -> Result<Self, FilesError> {
        if self.is_file() {
            Ok(self)
        } else if self.path.exists() {
            Err(FilesError::NotAFile)
        } else {
            Err(FilesError::NotFound)
        }
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.relative())
    }
}

fn is_single_component(name: &OsStr) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Joins a child name onto a relative directory path.
pub fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
