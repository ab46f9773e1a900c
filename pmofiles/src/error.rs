use std::io;

/// Errors surfaced by the file server core.
///
/// Only [`FilesError::Traversal`] and the not-found group ever reach a client
/// as meaningful outcomes; messages never embed filesystem paths so they can
/// be displayed as-is.
#[derive(thiserror::Error, Debug)]
pub enum FilesError {
    #[error("requested path escapes the shared root")]
    Traversal,
    #[error("no such file or directory")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("not a regular file")]
    NotAFile,
    #[error("invalid root directory: {0}")]
    InvalidRoot(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FilesError {
    /// True for every variant that maps to a "not found" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FilesError::NotFound | FilesError::NotADirectory | FilesError::NotAFile
        )
    }

    /// Classifies an I/O error raised while resolving a path.
    pub(crate) fn from_lookup(err: io::Error) -> Self {
        match err.kind() {
            // NotADirectory: a file was used as an intermediate directory
            io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::NotADirectory => FilesError::NotFound,
            _ => FilesError::Io(err),
        }
    }
}

/// Errors raised while writing a zip archive.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] async_zip::error::ZipError),
    #[error(transparent)]
    Files(#[from] FilesError),
}

impl ArchiveError {
    /// The consumer went away (client disconnect): not worth a warning.
    pub fn is_disconnect(&self) -> bool {
        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                return matches!(
                    io_err.kind(),
                    io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
                );
            }
            source = err.source();
        }
        false
    }
}
