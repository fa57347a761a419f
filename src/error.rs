//! Recoverable errors raised while acting on individual files and directories.
//!
//! None of these abort a run. The engine turns them into `Failed` or `Skipped`
//! records in the [`RunReport`](crate::report::RunReport) and moves on to the
//! next entry. Fatal problems are [`ConfigError`](crate::config::ConfigError)s.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while moving, copying or extracting a single file.
#[derive(Debug, Error)]
pub enum FileActionError {
    /// The process lacks permission to read the source or write the destination.
    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },
    /// The destination filesystem ran out of space.
    #[error("no space left on device while writing {}", path.display())]
    DiskFull { path: PathBuf },
    /// The source disappeared between discovery and action.
    #[error("source vanished before it could be processed: {}", path.display())]
    SourceVanished { path: PathBuf },
    /// Something already occupies the destination path.
    #[error("destination already exists: {}", path.display())]
    DestinationExists { path: PathBuf },
    /// The archive could not be read.
    #[error("corrupt archive {}: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },
    /// The file is not an archive format enabled for this run.
    #[error("unsupported archive format: {}", path.display())]
    UnsupportedArchive { path: PathBuf },
    /// Any other I/O failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileActionError {
    /// Classifies an I/O error raised while acting on `path`.
    ///
    /// `NotFound` is reported as a vanished source, so callers should only use
    /// this for errors where the missing path is the one being read.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                Self::PermissionDenied { path }
            }
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => Self::DiskFull { path },
            io::ErrorKind::NotFound => Self::SourceVanished { path },
            io::ErrorKind::AlreadyExists => Self::DestinationExists { path },
            _ => Self::Io { path, source: err },
        }
    }
}

/// Errors that can occur while removing or trashing an empty directory.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// The directory gained entries between inspection and action.
    #[error("directory is no longer empty: {}", path.display())]
    NotEmpty { path: PathBuf },
    /// Any other I/O failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CleanupError {
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::DirectoryNotEmpty => Self::NotEmpty {
                path: path.to_path_buf(),
            },
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}
