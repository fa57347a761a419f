//! Lazy, single-pass traversal of the source tree.
//!
//! [`Walker`] is an explicit iterator over [`FileEntry`] snapshots. Folders the
//! engine owns (category folders, the trash, the staging area) are skipped at
//! the moment they are reached, so sorted files are never picked up again.

use crate::archive::ArchiveFormat;
use crate::config::CompiledFilters;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file discovered by the walker.
///
/// The values are a snapshot taken at discovery time and are not refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the file (or of the symlink pointing at it).
    pub path: PathBuf,
    /// Size of the file's content.
    pub size_bytes: u64,
    /// Lower-cased extension without the dot, empty when there is none.
    pub extension: String,
    /// The archive format of the file, if it is an enabled archive.
    pub archive_format: Option<ArchiveFormat>,
}

impl FileEntry {
    /// Takes a snapshot of the file at `path`.
    ///
    /// Symlinks are described by their target. Returns an `InvalidInput`
    /// error when `path` does not resolve to a regular file.
    pub fn from_path(path: &Path, formats: &[ArchiveFormat]) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            ));
        }

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            archive_format: ArchiveFormat::detect(path, &extension, formats),
            extension,
        })
    }

    /// Whether this file is an archive the run may expand.
    pub fn is_archive(&self) -> bool {
        self.archive_format.is_some()
    }

    /// The final path component.
    pub fn file_name(&self) -> &std::ffi::OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }
}

/// Iterator over the files below a root directory.
///
/// The walk is finite and fused. Directory listings are read (and sorted by
/// name) when a directory is entered, which makes the order deterministic.
pub struct Walker {
    root: PathBuf,
    inner: Option<walkdir::IntoIter>,
    excluded: HashSet<PathBuf>,
    filters: CompiledFilters,
    formats: Vec<ArchiveFormat>,
}

impl Walker {
    /// Walks `root`, descending into subdirectories only when `recursive`.
    pub fn new(root: &Path, recursive: bool) -> Self {
        let mut walk = WalkDir::new(root).follow_links(false).sort_by_file_name();
        if !recursive {
            walk = walk.max_depth(1);
        }
        Self {
            root: root.to_path_buf(),
            inner: Some(walk.into_iter()),
            excluded: HashSet::new(),
            filters: CompiledFilters::permissive(),
            formats: Vec::new(),
        }
    }

    /// Directories that must never be descended into.
    pub fn exclude<I: IntoIterator<Item = PathBuf>>(mut self, dirs: I) -> Self {
        self.excluded.extend(dirs);
        self
    }

    /// Filters applied to paths relative to the root.
    pub fn filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Archive formats recognized when building entries.
    pub fn archive_formats(mut self, formats: &[ArchiveFormat]) -> Self {
        self.formats = formats.to_vec();
        self
    }

    /// Whether the walk has reached its end.
    pub fn is_exhausted(&self) -> bool {
        self.inner.is_none()
    }
}

fn relative<'a>(root: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

impl Iterator for Walker {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        loop {
            let inner = self.inner.as_mut()?;
            let dent = match inner.next() {
                None => {
                    self.inner = None;
                    return None;
                }
                Some(Err(e)) => {
                    tracing::warn!("skipping unreadable entry: {e}");
                    continue;
                }
                Some(Ok(dent)) => dent,
            };

            if dent.depth() == 0 {
                continue;
            }

            if dent.file_type().is_dir() {
                let path = dent.path();
                if self.excluded.contains(path)
                    || !self.filters.should_descend(relative(&self.root, path))
                {
                    tracing::debug!("not descending into {}", path.display());
                    inner.skip_current_dir();
                }
                continue;
            }

            let path = dent.path();
            if !self.filters.should_include(relative(&self.root, path)) {
                tracing::debug!("filtered out {}", path.display());
                continue;
            }

            match FileEntry::from_path(path, &self.formats) {
                Ok(entry) => return Some(entry),
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => continue,
                Err(e) => {
                    tracing::warn!("skipping {}: {e}", path.display());
                    continue;
                }
            }
        }
    }
}

impl std::iter::FusedIterator for Walker {}
