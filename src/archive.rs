//! Archive detection and extraction.
//!
//! Archives are unpacked into a staging folder chosen by the engine. Only
//! regular files and directories are written, and members whose paths would
//! leave the staging folder are skipped. The extracted files are returned as
//! [`FileEntry`] values so they can be sorted like any other file.

use crate::error::FileActionError;
use crate::walker::{FileEntry, Walker};
use flate2::read::GzDecoder;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;
use walkdir::WalkDir;

/// Archive formats that can be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    /// A gzip-compressed tarball (`.tar.gz` or `.tgz`).
    TarGz,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 3] = [
        ArchiveFormat::Zip,
        ArchiveFormat::Tar,
        ArchiveFormat::TarGz,
    ];

    /// The name used for this format in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }

    /// Detects the format of the file at `path`, limited to `enabled` formats.
    ///
    /// Detection goes by file name. Files without an extension are sniffed for
    /// a zip or tar signature instead.
    pub fn detect(path: &Path, extension: &str, enabled: &[ArchiveFormat]) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        let format = if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if extension.is_empty() {
            Self::sniff(path)
        } else {
            match extension {
                "zip" => Some(ArchiveFormat::Zip),
                "tar" => Some(ArchiveFormat::Tar),
                _ => None,
            }
        };
        format.filter(|format| enabled.contains(format))
    }

    fn sniff(path: &Path) -> Option<Self> {
        let kind = infer::get_from_path(path).ok().flatten()?;
        match kind.mime_type() {
            "application/zip" => Some(ArchiveFormat::Zip),
            "application/x-tar" => Some(ArchiveFormat::Tar),
            _ => None,
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar" => Ok(ArchiveFormat::Tar),
            "tar.gz" | "tgz" => Ok(ArchiveFormat::TarGz),
            other => Err(format!("unknown archive format: {other}")),
        }
    }
}

/// Name of the staging folder for an archive: its file name without the
/// archive suffix.
pub fn staging_name(archive: &Path) -> OsString {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    let lower = name.to_lowercase();
    let stem = [".tar.gz", ".tgz", ".zip", ".tar"]
        .iter()
        .find(|suffix| lower.ends_with(*suffix) && lower.len() > suffix.len())
        .map(|suffix| &name[..name.len() - suffix.len()])
        .unwrap_or(&name);
    OsString::from(stem)
}

/// Unpacks archives into staging folders.
pub struct ArchiveExpander;

impl ArchiveExpander {
    /// Extracts `entry` into `staging_dir` and returns the extracted files.
    ///
    /// `staging_dir` is created and must not exist yet. On failure the
    /// partially extracted folder is left for the caller to discard with
    /// [`ArchiveExpander::abandon`]. `formats` is used to flag nested archives
    /// in the returned entries.
    pub fn expand(
        entry: &FileEntry,
        staging_dir: &Path,
        formats: &[ArchiveFormat],
    ) -> Result<Vec<FileEntry>, FileActionError> {
        let format = entry
            .archive_format
            .ok_or_else(|| FileActionError::UnsupportedArchive {
                path: entry.path.clone(),
            })?;

        fs::create_dir_all(staging_dir).map_err(|e| FileActionError::from_io(e, staging_dir))?;

        let archive =
            File::open(&entry.path).map_err(|e| FileActionError::from_io(e, &entry.path))?;
        match format {
            ArchiveFormat::Zip => extract_zip(archive, &entry.path, staging_dir)?,
            ArchiveFormat::Tar => extract_tar(archive, &entry.path, staging_dir)?,
            ArchiveFormat::TarGz => {
                extract_tar(GzDecoder::new(archive), &entry.path, staging_dir)?
            }
        }

        tracing::debug!(
            "extracted {} ({format}) into {}",
            entry.path.display(),
            staging_dir.display()
        );
        Ok(Walker::new(staging_dir, true)
            .archive_formats(formats)
            .collect())
    }

    /// Removes the empty folders left in `staging_dir`, then the folder
    /// itself and its parent if they are empty too.
    ///
    /// Folders that still hold files are kept so nothing is lost.
    pub fn discard_staging(staging_dir: &Path) {
        for dent in WalkDir::new(staging_dir)
            .contents_first(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|dent| dent.file_type().is_dir())
        {
            if let Err(e) = fs::remove_dir(dent.path()) {
                tracing::debug!("keeping staging folder {}: {e}", dent.path().display());
            }
        }
        if let Some(parent) = staging_dir.parent() {
            let _ = fs::remove_dir(parent);
        }
    }

    /// Deletes a partially extracted staging folder after a failure.
    pub fn abandon(staging_dir: &Path) {
        if let Err(e) = fs::remove_dir_all(staging_dir) {
            tracing::warn!(
                "could not remove staging folder {}: {e}",
                staging_dir.display()
            );
        }
        if let Some(parent) = staging_dir.parent() {
            let _ = fs::remove_dir(parent);
        }
    }
}

/// Maps an I/O error raised while extracting.
///
/// Environment problems keep their meaning, everything else means the
/// archive could not be decoded.
fn extraction_error(err: io::Error, archive: &Path, target: &Path) -> FileActionError {
    match err.kind() {
        io::ErrorKind::PermissionDenied
        | io::ErrorKind::ReadOnlyFilesystem
        | io::ErrorKind::StorageFull
        | io::ErrorKind::QuotaExceeded => FileActionError::from_io(err, target),
        _ => FileActionError::CorruptArchive {
            path: archive.to_path_buf(),
            reason: err.to_string(),
        },
    }
}

fn extract_zip(file: File, archive: &Path, staging_dir: &Path) -> Result<(), FileActionError> {
    let corrupt = |e: zip::result::ZipError| FileActionError::CorruptArchive {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    };

    let mut zip = zip::ZipArchive::new(file).map_err(corrupt)?;
    for index in 0..zip.len() {
        let mut member = zip.by_index(index).map_err(corrupt)?;
        let Some(relative) = member.enclosed_name() else {
            tracing::warn!(
                "skipping unsafe member {:?} in {}",
                member.name(),
                archive.display()
            );
            continue;
        };
        if member
            .unix_mode()
            .is_some_and(|mode| mode & 0o170000 == 0o120000)
        {
            tracing::debug!("skipping symlink member {:?}", member.name());
            continue;
        }

        let target = staging_dir.join(relative);
        if member.is_dir() {
            fs::create_dir_all(&target).map_err(|e| FileActionError::from_io(e, &target))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| FileActionError::from_io(e, parent))?;
        }
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| FileActionError::from_io(e, &target))?;
        io::copy(&mut member, &mut out).map_err(|e| extraction_error(e, archive, &target))?;
    }
    Ok(())
}

fn extract_tar<R: Read>(
    reader: R,
    archive: &Path,
    staging_dir: &Path,
) -> Result<(), FileActionError> {
    let mut tar = tar::Archive::new(reader);
    let entries = tar
        .entries()
        .map_err(|e| extraction_error(e, archive, staging_dir))?;

    for member in entries {
        let mut member = member.map_err(|e| extraction_error(e, archive, staging_dir))?;
        let kind = member.header().entry_type();
        if !(kind.is_file() || kind.is_dir()) {
            tracing::debug!("skipping {kind:?} member in {}", archive.display());
            continue;
        }
        let unpacked = member
            .unpack_in(staging_dir)
            .map_err(|e| extraction_error(e, archive, staging_dir))?;
        if !unpacked {
            tracing::warn!("skipping unsafe member in {}", archive.display());
        }
    }
    Ok(())
}
