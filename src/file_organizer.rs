/// Moving and copying files into their category folders.
///
/// The organizer never overwrites anything. Moves check that the destination
/// is free right before renaming, copies create their target exclusively, and
/// a rename across filesystems falls back to copy and remove.
use crate::conflict::candidates;
use crate::engine::RunContext;
use crate::error::FileActionError;
use crate::report::{ActionKind, ActionRecord};
use crate::walker::FileEntry;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Places files at destinations chosen by the engine.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Returns a `Skipped` record when `entry` needs no action in `dest_dir`.
    ///
    /// That is the case when the file already sits where it would be placed,
    /// or, in copy mode, when `dest_dir` already holds a byte-identical copy
    /// under its name or one of the numbered variants.
    pub fn already_placed(entry: &FileEntry, dest_dir: &Path, copy: bool) -> Option<ActionRecord> {
        let desired = dest_dir.join(entry.file_name());
        if desired == entry.path {
            return Some(ActionRecord::skipped(&entry.path, desired, "already in place"));
        }
        if copy && let Some(existing) = find_identical_copy(entry, dest_dir) {
            let reason = format!("identical copy already at {}", existing.display());
            return Some(ActionRecord::skipped(&entry.path, existing, reason));
        }
        None
    }

    /// Moves or copies `entry` to `destination`, depending on the run mode.
    ///
    /// Missing parent folders are created and registered as protected. In a
    /// dry run nothing is touched and a `Skipped` record describes the action.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use autosort::config::RunConfig;
    /// use autosort::engine::RunContext;
    /// use autosort::file_organizer::FileOrganizer;
    /// use autosort::walker::FileEntry;
    /// use std::path::Path;
    ///
    /// let config = RunConfig::new("/path/to/base").validate()?;
    /// let mut ctx = RunContext::new(config)?;
    /// let entry = FileEntry::from_path(Path::new("/path/to/base/image.png"), &[])?;
    /// let destination = Path::new("/path/to/base/Images/image.png");
    /// let record = FileOrganizer::apply(&mut ctx, &entry, destination);
    /// println!("{record}");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn apply(ctx: &mut RunContext, entry: &FileEntry, destination: &Path) -> ActionRecord {
        let copy = ctx.config.copy;

        if ctx.config.dry_run {
            if !copy {
                ctx.mark_vacated(&entry.path);
            }
            let reason = if copy {
                "dry run: would copy"
            } else {
                "dry run: would move"
            };
            return ActionRecord::skipped(&entry.path, destination, reason);
        }

        let (kind, result) = if copy {
            (ActionKind::Copied, Self::copy_file(ctx, &entry.path, destination))
        } else {
            (ActionKind::Moved, Self::move_file(ctx, &entry.path, destination))
        };

        match result {
            Ok(()) => ActionRecord::new(&entry.path, destination, kind),
            Err(e) => {
                tracing::debug!("{} failed: {e:?}", entry.path.display());
                ActionRecord::failed(&entry.path, destination, e)
            }
        }
    }

    /// Moves an extracted archive member out of staging.
    ///
    /// The record shows `shown_as`, the member's path inside its archive, as
    /// its source. Members are always moved, whatever the run mode.
    pub fn relocate_member(
        ctx: &mut RunContext,
        member: &FileEntry,
        destination: &Path,
        shown_as: &Path,
    ) -> ActionRecord {
        match Self::move_file(ctx, &member.path, destination) {
            Ok(()) => ActionRecord::new(shown_as, destination, ActionKind::Extracted),
            Err(e) => ActionRecord::failed(shown_as, destination, e),
        }
    }

    /// Relocates `source` to `destination` without overwriting.
    pub fn move_file(
        ctx: &mut RunContext,
        source: &Path,
        destination: &Path,
    ) -> Result<(), FileActionError> {
        Self::prepare_destination(ctx, destination)?;

        match fs::rename(source, destination) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!(
                    "{} is on another device, copying instead of renaming",
                    source.display()
                );
                copy_exclusive(source, destination)?;
                if let Err(e) = fs::remove_file(source) {
                    let _ = fs::remove_file(destination);
                    return Err(FileActionError::from_io(e, source));
                }
                Ok(())
            }
            Err(e) => Err(FileActionError::from_io(e, source)),
        }
    }

    /// Duplicates `source` at `destination`, leaving the source untouched.
    pub fn copy_file(
        ctx: &mut RunContext,
        source: &Path,
        destination: &Path,
    ) -> Result<(), FileActionError> {
        Self::prepare_destination(ctx, destination)?;
        copy_exclusive(source, destination)
    }

    /// Creates the destination's parent folders and checks the name is free.
    fn prepare_destination(
        ctx: &mut RunContext,
        destination: &Path,
    ) -> Result<(), FileActionError> {
        if let Some(parent) = destination.parent() {
            Self::create_dirs(ctx, parent)?;
        }
        if destination.symlink_metadata().is_ok() {
            return Err(FileActionError::DestinationExists {
                path: destination.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Creates `dir` and its missing ancestors, registering each as protected.
    pub fn create_dirs(ctx: &mut RunContext, dir: &Path) -> Result<(), FileActionError> {
        let missing: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
            .map(Path::to_path_buf)
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(dir).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FileActionError::Io {
                path: dir.to_path_buf(),
                source: e,
            },
            _ => FileActionError::from_io(e, dir),
        })?;
        for created in missing {
            tracing::debug!("created {}", created.display());
            ctx.mark_created(created);
        }
        Ok(())
    }
}

/// Copies `source` into a newly created `destination`.
///
/// A partially written destination is removed on failure.
fn copy_exclusive(source: &Path, destination: &Path) -> Result<(), FileActionError> {
    let mut reader = File::open(source).map_err(|e| FileActionError::from_io(e, source))?;
    let permissions = reader.metadata().ok().map(|m| m.permissions());

    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .map_err(|e| FileActionError::from_io(e, destination))?;

    if let Err(e) = io::copy(&mut reader, &mut writer) {
        drop(writer);
        let _ = fs::remove_file(destination);
        return Err(FileActionError::from_io(e, destination));
    }
    if let Some(permissions) = permissions {
        let _ = fs::set_permissions(destination, permissions);
    }
    Ok(())
}

/// Looks for a byte-identical copy of `entry` in `dest_dir`.
///
/// Checks the entry's own name, then `name (1)`, `name (2)` and so on until a
/// name is free.
pub fn find_identical_copy(entry: &FileEntry, dest_dir: &Path) -> Option<PathBuf> {
    for name in candidates(entry.file_name()) {
        let candidate = dest_dir.join(name);
        let Ok(metadata) = fs::metadata(&candidate) else {
            return None;
        };
        if metadata.is_file()
            && metadata.len() == entry.size_bytes
            && same_content(&entry.path, &candidate).unwrap_or(false)
        {
            return Some(candidate);
        }
    }
    None
}

fn same_content(a: &Path, b: &Path) -> io::Result<bool> {
    let mut a = BufReader::new(File::open(a)?);
    let mut b = BufReader::new(File::open(b)?);
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];
    loop {
        let n = a.read(&mut buf_a)?;
        if n == 0 {
            return Ok(b.read(&mut buf_b)? == 0);
        }
        if b.read_exact(&mut buf_b[..n]).is_err() || buf_a[..n] != buf_b[..n] {
            return Ok(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::file_category::Category;
    use tempfile::TempDir;

    fn context(root: &Path, configure: impl FnOnce(&mut RunConfig)) -> RunContext {
        let mut config = RunConfig::new(root);
        configure(&mut config);
        RunContext::new(config.validate().expect("config should validate"))
            .expect("context should build")
    }

    fn entry(path: &Path) -> FileEntry {
        FileEntry::from_path(path, &[]).expect("entry")
    }

    #[test]
    fn test_move_creates_category_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut ctx = context(temp_dir.path(), |_| {});
        let base = ctx.config.source.clone();
        let file_path = base.join("test.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let destination = ctx.category_dir(&Category::Document).join("test.txt");
        let record = FileOrganizer::apply(&mut ctx, &entry(&file_path), &destination);

        assert_eq!(record.kind, ActionKind::Moved);
        assert!(!file_path.exists());
        assert_eq!(fs::read_to_string(&destination).expect("read"), "test content");
        assert!(ctx.is_protected(&base.join("Documents")));
    }

    #[test]
    fn test_copy_preserves_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut ctx = context(temp_dir.path(), |c| c.copy = true);
        let base = ctx.config.source.clone();
        let file_path = base.join("test.png");
        fs::write(&file_path, "pixels").expect("Failed to write test file");

        let destination = base.join("Images").join("test.png");
        let record = FileOrganizer::apply(&mut ctx, &entry(&file_path), &destination);

        assert_eq!(record.kind, ActionKind::Copied);
        assert!(file_path.exists());
        assert!(destination.exists());
    }

    #[test]
    fn test_existing_destination_is_never_overwritten() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut ctx = context(temp_dir.path(), |_| {});
        let base = ctx.config.source.clone();
        let file_path = base.join("note.txt");
        fs::write(&file_path, "new").expect("write");
        fs::create_dir(base.join("Documents")).expect("mkdir");
        let destination = base.join("Documents").join("note.txt");
        fs::write(&destination, "old").expect("write");

        let record = FileOrganizer::apply(&mut ctx, &entry(&file_path), &destination);

        assert_eq!(record.kind, ActionKind::Failed);
        assert_eq!(fs::read_to_string(&destination).expect("read"), "old");
        assert!(file_path.exists());
    }

    #[test]
    fn test_vanished_source_fails_without_aborting() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut ctx = context(temp_dir.path(), |_| {});
        let base = ctx.config.source.clone();
        let file_path = base.join("gone.txt");
        fs::write(&file_path, "x").expect("write");
        let snapshot = entry(&file_path);
        fs::remove_file(&file_path).expect("remove");

        let record = FileOrganizer::apply(&mut ctx, &snapshot, &base.join("Documents/gone.txt"));

        assert_eq!(record.kind, ActionKind::Failed);
        assert!(
            record
                .reason
                .as_deref()
                .is_some_and(|r| r.contains("vanished"))
        );
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut ctx = context(temp_dir.path(), |c| c.dry_run = true);
        let base = ctx.config.source.clone();
        let file_path = base.join("song.mp3");
        fs::write(&file_path, "la").expect("write");

        let destination = base.join("Music").join("song.mp3");
        let record = FileOrganizer::apply(&mut ctx, &entry(&file_path), &destination);

        assert_eq!(record.kind, ActionKind::Skipped);
        assert_eq!(record.reason.as_deref(), Some("dry run: would move"));
        assert_eq!(record.destination, destination);
        assert!(file_path.exists());
        assert!(!base.join("Music").exists());
        assert!(ctx.is_vacated(&file_path));
    }

    #[test]
    fn test_already_placed_detects_identical_numbered_copy() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let dest_dir = base.join("Documents");
        fs::create_dir(&dest_dir).expect("mkdir");
        fs::write(dest_dir.join("a.txt"), "different").expect("write");
        fs::write(dest_dir.join("a (1).txt"), "same").expect("write");
        let file_path = base.join("a.txt");
        fs::write(&file_path, "same").expect("write");

        let record =
            FileOrganizer::already_placed(&entry(&file_path), &dest_dir, true).expect("skip");
        assert_eq!(record.kind, ActionKind::Skipped);
        assert_eq!(record.destination, dest_dir.join("a (1).txt"));

        assert!(FileOrganizer::already_placed(&entry(&file_path), &dest_dir, false).is_none());
    }

    #[test]
    fn test_already_placed_when_destination_is_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dest_dir = temp_dir.path().join("Images");
        fs::create_dir(&dest_dir).expect("mkdir");
        let file_path = dest_dir.join("cat.jpg");
        fs::write(&file_path, "meow").expect("write");

        let record =
            FileOrganizer::already_placed(&entry(&file_path), &dest_dir, false).expect("skip");
        assert_eq!(record.reason.as_deref(), Some("already in place"));
    }

    #[test]
    fn test_same_content_compares_bytes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        let c = temp_dir.path().join("c");
        fs::write(&a, "hello world").expect("write");
        fs::write(&b, "hello world").expect("write");
        fs::write(&c, "hello there").expect("write");
        assert!(same_content(&a, &b).expect("compare"));
        assert!(!same_content(&a, &c).expect("compare"));
    }
}
