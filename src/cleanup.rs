//! Removal of directories left empty by a run.
//!
//! The pass runs after every file has been handled. Candidates are gathered
//! top-down and then inspected deepest-first, so a parent whose only content
//! was an empty child is cleaned in the same pass.

use crate::engine::RunContext;
use crate::error::CleanupError;
use crate::file_organizer::FileOrganizer;
use crate::report::{ActionKind, ActionRecord};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Trashes or deletes empty directories below the source root.
pub struct CleanupPass;

impl CleanupPass {
    /// Cleans every empty, unprotected directory below the source root.
    ///
    /// In a dry run nothing is touched: files the run would have moved away
    /// and directories that would have been cleaned count as absent, and each
    /// directory that would go gets a `Skipped` record.
    pub fn run(ctx: &mut RunContext) -> Vec<ActionRecord> {
        let candidates = Self::candidates(ctx);
        tracing::debug!("inspecting {} directories for cleanup", candidates.len());

        let mut cleaned: HashSet<PathBuf> = HashSet::new();
        let mut records = Vec::new();

        for dir in candidates.into_iter().rev() {
            match Self::is_empty(ctx, &dir, &cleaned) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    records.push(ActionRecord::failed(&dir, &dir, e));
                    continue;
                }
            }

            let record = Self::clean(ctx, &dir);
            let gone = match record.kind {
                ActionKind::Moved | ActionKind::Removed => true,
                ActionKind::Skipped => ctx.config.dry_run,
                _ => false,
            };
            if gone {
                cleaned.insert(dir);
            }
            records.push(record);
        }
        records
    }

    /// Directories below the root in walk order, parents before children.
    fn candidates(ctx: &RunContext) -> Vec<PathBuf> {
        let root = ctx.config.source.clone();
        let hidden = ctx.filters.hidden_files_enabled();

        WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .min_depth(1)
            .into_iter()
            .filter_entry(|dent| {
                if !dent.file_type().is_dir() {
                    return false;
                }
                let path = dent.path();
                let name = dent.file_name().to_string_lossy();
                !ctx.is_protected(path)
                    && (hidden || !name.starts_with('.'))
                    && ctx
                        .filters
                        .should_descend(path.strip_prefix(&root).unwrap_or(path))
            })
            .filter_map(|dent| match dent {
                Ok(dent) => Some(dent.into_path()),
                Err(e) => {
                    tracing::warn!("skipping unreadable directory: {e}");
                    None
                }
            })
            .collect()
    }

    fn is_empty(
        ctx: &RunContext,
        dir: &Path,
        cleaned: &HashSet<PathBuf>,
    ) -> Result<bool, CleanupError> {
        let entries = fs::read_dir(dir).map_err(|e| CleanupError::from_io(e, dir))?;
        for entry in entries {
            let path = entry.map_err(|e| CleanupError::from_io(e, dir))?.path();
            if !(cleaned.contains(&path) || ctx.is_vacated(&path)) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn clean(ctx: &mut RunContext, dir: &Path) -> ActionRecord {
        if ctx.config.permanent_trash {
            if ctx.config.dry_run {
                return ActionRecord::skipped(dir, dir, "dry run: would remove empty directory");
            }
            return match fs::remove_dir(dir) {
                Ok(()) => ActionRecord::new(dir, dir, ActionKind::Removed),
                Err(e) => Self::recover(dir, dir, CleanupError::from_io(e, dir)),
            };
        }

        let trash = ctx.config.trash_dir();
        let name = dir
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "directory".into());
        let target = ctx.resolver.resolve(&trash, &name);

        if ctx.config.dry_run {
            return ActionRecord::skipped(
                dir,
                target,
                "dry run: would move empty directory to trash",
            );
        }

        if let Err(e) = FileOrganizer::create_dirs(ctx, &trash) {
            return ActionRecord::failed(dir, target, e);
        }
        match fs::read_dir(dir).map(|mut entries| entries.next().is_none()) {
            Ok(true) => {}
            Ok(false) => {
                return Self::recover(dir, &target, CleanupError::NotEmpty {
                    path: dir.to_path_buf(),
                });
            }
            Err(e) => return Self::recover(dir, &target, CleanupError::from_io(e, dir)),
        }
        match fs::rename(dir, &target) {
            Ok(()) => ActionRecord::new(dir, target, ActionKind::Moved),
            Err(e) => Self::recover(dir, &target, CleanupError::from_io(e, dir)),
        }
    }

    /// A directory that filled up again is skipped, anything else failed.
    fn recover(dir: &Path, target: &Path, err: CleanupError) -> ActionRecord {
        match err {
            CleanupError::NotEmpty { .. } => {
                tracing::debug!("{} is no longer empty", dir.display());
                ActionRecord::skipped(dir, target, err.to_string())
            }
            CleanupError::Io { .. } => ActionRecord::failed(dir, target, err),
        }
    }
}
