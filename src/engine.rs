//! Orchestration of a sorting run.
//!
//! A [`Sorter`] walks the source tree once and hands every file through
//! classification, conflict resolution and the [`FileOrganizer`]. Archives are
//! expanded after they have been placed, and the [`CleanupPass`] runs last.
//! All mutable state of a run lives in its [`RunContext`].

use crate::archive::{ArchiveExpander, staging_name};
use crate::cleanup::CleanupPass;
use crate::config::{CompiledFilters, ConfigError, RunConfig};
use crate::conflict::ConflictResolver;
use crate::file_category::{Category, Classifier, FileMapper};
use crate::file_organizer::FileOrganizer;
use crate::output::Logger;
use crate::report::{ActionKind, ActionRecord, RunReport};
use crate::walker::{FileEntry, Walker};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// How deep archives found inside archives are expanded.
pub const MAX_ARCHIVE_DEPTH: usize = 3;

/// State owned by a single run.
pub struct RunContext {
    /// The validated configuration, frozen for the run.
    pub config: RunConfig,
    pub mapper: FileMapper,
    pub filters: CompiledFilters,
    pub resolver: ConflictResolver,
    pub report: RunReport,
    /// Folders created by this run.
    protected: HashSet<PathBuf>,
    /// Folders the engine owns and never walks or cleans.
    excluded: HashSet<PathBuf>,
    /// Files a dry run would have moved away.
    vacated: HashSet<PathBuf>,
}

impl RunContext {
    /// Builds the context for an already validated configuration.
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        let filters = CompiledFilters::new(&config.filters)?;
        let mapper = FileMapper::with_overrides(config.overrides.clone());

        let mut excluded: HashSet<PathBuf> = mapper
            .categories()
            .iter()
            .map(|category| config.dest.join(category.dir_name()))
            .collect();
        excluded.insert(config.trash_dir());
        excluded.insert(config.staging_root());
        if config.dest != config.source {
            excluded.insert(config.dest.clone());
        }

        Ok(Self {
            report: RunReport::new(config.dry_run),
            config,
            mapper,
            filters,
            resolver: ConflictResolver::new(),
            protected: HashSet::new(),
            excluded,
            vacated: HashSet::new(),
        })
    }

    /// The folder files of `category` are sorted into.
    pub fn category_dir(&self, category: &Category) -> PathBuf {
        self.config.dest.join(category.dir_name())
    }

    /// Folders excluded from the walk.
    pub fn excluded(&self) -> &HashSet<PathBuf> {
        &self.excluded
    }

    /// Registers a folder created by this run.
    pub fn mark_created(&mut self, dir: impl Into<PathBuf>) {
        self.protected.insert(dir.into());
    }

    /// Whether `dir` was created by this run or belongs to the engine.
    pub fn is_protected(&self, dir: &Path) -> bool {
        self.protected.contains(dir) || self.excluded.contains(dir)
    }

    /// Registers a file a dry run would have moved away.
    pub fn mark_vacated(&mut self, path: &Path) {
        self.vacated.insert(path.to_path_buf());
    }

    pub fn is_vacated(&self, path: &Path) -> bool {
        self.vacated.contains(path)
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }
}

/// Runs sorting passes, reporting every action to a [`Logger`].
///
/// # Examples
///
/// ```no_run
/// use autosort::config::RunConfig;
/// use autosort::engine::Sorter;
/// use autosort::output::ConsoleLogger;
///
/// let mut config = RunConfig::new("/home/user/Downloads");
/// config.dry_run = true;
///
/// let logger = ConsoleLogger::new(false, true);
/// let report = Sorter::new(&logger).run(config)?;
/// println!("{} actions", report.summary().total());
/// # Ok::<(), autosort::config::ConfigError>(())
/// ```
pub struct Sorter<'a> {
    logger: &'a dyn Logger,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Sorter<'a> {
    pub fn new(logger: &'a dyn Logger) -> Self {
        Self {
            logger,
            cancel: None,
        }
    }

    /// Stops the run at the next checkpoint once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Validates `config` and performs one full run.
    ///
    /// Only configuration problems are returned as errors. Everything that
    /// goes wrong with individual files ends up in the report.
    pub fn run(&self, config: RunConfig) -> Result<RunReport, ConfigError> {
        let config = config.validate()?;
        let mut ctx = RunContext::new(config)?;

        tracing::info!(
            source = %ctx.config.source.display(),
            dest = %ctx.config.dest.display(),
            dry_run = ctx.config.dry_run,
            "starting run"
        );

        let walker = Walker::new(&ctx.config.source, ctx.config.recursive)
            .exclude(ctx.excluded().iter().cloned())
            .filters(ctx.filters.clone())
            .archive_formats(&ctx.config.archive_formats);
        let log_path = ctx.config.log_path();

        for entry in walker {
            if self.cancelled() {
                ctx.report.interrupted = true;
                break;
            }
            if entry.path == log_path {
                continue;
            }
            self.sort_entry(&mut ctx, entry);
            if ctx.report.interrupted {
                break;
            }
        }

        if ctx.report.interrupted {
            tracing::warn!("run interrupted, skipping cleanup");
        } else if ctx.config.remove_empty_dirs {
            for record in CleanupPass::run(&mut ctx) {
                self.record(&mut ctx, record);
            }
        }

        if !ctx.config.dry_run
            && let Err(e) = ctx.report.write_log(&log_path)
        {
            tracing::warn!("could not write run log {}: {e}", log_path.display());
        }

        self.logger.summary(&ctx.report);
        Ok(ctx.into_report())
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn record(&self, ctx: &mut RunContext, record: ActionRecord) {
        self.logger.action(&record);
        ctx.report.push(record);
    }

    /// Classifies and places one file, then expands it if it is an archive.
    fn sort_entry(&self, ctx: &mut RunContext, entry: FileEntry) {
        let category = ctx.mapper.categorize(&entry);
        let dest_dir = ctx.category_dir(&category);

        if let Some(record) = FileOrganizer::already_placed(&entry, &dest_dir, ctx.config.copy) {
            self.record(ctx, record);
            return;
        }

        let destination = ctx.resolver.resolve(&dest_dir, entry.file_name());
        let record = FileOrganizer::apply(ctx, &entry, &destination);
        let outcome = record.kind;
        if outcome != ActionKind::Failed {
            ctx.report.count_category(category.dir_name());
        }
        self.record(ctx, record);

        if !(ctx.config.extract_archives && entry.is_archive()) {
            return;
        }
        match outcome {
            ActionKind::Moved | ActionKind::Copied => {
                let placed = FileEntry {
                    path: destination,
                    ..entry.clone()
                };
                self.expand_archive(ctx, &placed, &entry.path, 1);
            }
            ActionKind::Skipped if ctx.config.dry_run => {
                let staging = ctx.config.staging_root().join(staging_name(&entry.path));
                self.record(
                    ctx,
                    ActionRecord::skipped(&entry.path, staging, "dry run: would extract"),
                );
            }
            _ => {}
        }
    }

    /// Extracts a placed archive and sorts its members.
    ///
    /// `shown_as` is how the archive appears in records: its original path,
    /// or its path inside the enclosing archive.
    fn expand_archive(
        &self,
        ctx: &mut RunContext,
        archive: &FileEntry,
        shown_as: &Path,
        depth: usize,
    ) {
        let staging_root = ctx.config.staging_root();
        let staging_dir = ctx
            .resolver
            .resolve(&staging_root, &staging_name(&archive.path));

        let expanded =
            ArchiveExpander::expand(archive, &staging_dir, &ctx.config.archive_formats);
        let members = match expanded {
            Ok(members) => members,
            Err(e) => {
                ArchiveExpander::abandon(&staging_dir);
                self.record(ctx, ActionRecord::failed(shown_as, &archive.path, e));
                return;
            }
        };
        tracing::debug!("{} members in {}", members.len(), archive.path.display());

        for member in members {
            if self.cancelled() {
                ctx.report.interrupted = true;
                tracing::warn!(
                    "interrupted while expanding {}, leaving {}",
                    archive.path.display(),
                    staging_dir.display()
                );
                return;
            }

            let relative = member
                .path
                .strip_prefix(&staging_dir)
                .unwrap_or(&member.path)
                .to_path_buf();
            let member_shown = shown_as.join(relative);

            let category = ctx.mapper.categorize(&member);
            let dest_dir = ctx.category_dir(&category);
            let destination = ctx.resolver.resolve(&dest_dir, member.file_name());
            let record = FileOrganizer::relocate_member(ctx, &member, &destination, &member_shown);
            let extracted = record.kind == ActionKind::Extracted;
            if extracted {
                ctx.report.count_category(category.dir_name());
            }
            self.record(ctx, record);

            if extracted && member.is_archive() {
                if depth < MAX_ARCHIVE_DEPTH {
                    let placed = FileEntry {
                        path: destination,
                        ..member
                    };
                    self.expand_archive(ctx, &placed, &member_shown, depth + 1);
                    if ctx.report.interrupted {
                        return;
                    }
                } else {
                    tracing::info!(
                        "not expanding {}: nested deeper than {MAX_ARCHIVE_DEPTH} archives",
                        member_shown.display()
                    );
                }
            }
        }

        ArchiveExpander::discard_staging(&staging_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{STAGING_DIR_NAME, TRASH_DIR_NAME};
    use crate::output::MemoryLogger;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
        let file = fs::File::create(path).expect("create zip");
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in members {
            zip.start_file(*name, SimpleFileOptions::default())
                .expect("start file");
            zip.write_all(content).expect("write member");
        }
        zip.finish().expect("finish zip");
    }

    #[test]
    fn test_context_excludes_engine_folders() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut config = RunConfig::new(temp_dir.path());
        config.dest = temp_dir.path().join("sorted");
        config
            .overrides
            .insert("log".to_string(), Category::Custom("Logs".to_string()));
        let ctx = RunContext::new(config.validate().expect("validate")).expect("context");

        let source = ctx.config.source.clone();
        let dest = ctx.config.dest.clone();
        assert!(ctx.is_protected(&dest));
        assert!(ctx.is_protected(&dest.join("Images")));
        assert!(ctx.is_protected(&dest.join("Logs")));
        assert!(ctx.is_protected(&dest.join(STAGING_DIR_NAME)));
        assert!(ctx.is_protected(&source.join(TRASH_DIR_NAME)));
        assert!(!ctx.is_protected(&source.join("Images")));
    }

    #[test]
    fn test_run_sorts_flat_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("photo.jpg"), "jpg").expect("write");
        fs::write(root.join("note.txt"), "txt").expect("write");

        let logger = MemoryLogger::default();
        let report = Sorter::new(&logger)
            .run(RunConfig::new(root))
            .expect("run should start");

        assert_eq!(report.summary().moved, 2);
        assert!(root.join("Images/photo.jpg").exists());
        assert!(root.join("Documents/note.txt").exists());
        assert_eq!(logger.records().len(), 2);
        assert_eq!(logger.summaries(), 1);
        assert_eq!(report.category_counts().get("Images"), Some(&1));
    }

    #[test]
    fn test_cancelled_run_stops_before_first_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("photo.jpg"), "jpg").expect("write");
        fs::create_dir(root.join("empty")).expect("mkdir");

        let flag = Arc::new(AtomicBool::new(true));
        let logger = MemoryLogger::default();
        let mut config = RunConfig::new(root);
        config.remove_empty_dirs = true;
        let report = Sorter::new(&logger)
            .with_cancel_flag(flag)
            .run(config)
            .expect("run should start");

        assert!(report.interrupted);
        assert!(report.records().is_empty());
        assert!(root.join("photo.jpg").exists());
        assert!(root.join("empty").exists());
    }

    #[test]
    fn test_extracted_members_are_sorted_and_staging_removed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        write_zip(
            &root.join("bundle.zip"),
            &[("song.mp3", b"la"), ("docs/readme.md", b"# hi")],
        );

        let logger = MemoryLogger::default();
        let mut config = RunConfig::new(root);
        config.extract_archives = true;
        let report = Sorter::new(&logger).run(config).expect("run should start");

        let summary = report.summary();
        assert_eq!(summary.moved, 1);
        assert_eq!(summary.extracted, 2);
        assert!(root.join("Archives/bundle.zip").exists());
        assert!(root.join("Music/song.mp3").exists());
        assert!(root.join("Documents/readme.md").exists());
        assert!(!root.join(STAGING_DIR_NAME).exists());

        let shown: Vec<_> = report
            .of_kind(ActionKind::Extracted)
            .map(|r| r.source.clone())
            .collect();
        let source = root.canonicalize().expect("canonicalize");
        assert!(shown.contains(&source.join("bundle.zip").join("song.mp3")));
    }

    #[test]
    fn test_dry_run_reports_extraction_without_touching_archive() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        write_zip(&root.join("bundle.zip"), &[("a.txt", b"a")]);

        let logger = MemoryLogger::default();
        let mut config = RunConfig::new(root);
        config.extract_archives = true;
        config.dry_run = true;
        let report = Sorter::new(&logger).run(config).expect("run should start");

        assert_eq!(report.summary().skipped, 2);
        assert!(
            report
                .records()
                .iter()
                .any(|r| r.reason.as_deref() == Some("dry run: would extract"))
        );
        assert!(root.join("bundle.zip").exists());
        assert!(!root.join("Archives").exists());
        assert!(!root.join(crate::config::RUN_LOG_NAME).exists());
    }
}
