/// Audit trail of a sorting run.
///
/// Every file-level action becomes one [`ActionRecord`]. The [`RunReport`]
/// collects them in order, summarizes them, and appends them to the run log
/// as JSON lines so that past runs can be inspected.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// What happened to a file or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Moved,
    Copied,
    Extracted,
    /// Nothing was changed: dry run, already in place, or a cleanup race.
    Skipped,
    Failed,
    /// An empty directory was deleted permanently.
    Removed,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Moved => "MOVED",
            ActionKind::Copied => "COPIED",
            ActionKind::Extracted => "EXTRACTED",
            ActionKind::Skipped => "SKIPPED",
            ActionKind::Failed => "FAILED",
            ActionKind::Removed => "REMOVED",
        };
        f.write_str(label)
    }
}

/// A single action taken (or simulated) during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ActionRecord {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        kind: ActionKind,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            kind,
            reason: None,
        }
    }

    pub fn skipped(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(source, destination, ActionKind::Skipped).with_reason(reason)
    }

    pub fn failed(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::new(source, destination, ActionKind::Failed).with_reason(reason.to_string())
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.kind,
            self.source.display(),
            self.destination.display()
        )?;
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        Ok(())
    }
}

/// Per-kind action counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub moved: usize,
    pub copied: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub removed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.moved + self.copied + self.extracted + self.skipped + self.failed + self.removed
    }
}

/// One line of the run log.
#[derive(Serialize)]
struct LogLine<'a> {
    run: &'a str,
    #[serde(flatten)]
    record: &'a ActionRecord,
}

/// Append-only record of everything a run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// RFC 3339 timestamp of when the run started.
    pub started_at: String,
    /// Whether the run was simulated.
    pub dry_run: bool,
    /// Whether the run stopped at a checkpoint before finishing.
    pub interrupted: bool,
    records: Vec<ActionRecord>,
    categories: BTreeMap<String, usize>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            dry_run,
            interrupted: false,
            records: Vec::new(),
            categories: BTreeMap::new(),
        }
    }

    /// Counts one file placed (or planned) into the category folder `label`.
    pub fn count_category(&mut self, label: &str) {
        *self.categories.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Files per category folder.
    pub fn category_counts(&self) -> &BTreeMap<String, usize> {
        &self.categories
    }

    pub fn push(&mut self, record: ActionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ActionRecord] {
        &self.records
    }

    /// Records of one kind, in the order they were taken.
    pub fn of_kind(&self, kind: ActionKind) -> impl Iterator<Item = &ActionRecord> {
        self.records.iter().filter(move |record| record.kind == kind)
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for record in &self.records {
            let counter = match record.kind {
                ActionKind::Moved => &mut summary.moved,
                ActionKind::Copied => &mut summary.copied,
                ActionKind::Extracted => &mut summary.extracted,
                ActionKind::Skipped => &mut summary.skipped,
                ActionKind::Failed => &mut summary.failed,
                ActionKind::Removed => &mut summary.removed,
            };
            *counter += 1;
        }
        summary
    }

    /// Appends every record to the run log at `path`, one JSON object per line.
    ///
    /// Nothing is written for a run without records.
    pub fn write_log(&self, path: &Path) -> io::Result<()> {
        if self.records.is_empty() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        for record in &self.records {
            let line = LogLine {
                run: &self.started_at,
                record,
            };
            serde_json::to_writer(&mut writer, &line).map_err(io::Error::other)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }

    /// Reads back the records of every run in a log file.
    pub fn read_log(path: &Path) -> io::Result<Vec<ActionRecord>> {
        fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(io::Error::other))
            .collect()
    }
}
