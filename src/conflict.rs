//! Collision-free destination names.
//!
//! A name is taken when something already exists on disk under it, or when
//! an earlier action of the same run has been assigned it. The second half
//! matters for files that arrive in the same folder before either of them is
//! physically written, such as two extracted `report.txt` members.

use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Suffixes that name one format across two extensions.
const COMPOUND_SUFFIXES: [&str; 3] = [".tar.gz", ".tar.bz2", ".tar.xz"];

/// Splits a file name into the part that gets numbered and its suffix.
///
/// Compound archive suffixes stay whole so a numbered `.tar.gz` is still
/// recognized as one.
fn split_name(desired: &OsStr) -> (OsString, OsString) {
    if let Some(name) = desired.to_str() {
        let lower = name.to_ascii_lowercase();
        if let Some(suffix) = COMPOUND_SUFFIXES
            .iter()
            .find(|suffix| lower.ends_with(*suffix) && lower.len() > suffix.len())
        {
            let (stem, suffix) = name.split_at(name.len() - suffix.len());
            return (stem.into(), suffix.into());
        }
    }

    let path = Path::new(desired);
    let stem = path.file_stem().unwrap_or(desired).to_os_string();
    let mut suffix = OsString::new();
    if let Some(ext) = path.extension() {
        suffix.push(".");
        suffix.push(ext);
    }
    (stem, suffix)
}

/// Builds the `n`-th numbered variant of `desired`: `stem (n)ext`.
///
/// ```
/// use autosort::conflict::numbered_name;
/// use std::ffi::OsStr;
///
/// assert_eq!(numbered_name(OsStr::new("report.txt"), 1), "report (1).txt");
/// assert_eq!(numbered_name(OsStr::new("backup.tar.gz"), 1), "backup (1).tar.gz");
/// assert_eq!(numbered_name(OsStr::new(".bashrc"), 2), ".bashrc (2)");
/// ```
pub fn numbered_name(desired: &OsStr, n: usize) -> OsString {
    let (mut name, suffix) = split_name(desired);
    name.push(format!(" ({n})"));
    name.push(suffix);
    name
}

/// Yields `desired` followed by its numbered variants, forever.
pub fn candidates(desired: &OsStr) -> impl Iterator<Item = OsString> + '_ {
    std::iter::once(desired.to_os_string()).chain((1..).map(move |n| numbered_name(desired, n)))
}

/// Returns the first candidate for `desired` that `is_taken` rejects.
pub fn resolve_name(desired: &OsStr, is_taken: impl Fn(&OsStr) -> bool) -> OsString {
    candidates(desired)
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| desired.to_os_string())
}

/// Hands out destination paths that collide neither with the filesystem nor
/// with each other.
#[derive(Debug, Default)]
pub struct ConflictResolver {
    assigned: HashMap<PathBuf, HashSet<OsString>>,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is occupied in `dest_dir`, on disk or by this run.
    ///
    /// Dangling symlinks count as occupied.
    pub fn is_taken(&self, dest_dir: &Path, name: &OsStr) -> bool {
        self.assigned
            .get(dest_dir)
            .is_some_and(|names| names.contains(name))
            || dest_dir.join(name).symlink_metadata().is_ok()
    }

    /// Returns a free path for `desired` inside `dest_dir` and registers it.
    ///
    /// The name stays registered even if the caller's filesystem action fails,
    /// so it is never handed out twice in one run.
    pub fn resolve(&mut self, dest_dir: &Path, desired: &OsStr) -> PathBuf {
        let name = resolve_name(desired, |candidate| self.is_taken(dest_dir, candidate));
        self.register(dest_dir, &name);
        dest_dir.join(name)
    }

    /// Marks `name` in `dest_dir` as assigned.
    pub fn register(&mut self, dest_dir: &Path, name: &OsStr) {
        self.assigned
            .entry(dest_dir.to_path_buf())
            .or_default()
            .insert(name.to_os_string());
    }

    /// Number of names assigned so far across all folders.
    #[cfg(test)]
    fn assigned_count(&self) -> usize {
        self.assigned.values().map(HashSet::len).sum()
    }
}
