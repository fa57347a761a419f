//! Run configuration and file filtering.
//!
//! A run is described by a [`RunConfig`], built from command-line flags and an
//! optional TOML [`FileConfig`]. The file supports:
//! - Exact filename, extension, glob and regex exclusion rules
//! - Include (whitelist) rules that override exclude rules
//! - Extension to category overrides
//! - The set of archive formats that may be expanded
//!
//! # Configuration File Format
//!
//! ```toml
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp", "node_modules/**"]
//! extensions = ["bak", "tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [categories]
//! log = "Logs"
//!
//! [archives]
//! formats = ["zip", "tar", "tar.gz"]
//! ```

use crate::archive::ArchiveFormat;
use crate::file_category::{Category, normalize_extension};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Folder under the source root that receives trashed empty directories.
pub const TRASH_DIR_NAME: &str = ".trashcan";
/// Folder under the destination root where archives are unpacked.
pub const STAGING_DIR_NAME: &str = ".staging";
/// Run log appended to after every non-simulated run.
pub const RUN_LOG_NAME: &str = ".autosort.log";
/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_NAME: &str = ".autosortrc.toml";

/// Errors that prevent a run from starting.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// A category label that cannot be used as a folder name.
    #[error("Invalid category '{category}' for extension '{extension}': {reason}")]
    InvalidCategory {
        extension: String,
        category: String,
        reason: String,
    },
    /// An archive format name that is not supported.
    #[error("Unknown archive format '{0}': expected zip, tar or tar.gz")]
    InvalidArchiveFormat(String),
    /// The source path does not exist.
    #[error("Path not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// The source path exists but is not a directory.
    #[error("Path is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// The source directory cannot be listed.
    #[error("Cannot read {}: {reason}", path.display())]
    SourceUnreadable { path: PathBuf, reason: String },
    /// The destination cannot hold category folders.
    #[error("Unusable destination {}: {reason}", path.display())]
    DestinationUnusable { path: PathBuf, reason: String },
    /// Flags that contradict each other.
    #[error("Conflicting options: {0}")]
    ConflictingFlags(String),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Contents of a TOML configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub filters: FilterRules,

    /// Extension to category label overrides.
    #[serde(default)]
    pub categories: BTreeMap<String, String>,

    #[serde(default)]
    pub archives: ArchiveRules,
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to include hidden files (starting with "."). Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding files from sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude (e.g., "*.tmp", "node_modules/**").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "bak", "tmp", "log").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against file names.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Which archive formats may be expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRules {
    #[serde(default = "default_archive_formats")]
    pub formats: Vec<String>,
}

impl Default for ArchiveRules {
    fn default() -> Self {
        Self {
            formats: default_archive_formats(),
        }
    }
}

fn default_archive_formats() -> Vec<String> {
    ArchiveFormat::ALL
        .iter()
        .map(|format| format.name().to_string())
        .collect()
}

impl FileConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.autosortrc.toml` in the current directory
    /// 3. Look for `~/.config/autosort/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_NAME);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("autosort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&content)
    }

    /// Parses TOML configuration text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Compile the filter rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }

    /// Resolves the category overrides, keyed by normalized extension.
    pub fn category_overrides(&self) -> Result<BTreeMap<String, Category>, ConfigError> {
        self.categories
            .iter()
            .map(|(ext, label)| {
                let category = Category::from_label(label);
                validate_category(ext, &category)?;
                Ok((normalize_extension(ext), category))
            })
            .collect()
    }

    /// Parses the enabled archive formats.
    pub fn archive_formats(&self) -> Result<Vec<ArchiveFormat>, ConfigError> {
        let mut formats = Vec::new();
        for name in &self.archives.formats {
            let format: ArchiveFormat = name
                .parse()
                .map_err(|_| ConfigError::InvalidArchiveFormat(name.clone()))?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }
}

/// Rejects custom labels that would not be a single plain folder name.
fn validate_category(extension: &str, category: &Category) -> Result<(), ConfigError> {
    let Category::Custom(label) = category else {
        return Ok(());
    };

    let reason = if label.trim().is_empty() {
        Some("label is empty")
    } else if label.starts_with('.') {
        Some("label must not start with a dot")
    } else {
        let mut components = Path::new(label).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !label.contains(['/', '\\']) => None,
            _ => Some("label must be a single folder name"),
        }
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidCategory {
            extension: extension.to_string(),
            category: label.clone(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Compiled, optimized filter structures for efficient file matching.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Create compiled filters from filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
                })
                .collect()
        }

        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Filters that let everything through, hidden files included.
    pub fn permissive() -> Self {
        Self {
            enable_hidden_files: true,
            exclude_filenames: HashSet::new(),
            exclude_extensions: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }

    /// Whether hidden files and directories are considered.
    pub fn hidden_files_enabled(&self) -> bool {
        self.enable_hidden_files
    }

    /// Check if a file should be sorted (not excluded).
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden file filter - if hidden and disabled, exclude
    /// 3. Exact filename match - if matched, exclude
    /// 4. File extension match - if matched, exclude
    /// 5. Glob pattern match - if matched, exclude
    /// 6. Regex pattern match - if matched, exclude
    /// 7. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_include_patterns(file_path) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.matches_exclude_patterns(file_path) {
            return false;
        }

        if self.matches_exclude_regex(&file_name) {
            return false;
        }

        true
    }

    /// Check if the walker may descend into a directory.
    ///
    /// Hidden directories are skipped unless hidden files are enabled, and a
    /// directory whose name or path is excluded is skipped as a whole.
    pub fn should_descend(&self, dir_path: &Path) -> bool {
        if self.matches_include_patterns(dir_path) {
            return true;
        }

        let dir_name = dir_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if !self.enable_hidden_files && dir_name.starts_with('.') {
            return false;
        }

        !self.exclude_filenames.contains(dir_name.as_ref())
            && !self.matches_exclude_patterns(dir_path)
    }

    fn matches_include_patterns(&self, file_path: &Path) -> bool {
        self.include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
    }

    fn matches_exclude_patterns(&self, file_path: &Path) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
    }

    fn matches_exclude_regex(&self, file_name: &str) -> bool {
        self.exclude_regexes
            .iter()
            .any(|regex| regex.is_match(file_name))
    }
}

/// The frozen configuration of one run.
///
/// Build it with [`RunConfig::new`] and the public fields, then call
/// [`RunConfig::validate`] before handing it to the engine.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory whose files are sorted.
    pub source: PathBuf,
    /// Directory under which category folders are created.
    pub dest: PathBuf,
    pub recursive: bool,
    pub dry_run: bool,
    /// Copy files instead of moving them.
    pub copy: bool,
    pub extract_archives: bool,
    pub remove_empty_dirs: bool,
    /// Delete empty directories instead of moving them to the trash.
    pub permanent_trash: bool,
    /// Extension to category overrides, keyed by normalized extension.
    pub overrides: BTreeMap<String, Category>,
    pub archive_formats: Vec<ArchiveFormat>,
    pub filters: FilterRules,
}

impl RunConfig {
    /// A configuration that sorts `source` in place with every option off.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        Self {
            dest: source.clone(),
            source,
            recursive: false,
            dry_run: false,
            copy: false,
            extract_archives: false,
            remove_empty_dirs: false,
            permanent_trash: false,
            overrides: BTreeMap::new(),
            archive_formats: ArchiveFormat::ALL.to_vec(),
            filters: FilterRules::default(),
        }
    }

    /// Applies the filters, overrides and archive formats of a config file.
    pub fn with_file_config(mut self, file: &FileConfig) -> Result<Self, ConfigError> {
        self.overrides = file.category_overrides()?;
        self.archive_formats = file.archive_formats()?;
        self.filters = file.filters.clone();
        Ok(self)
    }

    /// Checks the configuration and resolves its paths.
    ///
    /// The source must be a readable directory. The destination may not exist
    /// yet, it is resolved through its nearest existing ancestor.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.source = match self.source.canonicalize() {
            Ok(path) => path,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::SourceNotFound(self.source));
            }
            Err(e) => {
                return Err(ConfigError::SourceUnreadable {
                    path: self.source,
                    reason: e.to_string(),
                });
            }
        };
        if !self.source.is_dir() {
            return Err(ConfigError::SourceNotDirectory(self.source));
        }
        if let Err(e) = fs::read_dir(&self.source) {
            return Err(ConfigError::SourceUnreadable {
                path: self.source,
                reason: e.to_string(),
            });
        }

        self.dest = resolve_path(&self.dest).map_err(|e| ConfigError::DestinationUnusable {
            path: self.dest.clone(),
            reason: e.to_string(),
        })?;
        if self.dest.exists() && !self.dest.is_dir() {
            return Err(ConfigError::DestinationUnusable {
                path: self.dest,
                reason: "not a directory".to_string(),
            });
        }

        if self.permanent_trash && !self.remove_empty_dirs {
            return Err(ConfigError::ConflictingFlags(
                "--trash only applies together with --remove-empty".to_string(),
            ));
        }
        if self.dest.starts_with(self.trash_dir()) {
            return Err(ConfigError::ConflictingFlags(format!(
                "the destination cannot be inside the {TRASH_DIR_NAME} folder"
            )));
        }

        for (ext, category) in &self.overrides {
            validate_category(ext, category)?;
        }
        CompiledFilters::new(&self.filters)?;

        Ok(self)
    }

    /// Folder receiving trashed empty directories.
    pub fn trash_dir(&self) -> PathBuf {
        self.source.join(TRASH_DIR_NAME)
    }

    /// Folder archives are unpacked into before their members are sorted.
    pub fn staging_root(&self) -> PathBuf {
        self.dest.join(STAGING_DIR_NAME)
    }

    /// The run log file.
    pub fn log_path(&self) -> PathBuf {
        self.source.join(RUN_LOG_NAME)
    }
}

/// Makes `path` absolute, canonicalizing its longest existing prefix.
///
/// Unlike [`Path::canonicalize`] this works for paths that do not exist yet.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();

    loop {
        if let Ok(mut resolved) = existing.canonicalize() {
            for component in missing.iter().rev() {
                resolved.push(component);
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn compile(rules: FilterRules) -> CompiledFilters {
        CompiledFilters::new(&rules).expect("filters should compile")
    }

    fn with_hidden(exclude: ExcludeRules) -> FilterRules {
        FilterRules {
            enable_hidden_files: true,
            exclude,
            include: IncludeRules::default(),
        }
    }

    #[test]
    fn test_default_config_hides_hidden_files() {
        let config = FileConfig::default();
        assert!(!config.filters.enable_hidden_files);
        let compiled = config.compile_filters().unwrap();
        assert!(!compiled.should_include(Path::new(".DS_Store")));
        assert!(!compiled.should_include(Path::new(RUN_LOG_NAME)));
        assert!(!compiled.should_descend(Path::new(".git")));
        assert!(compiled.should_descend(Path::new("photos")));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let compiled = compile(with_hidden(ExcludeRules {
            filenames: vec!["Thumbs.db".to_string()],
            ..Default::default()
        }));
        assert!(!compiled.should_include(Path::new("Thumbs.db")));
        assert!(compiled.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_exclude_extensions_case_insensitive() {
        let compiled = compile(with_hidden(ExcludeRules {
            extensions: vec!["bak".to_string(), ".TMP".to_string()],
            ..Default::default()
        }));
        assert!(!compiled.should_include(Path::new("file.bak")));
        assert!(!compiled.should_include(Path::new("file.tmp")));
        assert!(!compiled.should_include(Path::new("file.BAK")));
        assert!(compiled.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_glob_pattern_directory_boundary_semantics() {
        let compiled = compile(with_hidden(ExcludeRules {
            patterns: vec!["**/logs/**".to_string()],
            ..Default::default()
        }));
        assert!(!compiled.should_include(Path::new("logs/file.txt")));
        assert!(!compiled.should_include(Path::new("app/logs/file.txt")));
        assert!(compiled.should_include(Path::new("my_logs/file.txt")));
    }

    #[test]
    fn test_excluded_directory_is_not_descended() {
        let compiled = compile(with_hidden(ExcludeRules {
            filenames: vec!["node_modules".to_string()],
            patterns: vec!["build".to_string()],
            ..Default::default()
        }));
        assert!(!compiled.should_descend(Path::new("node_modules")));
        assert!(!compiled.should_descend(Path::new("build")));
        assert!(compiled.should_descend(Path::new("src")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let compiled = compile(FilterRules {
            enable_hidden_files: false,
            exclude: ExcludeRules::default(),
            include: IncludeRules {
                patterns: vec![".important".to_string()],
            },
        });
        assert!(compiled.should_include(Path::new(".important")));
        assert!(!compiled.should_include(Path::new(".other")));
    }

    #[test]
    fn test_exclude_regex() {
        let compiled = compile(with_hidden(ExcludeRules {
            regex: vec![r"^test_.*\.txt$".to_string()],
            ..Default::default()
        }));
        assert!(!compiled.should_include(Path::new("test_file.txt")));
        assert!(compiled.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let bad_regex = with_hidden(ExcludeRules {
            regex: vec!["[invalid(".to_string()],
            ..Default::default()
        });
        assert!(matches!(
            CompiledFilters::new(&bad_regex),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = with_hidden(ExcludeRules {
            patterns: vec!["[invalid".to_string()],
            ..Default::default()
        });
        assert!(matches!(
            CompiledFilters::new(&bad_glob),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }

    #[test]
    fn test_parse_full_file_config() {
        let config = FileConfig::parse(
            r#"
            [filters]
            enable_hidden_files = true

            [filters.exclude]
            extensions = ["part"]

            [categories]
            ".LOG" = "Logs"
            ipynb = "code"

            [archives]
            formats = ["zip", "tgz"]
            "#,
        )
        .expect("config should parse");

        assert!(config.filters.enable_hidden_files);
        let overrides = config.category_overrides().expect("overrides");
        assert_eq!(
            overrides.get("log"),
            Some(&Category::Custom("Logs".to_string()))
        );
        assert_eq!(overrides.get("ipynb"), Some(&Category::Code));
        assert_eq!(
            config.archive_formats().expect("formats"),
            vec![ArchiveFormat::Zip, ArchiveFormat::TarGz]
        );
    }

    #[test]
    fn test_default_archive_formats_are_all_formats() {
        let config = FileConfig::parse("").expect("empty config parses");
        assert_eq!(
            config.archive_formats().expect("formats"),
            ArchiveFormat::ALL.to_vec()
        );
    }

    #[test]
    fn test_invalid_category_labels_rejected() {
        for label in ["", "../escape", "a/b", ".hidden"] {
            let mut config = FileConfig::default();
            config.categories.insert("log".to_string(), label.to_string());
            assert!(
                matches!(
                    config.category_overrides(),
                    Err(ConfigError::InvalidCategory { .. })
                ),
                "label {label:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_archive_format_rejected() {
        let config = FileConfig::parse("[archives]\nformats = [\"rar\"]").expect("parse");
        assert!(matches!(
            config.archive_formats(),
            Err(ConfigError::InvalidArchiveFormat(_))
        ));
    }

    #[test]
    fn test_invalid_toml_is_config_invalid() {
        assert!(matches!(
            FileConfig::parse("[filters"),
            Err(ConfigError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let result = FileConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_missing_source() {
        let result = RunConfig::new("/definitely/not/here").validate();
        assert!(matches!(result, Err(ConfigError::SourceNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_file_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").expect("write");
        let result = RunConfig::new(&file).validate();
        assert!(matches!(result, Err(ConfigError::SourceNotDirectory(_))));
    }

    #[test]
    fn test_validate_rejects_trash_without_remove_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut config = RunConfig::new(temp_dir.path());
        config.permanent_trash = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConflictingFlags(_))
        ));
    }

    #[test]
    fn test_validate_rejects_dest_inside_trash() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut config = RunConfig::new(temp_dir.path());
        config.dest = temp_dir.path().join(TRASH_DIR_NAME).join("sorted");
        match config.validate() {
            Err(ConfigError::ConflictingFlags(reason)) => {
                assert_eq!(reason, "the destination cannot be inside the .trashcan folder");
            }
            other => panic!("expected conflicting flags, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_resolves_missing_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut config = RunConfig::new(temp_dir.path());
        config.dest = temp_dir.path().join("sorted").join("nested");
        let config = config.validate().expect("config should validate");

        let canonical_root = temp_dir.path().canonicalize().expect("canonicalize");
        assert_eq!(config.source, canonical_root);
        assert_eq!(config.dest, canonical_root.join("sorted").join("nested"));
        assert!(!config.dest.exists());
    }
}
