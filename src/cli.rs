//! Command-line interface module for autosort.
//!
//! This module handles:
//! - Argument parsing
//! - Loading the configuration file and merging it with flags
//! - Running the sorter or the pretest generator

use crate::config::{ConfigError, FileConfig, RunConfig};
use crate::engine::Sorter;
use crate::output::{ConsoleLogger, OutputFormatter};
use crate::pretest;
use clap::Parser;
use std::path::PathBuf;

/// Automatically sort files into category folders.
#[derive(Debug, Clone, Parser)]
#[command(name = "autosort", version, about)]
pub struct Cli {
    /// Source directory
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Destination root for category folders (defaults to --path)
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Show what would happen without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Copy files instead of moving them
    #[arg(long)]
    pub copy: bool,

    /// Extract archives after sorting them
    #[arg(long)]
    pub extract: bool,

    /// Remove directories left empty, moving them to .trashcan
    #[arg(long)]
    pub remove_empty: bool,

    /// Delete empty directories permanently instead of trashing them
    #[arg(long, requires = "remove_empty")]
    pub trash: bool,

    /// Create a bunch of unsorted files in --path and exit
    #[arg(long)]
    pub pretest: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only print the summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase diagnostic output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Builds the run configuration from the flags and a configuration file.
    pub fn into_run_config(self, file: &FileConfig) -> Result<RunConfig, ConfigError> {
        let mut config = RunConfig::new(&self.path).with_file_config(file)?;
        config.dest = self.dest.unwrap_or(self.path);
        config.recursive = self.recursive;
        config.dry_run = self.dry_run;
        config.copy = self.copy;
        config.extract_archives = self.extract;
        config.remove_empty_dirs = self.remove_empty;
        config.permanent_trash = self.trash;
        Ok(config)
    }

    /// The `tracing` level selected by `--verbose`.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Runs the CLI application with parsed arguments.
///
/// Returns an error only when the run cannot start. Failures of individual
/// files are reported in the output and do not fail the run.
///
/// # Examples
///
/// ```no_run
/// use autosort::cli::{Cli, run_cli};
/// use clap::Parser;
///
/// let cli = Cli::parse_from(["autosort", "--path", "/home/user/Downloads", "--dry-run"]);
/// if let Err(e) = run_cli(cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: Cli) -> Result<(), ConfigError> {
    if cli.pretest {
        let created = pretest::populate(&cli.path).map_err(|e| ConfigError::SourceUnreadable {
            path: cli.path.clone(),
            reason: e.to_string(),
        })?;
        OutputFormatter::success(&format!(
            "Created {} pretest files in {}",
            created.len(),
            cli.path.display()
        ));
        return Ok(());
    }

    let file_config = FileConfig::load(cli.config.as_deref())?;
    let quiet = cli.quiet;
    let config = cli.into_run_config(&file_config)?;

    if !quiet {
        let mode = if config.copy { "Copying" } else { "Sorting" };
        OutputFormatter::info(&format!(
            "{} contents of: {}",
            mode,
            config.source.display()
        ));
        if config.dry_run {
            OutputFormatter::dry_run_notice("Nothing will be changed.");
        }
    }

    let logger = ConsoleLogger::new(quiet, config.dry_run);
    Sorter::new(&logger).run(config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_category::Category;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["autosort"]);
        assert_eq!(cli.path, PathBuf::from("."));
        assert!(cli.dest.is_none());
        assert!(!cli.recursive && !cli.dry_run && !cli.copy);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_all_flags_map_to_run_config() {
        let cli = Cli::parse_from([
            "autosort",
            "-p",
            "/in",
            "-d",
            "/out",
            "-r",
            "--dry-run",
            "--copy",
            "--extract",
            "--remove-empty",
            "--trash",
            "-vv",
        ]);
        assert_eq!(cli.log_level(), "debug");

        let config = cli
            .into_run_config(&FileConfig::default())
            .expect("config");
        assert_eq!(config.source, PathBuf::from("/in"));
        assert_eq!(config.dest, PathBuf::from("/out"));
        assert!(config.recursive && config.dry_run && config.copy);
        assert!(config.extract_archives && config.remove_empty_dirs && config.permanent_trash);
    }

    #[test]
    fn test_dest_defaults_to_path() {
        let cli = Cli::parse_from(["autosort", "--path", "/in"]);
        let config = cli
            .into_run_config(&FileConfig::default())
            .expect("config");
        assert_eq!(config.dest, PathBuf::from("/in"));
    }

    #[test]
    fn test_trash_requires_remove_empty() {
        let result = Cli::try_parse_from(["autosort", "--trash"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_file_config_overrides_flow_into_run_config() {
        let file = FileConfig::parse("[categories]\nlog = \"Logs\"").expect("parse");
        let config = Cli::parse_from(["autosort"])
            .into_run_config(&file)
            .expect("config");
        assert_eq!(
            config.overrides.get("log"),
            Some(&Category::Custom("Logs".to_string()))
        );
    }
}
