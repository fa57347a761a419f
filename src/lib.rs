//! autosort - sort files into category folders
//!
//! This library walks a source directory, classifies every file by its
//! extension (or content signature), and moves or copies it into a category
//! folder such as `Images` or `Documents`. Name collisions are resolved with
//! numbered names, archives can be expanded and their contents sorted too,
//! and directories left empty can be trashed or deleted. Every action is
//! recorded in a [`RunReport`].

pub mod archive;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod output;
pub mod pretest;
pub mod report;
pub mod walker;

pub use archive::{ArchiveExpander, ArchiveFormat};
pub use cleanup::CleanupPass;
pub use config::{CompiledFilters, ConfigError, FileConfig, RunConfig};
pub use conflict::ConflictResolver;
pub use engine::{RunContext, Sorter};
pub use error::{CleanupError, FileActionError};
pub use file_category::{Category, Classifier, FileMapper};
pub use file_organizer::FileOrganizer;
pub use output::{ConsoleLogger, Logger, MemoryLogger};
pub use report::{ActionKind, ActionRecord, RunReport, RunSummary};
pub use walker::{FileEntry, Walker};

pub use cli::{Cli, run_cli};
