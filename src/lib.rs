//! Unified-diff parsing and git status/staging orchestration.
//!
//! Raw `git diff` and `git status --porcelain=v1` text goes in, strict
//! records come out:
//!
//! - [`Diff::parse`] turns multi-file unified diff text into [`FileDiff`]
//!   records with numbered lines and per-file statistics.
//! - [`StatusManager`] parses porcelain status (expanding collapsed
//!   directories), keeps a short-lived cache and answers derived queries.
//! - [`Stager`] runs batches of stage/unstage operations and reports every
//!   file as successful, skipped or failed.
//!
//! The `git` executable itself sits behind the [`Git`] trait; [`GitCli`] is
//! the subprocess implementation.
//!
//! ```no_run
//! # use diffstage::{Config, Stager};
//! let mut status = diffstage::open(&Config::new("."));
//! let summary = status.status_summary()?;
//! println!("{} staged, {} untracked", summary.staged_files, summary.untracked_files);
//!
//! let result = Stager::new(&mut status).smart_stage_files(&["src/lib.rs", "README.md"]);
//! for path in &result.failed_files {
//!     eprintln!("could not stage {path}: {}", result.errors[path]);
//! }
//! # Ok::<(), diffstage::GitOperationError>(())
//! ```

use error_set::error_set;

pub mod config;
pub mod diff;
pub mod git;
pub mod staging;
pub mod status;

pub use config::Config;
pub use diff::{
    Diagnostic, DiagnosticKind, Diff, DiffLine, DiffStatistics, FileDiff, Hunk, LineKind,
    format_diff,
};
pub use git::{Git, GitCli, list_files};
pub use staging::{DetailedStagingStatus, Stager, StagingOperation, StagingOperationResult};
pub use status::{
    FileStatusEntry, GitStatusSummary, StatusCache, StatusCode, StatusEvent, StatusManager,
};

error_set! {
    /// Failure of a status, diff or staging operation
    GitOperationError := {
        #[display("No changes found for {path}")]
        NoChanges { path: String },
        #[display("{path} has no hunk {index}")]
        HunkNotFound { path: String, index: usize },
    } || GitCommandError

    /// Errors from git command execution
    GitCommandError := {
        #[display("Failed to run git {command}: {message}")]
        SpawnFailed { command: String, message: String },
        #[display("git {command} failed: {stderr}")]
        ExitError { command: String, stderr: String },
        #[display("Invalid UTF-8 in git {command} output: {message}")]
        InvalidUtf8 { command: String, message: String },
        #[display("Failed to get stdin handle for git {command}")]
        StdinUnavailable { command: String },
        #[display("Failed to write input to git {command}: {message}")]
        WriteFailed { command: String, message: String },
        #[display("Failed to wait for git {command}: {message}")]
        WaitFailed { command: String, message: String },
    }
}

/// Status manager for the repository at `config.repo_path`, backed by the
/// `git` command-line client
pub fn open(config: &Config) -> StatusManager<GitCli> {
    StatusManager::with_config(GitCli::from_config(config), config)
}
