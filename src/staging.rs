//! Batch staging on top of [`StatusManager`].
//!
//! Every batch judges each distinct path exactly once and files it under
//! successful, skipped or failed. One path failing never stops the rest of
//! the batch; its error message is kept in [`StagingOperationResult::errors`].

use crate::GitOperationError;
use crate::diff::LineKind;
use crate::git::Git;
use crate::status::{FileStatusEntry, StatusManager};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagingOperation {
    Stage,
    Unstage,
    Toggle,
    StageAll,
    UnstageAll,
    StageModified,
    StageUntracked,
}

impl fmt::Display for StagingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stage => "stage",
            Self::Unstage => "unstage",
            Self::Toggle => "toggle",
            Self::StageAll => "stage all",
            Self::UnstageAll => "unstage all",
            Self::StageModified => "stage modified",
            Self::StageUntracked => "stage untracked",
        })
    }
}

/// Per-path outcome of one batch. The three sets never share a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingOperationResult {
    pub operation: StagingOperation,
    pub successful_files: BTreeSet<String>,
    pub failed_files: BTreeSet<String>,
    pub skipped_files: BTreeSet<String>,
    /// Failure message for every path in `failed_files`
    pub errors: BTreeMap<String, String>,
}

impl StagingOperationResult {
    pub fn new(operation: StagingOperation) -> Self {
        Self {
            operation,
            successful_files: BTreeSet::new(),
            failed_files: BTreeSet::new(),
            skipped_files: BTreeSet::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed_files.is_empty()
    }
}

/// Counts and bulk-action availability for the current status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailedStagingStatus {
    pub total_files: usize,
    pub staged_files: usize,
    pub modified_files: usize,
    pub untracked_files: usize,
    pub can_stage_all: bool,
    pub can_unstage_all: bool,
}

enum Outcome {
    Applied,
    Skipped,
}

fn stage<G: Git>(status: &mut StatusManager<G>, path: &str) -> Result<Outcome, GitOperationError> {
    status.git().execute(&["add", "--", path])?;
    Ok(Outcome::Applied)
}

// `reset` also works before the first commit, unlike `restore --staged`
fn unstage<G: Git>(
    status: &mut StatusManager<G>,
    path: &str,
) -> Result<Outcome, GitOperationError> {
    status.git().execute(&["reset", "-q", "--", path])?;
    Ok(Outcome::Applied)
}

/// Runs staging batches against one repository
pub struct Stager<'a, G: Git> {
    status: &'a mut StatusManager<G>,
}

impl<'a, G: Git> Stager<'a, G> {
    pub fn new(status: &'a mut StatusManager<G>) -> Self {
        Self { status }
    }

    fn run_batch<S: AsRef<str>>(
        &mut self,
        operation: StagingOperation,
        paths: &[S],
        mut attempt: impl FnMut(&mut StatusManager<G>, &str) -> Result<Outcome, GitOperationError>,
    ) -> StagingOperationResult {
        let mut result = StagingOperationResult::new(operation);
        if paths.is_empty() {
            return result;
        }

        let mut seen = HashSet::new();
        for path in paths.iter().map(AsRef::as_ref) {
            if !seen.insert(path) {
                continue;
            }
            match attempt(self.status, path) {
                Ok(Outcome::Applied) => {
                    result.successful_files.insert(path.to_string());
                }
                Ok(Outcome::Skipped) => {
                    result.skipped_files.insert(path.to_string());
                }
                Err(error) => {
                    tracing::debug!(%operation, path, %error, "staging failed");
                    result.failed_files.insert(path.to_string());
                    result.errors.insert(path.to_string(), error.to_string());
                }
            }
        }

        if !result.successful_files.is_empty() || !result.failed_files.is_empty() {
            self.status.invalidate_cache();
        }

        tracing::info!(
            %operation,
            successful = result.successful_files.len(),
            skipped = result.skipped_files.len(),
            failed = result.failed_files.len(),
            "staging batch finished"
        );
        result
    }

    /// Stage every path unconditionally
    pub fn stage_files<S: AsRef<str>>(&mut self, paths: &[S]) -> StagingOperationResult {
        self.run_batch(StagingOperation::Stage, paths, stage)
    }

    /// Unstage every path unconditionally
    pub fn unstage_files<S: AsRef<str>>(&mut self, paths: &[S]) -> StagingOperationResult {
        self.run_batch(StagingOperation::Unstage, paths, unstage)
    }

    /// Stage paths, skipping those that already have staged changes
    pub fn smart_stage_files<S: AsRef<str>>(&mut self, paths: &[S]) -> StagingOperationResult {
        self.run_batch(StagingOperation::Stage, paths, |status, path| {
            match status.file_status(path)? {
                Some(entry) if entry.is_staged() => Ok(Outcome::Skipped),
                _ => stage(status, path),
            }
        })
    }

    /// Unstage paths, skipping those with nothing in the index
    pub fn smart_unstage_files<S: AsRef<str>>(&mut self, paths: &[S]) -> StagingOperationResult {
        self.run_batch(StagingOperation::Unstage, paths, |status, path| {
            match status.file_status(path)? {
                Some(entry) if entry.is_staged() => unstage(status, path),
                _ => Ok(Outcome::Skipped),
            }
        })
    }

    /// Unstage paths that have staged changes and stage the others
    pub fn toggle_files_staging<S: AsRef<str>>(&mut self, paths: &[S]) -> StagingOperationResult {
        self.run_batch(StagingOperation::Toggle, paths, |status, path| {
            match status.file_status(path)? {
                Some(entry) if entry.is_staged() => unstage(status, path),
                _ => stage(status, path),
            }
        })
    }

    fn targets(
        &mut self,
        predicate: fn(&FileStatusEntry) -> bool,
    ) -> Result<Vec<String>, GitOperationError> {
        Ok(self
            .status
            .detailed_status(true)?
            .into_iter()
            .filter(|entry| predicate(entry))
            .map(|entry| entry.path)
            .collect())
    }

    /// Stage every file with worktree changes, untracked content or conflicts
    pub fn stage_all(&mut self) -> Result<StagingOperationResult, GitOperationError> {
        let paths = self.targets(FileStatusEntry::is_stageable)?;
        Ok(self.run_batch(StagingOperation::StageAll, &paths, stage))
    }

    pub fn unstage_all(&mut self) -> Result<StagingOperationResult, GitOperationError> {
        let paths = self.targets(FileStatusEntry::is_staged)?;
        Ok(self.run_batch(StagingOperation::UnstageAll, &paths, unstage))
    }

    /// Stage tracked files with worktree changes, leaving untracked files alone
    pub fn stage_modified(&mut self) -> Result<StagingOperationResult, GitOperationError> {
        let paths = self.targets(FileStatusEntry::has_working_directory_changes)?;
        Ok(self.run_batch(StagingOperation::StageModified, &paths, stage))
    }

    pub fn stage_untracked(&mut self) -> Result<StagingOperationResult, GitOperationError> {
        let paths = self.targets(FileStatusEntry::is_untracked)?;
        Ok(self.run_batch(StagingOperation::StageUntracked, &paths, stage))
    }

    pub fn detailed_staging_status(&mut self) -> Result<DetailedStagingStatus, GitOperationError> {
        let entries = self.status.detailed_status(true)?;
        let count = |predicate: fn(&FileStatusEntry) -> bool| {
            entries.iter().filter(|entry| predicate(entry)).count()
        };

        Ok(DetailedStagingStatus {
            total_files: entries.len(),
            staged_files: count(FileStatusEntry::is_staged),
            modified_files: count(FileStatusEntry::has_working_directory_changes),
            untracked_files: count(FileStatusEntry::is_untracked),
            can_stage_all: entries.iter().any(FileStatusEntry::is_stageable),
            can_unstage_all: entries.iter().any(FileStatusEntry::is_staged),
        })
    }

    /// Stage hunk `index` (zero-based) of the unstaged diff of `path`
    pub fn stage_hunk(&mut self, path: &str, index: usize) -> Result<(), GitOperationError> {
        self.apply_hunk(path, index, false)
    }

    /// Remove hunk `index` (zero-based) of the staged diff of `path` from the
    /// index
    pub fn unstage_hunk(&mut self, path: &str, index: usize) -> Result<(), GitOperationError> {
        self.apply_hunk(path, index, true)
    }

    fn apply_hunk(
        &mut self,
        path: &str,
        index: usize,
        staged: bool,
    ) -> Result<(), GitOperationError> {
        let diff = self.status.diff(&[path], staged)?;
        let file = diff
            .files
            .iter()
            .find(|file| file.path == path)
            .ok_or_else(|| GitOperationError::NoChanges {
                path: path.to_string(),
            })?;
        let hunk = file
            .hunks
            .get(index)
            .ok_or_else(|| GitOperationError::HunkNotFound {
                path: path.to_string(),
                index,
            })?;

        let mut args = vec!["apply", "--cached"];
        if staged {
            args.push("-R");
        }
        // Zero-context hunks (diff -U0) are rejected without this
        if hunk.lines.iter().all(|line| line.kind != LineKind::Context) {
            args.push("--unidiff-zero");
        }
        args.push("-");

        self.status
            .git()
            .execute_with_input(&args, &file.patch_for(hunk))?;
        tracing::debug!(path, index, staged, "hunk applied to index");

        self.status.invalidate_cache();
        Ok(())
    }
}
