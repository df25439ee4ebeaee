use super::cache::StatusCache;
use super::entry::FileStatusEntry;
use super::parse::{expand_directories, parse_porcelain};
use crate::GitOperationError;
use crate::config::{Config, DEFAULT_CACHE_VALIDITY};
use crate::diff::Diff;
use crate::git::Git;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

const STATUS_ARGS: [&str; 3] = ["status", "--porcelain=v1", "--untracked-files=normal"];

/// Aggregate counts over the current status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GitStatusSummary {
    pub total_files: usize,
    pub staged_files: usize,
    pub unstaged_files: usize,
    pub untracked_files: usize,
    pub conflicted_files: usize,
}

impl GitStatusSummary {
    fn from_entries(entries: &[FileStatusEntry]) -> Self {
        let count = |predicate: fn(&FileStatusEntry) -> bool| {
            entries.iter().filter(|entry| predicate(entry)).count()
        };
        Self {
            total_files: entries.len(),
            staged_files: count(FileStatusEntry::is_staged),
            unstaged_files: count(FileStatusEntry::has_working_directory_changes),
            untracked_files: count(FileStatusEntry::is_untracked),
            conflicted_files: count(FileStatusEntry::has_conflicts),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.total_files == 0
    }
}

/// Sent to subscribers whenever the cached status changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Full reload finished with this many entries
    Refreshed { files: usize },
    /// One path was re-queried
    FileUpdated { path: String },
    Invalidated,
}

/// Owns the status cache for one repository and answers status queries
/// through it.
///
/// Every method takes `&mut self`, so a full refresh and a single-file
/// refresh never interleave. A manager shared across threads behind a lock
/// keeps last-write-wins semantics: a stale single-file result may overwrite
/// a newer full snapshot until the next refresh.
pub struct StatusManager<G: Git> {
    git: G,
    cache: StatusCache,
    cache_validity: Duration,
    subscribers: Vec<Sender<StatusEvent>>,
}

impl<G: Git> StatusManager<G> {
    pub fn new(git: G) -> Self {
        Self {
            git,
            cache: StatusCache::new(),
            cache_validity: DEFAULT_CACHE_VALIDITY,
            subscribers: Vec::new(),
        }
    }

    pub fn with_config(git: G, config: &Config) -> Self {
        Self {
            cache_validity: config.cache_validity,
            ..Self::new(git)
        }
    }

    pub fn git(&self) -> &G {
        &self.git
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// Receive a [`StatusEvent`] for every later cache change. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<StatusEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: StatusEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Every changed file, sorted by path.
    ///
    /// With `use_cache` a snapshot younger than the validity window is
    /// returned without running git.
    pub fn detailed_status(
        &mut self,
        use_cache: bool,
    ) -> Result<Vec<FileStatusEntry>, GitOperationError> {
        if use_cache && self.cache.is_valid(self.cache_validity) {
            tracing::debug!(files = self.cache.len(), "status cache hit");
            return Ok(self.cache.ordered());
        }

        let output = self.git.execute(&STATUS_ARGS)?;
        let entries = expand_directories(&self.git, parse_porcelain(&output));
        self.cache.replace(entries);
        tracing::debug!(files = self.cache.len(), "status cache refreshed");

        let files = self.cache.len();
        self.notify(StatusEvent::Refreshed { files });
        Ok(self.cache.ordered())
    }

    /// Status of one path, or `None` when git reports nothing for it.
    ///
    /// A miss runs a status query scoped to `path` and updates only that
    /// entry in the cache.
    pub fn file_status(
        &mut self,
        path: &str,
    ) -> Result<Option<FileStatusEntry>, GitOperationError> {
        if self.cache.is_valid(self.cache_validity) {
            if let Some(entry) = self.cache.get(path) {
                return Ok(Some(entry.clone()));
            }
        }

        let mut args = STATUS_ARGS.to_vec();
        args.extend(["--", path]);
        let output = self.git.execute(&args)?;
        let entries = expand_directories(&self.git, parse_porcelain(&output));

        let found = entries.iter().find(|entry| entry.path == path).cloned();
        if found.is_none() {
            self.cache.remove(path);
        }
        for entry in entries {
            self.cache.upsert(entry);
        }
        tracing::debug!(path, found = found.is_some(), "file status refreshed");

        self.notify(StatusEvent::FileUpdated {
            path: path.to_string(),
        });
        Ok(found)
    }

    fn filtered(
        &mut self,
        predicate: fn(&FileStatusEntry) -> bool,
    ) -> Result<Vec<FileStatusEntry>, GitOperationError> {
        Ok(self
            .detailed_status(true)?
            .into_iter()
            .filter(|entry| predicate(entry))
            .collect())
    }

    pub fn staged_files(&mut self) -> Result<Vec<FileStatusEntry>, GitOperationError> {
        self.filtered(FileStatusEntry::is_staged)
    }

    pub fn unstaged_files(&mut self) -> Result<Vec<FileStatusEntry>, GitOperationError> {
        self.filtered(FileStatusEntry::has_working_directory_changes)
    }

    pub fn untracked_files(&mut self) -> Result<Vec<FileStatusEntry>, GitOperationError> {
        self.filtered(FileStatusEntry::is_untracked)
    }

    pub fn conflicted_files(&mut self) -> Result<Vec<FileStatusEntry>, GitOperationError> {
        self.filtered(FileStatusEntry::has_conflicts)
    }

    pub fn status_summary(&mut self) -> Result<GitStatusSummary, GitOperationError> {
        Ok(GitStatusSummary::from_entries(&self.detailed_status(true)?))
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
        tracing::debug!("status cache invalidated");
        self.notify(StatusEvent::Invalidated);
    }

    /// Invalidate, then reload without the cache
    pub fn refresh_cache(&mut self) -> Result<Vec<FileStatusEntry>, GitOperationError> {
        self.invalidate_cache();
        self.detailed_status(false)
    }

    /// Parsed `git diff` for `paths` (everything when empty), against the
    /// index or, with `staged`, the index against HEAD
    pub fn diff<S: AsRef<str>>(
        &self,
        paths: &[S],
        staged: bool,
    ) -> Result<Diff, GitOperationError> {
        let mut args = vec!["diff"];
        if staged {
            args.push("--cached");
        }
        args.extend(["--no-ext-diff", "--no-color", "--"]);
        args.extend(paths.iter().map(AsRef::as_ref));

        let output = self.git.execute(&args)?;
        Ok(Diff::parse(&output))
    }
}
