//! `git status --porcelain=v1` parsing in two phases.
//!
//! [`parse_porcelain`] is pure: each line becomes either a concrete entry or
//! a directory still waiting to be expanded. [`expand_directories`] then asks
//! git for the files under each directory. Only the second phase does I/O.

use super::entry::{FileStatusEntry, StatusCode};
use crate::git::{Git, list_files, unquote};
use nom::{
    IResult, Parser,
    character::complete::{anychar, char},
    combinator::rest,
};

/// One porcelain line after the pure parsing phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PorcelainItem {
    Entry(FileStatusEntry),
    /// Collapsed directory (path ends with `/`) that still needs expanding
    Directory {
        index_status: StatusCode,
        worktree_status: StatusCode,
        path: String,
    },
}

/// Parse porcelain v1 output. Lines that do not parse are dropped with a
/// warning.
pub fn parse_porcelain(output: &str) -> Vec<PorcelainItem> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let item = parse_line(line);
            if item.is_none() {
                tracing::warn!(line, "dropping unparseable status line");
            }
            item
        })
        .collect()
}

fn status_line(input: &str) -> IResult<&str, (char, char, &str)> {
    (anychar, anychar, char(' '), rest)
        .map(|(x, y, _, path)| (x, y, path))
        .parse(input)
}

fn parse_line(line: &str) -> Option<PorcelainItem> {
    let (_, (x, y, raw_path)) = status_line(line).ok()?;
    let index_status = StatusCode::from_char(x)?;
    let worktree_status = StatusCode::from_char(y)?;
    if raw_path.is_empty() {
        return None;
    }

    let is_move = matches!(index_status, StatusCode::Renamed | StatusCode::Copied)
        || matches!(worktree_status, StatusCode::Renamed | StatusCode::Copied);
    let (original_path, path) = match raw_path.split_once(" -> ") {
        Some((from, to)) if is_move => (Some(unquote(from)), unquote(to)),
        _ => (None, unquote(raw_path)),
    };

    if path.ends_with('/') {
        return Some(PorcelainItem::Directory {
            index_status,
            worktree_status,
            path,
        });
    }

    Some(PorcelainItem::Entry(FileStatusEntry {
        path,
        original_path,
        index_status,
        worktree_status,
    }))
}

/// Resolve directory items into one entry per file under them.
///
/// Untracked directories list `--others --exclude-standard` and every file
/// becomes untracked/unmodified; other directories list tracked files and
/// inherit the directory's status. A failed listing yields no entries for
/// that directory and does not stop the rest.
pub fn expand_directories<G: Git + ?Sized>(
    git: &G,
    items: Vec<PorcelainItem>,
) -> Vec<FileStatusEntry> {
    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        match item {
            PorcelainItem::Entry(entry) => entries.push(entry),
            PorcelainItem::Directory {
                index_status,
                worktree_status,
                path,
            } => {
                let untracked = index_status == StatusCode::Untracked
                    && worktree_status == StatusCode::Untracked;
                let (index_status, worktree_status) = if untracked {
                    (StatusCode::Untracked, StatusCode::Unmodified)
                } else {
                    (index_status, worktree_status)
                };

                match list_files(git, &path, untracked) {
                    Ok(files) => entries.extend(
                        files
                            .into_iter()
                            .map(|file| FileStatusEntry::new(file, index_status, worktree_status)),
                    ),
                    Err(error) => {
                        tracing::warn!(
                            directory = %path,
                            %error,
                            "could not expand directory status"
                        );
                    }
                }
            }
        }
    }

    entries
}
