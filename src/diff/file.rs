use super::hunk::{Hunk, LineKind};
use crate::git::{needs_quoting, quote, unquote};
use std::fmt;

/// Line counts for one file, always derived from its hunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStatistics {
    pub additions: usize,
    pub deletions: usize,
}

impl DiffStatistics {
    /// Tally added/removed lines across the given hunks.
    ///
    /// Context lines and no-newline markers do not count.
    pub fn from_hunks(hunks: &[Hunk]) -> Self {
        hunks
            .iter()
            .flat_map(|hunk| &hunk.lines)
            .fold(Self::default(), |mut stats, line| {
                match line.kind {
                    LineKind::Added => stats.additions += 1,
                    LineKind::Removed => stats.deletions += 1,
                    LineKind::Context | LineKind::NoNewlineMarker => {}
                }
                stats
            })
    }

    pub fn total_lines(&self) -> usize {
        self.additions + self.deletions
    }

    pub fn is_empty(&self) -> bool {
        self.additions == 0 && self.deletions == 0
    }
}

/// A complete diff for a single file.
///
/// Contains all hunks (change blocks) for one file from a git diff, in the
/// order they appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// File path taken from the `diff --git` marker, `a/`/`b/` prefix stripped
    pub path: String,
    /// Source path when the section carries a `rename from` header
    pub old_path: Option<String>,
    /// All hunks for this file
    pub hunks: Vec<Hunk>,
    pub is_binary: bool,
    pub is_new_file: bool,
    pub is_deleted_file: bool,
    /// Computed once by [`FileDiff::finish`], never touched while lines accumulate
    pub statistics: DiffStatistics,
}

impl FileDiff {
    /// Start an empty record for the section introduced by `marker`
    pub fn from_marker(marker: &str) -> Self {
        Self {
            path: path_from_marker(marker),
            old_path: None,
            hunks: Vec::new(),
            is_binary: false,
            is_new_file: false,
            is_deleted_file: false,
            statistics: DiffStatistics::default(),
        }
    }

    /// Seal the record: statistics are computed from the final hunk list.
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.statistics = DiffStatistics::from_hunks(&self.hunks);
        self
    }

    /// Render a patch containing only `hunk`, suitable for `git apply --cached`.
    pub fn patch_for(&self, hunk: &Hunk) -> String {
        let mut patch = String::new();
        self.push_headers(&mut patch);
        patch.push_str(&hunk.to_string());
        patch
    }

    fn push_headers(&self, out: &mut String) {
        let old_side = side("a/", self.old_path.as_deref().unwrap_or(&self.path));
        let new_side = side("b/", &self.path);

        out.push_str(&format!("diff --git {} {}\n", old_side, new_side));
        if self.is_new_file {
            out.push_str("--- /dev/null\n");
        } else {
            out.push_str(&format!("--- {}\n", old_side));
        }
        if self.is_deleted_file {
            out.push_str("+++ /dev/null\n");
        } else {
            out.push_str(&format!("+++ {}\n", new_side));
        }
    }
}

/// Extract the file path from a `diff --git a/<path> b/<path>` marker.
///
/// C-quoted sides (`"a/say \\"hi\\".txt"`) are unquoted first. The
/// symmetric form is taken whole so paths containing spaces survive.
/// Anything else falls back to the fourth whitespace-separated token, and a
/// marker with fewer than four tokens yields `"unknown"`.
fn path_from_marker(marker: &str) -> String {
    if let Some(rest) = marker.strip_prefix("diff --git ") {
        if rest.contains('"') {
            if let Some((_, new)) = quoted_sides(rest) {
                return strip_side_prefix(&new).to_string();
            }
        }
        if let Some(path) = symmetric_path(rest) {
            return path.to_string();
        }
    }

    match marker.split_whitespace().nth(3) {
        Some(token) => strip_side_prefix(token).to_string(),
        None => "unknown".to_string(),
    }
}

/// `a/P b/P` -> `P`
fn symmetric_path(rest: &str) -> Option<&str> {
    let len = rest.len();
    if len < 5 || (len - 5) % 2 != 0 {
        return None;
    }
    let path_len = (len - 5) / 2;
    let old = rest.strip_prefix("a/")?.get(..path_len)?;
    let new = rest.get(path_len + 2..)?.strip_prefix(" b/")?;
    (old == new && !old.is_empty()).then_some(new)
}

/// Split a marker tail where at least one side is C-quoted
fn quoted_sides(rest: &str) -> Option<(String, String)> {
    let (old, tail) = take_side(rest)?;
    let (new, tail) = take_side(tail.strip_prefix(' ')?)?;
    tail.is_empty().then_some((old, new))
}

fn take_side(input: &str) -> Option<(String, &str)> {
    if !input.starts_with('"') {
        let end = input.find(" \"").unwrap_or(input.len());
        return Some((input[..end].to_string(), &input[end..]));
    }

    let mut escaped = false;
    for (i, c) in input.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some((unquote(&input[..=i]), &input[i + 1..])),
            _ => {}
        }
    }
    None
}

/// `prefix` + `path`, C-quoted when git would quote it
fn side(prefix: &str, path: &str) -> String {
    let full = format!("{}{}", prefix, path);
    if needs_quoting(&full) {
        quote(&full)
    } else {
        full
    }
}

fn strip_side_prefix(token: &str) -> &str {
    token
        .strip_prefix("a/")
        .or_else(|| token.strip_prefix("b/"))
        .unwrap_or(token)
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut headers = String::new();
        self.push_headers(&mut headers);
        write!(f, "{}", headers)?;

        if self.is_binary {
            let old_path = self.old_path.as_deref().unwrap_or(&self.path);
            writeln!(
                f,
                "Binary files {} and {} differ",
                side("a/", old_path),
                side("b/", &self.path)
            )?;
        }

        for hunk in &self.hunks {
            write!(f, "{}", hunk)?;
        }

        Ok(())
    }
}
