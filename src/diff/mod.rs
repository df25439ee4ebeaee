pub mod file;
pub mod full;
pub mod hunk;

pub use file::{DiffStatistics, FileDiff};
pub use full::{Diagnostic, DiagnosticKind, Diff};
pub use hunk::{DiffLine, Hunk, LineKind};

/// Format a git diff for user display with explicit line numbers
///
/// Additions show their new line number, deletions their old one and context
/// lines their new one, so any line can be referenced directly.
pub fn format_diff(diff: &Diff) -> String {
    let mut result = String::new();

    for file_diff in &diff.files {
        let stats = &file_diff.statistics;
        result.push_str(&format!(
            "{} (+{} -{}):\n",
            file_diff.path, stats.additions, stats.deletions
        ));

        if file_diff.is_binary {
            result.push_str("  binary file\n\n");
            continue;
        }

        for hunk in &file_diff.hunks {
            for line in &hunk.lines {
                match (line.kind, line.old_line, line.new_line) {
                    (LineKind::Added, _, Some(new)) => {
                        result.push_str(&format!("  +{}:\t{}\n", new, line.content));
                    }
                    (LineKind::Removed, Some(old), _) => {
                        result.push_str(&format!("  -{}:\t{}\n", old, line.content));
                    }
                    (LineKind::Context, _, Some(new)) => {
                        result.push_str(&format!("   {}:\t{}\n", new, line.content));
                    }
                    _ => {
                        result.push_str(&format!("  {}\n", line.content));
                    }
                }
            }

            result.push('\n');
        }
    }

    // Remove trailing newline if present
    if result.ends_with("\n\n") {
        result.pop();
    }

    result
}
