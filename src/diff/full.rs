use super::file::FileDiff;
use super::hunk::{Hunk, HunkBuilder};
use crate::git::unquote;

/// Why a line was set aside while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// `@@` line that does not match the hunk header grammar; content up to
    /// the next marker is dropped
    MalformedHunkHeader,
    /// Hunk header before any `diff --git` marker
    HunkOutsideFile,
}

/// A line the parser could not use, reported instead of failing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line number in the input
    pub line_number: usize,
    pub line: String,
    pub kind: DiagnosticKind,
}

/// A complete git diff containing changes for multiple files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub files: Vec<FileDiff>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Diff {
    /// Parse complete `git diff` output into file records.
    ///
    /// Single forward pass; never fails. Malformed segments are dropped and
    /// reported in [`Diff::diagnostics`].
    pub fn parse(text: &str) -> Self {
        let mut parser = Parser::default();
        for (index, line) in text.split('\n').enumerate() {
            parser.feed(index + 1, line.strip_suffix('\r').unwrap_or(line));
        }
        parser.finish()
    }
}

#[derive(Default)]
struct Parser {
    files: Vec<FileDiff>,
    diagnostics: Vec<Diagnostic>,
    file: Option<FileDiff>,
    hunk: Option<HunkBuilder>,
}

impl Parser {
    fn feed(&mut self, line_number: usize, line: &str) {
        if line.starts_with("diff --git") {
            self.finish_file();
            self.file = Some(FileDiff::from_marker(line));
            return;
        }

        if line.starts_with("@@") {
            self.start_hunk(line_number, line);
            return;
        }

        let Some(file) = self.file.as_mut() else {
            return;
        };

        if self.hunk.is_none() {
            // Extended headers only appear before the first hunk of a section
            if line.starts_with("---") || line.starts_with("+++") {
                return;
            }
            if line.starts_with("new file mode") {
                file.is_new_file = true;
            } else if line.starts_with("deleted file mode") {
                file.is_deleted_file = true;
            } else if let Some(from) = line.strip_prefix("rename from ") {
                file.old_path = Some(unquote(from));
            }
        }

        if line.starts_with("Binary files") {
            file.is_binary = true;
            return;
        }

        let Some(hunk) = self.hunk.as_mut() else {
            return;
        };

        if let Some(content) = line.strip_prefix(' ') {
            hunk.push_context(content);
        } else if let Some(content) = line.strip_prefix('+') {
            hunk.push_added(content);
        } else if let Some(content) = line.strip_prefix('-') {
            hunk.push_removed(content);
        } else if line.starts_with('\\') {
            hunk.push_marker(line);
        }
    }

    fn start_hunk(&mut self, line_number: usize, line: &str) {
        self.finish_hunk();

        if self.file.is_none() {
            tracing::debug!(line_number, "hunk header outside of a file section");
            self.report(line_number, line, DiagnosticKind::HunkOutsideFile);
            return;
        }

        match Hunk::parse_header(line) {
            Some(hunk) => self.hunk = Some(HunkBuilder::new(hunk)),
            None => {
                tracing::debug!(line_number, line, "malformed hunk header");
                self.report(line_number, line, DiagnosticKind::MalformedHunkHeader);
            }
        }
    }

    fn report(&mut self, line_number: usize, line: &str, kind: DiagnosticKind) {
        self.diagnostics.push(Diagnostic {
            line_number,
            line: line.to_string(),
            kind,
        });
    }

    fn finish_hunk(&mut self) {
        if let (Some(builder), Some(file)) = (self.hunk.take(), self.file.as_mut()) {
            file.hunks.push(builder.finish());
        }
    }

    fn finish_file(&mut self) {
        self.finish_hunk();
        if let Some(file) = self.file.take() {
            self.files.push(file.finish());
        }
    }

    fn finish(mut self) -> Diff {
        self.finish_file();
        Diff {
            files: self.files,
            diagnostics: self.diagnostics,
        }
    }
}

impl std::fmt::Display for Diff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for file_diff in &self.files {
            write!(f, "{}", file_diff)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diff::file::DiffStatistics;
    use crate::diff::hunk::{DiffLine, LineKind};
    use similar_asserts::assert_eq;

    #[test]
    fn parse_empty_diff() {
        let diff = Diff::parse("");
        assert_eq!(diff.files.len(), 0);
        assert!(diff.diagnostics.is_empty());
    }

    #[test]
    fn parse_single_file() {
        let text = r#"diff --git a/flake.nix b/flake.nix
index abc1234..def5678 100644
--- a/flake.nix
+++ b/flake.nix
@@ -136,0 +137 @@
+      debug = true;
"#;
        let diff = Diff::parse(text);
        assert_eq!(diff.files.len(), 1);
        assert_eq!(diff.files[0].path, "flake.nix");
        assert_eq!(diff.files[0].hunks.len(), 1);
        assert_eq!(
            diff.files[0].hunks[0].lines,
            vec![DiffLine::added("      debug = true;", 137)]
        );
        assert_eq!(diff.files[0].statistics.additions, 1);
    }

    #[test]
    fn parse_multiple_files_in_order() {
        let text = r#"diff --git a/zsh.nix b/zsh.nix
index 6f2e06d..110fff0 100644
--- a/zsh.nix
+++ b/zsh.nix
@@ -15 +14,0 @@ line 14
-      enableAutosuggestions = true;
diff --git a/flake.nix b/flake.nix
index abc1234..def5678 100644
--- a/flake.nix
+++ b/flake.nix
@@ -136,0 +137 @@
+      debug = true;
diff --git a/gtk.nix b/gtk.nix
index 111..222 100644
--- a/gtk.nix
+++ b/gtk.nix
@@ -11,0 +12 @@
+    gtk.cursorTheme.size = 24;
"#;
        let diff = Diff::parse(text);
        let paths: Vec<_> = diff.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["zsh.nix", "flake.nix", "gtk.nix"]);
        assert_eq!(diff.files[0].hunks[0].context, "line 14");
        assert_eq!(
            diff.files[0].hunks[0].lines,
            vec![DiffLine::removed("      enableAutosuggestions = true;", 15)]
        );
    }

    #[test]
    fn parse_context_lines_carry_both_numbers() {
        let text = "diff --git a/lib.rs b/lib.rs\n\
index 1111111..2222222 100644\n\
--- a/lib.rs\n\
+++ b/lib.rs\n\
@@ -1,3 +1,4 @@ mod tests\n\
\x20use std::fmt;\n\
-use std::io;\n\
+use std::io::{self, Write};\n\
+use std::path::Path;\n\
\x20\n";
        let diff = Diff::parse(text);
        let hunk = &diff.files[0].hunks[0];
        assert_eq!(
            hunk.lines,
            vec![
                DiffLine::context("use std::fmt;", 1, 1),
                DiffLine::removed("use std::io;", 2),
                DiffLine::added("use std::io::{self, Write};", 2),
                DiffLine::added("use std::path::Path;", 3),
                DiffLine::context("", 3, 4),
            ]
        );
        assert_eq!(
            diff.files[0].statistics,
            DiffStatistics {
                additions: 2,
                deletions: 1
            }
        );
    }

    #[test]
    fn parse_multiple_hunks() {
        let text = r#"diff --git a/config.nix b/config.nix
index fa2da6e..41114ff 100644
--- a/config.nix
+++ b/config.nix
@@ -2,0 +3 @@ line 2
+# FIRST INSERTION
@@ -8,0 +10 @@ line 8
+# SECOND INSERTION
"#;
        let diff = Diff::parse(text);
        let file = &diff.files[0];
        assert_eq!(file.hunks.len(), 2);
        assert_eq!(file.hunks[0].new_start, 3);
        assert_eq!(file.hunks[1].old_start, 8);
        assert_eq!(
            file.hunks[1].lines,
            vec![DiffLine::added("# SECOND INSERTION", 10)]
        );
        assert_eq!(file.statistics.total_lines(), 2);
    }

    #[test]
    fn parse_binary_file() {
        let text = concat!(
            "diff --git a/logo.png b/logo.png\n",
            "index 1234567..89abcde 100644\n",
            "Binary files a/logo.png and b/logo.png differ\n",
        );
        let diff = Diff::parse(text);
        assert_eq!(diff.files.len(), 1);
        assert!(diff.files[0].is_binary);
        assert!(diff.files[0].hunks.is_empty());
        assert!(diff.files[0].statistics.is_empty());
    }

    #[test]
    fn parse_new_and_deleted_files() {
        let text = r#"diff --git a/added.txt b/added.txt
new file mode 100644
index 0000000..ce01362
--- /dev/null
+++ b/added.txt
@@ -0,0 +1 @@
+hello
diff --git a/removed.txt b/removed.txt
deleted file mode 100644
index ce01362..0000000
--- a/removed.txt
+++ /dev/null
@@ -1 +0,0 @@
-hello
"#;
        let diff = Diff::parse(text);
        assert!(diff.files[0].is_new_file);
        assert!(!diff.files[0].is_deleted_file);
        assert!(diff.files[1].is_deleted_file);
        assert!(!diff.files[1].is_new_file);
        assert_eq!(diff.files[1].hunks[0].lines, vec![DiffLine::removed("hello", 1)]);
    }

    #[test]
    fn parse_pure_rename_has_no_hunks() {
        let text = r#"diff --git a/old name.rs b/new name.rs
similarity index 100%
rename from old name.rs
rename to new name.rs
"#;
        let diff = Diff::parse(text);
        assert_eq!(diff.files.len(), 1);
        assert_eq!(diff.files[0].old_path.as_deref(), Some("old name.rs"));
        assert!(diff.files[0].hunks.is_empty());
        assert!(diff.files[0].statistics.is_empty());
    }

    #[test]
    fn parse_quoted_section() {
        let text = r#"diff --git "a/say \"hi\".txt" "b/say \"hi\".txt"
index 1111111..2222222 100644
--- "a/say \"hi\".txt"
+++ "b/say \"hi\".txt"
@@ -1 +1 @@
-hello
+hi
"#;
        let diff = Diff::parse(text);
        assert_eq!(diff.files.len(), 1);
        assert_eq!(diff.files[0].path, "say \"hi\".txt");
        assert_eq!(diff.files[0].statistics.total_lines(), 2);
    }

    #[test]
    fn parse_quoted_rename_source() {
        let text = "diff --git \"a/tab\\tname\" b/plain\n\
                    rename from \"tab\\tname\"\n\
                    rename to plain\n";
        let diff = Diff::parse(text);
        assert_eq!(diff.files[0].path, "plain");
        assert_eq!(diff.files[0].old_path.as_deref(), Some("tab\tname"));
    }

    #[test]
    fn parse_removed_line_that_looks_like_header() {
        let text = r#"diff --git a/notes.md b/notes.md
index 1111111..2222222 100644
--- a/notes.md
+++ b/notes.md
@@ -1,2 +1,2 @@
---- horizontal rule
+++++ emphasis
 tail
"#;
        let diff = Diff::parse(text);
        assert_eq!(
            diff.files[0].hunks[0].lines,
            vec![
                DiffLine::removed("--- horizontal rule", 1),
                DiffLine::added("++++ emphasis", 1),
                DiffLine::context("tail", 2, 2),
            ]
        );
    }

    #[test]
    fn parse_no_newline_at_eof_marker() {
        let text = r#"diff --git a/config.nix b/config.nix
index 79e51de..88ee0b1 100644
--- a/config.nix
+++ b/config.nix
@@ -3 +3,2 @@ line 2
-no newline
\ No newline at end of file
+no newline
+new line
\ No newline at end of file
"#;
        let diff = Diff::parse(text);
        let kinds: Vec<_> = diff.files[0].hunks[0]
            .lines
            .iter()
            .map(|l| l.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::Removed,
                LineKind::NoNewlineMarker,
                LineKind::Added,
                LineKind::Added,
                LineKind::NoNewlineMarker,
            ]
        );
        assert_eq!(diff.files[0].statistics.additions, 2);
        assert_eq!(diff.files[0].statistics.deletions, 1);
    }

    #[test]
    fn malformed_hunk_header_drops_its_content() {
        let text = r#"diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1,2 +1,2 @@
-one
+uno
@@ nonsense @@
-two
+dos
@@ -10 +10 @@
-ten
+diez
"#;
        let diff = Diff::parse(text);
        let file = &diff.files[0];
        assert_eq!(file.hunks.len(), 2);
        assert_eq!(file.hunks[0].lines.len(), 2);
        assert_eq!(file.hunks[1].old_start, 10);
        assert_eq!(file.statistics.additions, 2);
        assert_eq!(
            diff.diagnostics,
            vec![Diagnostic {
                line_number: 7,
                line: "@@ nonsense @@".to_string(),
                kind: DiagnosticKind::MalformedHunkHeader,
            }]
        );
    }

    #[test]
    fn hunk_before_any_file_is_reported() {
        let diff = Diff::parse("@@ -1 +1 @@\n-a\n+b\n");
        assert!(diff.files.is_empty());
        assert_eq!(diff.diagnostics[0].kind, DiagnosticKind::HunkOutsideFile);
    }

    #[test]
    fn junk_input_never_fails() {
        let diff = Diff::parse("   \n\n\tnot a diff\n+++\n---\n\\\n");
        assert!(diff.files.is_empty());
        assert!(diff.diagnostics.is_empty());
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let text = concat!(
            "diff --git a/w.txt b/w.txt\r\n",
            "--- a/w.txt\r\n+++ b/w.txt\r\n",
            "@@ -1 +1 @@\r\n-a\r\n+b\r\n",
        );
        let diff = Diff::parse(text);
        assert_eq!(diff.files[0].path, "w.txt");
        assert_eq!(
            diff.files[0].hunks[0].lines,
            vec![DiffLine::removed("a", 1), DiffLine::added("b", 1)]
        );
    }

    #[test]
    fn render_roundtrip_preserves_records() {
        let text = r#"diff --git a/config.nix b/config.nix
--- a/config.nix
+++ b/config.nix
@@ -2,3 +2,3 @@ line 1
 two
+# FIRST INSERTION
 three
-four
@@ -8,0 +10,1 @@ line 8
+# SECOND INSERTION
"#;
        let diff = Diff::parse(text);
        let reparsed = Diff::parse(&diff.to_string());
        assert_eq!(reparsed, diff);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::diff::hunk::LineKind;
    use proptest::prelude::*;

    /// Generate line content
    fn arb_line_content() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::char::range(' ', '~'), 0..20)
            .prop_map(|chars| chars.into_iter().collect())
    }

    fn arb_body_line() -> impl Strategy<Value = (LineKind, String)> {
        (
            prop_oneof![
                Just(LineKind::Context),
                Just(LineKind::Added),
                Just(LineKind::Removed),
            ],
            arb_line_content(),
        )
    }

    /// Generate the text of one file section with 0-3 hunks
    fn arb_file_section(index: usize) -> impl Strategy<Value = String> {
        prop::collection::vec(prop::collection::vec(arb_body_line(), 0..8), 0..4).prop_map(
            move |hunks| {
                let path = format!("dir/file{}.txt", index);
                let mut text = format!(
                    "diff --git a/{0} b/{0}\nindex 1111111..2222222 100644\n--- a/{0}\n+++ b/{0}\n",
                    path
                );
                let mut start = 1;
                for body in hunks {
                    let old_count = body.iter().filter(|(k, _)| *k != LineKind::Added).count();
                    let new_count = body.iter().filter(|(k, _)| *k != LineKind::Removed).count();
                    text.push_str(&format!(
                        "@@ -{},{} +{},{} @@\n",
                        start, old_count, start, new_count
                    ));
                    for (kind, content) in body {
                        let marker = match kind {
                            LineKind::Added => '+',
                            LineKind::Removed => '-',
                            _ => ' ',
                        };
                        text.push(marker);
                        text.push_str(&content);
                        text.push('\n');
                    }
                    start += 100;
                }
                text
            },
        )
    }

    /// Marker, header and content fragments in any order
    const DIFFISH_TEXT: &str = "(diff --git a/x b/x|@@ -1 +1 @@|[ +\\-\\\\@]?[a-z ]{0,8}|\n){0,40}";

    fn arb_diff_text() -> impl Strategy<Value = (usize, String)> {
        (0usize..5).prop_flat_map(|count| {
            (0..count)
                .map(arb_file_section)
                .collect::<Vec<_>>()
                .prop_map(move |sections| (count, sections.concat()))
        })
    }

    proptest! {
        /// N file sections always yield N records in section order
        #[test]
        fn one_record_per_section((count, text) in arb_diff_text()) {
            let diff = Diff::parse(&text);
            prop_assert_eq!(diff.files.len(), count);
            for (index, file) in diff.files.iter().enumerate() {
                prop_assert_eq!(&file.path, &format!("dir/file{}.txt", index));
            }
            prop_assert!(diff.diagnostics.is_empty());
        }

        /// Statistics agree with a direct tally of line kinds
        #[test]
        fn statistics_match_line_kinds((_, text) in arb_diff_text()) {
            for file in Diff::parse(&text).files {
                let lines = file.hunks.iter().flat_map(|h| &h.lines);
                let added = lines.clone().filter(|l| l.kind == LineKind::Added).count();
                let removed = lines.filter(|l| l.kind == LineKind::Removed).count();

                prop_assert_eq!(file.statistics.additions, added);
                prop_assert_eq!(file.statistics.deletions, removed);
                prop_assert_eq!(file.statistics.total_lines(), added + removed);
            }
        }

        /// Added lines never carry an old number, removed lines never a new one
        #[test]
        fn line_numbers_follow_kind((_, text) in arb_diff_text()) {
            for file in Diff::parse(&text).files {
                for line in file.hunks.iter().flat_map(|h| &h.lines) {
                    match line.kind {
                        LineKind::Added => {
                            prop_assert!(line.old_line.is_none() && line.new_line.is_some())
                        }
                        LineKind::Removed => {
                            prop_assert!(line.old_line.is_some() && line.new_line.is_none())
                        }
                        LineKind::Context => {
                            prop_assert!(line.old_line.is_some() && line.new_line.is_some())
                        }
                        LineKind::NoNewlineMarker => {}
                    }
                }
            }
        }

        /// Arbitrary text never panics the parser
        #[test]
        fn arbitrary_text_never_panics(text in DIFFISH_TEXT) {
            let _ = Diff::parse(&text);
        }
    }
}
