use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, u32 as number},
    combinator::{opt, rest},
    sequence::preceded,
};
use std::fmt;

/// What a physical line inside a hunk represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Unchanged line, present on both sides
    Context,
    /// Line only present in the new version
    Added,
    /// Line only present in the old version
    Removed,
    /// `\ No newline at end of file`
    NoNewlineMarker,
}

/// A single line of a hunk with its resolved line numbers
///
/// Context lines carry both numbers, added lines only the new one, removed
/// lines only the old one. The no-newline marker carries neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    /// Line text without its `+`/`-`/` ` marker (the raw line for the no-newline marker)
    pub content: String,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
}

impl DiffLine {
    pub fn context(content: impl Into<String>, old_line: u32, new_line: u32) -> Self {
        Self {
            kind: LineKind::Context,
            content: content.into(),
            old_line: Some(old_line),
            new_line: Some(new_line),
        }
    }

    pub fn added(content: impl Into<String>, new_line: u32) -> Self {
        Self {
            kind: LineKind::Added,
            content: content.into(),
            old_line: None,
            new_line: Some(new_line),
        }
    }

    pub fn removed(content: impl Into<String>, old_line: u32) -> Self {
        Self {
            kind: LineKind::Removed,
            content: content.into(),
            old_line: Some(old_line),
            new_line: None,
        }
    }

    pub fn no_newline_marker(raw: impl Into<String>) -> Self {
        Self {
            kind: LineKind::NoNewlineMarker,
            content: raw.into(),
            old_line: None,
            new_line: None,
        }
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LineKind::Context => write!(f, " {}", self.content),
            LineKind::Added => write!(f, "+{}", self.content),
            LineKind::Removed => write!(f, "-{}", self.content),
            LineKind::NoNewlineMarker => write!(f, "{}", self.content),
        }
    }
}

/// A single hunk from a unified diff
///
/// The header fields are fixed once parsed; only `lines` grows while the
/// hunk is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Trailing text after the closing `@@`, trimmed
    pub context: String,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// Parse a hunk header: `@@ -old_start[,old_count] +new_start[,new_count] @@ context`
    ///
    /// Omitted counts default to 1. Returns `None` when the line does not
    /// match, the caller decides what to do with the content that follows.
    pub fn parse_header(line: &str) -> Option<Self> {
        header(line).ok().map(|(_, hunk)| hunk)
    }

    pub fn additions(&self) -> usize {
        self.count(LineKind::Added)
    }

    pub fn deletions(&self) -> usize {
        self.count(LineKind::Removed)
    }

    fn count(&self, kind: LineKind) -> usize {
        self.lines.iter().filter(|line| line.kind == kind).count()
    }
}

/// Parse a range like "136,0" or "137"
fn range(input: &str) -> IResult<&str, (u32, u32)> {
    (number, opt(preceded(char(','), number)))
        .map(|(start, count)| (start, count.unwrap_or(1)))
        .parse(input)
}

fn header(input: &str) -> IResult<&str, Hunk> {
    (tag("@@ -"), range, tag(" +"), range, tag(" @@"), rest)
        .map(
            |(_, (old_start, old_count), _, (new_start, new_count), _, context)| Hunk {
                old_start,
                old_count,
                new_start,
                new_count,
                context: str::trim(context).to_string(),
                lines: Vec::new(),
            },
        )
        .parse(input)
}

/// An open hunk plus the running old/new line counters
#[derive(Debug)]
pub(crate) struct HunkBuilder {
    hunk: Hunk,
    old_line: u32,
    new_line: u32,
}

impl HunkBuilder {
    pub(crate) fn new(hunk: Hunk) -> Self {
        Self {
            old_line: hunk.old_start,
            new_line: hunk.new_start,
            hunk,
        }
    }

    pub(crate) fn push_context(&mut self, content: &str) {
        self.hunk
            .lines
            .push(DiffLine::context(content, self.old_line, self.new_line));
        self.old_line = self.old_line.saturating_add(1);
        self.new_line = self.new_line.saturating_add(1);
    }

    pub(crate) fn push_added(&mut self, content: &str) {
        self.hunk.lines.push(DiffLine::added(content, self.new_line));
        self.new_line = self.new_line.saturating_add(1);
    }

    pub(crate) fn push_removed(&mut self, content: &str) {
        self.hunk
            .lines
            .push(DiffLine::removed(content, self.old_line));
        self.old_line = self.old_line.saturating_add(1);
    }

    pub(crate) fn push_marker(&mut self, raw: &str) {
        self.hunk.lines.push(DiffLine::no_newline_marker(raw));
    }

    pub(crate) fn finish(self) -> Hunk {
        self.hunk
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )?;
        if !self.context.is_empty() {
            write!(f, " {}", self.context)?;
        }
        writeln!(f)?;

        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }

        Ok(())
    }
}
