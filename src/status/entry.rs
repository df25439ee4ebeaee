use std::fmt;

/// One side (index or working tree) of a porcelain status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Unmodified,
    Modified,
    TypeChanged,
    Added,
    Deleted,
    Renamed,
    Copied,
    /// Updated but unmerged
    Unmerged,
    Untracked,
    Ignored,
}

impl StatusCode {
    /// Map a porcelain v1 status character
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            ' ' | '.' => Self::Unmodified,
            'M' => Self::Modified,
            'T' => Self::TypeChanged,
            'A' => Self::Added,
            'D' => Self::Deleted,
            'R' => Self::Renamed,
            'C' => Self::Copied,
            'U' => Self::Unmerged,
            '?' => Self::Untracked,
            '!' => Self::Ignored,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Unmodified => ' ',
            Self::Modified => 'M',
            Self::TypeChanged => 'T',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Unmerged => 'U',
            Self::Untracked => '?',
            Self::Ignored => '!',
        }
    }

    /// No change recorded on this side
    fn is_clean(self) -> bool {
        matches!(self, Self::Unmodified | Self::Untracked | Self::Ignored)
    }
}

/// Index and working-tree state of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatusEntry {
    pub path: String,
    /// Rename or copy source
    pub original_path: Option<String>,
    pub index_status: StatusCode,
    pub worktree_status: StatusCode,
}

impl FileStatusEntry {
    pub fn new(
        path: impl Into<String>,
        index_status: StatusCode,
        worktree_status: StatusCode,
    ) -> Self {
        Self {
            path: path.into(),
            original_path: None,
            index_status,
            worktree_status,
        }
    }

    /// Both sides of a merge conflict (`UU`, `AA`, `DD`, `AU`, ...)
    pub fn has_conflicts(&self) -> bool {
        use StatusCode::*;
        matches!(
            (self.index_status, self.worktree_status),
            (Unmerged, _) | (_, Unmerged) | (Added, Added) | (Deleted, Deleted)
        )
    }

    /// Changes recorded in the index
    pub fn is_staged(&self) -> bool {
        !self.has_conflicts() && !self.index_status.is_clean()
    }

    /// Tracked changes not yet in the index
    pub fn has_working_directory_changes(&self) -> bool {
        !self.has_conflicts() && !self.worktree_status.is_clean()
    }

    pub fn is_untracked(&self) -> bool {
        self.index_status == StatusCode::Untracked || self.worktree_status == StatusCode::Untracked
    }

    /// Everything about this file is already in the index
    pub fn is_fully_staged(&self) -> bool {
        self.is_staged() && !self.has_working_directory_changes()
    }

    /// Something `git add` would change: worktree edits, an untracked file or
    /// a conflict to mark resolved
    pub fn is_stageable(&self) -> bool {
        self.has_working_directory_changes() || self.is_untracked() || self.has_conflicts()
    }
}

impl fmt::Display for FileStatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} ",
            self.index_status.as_char(),
            self.worktree_status.as_char()
        )?;
        if let Some(original) = &self.original_path {
            write!(f, "{} -> ", original)?;
        }
        write!(f, "{}", self.path)
    }
}
