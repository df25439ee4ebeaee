use std::path::PathBuf;
use std::time::Duration;

/// How long a full status snapshot is served from the cache
pub const DEFAULT_CACHE_VALIDITY: Duration = Duration::from_secs(1);

/// Settings shared by the git client and the status manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Repository root passed to `git -C`
    pub repo_path: PathBuf,
    /// Executable to invoke, `git` unless overridden
    pub git_program: String,
    pub cache_validity: Duration,
}

impl Config {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git_program = program.into();
        self
    }

    #[must_use]
    pub fn with_cache_validity(mut self, validity: Duration) -> Self {
        self.cache_validity = validity;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            git_program: "git".to_string(),
            cache_validity: DEFAULT_CACHE_VALIDITY,
        }
    }
}
