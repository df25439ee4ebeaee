//! The boundary to the `git` executable.
//!
//! Everything above this module sees git as "arguments in, stdout out". The
//! [`Git`] trait is the whole contract; [`list_files`] is a helper written
//! against it rather than a trait method so test doubles only implement the
//! two primitives.

use crate::GitCommandError;
use crate::config::Config;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// Runs git subcommands against one repository
pub trait Git {
    /// Run git with `args` and return its captured standard output
    fn execute(&self, args: &[&str]) -> Result<String, GitCommandError>;

    /// Run git with `args`, writing `input` to its standard input
    fn execute_with_input(&self, args: &[&str], input: &str) -> Result<String, GitCommandError>;
}

impl<G: Git + ?Sized> Git for &G {
    fn execute(&self, args: &[&str]) -> Result<String, GitCommandError> {
        (**self).execute(args)
    }

    fn execute_with_input(&self, args: &[&str], input: &str) -> Result<String, GitCommandError> {
        (**self).execute_with_input(args, input)
    }
}

/// List every file under `scope`, either tracked files or untracked
/// non-ignored ones.
pub fn list_files<G: Git + ?Sized>(
    git: &G,
    scope: &str,
    only_untracked: bool,
) -> Result<Vec<String>, GitCommandError> {
    let mut args = vec!["ls-files"];
    if only_untracked {
        args.extend(["--others", "--exclude-standard"]);
    }
    args.extend(["--", scope]);

    Ok(git
        .execute(&args)?
        .lines()
        .filter(|line| !line.is_empty())
        .map(unquote)
        .collect())
}

/// Undo git's C-style path quoting (`"dir/a \"b\".txt"`, octal escapes for
/// non-ASCII bytes). Unquoted input is returned as is.
pub(crate) fn unquote(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return raw.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('r') => bytes.push(b'\r'),
            Some('a') => bytes.push(0x07),
            Some('b') => bytes.push(0x08),
            Some('f') => bytes.push(0x0c),
            Some('v') => bytes.push(0x0b),
            Some(digit @ '0'..='7') => {
                let mut value = digit as u32 - '0' as u32;
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&next @ '0'..='7') => {
                            value = value * 8 + (next as u32 - '0' as u32);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            Some(other) => {
                let mut buf = [0; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

/// Git quotes a path containing a double quote, a backslash or a control
/// character, even with `core.quotePath=false`
pub(crate) fn needs_quoting(path: &str) -> bool {
    path.chars().any(|c| c == '"' || c == '\\' || c.is_ascii_control())
}

/// C-style quote `path` the way git does, inverse of [`unquote`]
pub(crate) fn quote(path: &str) -> String {
    let mut quoted = String::with_capacity(path.len() + 2);
    quoted.push('"');
    for c in path.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_ascii_control() => quoted.push_str(&format!("\\{:03o}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// [`Git`] implemented by spawning the git executable
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
    program: String,
}

impl GitCli {
    /// Create a client for the repository at `repo_path`
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            program: "git".to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            repo_path: config.repo_path.clone(),
            program: config.git_program.clone(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-C")
            .arg(&self.repo_path)
            .args(["-c", "core.quotePath=false"])
            .args(args)
            // Read-only commands must not take the index lock
            .env("GIT_OPTIONAL_LOCKS", "0");
        command
    }

    fn finish(&self, subcommand: &str, output: Output) -> Result<String, GitCommandError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::ExitError {
                command: subcommand.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| GitCommandError::InvalidUtf8 {
            command: subcommand.to_string(),
            message: e.to_string(),
        })
    }
}

fn subcommand<'a>(args: &[&'a str]) -> &'a str {
    args.first().copied().unwrap_or("")
}

impl Git for GitCli {
    fn execute(&self, args: &[&str]) -> Result<String, GitCommandError> {
        let subcommand = subcommand(args);
        tracing::debug!(repo = %self.repo_path.display(), ?args, "running git");

        let output =
            self.command(args)
                .output()
                .map_err(|e| GitCommandError::SpawnFailed {
                    command: subcommand.to_string(),
                    message: e.to_string(),
                })?;

        self.finish(subcommand, output)
    }

    fn execute_with_input(&self, args: &[&str], input: &str) -> Result<String, GitCommandError> {
        let subcommand = subcommand(args);
        tracing::debug!(
            repo = %self.repo_path.display(),
            ?args,
            bytes = input.len(),
            "running git with input"
        );

        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GitCommandError::SpawnFailed {
                command: subcommand.to_string(),
                message: e.to_string(),
            })?;

        // Dropping the handle closes stdin so git sees EOF
        child
            .stdin
            .take()
            .ok_or_else(|| GitCommandError::StdinUnavailable {
                command: subcommand.to_string(),
            })?
            .write_all(input.as_bytes())
            .map_err(|e| GitCommandError::WriteFailed {
                command: subcommand.to_string(),
                message: e.to_string(),
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| GitCommandError::WaitFailed {
                command: subcommand.to_string(),
                message: e.to_string(),
            })?;

        self.finish(subcommand, output)
    }
}
