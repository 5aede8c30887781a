//! Subprocess runner

use semtag_core::GitError;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Captured output of one git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// A git repository, addressed by its top-level directory.
///
/// Every operation shells out to `git -C <root>`. Values are cheap to clone
/// and are passed explicitly to whatever needs repository access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Open the repository containing `path`.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let probe = Self {
            root: path.to_path_buf(),
        };
        let out = probe.run(&["rev-parse", "--show-toplevel"])?;
        let top = out.stdout.trim();
        if !out.success || top.is_empty() {
            return Err(GitError::NotARepository {
                path: path.display().to_string(),
            });
        }
        Ok(Self {
            root: PathBuf::from(top),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run git and capture output whatever the exit status.
    pub fn run(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Result<GitOutput, GitError> {
        debug!(root = %self.root.display(), args = ?args, "git");
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.root).args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }
        let output = cmd.output().map_err(|e| GitError::Spawn {
            command: command_line(args),
            reason: e.to_string(),
        })?;
        Ok(GitOutput::from_output(output))
    }

    /// Run git and return trimmed stdout, failing on non-zero exit.
    pub fn run_ok(&self, args: &[&str]) -> Result<String, GitError> {
        let out = self.run(args)?;
        if !out.success {
            return Err(GitError::CommandFailed {
                command: command_line(args),
                status: out.status,
                stderr: out.stderr,
            });
        }
        Ok(out.stdout.trim_end().to_string())
    }
}

pub(crate) fn command_line(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        assert_eq!(command_line(&["tag", "-d", "x"]), "git tag -d x");
    }

    #[test]
    fn test_open_outside_repository_fails() {
        if !semtag_test_utils::fixtures::git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let err = GitRepo::open(dir.path()).unwrap_err();
        assert!(matches!(err, GitError::NotARepository { .. }));
    }
}
