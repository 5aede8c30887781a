//! Commits, path history and the working tree

use crate::repo::command_line;
use crate::{parse_timestamp, GitRepo};
use semtag_core::{GitError, Timestamp};

const FIELD_SEP: char = '\u{1f}';

/// One commit as seen by `git log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub timestamp: Timestamp,
    pub subject: String,
}

impl GitRepo {
    /// Resolve any revision to a full commit id. None when git cannot.
    pub fn resolve_commit(&self, rev: &str) -> Result<Option<String>, GitError> {
        if rev.starts_with('-') {
            return Ok(None);
        }
        self.peel(rev)
    }

    pub(crate) fn peel(&self, rev: &str) -> Result<Option<String>, GitError> {
        let spec = format!("{}^{{commit}}", rev);
        let out = self.run(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !out.success {
            return Ok(None);
        }
        let id = out.stdout.trim();
        Ok((!id.is_empty()).then(|| id.to_string()))
    }

    pub fn head(&self) -> Result<Option<String>, GitError> {
        self.resolve_commit("HEAD")
    }

    pub fn commit_info(&self, commit: &str) -> Result<CommitInfo, GitError> {
        let args = ["log", "-1", "--format=%H%x1f%aI%x1f%s", commit];
        let raw = self.run_ok(&args)?;
        raw.lines()
            .find_map(parse_log_line)
            .ok_or_else(|| GitError::InvalidOutput {
                command: command_line(&args),
                reason: "no commit line".to_string(),
            })
    }

    /// Commits touching `path`, newest first. Empty for unknown paths.
    pub fn path_log(&self, path: &str) -> Result<Vec<CommitInfo>, GitError> {
        if self.head()?.is_none() {
            return Ok(Vec::new());
        }
        let raw = self.run_ok(&["log", "--format=%H%x1f%aI%x1f%s", "--", path])?;
        Ok(raw.lines().filter_map(parse_log_line).collect())
    }

    /// True if `path` is present in the tree of `commit`.
    pub fn path_exists_at(&self, commit: &str, path: &str) -> Result<bool, GitError> {
        let spec = format!("{}:{}", commit, path);
        Ok(self.run(&["cat-file", "-e", &spec])?.success)
    }

    /// Tracked and untracked-but-not-ignored files that exist on disk,
    /// repo-relative with forward slashes, sorted.
    pub fn list_files(&self) -> Result<Vec<String>, GitError> {
        let raw = self.run_ok(&[
            "ls-files",
            "-z",
            "--cached",
            "--others",
            "--exclude-standard",
        ])?;
        let mut files: Vec<String> = raw
            .split('\0')
            .filter(|p| !p.is_empty())
            .filter(|p| self.root().join(p).is_file())
            .map(|p| p.replace('\\', "/"))
            .collect();
        files.sort();
        files.dedup();
        Ok(files)
    }
}

fn parse_log_line(line: &str) -> Option<CommitInfo> {
    let mut parts = line.splitn(3, FIELD_SEP);
    let id = parts.next()?.trim();
    let timestamp = parse_timestamp(parts.next()?)?;
    let subject = parts.next().unwrap_or("").to_string();
    if id.is_empty() {
        return None;
    }
    Some(CommitInfo {
        id: id.to_string(),
        timestamp,
        subject,
    })
}
