//! Tag refs

use crate::repo::command_line;
use crate::{parse_timestamp, GitRepo};
use semtag_core::{GitError, Timestamp};
use tracing::{info, warn};

const FIELD_SEP: char = '\u{1f}';

/// What `for-each-ref` knows about one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDetails {
    pub name: String,
    pub commit: String,
    pub annotated: bool,
    /// Tagger for annotated tags, commit author otherwise.
    pub author: String,
    pub date: Option<Timestamp>,
    pub message: String,
}

/// Outcome of pushing one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushStatus {
    Pushed,
    /// The remote refused a non-forced update.
    Rejected { reason: String },
}

impl GitRepo {
    /// Commit the tag points at (peeled), or None if the tag is absent.
    pub fn tag_commit(&self, tag: &str) -> Result<Option<String>, GitError> {
        self.peel(&format!("refs/tags/{}", tag))
    }

    pub fn tag_exists(&self, tag: &str) -> Result<bool, GitError> {
        let out = self.run(&[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/tags/{}", tag),
        ])?;
        Ok(out.success)
    }

    /// Tag names under `prefix` (a `/`-separated tag path), sorted by name.
    pub fn list_tags(&self, prefix: &str) -> Result<Vec<String>, GitError> {
        let pattern = if prefix.is_empty() {
            "refs/tags".to_string()
        } else {
            format!("refs/tags/{}", prefix.trim_end_matches('/'))
        };
        let out = self.run_ok(&[
            "for-each-ref",
            "--sort=refname",
            "--format=%(refname:strip=2)",
            &pattern,
        ])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn tag_details(&self, tag: &str) -> Result<Option<TagDetails>, GitError> {
        let Some(commit) = self.tag_commit(tag)? else {
            return Ok(None);
        };
        let format = "--format=%(objecttype)%1f%(taggername)%1f%(taggerdate:iso-strict)%1f%(authorname)%1f%(authordate:iso-strict)%1f%(contents)";
        let refname = format!("refs/tags/{}", tag);
        let args = ["for-each-ref", format, refname.as_str()];
        let raw = self.run_ok(&args)?;
        let fields: Vec<&str> = raw.splitn(6, FIELD_SEP).collect();
        if fields.len() != 6 {
            return Err(GitError::InvalidOutput {
                command: command_line(&args),
                reason: format!("expected 6 fields, got {}", fields.len()),
            });
        }
        let annotated = fields[0] == "tag";
        let (author, date) = if annotated {
            (fields[1], fields[2])
        } else {
            (fields[3], fields[4])
        };
        Ok(Some(TagDetails {
            name: tag.to_string(),
            commit,
            annotated,
            author: author.to_string(),
            date: parse_timestamp(date),
            message: fields[5].trim().to_string(),
        }))
    }

    /// Create an annotated tag. `force` replaces an existing tag.
    pub fn create_annotated_tag(
        &self,
        tag: &str,
        commit: &str,
        message: &str,
        force: bool,
    ) -> Result<(), GitError> {
        let mut args = vec!["tag", "-a"];
        if force {
            args.push("-f");
        }
        args.extend(["-m", message, tag, commit]);
        self.run_ok(&args)?;
        info!(tag, commit, force, "tag written");
        Ok(())
    }

    pub fn delete_tag(&self, tag: &str) -> Result<(), GitError> {
        self.run_ok(&["tag", "-d", tag])?;
        info!(tag, "tag deleted");
        Ok(())
    }

    /// Push one tag. A refused non-forced update comes back as
    /// [`PushStatus::Rejected`]; other failures are errors.
    pub fn push_tag(&self, remote: &str, tag: &str, force: bool) -> Result<PushStatus, GitError> {
        let refspec = format!("refs/tags/{0}:refs/tags/{0}", tag);
        let mut args = vec!["push", "--quiet"];
        if force {
            args.push("--force");
        }
        args.extend([remote, refspec.as_str()]);
        let out = self.run(&args)?;
        if out.success {
            info!(remote, tag, force, "tag pushed");
            return Ok(PushStatus::Pushed);
        }
        if is_rejection(&out.stderr) {
            warn!(remote, tag, stderr = %out.stderr, "remote rejected tag");
            return Ok(PushStatus::Rejected { reason: out.stderr });
        }
        Err(GitError::CommandFailed {
            command: command_line(&args),
            status: out.status,
            stderr: out.stderr,
        })
    }

    pub fn delete_remote_tag(&self, remote: &str, tag: &str) -> Result<(), GitError> {
        let refspec = format!(":refs/tags/{}", tag);
        self.run_ok(&["push", "--quiet", remote, &refspec])?;
        info!(remote, tag, "remote tag deleted");
        Ok(())
    }
}

fn is_rejection(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("[rejected]")
        || lower.contains("already exists")
        || lower.contains("non-fast-forward")
        || lower.contains("would clobber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_detection() {
        assert!(is_rejection(
            " ! [rejected]        components/prompts/a/v1.0.0 -> components/prompts/a/v1.0.0 (already exists)"
        ));
        assert!(!is_rejection("fatal: 'nowhere' does not appear to be a git repository"));
    }
}
