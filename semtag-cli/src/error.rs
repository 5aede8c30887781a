//! Error types for the CLI.

use semtag_core::{
    ConfigError, GitError, ReconcileError, RegistryError, SemtagError, TagError, ValidationError,
};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Semtag(#[from] SemtagError),
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

impl From<ReconcileError> for CliError {
    fn from(e: ReconcileError) -> Self {
        CliError::Semtag(e.into())
    }
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Suggestions printed under the error line.
    pub fn hints(&self) -> Vec<&'static str> {
        let CliError::Semtag(err) = self else {
            return Vec::new();
        };
        match err {
            SemtagError::Tag(TagError::TagAlreadyExists { .. }) => {
                vec!["version tags are immutable; release a higher version instead"]
            }
            SemtagError::Tag(TagError::InvalidVersion { .. }) => {
                vec!["versions look like 1.2.3, v1.2.3 or 1.2.3-rc.1"]
            }
            SemtagError::Tag(TagError::InvalidEnvironment { .. }) => vec![
                "environment names use lowercase letters, digits and hyphens",
                "an environment name must not look like a version",
            ],
            SemtagError::Tag(TagError::TagNotFound { .. }) => {
                vec!["run `semtag tag list <component>` to see existing tags"]
            }
            SemtagError::Tag(TagError::ReferenceNotFound { .. }) => vec![
                "a reference is a version (v1.2.0), an environment (prod), a branch or a commit id",
                "run `semtag tag list <component>` to see existing tags",
            ],
            SemtagError::Tag(TagError::ImmutableTagRejected { .. }) => {
                vec!["pass --force to overwrite the tag on the remote"]
            }
            SemtagError::Tag(TagError::MalformedTag { .. }) => {
                vec!["tags look like components/<type>/<name>/<version-or-env>"]
            }
            SemtagError::Registry(RegistryError::ComponentNotFound { .. }) => vec![
                "run `semtag list` to see registered components",
                "register a file with `semtag add <path>` or `semtag resync`",
            ],
            SemtagError::Registry(RegistryError::Corrupt { .. }) => {
                vec!["run `semtag resync --force` to rebuild the registry"]
            }
            SemtagError::Registry(RegistryError::DuplicateName { .. }) => {
                vec!["pick another name with --name"]
            }
            SemtagError::Validation(ValidationError::InvalidName { .. }) => {
                vec!["names use lowercase letters, digits and inner hyphens"]
            }
            SemtagError::Validation(ValidationError::UnknownType { .. }) => vec![
                "known types: prompt, schema, query, config, script, template, agent, ensemble, tool",
            ],
            SemtagError::Git(GitError::NotARepository { .. }) => {
                vec!["run inside a git repository or pass -C <dir>"]
            }
            SemtagError::Git(GitError::Spawn { .. }) => vec!["is git installed and on PATH?"],
            SemtagError::Reconcile(ReconcileError::PartialFailure { .. }) => {
                vec!["rerun with --verbose for per-file details"]
            }
            SemtagError::Config(ConfigError::Parse { .. } | ConfigError::InvalidValue { .. }) => {
                vec!["check .semtag/config.toml and SEMTAG_* environment variables"]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_for_missing_component() {
        let err: CliError = SemtagError::from(RegistryError::ComponentNotFound {
            key: "x".to_string(),
        })
        .into();
        assert_eq!(err.hints().len(), 2);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_io_errors_have_no_hints() {
        let err = CliError::Io(std::io::Error::new(std::io::ErrorKind::Other, "closed"));
        assert!(err.hints().is_empty());
    }
}
