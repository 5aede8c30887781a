//! Error types for semtag operations

use thiserror::Error;

/// Tag hierarchy and reference resolution errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("Invalid version '{value}': expected vMAJOR.MINOR.PATCH[-pre]")]
    InvalidVersion { value: String },

    #[error("Invalid environment '{value}': {reason}")]
    InvalidEnvironment { value: String, reason: String },

    #[error("Malformed tag '{tag}': {reason}")]
    MalformedTag { tag: String, reason: String },

    #[error("Tag already exists: {tag}")]
    TagAlreadyExists { tag: String },

    #[error("Tag not found: {tag}")]
    TagNotFound { tag: String },

    #[error("Reference '{reference}' not found for component {component}")]
    ReferenceNotFound { reference: String, component: String },

    #[error("Remote rejected immutable tag {tag}: {reason}")]
    ImmutableTagRejected { tag: String, reason: String },
}

/// Side-registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Component not found: {key}")]
    ComponentNotFound { key: String },

    #[error("Registry file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Component name '{name}' is already used by {existing}")]
    DuplicateName { name: String, existing: String },

    #[error("Component id {id} is already registered")]
    DuplicateId { id: String },

    #[error("Registry I/O failed for {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Registry serialization failed: {reason}")]
    Serialize { reason: String },
}

/// Validation errors for user-supplied values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid component name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Unknown component type '{value}'")]
    UnknownType { value: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("File format of {path} does not support embedded headers")]
    UnsupportedHeaderFormat { path: String },
}

/// Errors from the git subprocess layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitError {
    #[error("Not a git repository: {path}")]
    NotARepository { path: String },

    #[error("Failed to run `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` exited with status {status:?}: {stderr}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Unexpected output from `{command}`: {reason}")]
    InvalidOutput { command: String, reason: String },
}

/// Reconciliation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Reconciliation finished with {failed} of {total} files failing")]
    PartialFailure { failed: usize, total: usize },

    #[error("Failed to write {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all semtag errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SemtagError {
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for semtag operations.
pub type SemtagResult<T> = Result<T, SemtagError>;

// =============================================================================
// TESTS
// =============================================================================
