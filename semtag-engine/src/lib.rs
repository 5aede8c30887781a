//! semtag Engine - Operations over the Three Witnesses
//!
//! A component's release state is asserted three times: by the tag
//! hierarchy in git (authoritative), by the side-registry, and by the
//! header inside the file. This crate resolves references against the tag
//! hierarchy, creates and moves tags, performs releases and deployments,
//! and reconciles the two derived witnesses back to the authoritative one.

mod deploy;
mod discover;
mod headers;
mod project;
mod release;
mod resolver;
mod resync;
mod tags;

pub use deploy::{Deployments, EnvironmentStatus};
pub use discover::{discover, fallback_type, DiscoveredFile};
pub use headers::{CommentHeaderStore, HeaderStore, WriteOptions};
pub use project::{InitOutcome, Project};
pub use release::{Release, Releaser};
pub use resolver::Resolver;
pub use resync::{
    commits_with_path, infer_history, relocate, FileFailure, Fix, Reconciler, ResyncOptions,
    ResyncReport,
};
pub use tags::{
    CreatedTag, DeleteOutcome, DeploymentMove, DeploymentTag, PushReport, TagInfo, TagListing,
    TagManager, VersionTag,
};
