//! semtag Git - Repository Access
//!
//! Thin wrapper over the `git` binary. No libgit, no caching: each call is
//! one subprocess, logged at debug level.

mod history;
mod repo;
mod tags;

pub use history::CommitInfo;
pub use repo::{GitOutput, GitRepo};
pub use tags::{PushStatus, TagDetails};

use chrono::{DateTime, Utc};
use semtag_core::Timestamp;

/// Parse git's `iso-strict` dates.
pub(crate) fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
