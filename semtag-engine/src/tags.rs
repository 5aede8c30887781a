//! Tag hierarchy manager
//!
//! Version tags are immutable: created once, never moved, pushed without
//! force. Deployment tags are force-moved and always force-pushed.

use crate::Resolver;
use chrono::Utc;
use semtag_core::{
    classify_slot, version_sort_key, SemVer, SemtagResult, TagError, TagName, TagNamespace,
    TagScope, TagSlot, Timestamp,
};
use semtag_git::{GitRepo, PushStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// A version tag and its parsed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionTag {
    pub tag: String,
    pub version: SemVer,
}

/// A deployment tag and its environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentTag {
    pub tag: String,
    pub environment: String,
}

/// All tags of one component, partitioned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagListing {
    pub versions: Vec<VersionTag>,
    pub deployments: Vec<DeploymentTag>,
}

/// Details of one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagInfo {
    pub tag: String,
    pub commit: String,
    pub author: String,
    pub date: Option<Timestamp>,
    pub message: String,
    pub annotated: bool,
    /// Set for version tags.
    pub version: Option<SemVer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedTag {
    pub tag: String,
    pub version: SemVer,
    pub commit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentMove {
    pub tag: String,
    pub environment: String,
    pub commit: String,
    pub previous: Option<String>,
    /// Highest version tag at `commit`, if any.
    pub version: Option<SemVer>,
    /// False when the tag already pointed at `commit`.
    pub moved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub tag: String,
    pub remote_deleted: bool,
    /// Remote failure; the local deletion stands.
    pub remote_warning: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub pushed: Vec<String>,
    /// Version tags the remote rejected and that were then forced.
    pub forced: Vec<String>,
}

/// Create, inspect, move, delete and push tags.
#[derive(Debug, Clone, Copy)]
pub struct TagManager<'a> {
    git: &'a GitRepo,
    remote: &'a str,
}

impl<'a> TagManager<'a> {
    pub fn new(git: &'a GitRepo, remote: &'a str) -> Self {
        Self { git, remote }
    }

    pub fn resolver(&self) -> Resolver<'a> {
        Resolver::new(self.git)
    }

    /// Create an immutable version tag. `commit` defaults to `HEAD`.
    pub fn create_version_tag(
        &self,
        scope: &TagScope,
        version: &str,
        commit: Option<&str>,
        message: Option<&str>,
    ) -> SemtagResult<CreatedTag> {
        let version = SemVer::parse(version.trim())?;
        let tag = scope.version_tag(&version);
        if self.git.tag_exists(&tag)? {
            return Err(TagError::TagAlreadyExists { tag }.into());
        }
        let commit = self.resolver().resolve(scope, commit.unwrap_or("HEAD"))?;
        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("Release {} {}", scope.name, version));
        self.git.create_annotated_tag(&tag, &commit, &message, false)?;
        info!(tag = %tag, commit = %commit, "version tag created");
        Ok(CreatedTag {
            tag,
            version,
            commit,
        })
    }

    /// Point the deployment tag for `environment` at `target_ref`.
    pub fn move_deployment_tag(
        &self,
        scope: &TagScope,
        environment: &str,
        target_ref: &str,
        message: Option<&str>,
    ) -> SemtagResult<DeploymentMove> {
        let tag = scope.deployment_tag(environment)?;
        let commit = self.resolver().resolve(scope, target_ref)?;
        let previous = self.git.tag_commit(&tag)?;
        let version = self.version_at(scope, &commit)?;

        if previous.as_deref() == Some(commit.as_str()) {
            debug!(tag = %tag, commit = %commit, "deployment tag already in place");
            return Ok(DeploymentMove {
                tag,
                environment: environment.to_string(),
                commit,
                previous,
                version,
                moved: false,
            });
        }

        let source = version
            .as_ref()
            .map(|v| v.tag_slot())
            .unwrap_or_else(|| target_ref.to_string());
        let body = format!(
            "source: {}\ncommit: {}\ntimestamp: {}",
            source,
            commit,
            Utc::now().to_rfc3339()
        );
        let message = match message {
            Some(m) => format!("{}\n\n{}", m, body),
            None => format!("Deploy {} {} to {}\n\n{}", scope.name, source, environment, body),
        };
        self.git.create_annotated_tag(&tag, &commit, &message, true)?;
        info!(tag = %tag, commit = %commit, previous = ?previous, "deployment tag moved");
        Ok(DeploymentMove {
            tag,
            environment: environment.to_string(),
            commit,
            previous,
            version,
            moved: true,
        })
    }

    pub fn list_tags(&self, scope: &TagScope) -> SemtagResult<TagListing> {
        let mut listing = TagListing::default();
        for raw in self.git.list_tags(&scope.prefix())? {
            let Ok(tag) = TagName::parse(&raw) else {
                debug!(tag = %raw, "skipping foreign tag");
                continue;
            };
            if !scope.owns(&tag) {
                continue;
            }
            match classify_slot(&tag.slot) {
                TagSlot::Version(_) => listing.versions.push(VersionTag {
                    version: version_sort_key(&tag.slot),
                    tag: raw,
                }),
                TagSlot::Environment(environment) => {
                    listing.deployments.push(DeploymentTag { tag: raw, environment })
                }
            }
        }
        listing
            .versions
            .sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.tag.cmp(&b.tag)));
        listing
            .deployments
            .sort_by(|a, b| a.environment.cmp(&b.environment));
        Ok(listing)
    }

    /// Version tags in ascending numeric order.
    pub fn get_version_tags(&self, scope: &TagScope) -> SemtagResult<Vec<VersionTag>> {
        Ok(self.list_tags(scope)?.versions)
    }

    pub fn get_deployment_tags(&self, scope: &TagScope) -> SemtagResult<Vec<DeploymentTag>> {
        Ok(self.list_tags(scope)?.deployments)
    }

    /// Every component tag in `namespace`, grouped by component prefix.
    pub fn list_all(&self, namespace: TagNamespace) -> SemtagResult<BTreeMap<String, TagListing>> {
        let mut scopes: BTreeMap<String, TagScope> = BTreeMap::new();
        for raw in self.git.list_tags(namespace.as_str())? {
            if let Ok(tag) = TagName::parse(&raw) {
                let scope = tag.scope();
                scopes.entry(scope.prefix()).or_insert(scope);
            }
        }
        let mut out = BTreeMap::new();
        for (prefix, scope) in scopes {
            out.insert(prefix, self.list_tags(&scope)?);
        }
        Ok(out)
    }

    /// Details for a tag given as a bare slot or a full name.
    pub fn get_tag_info(&self, scope: &TagScope, tag_or_slot: &str) -> SemtagResult<TagInfo> {
        let tag = self.qualify_existing(scope, tag_or_slot)?;
        let details = self
            .git
            .tag_details(&tag)?
            .ok_or_else(|| TagError::TagNotFound { tag: tag.clone() })?;
        let slot = tag.rsplit('/').next().unwrap_or_default();
        Ok(TagInfo {
            version: classify_slot(slot).version().cloned(),
            tag,
            commit: details.commit,
            author: details.author,
            date: details.date,
            message: details.message,
            annotated: details.annotated,
        })
    }

    /// Delete locally, then optionally on the remote. A remote failure is
    /// reported, never rolled back.
    pub fn delete_tag(
        &self,
        scope: &TagScope,
        tag_or_slot: &str,
        also_remote: bool,
    ) -> SemtagResult<DeleteOutcome> {
        let tag = self.qualify_existing(scope, tag_or_slot)?;
        self.git.delete_tag(&tag)?;
        let mut outcome = DeleteOutcome {
            tag: tag.clone(),
            remote_deleted: false,
            remote_warning: None,
        };
        if also_remote {
            match self.git.delete_remote_tag(self.remote, &tag) {
                Ok(()) => outcome.remote_deleted = true,
                Err(e) => {
                    warn!(tag = %tag, remote = self.remote, error = %e, "remote delete failed");
                    outcome.remote_warning = Some(e.to_string());
                }
            }
        }
        Ok(outcome)
    }

    /// Push `tags` (all of the component's tags when None).
    ///
    /// Deployment tags are always forced. A rejected version tag fails with
    /// `ImmutableTagRejected` unless `force` is set, in which case it is
    /// re-pushed with force.
    pub fn push_tags(
        &self,
        scope: &TagScope,
        tags: Option<&[String]>,
        force: bool,
    ) -> SemtagResult<PushReport> {
        let names: Vec<String> = match tags {
            Some(list) => list
                .iter()
                .map(|t| self.qualify_existing(scope, t))
                .collect::<SemtagResult<_>>()?,
            None => {
                let listing = self.list_tags(scope)?;
                listing
                    .versions
                    .into_iter()
                    .map(|v| v.tag)
                    .chain(listing.deployments.into_iter().map(|d| d.tag))
                    .collect()
            }
        };

        let mut report = PushReport::default();
        for tag in names {
            let slot = tag.rsplit('/').next().unwrap_or_default();
            let is_version = classify_slot(slot).is_version();
            match self.git.push_tag(self.remote, &tag, !is_version)? {
                PushStatus::Pushed => report.pushed.push(tag),
                PushStatus::Rejected { reason } if is_version && force => {
                    warn!(tag = %tag, reason = %reason, "forcing push of immutable version tag");
                    match self.git.push_tag(self.remote, &tag, true)? {
                        PushStatus::Pushed => {
                            report.pushed.push(tag.clone());
                            report.forced.push(tag);
                        }
                        PushStatus::Rejected { reason } => {
                            return Err(TagError::ImmutableTagRejected { tag, reason }.into())
                        }
                    }
                }
                PushStatus::Rejected { reason } => {
                    return Err(TagError::ImmutableTagRejected { tag, reason }.into())
                }
            }
        }
        Ok(report)
    }

    /// Highest version tag of `scope` pointing at `commit`.
    pub fn version_at(&self, scope: &TagScope, commit: &str) -> SemtagResult<Option<SemVer>> {
        let mut best = None;
        for vt in self.get_version_tags(scope)? {
            if self.git.tag_commit(&vt.tag)?.as_deref() == Some(commit) {
                best = Some(vt.version);
            }
        }
        Ok(best)
    }

    /// Qualify a slot or full tag name and check the tag exists. A bare
    /// version without `v` also matches the canonical `v` tag.
    fn qualify_existing(&self, scope: &TagScope, tag_or_slot: &str) -> SemtagResult<String> {
        let tag = scope.qualify(tag_or_slot.trim())?;
        if self.git.tag_exists(&tag)? {
            return Ok(tag);
        }
        if !tag_or_slot.contains('/') {
            if let TagSlot::Version(v) = classify_slot(tag_or_slot.trim()) {
                let canonical = scope.version_tag(&v);
                if self.git.tag_exists(&canonical)? {
                    return Ok(canonical);
                }
            }
        }
        Err(TagError::TagNotFound { tag }.into())
    }
}
