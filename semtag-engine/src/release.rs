//! Releases
//!
//! A release creates the immutable version tag and then brings the two
//! other witnesses in line: the registry gets a history entry and the file
//! header is stamped with the new version.

use crate::{CreatedTag, HeaderStore, TagManager, WriteOptions};
use semtag_core::{Component, SemtagResult, TagNamespace, VersionHistoryEntry};
use semtag_git::GitRepo;
use semtag_registry::RegistryStore;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    pub component: String,
    #[serde(flatten)]
    pub tag: CreatedTag,
    /// False when the file did not exist at the tagged commit.
    pub recorded: bool,
    pub header_written: bool,
}

pub struct Releaser<'a> {
    git: &'a GitRepo,
    tags: TagManager<'a>,
    store: &'a dyn RegistryStore,
    headers: &'a dyn HeaderStore,
    namespace: TagNamespace,
}

impl<'a> Releaser<'a> {
    pub fn new(
        git: &'a GitRepo,
        tags: TagManager<'a>,
        store: &'a dyn RegistryStore,
        headers: &'a dyn HeaderStore,
        namespace: TagNamespace,
    ) -> Self {
        Self {
            git,
            tags,
            store,
            headers,
            namespace,
        }
    }

    /// Tag `key` (id or name) at `commit` (default `HEAD`) as `version`.
    pub fn release(
        &self,
        key: &str,
        version: &str,
        commit: Option<&str>,
        message: Option<&str>,
    ) -> SemtagResult<Release> {
        let loaded = self.store.load()?;
        if let Some(diagnostic) = &loaded.diagnostic {
            warn!(error = %diagnostic, "releasing against a recovered registry");
        }
        let mut doc = loaded.document;
        let mut component = doc.resolve(key)?.clone();
        let scope = component.tag_scope(self.namespace);

        let created = self
            .tags
            .create_version_tag(&scope, version, commit, message)?;

        let recorded = if self.git.path_exists_at(&created.commit, &component.path)? {
            let info = self.git.commit_info(&created.commit)?;
            component.record(VersionHistoryEntry {
                version: created.version.clone(),
                commit: created.commit.clone(),
                timestamp: info.timestamp,
                path: component.path.clone(),
                message: message
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Release {}", created.version)),
            });
            doc.replace(component.clone())?;
            self.store.save(&mut doc)?;
            true
        } else {
            warn!(
                tag = %created.tag,
                path = %component.path,
                "file absent at tagged commit, history not recorded"
            );
            false
        };

        let header_written = self.stamp(&component.path, &component)?;
        info!(component = %component.name, tag = %created.tag, "released");
        Ok(Release {
            component: component.name,
            tag: created,
            recorded,
            header_written,
        })
    }

    fn stamp(&self, path: &str, component: &Component) -> SemtagResult<bool> {
        let hint = Some(component.component_type);
        if !self.git.root().join(path).is_file() || !self.headers.supports(path, hint) {
            return Ok(false);
        }
        self.headers.write(
            path,
            &component.expected_header(),
            WriteOptions {
                replace: true,
                type_hint: hint,
            },
        )
    }
}
