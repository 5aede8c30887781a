//! Reference resolution
//!
//! Turns whatever the operator typed (commit id, version, environment,
//! branch, `HEAD`) into a full commit id for one component.

use semtag_core::{classify_slot, is_commit_id_shape, SemtagResult, TagError, TagName, TagScope, TagSlot};
use semtag_git::GitRepo;
use tracing::debug;

/// Resolves references against one repository.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    git: &'a GitRepo,
}

impl<'a> Resolver<'a> {
    pub fn new(git: &'a GitRepo) -> Self {
        Self { git }
    }

    /// Resolve `reference` for the component at `scope`.
    ///
    /// Order: commit-id shaped strings as object ids, then the component's
    /// own tags, then git's generic resolution. A component tag therefore
    /// shadows a branch of the same name, even a hex-looking one.
    pub fn resolve(&self, scope: &TagScope, reference: &str) -> SemtagResult<String> {
        let reference = reference.trim();
        let not_found = || TagError::ReferenceNotFound {
            reference: reference.to_string(),
            component: scope.name.clone(),
        };
        if reference.is_empty() {
            return Err(not_found().into());
        }

        if is_commit_id_shape(reference) {
            if let Some(commit) = self.git.resolve_commit(reference)? {
                // rev-parse also resolves refs, so `beef` may name a branch.
                if commit.starts_with(&reference.to_ascii_lowercase()) {
                    debug!(reference, commit = %commit, "resolved as object id");
                    return Ok(commit);
                }
            }
        }

        for tag in tag_candidates(scope, reference) {
            if let Some(commit) = self.git.tag_commit(&tag)? {
                debug!(reference, tag = %tag, commit = %commit, "resolved as component tag");
                return Ok(commit);
            }
        }

        if let Some(commit) = self.git.resolve_commit(reference)? {
            debug!(reference, commit = %commit, "resolved by git");
            return Ok(commit);
        }
        Err(not_found().into())
    }
}

/// Full tag names `reference` may denote inside `scope`, most likely first.
fn tag_candidates(scope: &TagScope, reference: &str) -> Vec<String> {
    if reference.contains('/') {
        return match TagName::parse(reference) {
            Ok(tag) if scope.owns(&tag) => vec![tag.to_string()],
            _ => Vec::new(),
        };
    }
    match classify_slot(reference) {
        TagSlot::Version(version) => {
            let canonical = scope.version_tag(&version);
            let raw = scope.tag(reference);
            if canonical == raw {
                vec![canonical]
            } else {
                vec![canonical, raw]
            }
        }
        TagSlot::Environment(env) => vec![scope.tag(&env)],
    }
}
