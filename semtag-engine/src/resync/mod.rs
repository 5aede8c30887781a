//! Reconciliation engine
//!
//! Rebuilds a consistent picture from three witnesses: the side-registry,
//! the headers inside component files, and the commit log. All decisions
//! are made against an in-memory copy of the registry; header writes are
//! queued. A dry run executes exactly the same decisions and only skips
//! the final persistence step.

mod history;
mod report;

pub use history::{commits_with_path, infer_history, relocate};
pub use report::{FileFailure, Fix, ResyncReport};

use crate::discover::{discover, fallback_type, DiscoveredFile};
use crate::{HeaderStore, WriteOptions};
use chrono::Duration;
use semtag_core::{
    derive_name_from_path, validate_component_name, Classifier, Component, ComponentId,
    ComponentStatus, ComponentType, FileHeader, SemVer, SemtagResult, ValidationError,
    VersionHistoryEntry,
};
use semtag_git::{CommitInfo, GitRepo};
use semtag_registry::{RegistryDocument, RegistryStore};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Flags for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncOptions {
    /// Ignore the stored registry and rebuild from scratch.
    pub force: bool,
    /// Compute fixes without saving the registry or touching files.
    pub dry_run: bool,
    /// Rebuild every history from the commit log.
    pub rebuild_history: bool,
    /// Also rewrite headers whose name or id is stale.
    pub fix_headers: bool,
}

#[derive(Debug, Clone)]
struct HeaderWrite {
    path: String,
    header: FileHeader,
    replace: bool,
    type_hint: ComponentType,
    /// Registry state to restore if the write fails.
    revert: Option<Component>,
}

/// Working state of one run.
struct Plan {
    doc: RegistryDocument,
    fixes: Vec<Fix>,
    failures: Vec<FileFailure>,
    writes: Vec<HeaderWrite>,
    /// Components registered during this run; their header is already queued.
    created: HashSet<ComponentId>,
    /// Component id -> path that matched it this run.
    claimed: HashMap<ComponentId, String>,
    commits: HashMap<String, Vec<CommitInfo>>,
}

impl Plan {
    fn new(doc: RegistryDocument) -> Self {
        Self {
            doc,
            fixes: Vec::new(),
            failures: Vec::new(),
            writes: Vec::new(),
            created: HashSet::new(),
            claimed: HashMap::new(),
            commits: HashMap::new(),
        }
    }

    fn fail(&mut self, path: &str, error: impl ToString) {
        let error = error.to_string();
        warn!(path, error = %error, "reconciliation failed for file");
        self.failures.push(FileFailure {
            path: path.to_string(),
            error,
        });
    }
}

/// Reconciles one repository.
pub struct Reconciler<'a> {
    git: &'a GitRepo,
    store: &'a dyn RegistryStore,
    headers: &'a dyn HeaderStore,
    classifier: &'a Classifier,
    window: Duration,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        git: &'a GitRepo,
        store: &'a dyn RegistryStore,
        headers: &'a dyn HeaderStore,
        classifier: &'a Classifier,
        repair_window_hours: u32,
    ) -> Self {
        Self {
            git,
            store,
            headers,
            classifier,
            window: Duration::hours(i64::from(repair_window_hours)),
        }
    }

    pub fn run(&self, options: ResyncOptions) -> SemtagResult<ResyncReport> {
        let loaded = self.store.load()?;
        let mut report = ResyncReport {
            dry_run: options.dry_run,
            ..Default::default()
        };
        if let Some(diagnostic) = &loaded.diagnostic {
            report.diagnostics.push(diagnostic.to_string());
        }
        let doc = if options.force {
            info!(components = loaded.document.len(), "ignoring stored registry");
            RegistryDocument::new()
        } else {
            loaded.document
        };
        let mut plan = Plan::new(doc);

        let registered: Vec<String> = plan.doc.active().map(|c| c.path.clone()).collect();
        let files = discover(self.git, self.classifier, self.headers, &registered)?;
        report.scanned = files.len();

        for file in &files {
            debug!(path = %file.path, "reconciling");
            if let Err(e) = self.reconcile_file(&mut plan, file, options) {
                plan.fail(&file.path, e);
            }
        }
        self.sweep_removed(&mut plan);
        self.sync_headers(&mut plan, options);

        if !options.dry_run {
            self.persist(&mut plan, options.force || loaded.diagnostic.is_some())?;
        }

        info!(
            scanned = report.scanned,
            fixes = plan.fixes.len(),
            failures = plan.failures.len(),
            dry_run = options.dry_run,
            "reconciliation finished"
        );
        report.fixes = plan.fixes;
        report.failures = plan.failures;
        Ok(report)
    }

    fn persist(&self, plan: &mut Plan, always_save: bool) -> SemtagResult<()> {
        let writes = std::mem::take(&mut plan.writes);
        for write in writes {
            let options = WriteOptions {
                replace: write.replace,
                type_hint: Some(write.type_hint),
            };
            let Err(e) = self.headers.write(&write.path, &write.header, options) else {
                continue;
            };
            plan.fail(&write.path, e);
            if let Some(previous) = write.revert {
                let id = previous.id.clone();
                warn!(
                    id = %id,
                    path = %write.path,
                    "header not written, version conflict left for the next run"
                );
                plan.doc.replace(previous)?;
                plan.fixes.retain(|fix| {
                    !matches!(fix, Fix::ResolveVersionConflict { id: fixed, .. } if *fixed == id)
                });
            }
        }
        if always_save || !plan.fixes.is_empty() {
            self.store.save(&mut plan.doc)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Per file
    // ------------------------------------------------------------------

    fn reconcile_file(
        &self,
        plan: &mut Plan,
        file: &DiscoveredFile,
        options: ResyncOptions,
    ) -> SemtagResult<()> {
        let commits = self.commits(plan, &file.path)?;
        match self.lookup(plan, file) {
            Some(id) => {
                plan.claimed.insert(id.clone(), file.path.clone());
                self.reconcile_existing(plan, &id, file, &commits, options)
            }
            None => self.register_new(plan, file, &commits),
        }
    }

    /// Existing component for `file`: by header id, then by path, then by
    /// name. A name match only counts if the component's recorded path is
    /// this one or no longer exists.
    fn lookup(&self, plan: &Plan, file: &DiscoveredFile) -> Option<ComponentId> {
        let free = |id: &ComponentId| !plan.claimed.contains_key(id);

        if let Some(id) = file.header.as_ref().and_then(|h| h.component_id.as_ref()) {
            if let Some(c) = plan.doc.get(id) {
                let elsewhere_still_claims = c.path != file.path
                    && self.exists(&c.path)
                    && self
                        .headers
                        .read(&c.path)
                        .and_then(|h| h.component_id)
                        .as_ref()
                        == Some(id);
                if free(id) && !elsewhere_still_claims {
                    return Some(id.clone());
                }
            }
        }

        if let Some(c) = plan.doc.find_by_path(&file.path) {
            if free(&c.id) {
                return Some(c.id.clone());
            }
        }

        let name = candidate_name(file)?;
        let c = plan.doc.find_by_name(&name)?;
        if free(&c.id) && (c.path == file.path || !self.exists(&c.path)) {
            return Some(c.id.clone());
        }
        None
    }

    fn register_new(
        &self,
        plan: &mut Plan,
        file: &DiscoveredFile,
        commits: &[CommitInfo],
    ) -> SemtagResult<()> {
        let Synthesized { component, note } = synthesize(&plan.doc, file, commits, None, None)?;
        let id = component.id.clone();
        let component_type = component.component_type;
        let expected = component.expected_header();
        let fix = Fix::RegisterComponent {
            id: id.clone(),
            name: component.name.clone(),
            path: file.path.clone(),
            component_type,
            version: component.version.clone(),
            note,
        };
        plan.doc.insert(component)?;
        plan.created.insert(id.clone());
        plan.claimed.insert(id, file.path.clone());
        plan.fixes.push(fix);

        if self.headers.supports(&file.path, Some(component_type))
            && file.header.as_ref() != Some(&expected)
        {
            plan.writes.push(HeaderWrite {
                path: file.path.clone(),
                header: expected,
                replace: true,
                type_hint: component_type,
                revert: None,
            });
        }
        Ok(())
    }

    fn reconcile_existing(
        &self,
        plan: &mut Plan,
        id: &ComponentId,
        file: &DiscoveredFile,
        commits: &[CommitInfo],
        options: ResyncOptions,
    ) -> SemtagResult<()> {
        let Some(mut c) = plan.doc.get(id).cloned() else {
            return Ok(());
        };
        let mut fixes = Vec::new();

        if c.path != file.path {
            fixes.push(Fix::UpdatePath {
                id: c.id.clone(),
                name: c.name.clone(),
                from: c.path.clone(),
                to: file.path.clone(),
            });
            c.path = file.path.clone();
            if let Some(detection) = &file.detection {
                if detection.component_type != c.component_type {
                    fixes.push(Fix::UpdateType {
                        id: c.id.clone(),
                        name: c.name.clone(),
                        from: c.component_type,
                        to: detection.component_type,
                    });
                    c.component_type = detection.component_type;
                }
            }
        }

        if c.status == ComponentStatus::Removed {
            if plan.doc.name_taken(&c.name, Some(&c.id)) {
                c.name = plan.doc.unique_name(&c.name);
            }
            c.status = ComponentStatus::Active;
            fixes.push(Fix::Reactivate {
                id: c.id.clone(),
                name: c.name.clone(),
                path: c.path.clone(),
            });
        }

        let mut kept: Vec<VersionHistoryEntry> = Vec::with_capacity(c.history.len());
        for entry in std::mem::take(&mut c.history) {
            if self.git.path_exists_at(&entry.commit, &entry.path)? {
                kept.push(entry);
                continue;
            }
            match relocate(&entry, commits, self.window) {
                Some(found) => {
                    fixes.push(Fix::RepairHistoryEntry {
                        id: c.id.clone(),
                        name: c.name.clone(),
                        version: entry.version.clone(),
                        from_commit: entry.commit.clone(),
                        to_commit: found.id.clone(),
                    });
                    kept.push(VersionHistoryEntry {
                        commit: found.id.clone(),
                        timestamp: found.timestamp,
                        path: c.path.clone(),
                        ..entry
                    });
                }
                None => fixes.push(Fix::DropHistoryEntry {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    version: entry.version.clone(),
                    commit: entry.commit.clone(),
                }),
            }
        }
        c.history = kept;

        if c.history.is_empty() || options.rebuild_history {
            let rebuilt = infer_history(&c.path, commits);
            if rebuilt != c.history {
                fixes.push(Fix::RebuildHistory {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    entries: rebuilt.len(),
                });
                c.history = rebuilt;
            }
        }

        if !fixes.is_empty() {
            c.touch();
            plan.doc.replace(c)?;
            plan.fixes.extend(fixes);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Whole registry
    // ------------------------------------------------------------------

    fn sweep_removed(&self, plan: &mut Plan) {
        let gone: Vec<(ComponentId, String, String)> = plan
            .doc
            .active()
            .filter(|c| !self.exists(&c.path))
            .map(|c| (c.id.clone(), c.name.clone(), c.path.clone()))
            .collect();
        for (id, name, path) in gone {
            if let Err(e) = plan.doc.set_status(&id, ComponentStatus::Removed) {
                plan.fail(&path, e);
                continue;
            }
            info!(id = %id, path = %path, "component marked removed");
            plan.fixes.push(Fix::MarkRemoved { id, name, path });
        }
    }

    fn sync_headers(&self, plan: &mut Plan, options: ResyncOptions) {
        let mut ids: Vec<(String, ComponentId)> = plan
            .doc
            .active()
            .filter(|c| !plan.created.contains(&c.id))
            .map(|c| (c.path.clone(), c.id.clone()))
            .collect();
        ids.sort();
        for (path, id) in ids {
            if let Err(e) = self.sync_header(plan, &id, options) {
                plan.fail(&path, e);
            }
        }
    }

    fn sync_header(
        &self,
        plan: &mut Plan,
        id: &ComponentId,
        options: ResyncOptions,
    ) -> SemtagResult<()> {
        let Some(mut c) = plan.doc.get(id).cloned() else {
            return Ok(());
        };
        let before = c.clone();
        if !self.exists(&c.path) || !self.headers.supports(&c.path, Some(c.component_type)) {
            return Ok(());
        }

        match self.headers.read(&c.path) {
            None => {
                plan.fixes.push(Fix::WriteHeader {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    path: c.path.clone(),
                    version: c.version.clone(),
                });
                plan.writes.push(HeaderWrite {
                    path: c.path.clone(),
                    header: c.expected_header(),
                    replace: false,
                    type_hint: c.component_type,
                    revert: None,
                });
            }
            Some(found) if found.version != c.version => {
                let registry = c.version.clone();
                let resolved = found.version.clone().max(registry.clone()).bump_patch()?;
                let commits = self.commits(plan, &c.path)?;
                match commits.last() {
                    Some(latest) => c.record(VersionHistoryEntry {
                        version: resolved.clone(),
                        commit: latest.id.clone(),
                        timestamp: latest.timestamp,
                        path: c.path.clone(),
                        message: format!(
                            "header {} and registry {} disagreed, resolved to {}",
                            found.version, registry, resolved
                        ),
                    }),
                    None => {
                        c.version = resolved.clone();
                        c.touch();
                    }
                }
                info!(
                    id = %c.id,
                    header = %found.version,
                    registry = %registry,
                    resolved = %resolved,
                    "version conflict resolved"
                );
                let fix = Fix::ResolveVersionConflict {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    path: c.path.clone(),
                    header: found.version,
                    registry,
                    resolved,
                };
                let write = HeaderWrite {
                    path: c.path.clone(),
                    header: c.expected_header(),
                    replace: true,
                    type_hint: c.component_type,
                    revert: Some(before),
                };
                plan.doc.replace(c)?;
                plan.fixes.push(fix);
                plan.writes.push(write);
            }
            Some(found)
                if options.fix_headers
                    && (found.component != c.name || found.component_id.as_ref() != Some(&c.id)) =>
            {
                plan.fixes.push(Fix::RefreshHeader {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    path: c.path.clone(),
                });
                plan.writes.push(HeaderWrite {
                    path: c.path.clone(),
                    header: c.expected_header(),
                    replace: true,
                    type_hint: c.component_type,
                    revert: None,
                });
            }
            Some(_) => {}
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn exists(&self, path: &str) -> bool {
        self.git.root().join(path).is_file()
    }

    fn commits(&self, plan: &mut Plan, path: &str) -> SemtagResult<Vec<CommitInfo>> {
        if let Some(cached) = plan.commits.get(path) {
            return Ok(cached.clone());
        }
        let commits = commits_with_path(self.git, path)?;
        plan.commits.insert(path.to_string(), commits.clone());
        Ok(commits)
    }
}

/// Name a file asks for: its header's component name when valid, else the
/// classifier's, else one derived from the file name.
fn candidate_name(file: &DiscoveredFile) -> Option<String> {
    if let Some(header) = &file.header {
        if validate_component_name(&header.component).is_ok() {
            return Some(header.component.clone());
        }
    }
    file.detection
        .as_ref()
        .map(|d| d.name.clone())
        .or_else(|| derive_name_from_path(&file.path))
}

/// A component built for a file the registry does not know yet.
pub(crate) struct Synthesized {
    pub component: Component,
    /// Set when header and history disagreed on the version.
    pub note: Option<String>,
}

/// Build a new component for `file`.
///
/// The header id is reused when the registry does not hold it yet. The
/// version is the larger of the header's and the one inferred from
/// `commits`. Without an explicit `name` the candidate name is made unique.
pub(crate) fn synthesize(
    doc: &RegistryDocument,
    file: &DiscoveredFile,
    commits: &[CommitInfo],
    name: Option<String>,
    component_type: Option<ComponentType>,
) -> SemtagResult<Synthesized> {
    let header = file.header.as_ref();
    let id = match header.and_then(|h| h.component_id.clone()) {
        Some(id) if !doc.contains_id(&id) => id,
        _ => doc.fresh_id(),
    };
    let component_type = component_type
        .or_else(|| file.detection.as_ref().map(|d| d.component_type))
        .unwrap_or_else(|| fallback_type(&file.path));
    let name = match name {
        Some(name) => name,
        None => {
            let base = candidate_name(file).ok_or_else(|| ValidationError::InvalidName {
                name: file.path.clone(),
                reason: "no usable component name in header or file name".to_string(),
            })?;
            doc.unique_name(&base)
        }
    };

    let history = infer_history(&file.path, commits);
    let inferred = history.last().map(|e| e.version.clone());
    let (version, note) = match (header.map(|h| h.version.clone()), inferred) {
        (Some(from_header), Some(from_history)) if from_header != from_history => {
            let note = format!("header says {}, history implies {}", from_header, from_history);
            (from_header.max(from_history), Some(note))
        }
        (Some(from_header), _) => (from_header, None),
        (None, Some(from_history)) => (from_history, None),
        (None, None) => (SemVer::initial(), None),
    };

    info!(id = %id, name = %name, path = %file.path, version = %version, "component registered");
    let component = Component::new(id, name, component_type, file.path.clone(), version)
        .with_history(history);
    Ok(Synthesized { component, note })
}
