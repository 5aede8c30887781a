//! A repository opened for semtag
//!
//! Bundles the git handle, configuration, registry store, header store and
//! classifier, and hands out the operation types bound to them.

use crate::discover::DiscoveredFile;
use crate::resync::{commits_with_path, synthesize, Synthesized};
use crate::{
    CommentHeaderStore, Deployments, HeaderStore, Reconciler, Releaser, TagManager, WriteOptions,
};
use semtag_core::{
    validate_component_name, Classifier, Component, ComponentType, ConfigError, RegistryError,
    SemtagConfig, SemtagResult, TagScope, ValidationError,
};
use semtag_git::GitRepo;
use semtag_registry::{FileRegistry, RegistryDocument, RegistryStore};
use serde::Serialize;
use std::path::{Component as PathComponent, Path};
use tracing::{info, warn};

/// What `init` created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitOutcome {
    pub config_path: String,
    pub registry_path: String,
    pub config_created: bool,
    pub registry_created: bool,
}

pub struct Project {
    git: GitRepo,
    config: SemtagConfig,
    store: Box<dyn RegistryStore>,
    headers: CommentHeaderStore,
    classifier: Classifier,
}

impl Project {
    /// Open the repository containing `path` and load its configuration.
    pub fn open(path: &Path) -> SemtagResult<Self> {
        let git = GitRepo::open(path)?;
        let config = SemtagConfig::load(git.root())?;
        Self::with_config(git, config)
    }

    pub fn with_config(git: GitRepo, config: SemtagConfig) -> SemtagResult<Self> {
        let store = FileRegistry::new(config.registry_file(git.root()));
        let headers = CommentHeaderStore::new(git.root(), config.header_scan_lines);
        let classifier = Classifier::from_config(&config.discovery)?;
        Ok(Self {
            git,
            config,
            store: Box::new(store),
            headers,
            classifier,
        })
    }

    /// Swap the registry backend.
    pub fn with_store(mut self, store: Box<dyn RegistryStore>) -> Self {
        self.store = store;
        self
    }

    /// Create `.semtag/config.toml` and an empty registry where missing.
    pub fn init(path: &Path) -> SemtagResult<(Self, InitOutcome)> {
        let git = GitRepo::open(path)?;
        let config_path = SemtagConfig::config_path(git.root());
        let config_created = !config_path.exists();
        if config_created {
            let defaults = SemtagConfig::default();
            let io_error = |e: std::io::Error| ConfigError::Io {
                path: config_path.display().to_string(),
                reason: e.to_string(),
            };
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).map_err(io_error)?;
            }
            std::fs::write(&config_path, defaults.to_toml()?).map_err(io_error)?;
            info!(path = %config_path.display(), "config written");
        }

        let project = Self::open(git.root())?;
        let registry_path = project.config.registry_file(project.git.root());
        let registry_created = !registry_path.exists();
        if registry_created {
            project.store.save(&mut RegistryDocument::new())?;
        }
        let outcome = InitOutcome {
            config_path: config_path.display().to_string(),
            registry_path: registry_path.display().to_string(),
            config_created,
            registry_created,
        };
        Ok((project, outcome))
    }

    pub fn git(&self) -> &GitRepo {
        &self.git
    }

    pub fn config(&self) -> &SemtagConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn RegistryStore {
        self.store.as_ref()
    }

    pub fn headers(&self) -> &CommentHeaderStore {
        &self.headers
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Load the registry, logging a recovered corruption.
    pub fn load_registry(&self) -> SemtagResult<RegistryDocument> {
        let loaded = self.store.load()?;
        if let Some(diagnostic) = loaded.diagnostic {
            warn!(error = %diagnostic, "registry unreadable, continuing with an empty one");
        }
        Ok(loaded.document)
    }

    /// Component by id or name.
    pub fn component(&self, key: &str) -> SemtagResult<Component> {
        Ok(self.load_registry()?.resolve(key)?.clone())
    }

    pub fn scope(&self, component: &Component) -> TagScope {
        component.tag_scope(self.config.namespace)
    }

    pub fn tags(&self) -> TagManager<'_> {
        TagManager::new(&self.git, &self.config.remote)
    }

    pub fn deployments(&self) -> Deployments<'_> {
        Deployments::new(self.tags())
    }

    pub fn releases(&self) -> Releaser<'_> {
        Releaser::new(
            &self.git,
            self.tags(),
            self.store.as_ref(),
            &self.headers,
            self.config.namespace,
        )
    }

    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(
            &self.git,
            self.store.as_ref(),
            &self.headers,
            &self.classifier,
            self.config.repair_window_hours,
        )
    }

    /// Register the file at `path` explicitly.
    ///
    /// Type and name default to what the classifier and the file's header
    /// suggest. The header is stamped when the format allows it.
    pub fn add(
        &self,
        path: &Path,
        name: Option<&str>,
        component_type: Option<ComponentType>,
    ) -> SemtagResult<Component> {
        let rel = self.relative_path(path)?;
        let mut doc = self.load_registry()?;
        if let Some(existing) = doc.active().find(|c| c.path == rel) {
            return Err(ValidationError::InvalidValue {
                field: "path".to_string(),
                reason: format!("{} is already registered as {}", rel, existing.name),
            }
            .into());
        }
        if let Some(name) = name {
            validate_component_name(name)?;
            if let Some(existing) = doc.active().find(|c| c.name == name) {
                return Err(RegistryError::DuplicateName {
                    name: name.to_string(),
                    existing: existing.id.to_string(),
                }
                .into());
            }
        }

        let file = DiscoveredFile {
            detection: self.classifier.detect(&rel),
            header: self.headers.read(&rel),
            path: rel,
        };
        let commits = commits_with_path(&self.git, &file.path)?;
        let Synthesized { component, note } = synthesize(
            &doc,
            &file,
            &commits,
            name.map(str::to_string),
            component_type,
        )?;
        if let Some(note) = note {
            info!(component = %component.name, note = %note, "version taken from the newer witness");
        }
        doc.insert(component.clone())?;
        self.store.save(&mut doc)?;

        let hint = Some(component.component_type);
        if self.headers.supports(&file.path, hint) {
            self.headers.write(
                &file.path,
                &component.expected_header(),
                WriteOptions {
                    replace: true,
                    type_hint: hint,
                },
            )?;
        }
        Ok(component)
    }

    /// Repo-relative forward-slash form of `path`, which may be absolute,
    /// relative to the repository root, or relative to the working
    /// directory.
    pub fn relative_path(&self, path: &Path) -> SemtagResult<String> {
        let root = self.git.root();
        let candidate = if path.is_absolute() || !root.join(path).exists() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        let invalid = |reason: String| ValidationError::InvalidValue {
            field: "path".to_string(),
            reason,
        };
        let canonical = candidate
            .canonicalize()
            .map_err(|e| invalid(format!("{}: {}", path.display(), e)))?;
        if !canonical.is_file() {
            return Err(invalid(format!("{} is not a file", path.display())).into());
        }
        let root = root
            .canonicalize()
            .map_err(|e| invalid(format!("{}: {}", root.display(), e)))?;
        let relative = canonical
            .strip_prefix(&root)
            .map_err(|_| invalid(format!("{} is outside the repository", path.display())))?;
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                PathComponent::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Ok(segments.join("/"))
    }
}
