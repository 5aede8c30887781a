//! JSON file backend

use crate::{Loaded, RegistryDocument, RegistryStore};
use semtag_core::{RegistryError, SemtagResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Registry persisted as pretty JSON, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    fn io_error(&self, e: std::io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.display(),
            reason: e.to_string(),
        }
    }
}

impl RegistryStore for FileRegistry {
    fn load(&self) -> SemtagResult<Loaded> {
        if !self.path.exists() {
            debug!(path = %self.display(), "registry file absent, starting empty");
            return Ok(Loaded::clean(RegistryDocument::new()));
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        match serde_json::from_str::<RegistryDocument>(&contents) {
            Ok(document) => {
                debug!(path = %self.display(), components = document.len(), "registry loaded");
                Ok(Loaded::clean(document))
            }
            Err(e) => {
                warn!(path = %self.display(), error = %e, "registry is corrupt, starting empty");
                Ok(Loaded {
                    document: RegistryDocument::new(),
                    diagnostic: Some(RegistryError::Corrupt {
                        path: self.display(),
                        reason: e.to_string(),
                    }),
                })
            }
        }
    }

    fn save(&self, document: &mut RegistryDocument) -> SemtagResult<()> {
        document.touch();
        let contents = serde_json::to_string_pretty(document).map_err(|e| {
            RegistryError::Serialize {
                reason: e.to_string(),
            }
        })?;
        write_atomic(&self.path, contents.as_bytes()).map_err(|e| self.io_error(e))?;
        info!(path = %self.display(), components = document.len(), "registry saved");
        Ok(())
    }

    fn location(&self) -> String {
        self.display()
    }
}

/// Write to a sibling temp file, then rename over `path`.
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = temp_path_next_to(path);
    std::fs::write(&tmp, contents)?;
    match std::fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            let _ = std::fs::remove_file(path);
            std::fs::rename(&tmp, path)
        }
    }
}

fn temp_path_next_to(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "registry.json".to_string());
    path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use semtag_core::{new_component_id, Component, ComponentType, SemVer};

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRegistry::new(dir.path().join(".semtag/registry.json"));
        let loaded = store.load().unwrap();
        assert!(loaded.document.is_empty());
        assert!(loaded.diagnostic.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRegistry::new(dir.path().join(".semtag/registry.json"));
        let mut doc = RegistryDocument::new();
        doc.insert(Component::new(
            new_component_id(),
            "a",
            ComponentType::Config,
            "configs/a.yaml",
            SemVer::initial(),
        ))
        .unwrap();
        let before = doc.updated;
        store.save(&mut doc).unwrap();
        assert!(doc.updated >= before);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.document, doc);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join(".semtag"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_corrupt_file_reports_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, "{ not json").unwrap();
        let loaded = FileRegistry::new(&path).load().unwrap();
        assert!(loaded.document.is_empty());
        assert!(matches!(loaded.diagnostic, Some(RegistryError::Corrupt { .. })));
    }
}
