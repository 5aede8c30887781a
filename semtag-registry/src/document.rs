//! The registry document

use chrono::Utc;
use semtag_core::{
    new_component_id, Component, ComponentId, ComponentStatus, RegistryError, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// On-disk format version.
pub const REGISTRY_FORMAT_VERSION: u32 = 1;

/// `{version, components: {id -> Component}, updated}`.
///
/// A cache of what the repository asserts. Every mutation goes through the
/// methods here so the active-name uniqueness rule holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub version: u32,
    #[serde(default)]
    pub components: BTreeMap<ComponentId, Component>,
    pub updated: Timestamp,
}

impl Default for RegistryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryDocument {
    pub fn new() -> Self {
        Self {
            version: REGISTRY_FORMAT_VERSION,
            components: BTreeMap::new(),
            updated: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn touch(&mut self) {
        self.updated = Utc::now();
    }

    pub fn get(&self, id: &ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn get_mut(&mut self, id: &ComponentId) -> Option<&mut Component> {
        self.components.get_mut(id)
    }

    pub fn contains_id(&self, id: &ComponentId) -> bool {
        self.components.contains_key(id)
    }

    /// Components sorted by name, then id.
    pub fn components(&self) -> Vec<&Component> {
        let mut all: Vec<&Component> = self.components.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn active(&self) -> impl Iterator<Item = &Component> {
        self.components.values().filter(|c| c.is_active())
    }

    /// Active component with this name, else the most recently updated
    /// removed one.
    pub fn find_by_name(&self, name: &str) -> Option<&Component> {
        self.active().find(|c| c.name == name).or_else(|| {
            self.components
                .values()
                .filter(|c| c.name == name)
                .max_by_key(|c| c.updated)
        })
    }

    /// Component currently recorded at `path`, preferring active ones.
    pub fn find_by_path(&self, path: &str) -> Option<&Component> {
        self.active().find(|c| c.path == path).or_else(|| {
            self.components
                .values()
                .filter(|c| c.path == path)
                .max_by_key(|c| c.updated)
        })
    }

    /// Resolve a user-supplied key: component id first, then name.
    pub fn resolve(&self, key: &str) -> Result<&Component, RegistryError> {
        if let Ok(id) = ComponentId::parse(key) {
            if let Some(component) = self.components.get(&id) {
                return Ok(component);
            }
        }
        self.find_by_name(key)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                key: key.to_string(),
            })
    }

    /// True if an active component other than `except` uses `name`.
    pub fn name_taken(&self, name: &str, except: Option<&ComponentId>) -> bool {
        self.active()
            .any(|c| c.name == name && Some(&c.id) != except)
    }

    /// `base`, or `base-2`, `base-3`, ... whichever is free among active
    /// components.
    pub fn unique_name(&self, base: &str) -> String {
        if !self.name_taken(base, None) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.name_taken(&candidate, None) {
                return candidate;
            }
            n += 1;
        }
    }

    /// A random id not present in the document.
    pub fn fresh_id(&self) -> ComponentId {
        loop {
            let id = new_component_id();
            if !self.contains_id(&id) {
                return id;
            }
        }
    }

    /// Add a new component.
    pub fn insert(&mut self, component: Component) -> Result<(), RegistryError> {
        if self.contains_id(&component.id) {
            return Err(RegistryError::DuplicateId {
                id: component.id.to_string(),
            });
        }
        if component.is_active() && self.name_taken(&component.name, None) {
            let existing = self
                .find_by_name(&component.name)
                .map(|c| c.id.to_string())
                .unwrap_or_default();
            return Err(RegistryError::DuplicateName {
                name: component.name.clone(),
                existing,
            });
        }
        self.components.insert(component.id.clone(), component);
        Ok(())
    }

    /// Replace an existing component wholesale.
    pub fn replace(&mut self, component: Component) -> Result<(), RegistryError> {
        if !self.contains_id(&component.id) {
            return Err(RegistryError::ComponentNotFound {
                key: component.id.to_string(),
            });
        }
        if component.is_active() && self.name_taken(&component.name, Some(&component.id)) {
            let existing = self
                .find_by_name(&component.name)
                .map(|c| c.id.to_string())
                .unwrap_or_default();
            return Err(RegistryError::DuplicateName {
                name: component.name.clone(),
                existing,
            });
        }
        self.components.insert(component.id.clone(), component);
        Ok(())
    }

    pub fn set_status(
        &mut self,
        id: &ComponentId,
        status: ComponentStatus,
    ) -> Result<(), RegistryError> {
        let component = self
            .components
            .get_mut(id)
            .ok_or_else(|| RegistryError::ComponentNotFound { key: id.to_string() })?;
        component.status = status;
        component.touch();
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use semtag_core::{ComponentType, SemVer};

    fn component(name: &str, path: &str) -> Component {
        Component::new(
            new_component_id(),
            name,
            ComponentType::Prompt,
            path,
            SemVer::initial(),
        )
    }

    #[test]
    fn test_insert_rejects_duplicate_active_name() {
        let mut doc = RegistryDocument::new();
        doc.insert(component("a", "prompts/a.md")).unwrap();
        let err = doc.insert(component("a", "prompts/other/a.md")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));
    }

    #[test]
    fn test_removed_components_free_their_name() {
        let mut doc = RegistryDocument::new();
        let first = component("a", "prompts/a.md");
        let first_id = first.id.clone();
        doc.insert(first).unwrap();
        doc.set_status(&first_id, ComponentStatus::Removed).unwrap();
        let second = component("a", "prompts/new/a.md");
        let second_id = second.id.clone();
        doc.insert(second).unwrap();
        assert_eq!(doc.find_by_name("a").unwrap().id, second_id);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_unique_name_suffixes() {
        let mut doc = RegistryDocument::new();
        doc.insert(component("a", "x/a.md")).unwrap();
        assert_eq!(doc.unique_name("a"), "a-2");
        doc.insert(component("a-2", "y/a.md")).unwrap();
        assert_eq!(doc.unique_name("a"), "a-3");
        assert_eq!(doc.unique_name("b"), "b");
    }

    #[test]
    fn test_resolve_by_id_or_name() {
        let mut doc = RegistryDocument::new();
        let c = component("orders", "queries/orders.sql");
        let id = c.id.clone();
        doc.insert(c).unwrap();
        assert_eq!(doc.resolve(id.as_str()).unwrap().name, "orders");
        assert_eq!(doc.resolve("orders").unwrap().id, id);
        assert!(matches!(
            doc.resolve("missing"),
            Err(RegistryError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn test_find_by_path_prefers_active() {
        let mut doc = RegistryDocument::new();
        let old = component("old", "prompts/a.md");
        let old_id = old.id.clone();
        doc.insert(old).unwrap();
        doc.set_status(&old_id, ComponentStatus::Removed).unwrap();
        let new = component("new", "prompts/a.md");
        doc.insert(new).unwrap();
        assert_eq!(doc.find_by_path("prompts/a.md").unwrap().name, "new");
    }

    #[test]
    fn test_serde_shape() {
        let mut doc = RegistryDocument::new();
        let c = component("a", "prompts/a.md");
        let id = c.id.to_string();
        doc.insert(c).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["components"][&id]["name"], "a");
        let back: RegistryDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }
}
