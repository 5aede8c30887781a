//! semtag Registry - Side-Registry Storage
//!
//! The side-registry maps stable component ids to name, type, path, version
//! and a cached release history. It is never the source of truth: the tag
//! hierarchy and commit log are, and reconciliation can rebuild this file
//! from them at any time.

mod document;
mod file;
mod memory;

pub use document::{RegistryDocument, REGISTRY_FORMAT_VERSION};
pub use file::FileRegistry;
pub use memory::MemoryRegistry;

use semtag_core::{RegistryError, SemtagResult};

/// Result of loading a registry.
///
/// A malformed registry loads as empty; `diagnostic` then carries the
/// corruption so callers can report it.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub document: RegistryDocument,
    pub diagnostic: Option<RegistryError>,
}

impl Loaded {
    pub fn clean(document: RegistryDocument) -> Self {
        Self {
            document,
            diagnostic: None,
        }
    }
}

/// Storage backend for the registry document.
pub trait RegistryStore: Send + Sync {
    /// Load the document. Missing storage yields an empty document.
    fn load(&self) -> SemtagResult<Loaded>;

    /// Persist the document after bumping its `updated` timestamp.
    fn save(&self, document: &mut RegistryDocument) -> SemtagResult<()>;

    /// Human-readable location for messages.
    fn location(&self) -> String;
}
