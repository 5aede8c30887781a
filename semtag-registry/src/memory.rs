//! In-memory backend for tests and dry runs

use crate::{Loaded, RegistryDocument, RegistryStore};
use semtag_core::SemtagResult;
use std::sync::{Arc, RwLock};

/// Registry held in memory. Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    document: Arc<RwLock<RegistryDocument>>,
    saves: Arc<RwLock<usize>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: RegistryDocument) -> Self {
        Self {
            document: Arc::new(RwLock::new(document)),
            saves: Arc::default(),
        }
    }

    /// Current stored document.
    pub fn snapshot(&self) -> RegistryDocument {
        self.document
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        *self.saves.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl RegistryStore for MemoryRegistry {
    fn load(&self) -> SemtagResult<Loaded> {
        Ok(Loaded::clean(self.snapshot()))
    }

    fn save(&self, document: &mut RegistryDocument) -> SemtagResult<()> {
        document.touch();
        *self.document.write().unwrap_or_else(|e| e.into_inner()) = document.clone();
        *self.saves.write().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
