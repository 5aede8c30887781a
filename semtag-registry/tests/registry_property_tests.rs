//! Property-Based Tests for Registry Persistence
//!
//! Property: whatever components a document holds, saving it to disk and
//! loading it back yields the same components, and name lookups keep
//! resolving to the same ids.

use proptest::prelude::*;
use semtag_core::Component;
use semtag_registry::{FileRegistry, RegistryDocument, RegistryStore};
use semtag_test_utils::generators::{arb_component, arb_history_entry};

/// Components with distinct ids and names, each carrying some history.
fn arb_components() -> impl Strategy<Value = Vec<Component>> {
    prop::collection::vec(arb_component(), 0..8).prop_flat_map(|components| {
        let strategies: Vec<_> = components
            .into_iter()
            .map(|c| {
                let path = c.path.clone();
                prop::collection::vec(arb_history_entry(path), 0..4)
                    .prop_map(move |history| c.clone().with_history(history))
            })
            .collect();
        strategies
    })
}

fn document_of(components: Vec<Component>) -> RegistryDocument {
    let mut doc = RegistryDocument::new();
    for component in components {
        // Generated duplicates are simply skipped.
        let _ = doc.insert(component);
    }
    doc
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_save_then_load_preserves_components(components in arb_components()) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRegistry::new(dir.path().join(".semtag/registry.json"));
        let mut doc = document_of(components);
        store.save(&mut doc).unwrap();

        let loaded = store.load().unwrap();
        prop_assert!(loaded.diagnostic.is_none());
        prop_assert_eq!(loaded.document.len(), doc.len());
        for component in doc.components() {
            prop_assert_eq!(loaded.document.get(&component.id), Some(component));
        }
    }

    #[test]
    fn prop_names_resolve_to_the_same_ids(components in arb_components()) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRegistry::new(dir.path().join("registry.json"));
        let mut doc = document_of(components);
        store.save(&mut doc).unwrap();
        let loaded = store.load().unwrap().document;

        for component in doc.components() {
            let resolved = loaded.resolve(&component.name).unwrap();
            prop_assert_eq!(&resolved.id, &component.id);
            let by_id = loaded.resolve(component.id.as_str()).unwrap();
            prop_assert_eq!(&by_id.name, &component.name);
        }
    }

    #[test]
    fn prop_unique_name_is_free(components in arb_components(), base in "[a-z]{1,6}") {
        let doc = document_of(components);
        let name = doc.unique_name(&base);
        prop_assert!(!doc.name_taken(&name, None));
        prop_assert!(name.starts_with(&base));
    }
}

#[test]
fn saving_over_a_corrupt_file_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    std::fs::write(&path, "[1, 2").unwrap();
    let store = FileRegistry::new(&path);

    let loaded = store.load().unwrap();
    assert!(loaded.document.is_empty());
    assert!(loaded.diagnostic.is_some());

    let mut doc = loaded.document;
    store.save(&mut doc).unwrap();
    let reloaded = store.load().unwrap();
    assert!(reloaded.diagnostic.is_none());
    assert_eq!(reloaded.document.version, semtag_registry::REGISTRY_FORMAT_VERSION);
}
