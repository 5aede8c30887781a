//! Repository walk for reconciliation

use crate::HeaderStore;
use semtag_core::{Classifier, ComponentType, Detection, FileHeader, SemtagResult};
use semtag_git::GitRepo;
use std::collections::BTreeSet;
use tracing::debug;

/// A candidate component file.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredFile {
    pub path: String,
    pub detection: Option<Detection>,
    pub header: Option<FileHeader>,
}

/// Files matched by the classifier or carrying a header, plus `extra`
/// paths (registered components) that exist. Sorted, deduplicated.
pub fn discover(
    git: &GitRepo,
    classifier: &Classifier,
    headers: &dyn HeaderStore,
    extra: &[String],
) -> SemtagResult<Vec<DiscoveredFile>> {
    let mut paths: BTreeSet<String> = git
        .list_files()?
        .into_iter()
        .filter(|p| !classifier.is_excluded(p))
        .collect();
    for path in extra {
        if git.root().join(path).is_file() {
            paths.insert(path.clone());
        }
    }
    let extra: BTreeSet<&String> = extra.iter().collect();

    let mut found = Vec::new();
    for path in paths {
        let detection = classifier.detect(&path);
        let header = headers.read(&path);
        if detection.is_none() && header.is_none() && !extra.contains(&path) {
            continue;
        }
        found.push(DiscoveredFile {
            path,
            detection,
            header,
        });
    }
    debug!(files = found.len(), "discovery finished");
    Ok(found)
}

/// Type for a file no rule matched: a path segment naming a type, else
/// config.
pub fn fallback_type(path: &str) -> ComponentType {
    path.split('/')
        .rev()
        .skip(1)
        .find_map(|segment| segment.parse::<ComponentType>().ok())
        .unwrap_or(ComponentType::Config)
}
