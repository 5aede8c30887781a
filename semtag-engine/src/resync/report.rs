//! Reconciliation results

use semtag_core::{ComponentId, ComponentType, ReconcileError, SemVer};
use serde::Serialize;
use std::fmt;

/// One corrective action. Dry runs report the same list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fix {
    RegisterComponent {
        id: ComponentId,
        name: String,
        path: String,
        component_type: ComponentType,
        version: SemVer,
        /// Set when header and history disagreed on the version.
        note: Option<String>,
    },
    UpdatePath {
        id: ComponentId,
        name: String,
        from: String,
        to: String,
    },
    UpdateType {
        id: ComponentId,
        name: String,
        from: ComponentType,
        to: ComponentType,
    },
    Reactivate {
        id: ComponentId,
        name: String,
        path: String,
    },
    RepairHistoryEntry {
        id: ComponentId,
        name: String,
        version: SemVer,
        from_commit: String,
        to_commit: String,
    },
    DropHistoryEntry {
        id: ComponentId,
        name: String,
        version: SemVer,
        commit: String,
    },
    RebuildHistory {
        id: ComponentId,
        name: String,
        entries: usize,
    },
    MarkRemoved {
        id: ComponentId,
        name: String,
        path: String,
    },
    WriteHeader {
        id: ComponentId,
        name: String,
        path: String,
        version: SemVer,
    },
    ResolveVersionConflict {
        id: ComponentId,
        name: String,
        path: String,
        header: SemVer,
        registry: SemVer,
        resolved: SemVer,
    },
    RefreshHeader {
        id: ComponentId,
        name: String,
        path: String,
    },
}

fn short(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fix::RegisterComponent {
                name,
                path,
                component_type,
                version,
                note,
                ..
            } => {
                write!(f, "register {} {} at {} ({})", component_type, name, path, version)?;
                if let Some(note) = note {
                    write!(f, " - {}", note)?;
                }
                Ok(())
            }
            Fix::UpdatePath { name, from, to, .. } => {
                write!(f, "{}: path {} -> {}", name, from, to)
            }
            Fix::UpdateType { name, from, to, .. } => {
                write!(f, "{}: type {} -> {}", name, from, to)
            }
            Fix::Reactivate { name, path, .. } => write!(f, "{}: reactivated at {}", name, path),
            Fix::RepairHistoryEntry {
                name,
                version,
                from_commit,
                to_commit,
                ..
            } => write!(
                f,
                "{}: history {} moved {} -> {}",
                name,
                version,
                short(from_commit),
                short(to_commit)
            ),
            Fix::DropHistoryEntry {
                name,
                version,
                commit,
                ..
            } => write!(f, "{}: dropped history {} at {}", name, version, short(commit)),
            Fix::RebuildHistory { name, entries, .. } => {
                write!(f, "{}: rebuilt history ({} entries)", name, entries)
            }
            Fix::MarkRemoved { name, path, .. } => {
                write!(f, "{}: marked removed ({} is gone)", name, path)
            }
            Fix::WriteHeader {
                name,
                path,
                version,
                ..
            } => write!(f, "{}: write header {} to {}", name, version, path),
            Fix::ResolveVersionConflict {
                name,
                header,
                registry,
                resolved,
                ..
            } => write!(
                f,
                "{}: header {} vs registry {} resolved to {}",
                name, header, registry, resolved
            ),
            Fix::RefreshHeader { name, path, .. } => {
                write!(f, "{}: refresh stale header in {}", name, path)
            }
        }
    }
}

/// A file reconciliation could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
    pub dry_run: bool,
    pub scanned: usize,
    pub fixes: Vec<Fix>,
    pub failures: Vec<FileFailure>,
    /// Problems recovered from, such as a corrupt registry.
    pub diagnostics: Vec<String>,
}

impl ResyncReport {
    pub fn is_clean(&self) -> bool {
        self.fixes.is_empty() && self.failures.is_empty()
    }

    /// The error to exit with when some files failed.
    pub fn partial_failure(&self) -> Option<ReconcileError> {
        (!self.failures.is_empty()).then(|| ReconcileError::PartialFailure {
            failed: self.failures.len(),
            total: self.scanned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_serializes_with_kind() {
        let fix = Fix::MarkRemoved {
            id: ComponentId::parse("abcd1234").unwrap(),
            name: "a".to_string(),
            path: "prompts/a.md".to_string(),
        };
        let value = serde_json::to_value(&fix).unwrap();
        assert_eq!(value["kind"], "mark_removed");
        assert_eq!(value["id"], "abcd1234");
        assert_eq!(fix.to_string(), "a: marked removed (prompts/a.md is gone)");
    }

    #[test]
    fn test_partial_failure() {
        let mut report = ResyncReport {
            scanned: 3,
            ..Default::default()
        };
        assert!(report.partial_failure().is_none());
        report.failures.push(FileFailure {
            path: "x".to_string(),
            error: "boom".to_string(),
        });
        assert_eq!(
            report.partial_failure(),
            Some(ReconcileError::PartialFailure { failed: 1, total: 3 })
        );
    }
}
