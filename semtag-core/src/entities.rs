//! Core entity structures

use crate::{
    ComponentId, ComponentStatus, ComponentType, SemVer, TagNamespace, TagScope, Timestamp,
    ValidationError,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("name regex is valid"));

/// Longest accepted component name (one DNS label).
pub const MAX_NAME_LEN: usize = 63;

/// Check that a component name is URL and hostname safe.
pub fn validate_component_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
            reason: format!("must be 1-{} characters", MAX_NAME_LEN),
        });
    }
    if !NAME_RE.is_match(name) {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
            reason: "use lowercase letters, digits and inner hyphens".to_string(),
        });
    }
    Ok(())
}

/// Turn an arbitrary string (usually a file stem) into a valid name.
/// Returns None when nothing usable remains.
pub fn sanitize_component_name(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = true;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let mut name = out.trim_matches('-').to_string();
    if name.len() > MAX_NAME_LEN {
        name.truncate(MAX_NAME_LEN);
        name = name.trim_end_matches('-').to_string();
    }
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// One cached release record.
///
/// A denormalized copy of what the tag hierarchy and commit log assert. It
/// can go stale; reconciliation checks `path` exists at `commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHistoryEntry {
    pub version: SemVer,
    pub commit: String,
    pub timestamp: Timestamp,
    pub path: String,
    pub message: String,
}

/// A tracked file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub path: String,
    pub version: SemVer,
    #[serde(default)]
    pub status: ComponentStatus,
    #[serde(default)]
    pub history: Vec<VersionHistoryEntry>,
    pub created: Timestamp,
    pub updated: Timestamp,
}

impl Component {
    /// Create a new active component at `version` with empty history.
    pub fn new(
        id: ComponentId,
        name: impl Into<String>,
        component_type: ComponentType,
        path: impl Into<String>,
        version: SemVer,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            component_type,
            path: path.into(),
            version,
            status: ComponentStatus::Active,
            history: Vec::new(),
            created: now,
            updated: now,
        }
    }

    /// Set the history entries.
    pub fn with_history(mut self, history: Vec<VersionHistoryEntry>) -> Self {
        self.history = history;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ComponentStatus::Active
    }

    pub fn tag_scope(&self, namespace: TagNamespace) -> TagScope {
        TagScope::new(namespace, self.component_type, self.name.clone())
    }

    /// Highest version recorded in history.
    pub fn latest_entry(&self) -> Option<&VersionHistoryEntry> {
        self.history.iter().max_by(|a, b| a.version.cmp(&b.version))
    }

    /// Append a history entry, advancing `version` if the entry is newer.
    pub fn record(&mut self, entry: VersionHistoryEntry) {
        if entry.version > self.version {
            self.version = entry.version.clone();
        }
        self.history.push(entry);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated = Utc::now();
    }

    /// The header this component's file should carry.
    pub fn expected_header(&self) -> FileHeader {
        FileHeader {
            version: self.version.clone(),
            component: self.name.clone(),
            component_id: Some(self.id.clone()),
        }
    }
}

/// Version metadata embedded in a component's own file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHeader {
    pub version: SemVer,
    pub component: String,
    pub component_id: Option<ComponentId>,
}
