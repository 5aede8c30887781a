//! Tag naming wire format
//!
//! Tags are `<namespace>/<type-plural>/<name>/<slot>`. The final slot is
//! either a semantic version (immutable release marker) or an environment
//! token (mutable deployment marker). Every call site that needs to tell the
//! two apart goes through [`classify_slot`].

use crate::{ComponentType, SemVer, TagError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static ENVIRONMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("environment regex is valid"));

static COMMIT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{4,40}$").expect("commit id regex is valid"));

/// Number of `/`-separated segments in every semtag tag.
pub const TAG_SEGMENTS: usize = 4;

// ============================================================================
// NAMESPACE
// ============================================================================

/// Top-level tag namespace, picked by entity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TagNamespace {
    #[default]
    Components,
    Logic,
}

impl TagNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagNamespace::Components => "components",
            TagNamespace::Logic => "logic",
        }
    }
}

impl fmt::Display for TagNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagNamespace {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "components" => Ok(TagNamespace::Components),
            "logic" => Ok(TagNamespace::Logic),
            other => Err(TagError::MalformedTag {
                tag: other.to_string(),
                reason: "namespace must be 'components' or 'logic'".to_string(),
            }),
        }
    }
}

// ============================================================================
// SLOT CLASSIFICATION
// ============================================================================

/// Interpretation of the final tag segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSlot {
    Version(SemVer),
    Environment(String),
}

impl TagSlot {
    pub fn is_version(&self) -> bool {
        matches!(self, TagSlot::Version(_))
    }

    pub fn version(&self) -> Option<&SemVer> {
        match self {
            TagSlot::Version(v) => Some(v),
            TagSlot::Environment(_) => None,
        }
    }
}

/// Decide whether a slot names a version or an environment.
pub fn classify_slot(slot: &str) -> TagSlot {
    match SemVer::parse(slot) {
        Ok(version) => TagSlot::Version(version),
        Err(_) => TagSlot::Environment(slot.to_string()),
    }
}

/// Check that `env` can be used as a deployment slot.
pub fn validate_environment(env: &str) -> Result<(), TagError> {
    let invalid = |reason: &str| TagError::InvalidEnvironment {
        value: env.to_string(),
        reason: reason.to_string(),
    };
    if env.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if !ENVIRONMENT_RE.is_match(env) {
        return Err(invalid("allowed characters are [A-Za-z0-9._-]"));
    }
    if classify_slot(env).is_version() {
        return Err(invalid("looks like a version; environments must not"));
    }
    Ok(())
}

/// True if `value` has the shape of a (possibly abbreviated) commit id.
pub fn is_commit_id_shape(value: &str) -> bool {
    COMMIT_ID_RE.is_match(value)
}

// ============================================================================
// SCOPE (one component's corner of the hierarchy)
// ============================================================================

/// Address of one component inside the tag hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagScope {
    pub namespace: TagNamespace,
    pub type_segment: String,
    pub name: String,
}

impl TagScope {
    pub fn new(namespace: TagNamespace, component_type: ComponentType, name: impl Into<String>) -> Self {
        Self {
            namespace,
            type_segment: component_type.plural().to_string(),
            name: name.into(),
        }
    }

    /// `<namespace>/<type-plural>/<name>`
    pub fn prefix(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.type_segment, self.name)
    }

    /// Full tag name for `slot` (no validation).
    pub fn tag(&self, slot: &str) -> String {
        format!("{}/{}", self.prefix(), slot)
    }

    pub fn version_tag(&self, version: &SemVer) -> String {
        self.tag(&version.tag_slot())
    }

    pub fn deployment_tag(&self, environment: &str) -> Result<String, TagError> {
        validate_environment(environment)?;
        Ok(self.tag(environment))
    }

    /// Accept either a bare slot (`v1.0.0`, `prod`) or a full tag name that
    /// belongs to this scope; return the full tag name.
    pub fn qualify(&self, tag_or_slot: &str) -> Result<String, TagError> {
        if tag_or_slot.contains('/') {
            let parsed = TagName::parse(tag_or_slot)?;
            if !self.owns(&parsed) {
                return Err(TagError::MalformedTag {
                    tag: tag_or_slot.to_string(),
                    reason: format!("does not belong to {}", self.prefix()),
                });
            }
            return Ok(parsed.to_string());
        }
        Ok(self.tag(tag_or_slot))
    }

    pub fn owns(&self, tag: &TagName) -> bool {
        tag.namespace == self.namespace
            && tag.type_segment == self.type_segment
            && tag.name == self.name
    }
}

impl fmt::Display for TagScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix())
    }
}

// ============================================================================
// TAG NAME
// ============================================================================

/// A parsed four-segment tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagName {
    pub namespace: TagNamespace,
    pub type_segment: String,
    pub name: String,
    pub slot: String,
}

impl TagName {
    pub fn parse(tag: &str) -> Result<Self, TagError> {
        let segments: Vec<&str> = tag.split('/').collect();
        if segments.len() != TAG_SEGMENTS {
            return Err(TagError::MalformedTag {
                tag: tag.to_string(),
                reason: format!(
                    "expected {} segments, found {}",
                    TAG_SEGMENTS,
                    segments.len()
                ),
            });
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(TagError::MalformedTag {
                tag: tag.to_string(),
                reason: "empty segment".to_string(),
            });
        }
        let namespace = segments[0].parse::<TagNamespace>().map_err(|_| TagError::MalformedTag {
            tag: tag.to_string(),
            reason: format!("unknown namespace '{}'", segments[0]),
        })?;
        Ok(Self {
            namespace,
            type_segment: segments[1].to_string(),
            name: segments[2].to_string(),
            slot: segments[3].to_string(),
        })
    }

    pub fn kind(&self) -> TagSlot {
        classify_slot(&self.slot)
    }

    pub fn component_type(&self) -> Option<ComponentType> {
        ComponentType::from_plural(&self.type_segment)
    }

    pub fn scope(&self) -> TagScope {
        TagScope {
            namespace: self.namespace,
            type_segment: self.type_segment.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.namespace, self.type_segment, self.name, self.slot
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_slot() {
        assert_eq!(
            classify_slot("v1.2.3"),
            TagSlot::Version(SemVer::new(1, 2, 3))
        );
        assert_eq!(classify_slot("1.2.3"), TagSlot::Version(SemVer::new(1, 2, 3)));
        assert_eq!(classify_slot("prod"), TagSlot::Environment("prod".to_string()));
        assert_eq!(classify_slot("v1.2"), TagSlot::Environment("v1.2".to_string()));
    }

    #[test]
    fn test_validate_environment() {
        assert!(validate_environment("prod").is_ok());
        assert!(validate_environment("canary-eu.1").is_ok());
        assert!(validate_environment("").is_err());
        assert!(validate_environment("v1.0.0").is_err());
        assert!(validate_environment("a/b").is_err());
        assert!(validate_environment("-x").is_err());
    }

    #[test]
    fn test_commit_id_shape() {
        assert!(is_commit_id_shape("abc1234"));
        assert!(is_commit_id_shape("1234567"));
        assert!(!is_commit_id_shape("prod"));
        assert!(!is_commit_id_shape("v1.0.0"));
        assert!(!is_commit_id_shape("abc"));
    }

    #[test]
    fn test_parse_tag_name() {
        let tag = TagName::parse("components/prompts/extraction/v1.0.0").unwrap();
        assert_eq!(tag.namespace, TagNamespace::Components);
        assert_eq!(tag.type_segment, "prompts");
        assert_eq!(tag.name, "extraction");
        assert!(tag.kind().is_version());
        assert_eq!(tag.component_type(), Some(ComponentType::Prompt));
        assert_eq!(tag.to_string(), "components/prompts/extraction/v1.0.0");
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        assert!(TagName::parse("components/prompts/v1.0.0").is_err());
        assert!(TagName::parse("components/prompts/a/b/v1.0.0").is_err());
        assert!(TagName::parse("v1.0.0").is_err());
        assert!(TagName::parse("components//a/prod").is_err());
        assert!(TagName::parse("other/prompts/a/prod").is_err());
    }

    #[test]
    fn test_scope_tags() {
        let scope = TagScope::new(TagNamespace::Components, ComponentType::Query, "orders");
        assert_eq!(scope.prefix(), "components/queries/orders");
        assert_eq!(
            scope.version_tag(&SemVer::new(2, 0, 1)),
            "components/queries/orders/v2.0.1"
        );
        assert_eq!(
            scope.deployment_tag("prod").unwrap(),
            "components/queries/orders/prod"
        );
        assert!(scope.deployment_tag("v1.0.0").is_err());
    }

    #[test]
    fn test_scope_qualify() {
        let scope = TagScope::new(TagNamespace::Logic, ComponentType::Tool, "fetch");
        assert_eq!(scope.qualify("prod").unwrap(), "logic/tools/fetch/prod");
        assert_eq!(
            scope.qualify("logic/tools/fetch/v1.0.0").unwrap(),
            "logic/tools/fetch/v1.0.0"
        );
        assert!(scope.qualify("logic/tools/other/v1.0.0").is_err());
    }
}
