//! Enum types for semtag components

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// COMPONENT TYPE
// ============================================================================

/// Content category of a component. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Prompt,
    Schema,
    Query,
    Config,
    Script,
    Template,
    /// Agent definition
    #[serde(alias = "agent-definition")]
    Agent,
    Ensemble,
    Tool,
}

impl ComponentType {
    pub const ALL: [ComponentType; 9] = [
        ComponentType::Prompt,
        ComponentType::Schema,
        ComponentType::Query,
        ComponentType::Config,
        ComponentType::Script,
        ComponentType::Template,
        ComponentType::Agent,
        ComponentType::Ensemble,
        ComponentType::Tool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Prompt => "prompt",
            ComponentType::Schema => "schema",
            ComponentType::Query => "query",
            ComponentType::Config => "config",
            ComponentType::Script => "script",
            ComponentType::Template => "template",
            ComponentType::Agent => "agent",
            ComponentType::Ensemble => "ensemble",
            ComponentType::Tool => "tool",
        }
    }

    /// Plural form used as the second tag segment.
    pub fn plural(&self) -> &'static str {
        match self {
            ComponentType::Prompt => "prompts",
            ComponentType::Schema => "schemas",
            ComponentType::Query => "queries",
            ComponentType::Config => "configs",
            ComponentType::Script => "scripts",
            ComponentType::Template => "templates",
            ComponentType::Agent => "agents",
            ComponentType::Ensemble => "ensembles",
            ComponentType::Tool => "tools",
        }
    }

    pub fn from_plural(plural: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.plural() == plural)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "agent-definition" || normalized == "agent_definition" {
            return Ok(ComponentType::Agent);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized || t.plural() == normalized)
            .ok_or(ValidationError::UnknownType {
                value: s.to_string(),
            })
    }
}

// ============================================================================
// COMPONENT STATUS
// ============================================================================

/// Lifecycle status of a registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    #[default]
    Active,
    /// File disappeared; kept for history, never hard-deleted.
    Removed,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Active => "active",
            ComponentStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_type_plural_roundtrip() {
        for t in ComponentType::ALL {
            assert_eq!(ComponentType::from_plural(t.plural()), Some(t));
        }
        assert_eq!(ComponentType::from_plural("widgets"), None);
    }

    #[test]
    fn test_component_type_from_str_accepts_aliases() {
        assert_eq!("prompt".parse::<ComponentType>().unwrap(), ComponentType::Prompt);
        assert_eq!("Queries".parse::<ComponentType>().unwrap(), ComponentType::Query);
        assert_eq!(
            "agent-definition".parse::<ComponentType>().unwrap(),
            ComponentType::Agent
        );
        assert!("widget".parse::<ComponentType>().is_err());
    }

    #[test]
    fn test_component_type_serde_lowercase() {
        let json = serde_json::to_string(&ComponentType::Ensemble).unwrap();
        assert_eq!(json, "\"ensemble\"");
        let agent: ComponentType = serde_json::from_str("\"agent-definition\"").unwrap();
        assert_eq!(agent, ComponentType::Agent);
    }
}
