//! Identity types for semtag components

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ValidationError;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Length of generated component ids, in hex characters.
pub const COMPONENT_ID_LEN: usize = 8;

/// Stable component identifier.
///
/// Short random hex string. The only immutable handle to a component: names
/// change, paths move, the id never does and is never reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Accept an id read from an external witness (file header, registry).
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        if value.is_empty() || value.len() > 64 {
            return Err(ValidationError::InvalidValue {
                field: "component_id".to_string(),
                reason: "must be 1-64 characters".to_string(),
            });
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidValue {
                field: "component_id".to_string(),
                reason: format!("'{}' contains characters outside [A-Za-z0-9_-]", value),
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a new random ComponentId.
pub fn new_component_id() -> ComponentId {
    let simple = Uuid::new_v4().simple().to_string();
    ComponentId(simple[..COMPONENT_ID_LEN].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_component_id_shape() {
        let id = new_component_id();
        assert_eq!(id.as_str().len(), COMPONENT_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_parse_rejects_spaces() {
        assert!(ComponentId::parse("ab cd").is_err());
        assert!(ComponentId::parse("").is_err());
        assert_eq!(ComponentId::parse(" ab12cd34 ").unwrap().as_str(), "ab12cd34");
    }
}
