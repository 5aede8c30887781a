//! Pattern-based component type detection
//!
//! An ordered list of `(glob, type, confidence)` rules. Every matching rule
//! is a candidate; the highest confidence wins and an earlier rule wins a
//! tie. Paths are repo-relative with forward slashes.

use crate::{sanitize_component_name, ComponentType, ConfigError, DiscoveryConfig};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

/// One detection rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRule {
    pub glob: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub confidence: f32,
}

impl DetectionRule {
    pub fn new(glob: &str, component_type: ComponentType, confidence: f32) -> Self {
        Self {
            glob: glob.to_string(),
            component_type,
            confidence,
        }
    }
}

/// Outcome of classifying one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub component_type: ComponentType,
    pub name: String,
    pub confidence: f32,
}

/// Paths never considered during discovery.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git/**", ".semtag/**", "**/node_modules/**", "target/**"];

/// Built-in rules, most specific first.
pub fn default_rules() -> Vec<DetectionRule> {
    use ComponentType::*;
    vec![
        DetectionRule::new("**/*.prompt", Prompt, 0.95),
        DetectionRule::new("**/*.prompt.*", Prompt, 0.95),
        DetectionRule::new("**/*.schema.json", Schema, 0.95),
        DetectionRule::new("**/*.agent.*", Agent, 0.95),
        DetectionRule::new("**/*.ensemble.*", Ensemble, 0.95),
        DetectionRule::new("**/*.tool.*", Tool, 0.95),
        DetectionRule::new("**/*.sql", Query, 0.9),
        DetectionRule::new("**/*.j2", Template, 0.85),
        DetectionRule::new("**/*.jinja", Template, 0.85),
        DetectionRule::new("**/*.config.*", Config, 0.85),
        DetectionRule::new("**/prompts/**", Prompt, 0.8),
        DetectionRule::new("**/schemas/**", Schema, 0.8),
        DetectionRule::new("**/queries/**", Query, 0.8),
        DetectionRule::new("**/agents/**", Agent, 0.8),
        DetectionRule::new("**/ensembles/**", Ensemble, 0.8),
        DetectionRule::new("**/tools/**", Tool, 0.8),
        DetectionRule::new("**/templates/**", Template, 0.8),
        DetectionRule::new("**/scripts/**", Script, 0.8),
        DetectionRule::new("**/configs/**", Config, 0.8),
        DetectionRule::new("**/*.sh", Script, 0.6),
    ]
}

/// Component name for a path: file name up to its first dot, sanitized.
pub fn derive_name_from_path(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let stem = file_name.split('.').next().unwrap_or(file_name);
    sanitize_component_name(stem)
}

/// Compiled rule list.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<DetectionRule>,
    set: GlobSet,
    excludes: GlobSet,
}

impl Classifier {
    /// Compile `rules` in order, plus exclusion globs.
    pub fn new(rules: Vec<DetectionRule>, excludes: &[String]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for rule in &rules {
            if !(0.0..=1.0).contains(&rule.confidence) {
                return Err(ConfigError::InvalidValue {
                    field: "discovery.rules.confidence".to_string(),
                    value: rule.confidence.to_string(),
                    reason: "must be between 0 and 1".to_string(),
                });
            }
            builder.add(compile_glob(&rule.glob)?);
        }
        let set = builder.build().map_err(|e| glob_error("discovery.rules", e))?;

        let mut exclude_builder = GlobSetBuilder::new();
        for glob in DEFAULT_EXCLUDES.iter().copied().chain(excludes.iter().map(String::as_str)) {
            exclude_builder.add(compile_glob(glob)?);
        }
        let excludes = exclude_builder
            .build()
            .map_err(|e| glob_error("discovery.exclude", e))?;

        Ok(Self {
            rules,
            set,
            excludes,
        })
    }

    /// Configured rules first, then the built-in ones.
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, ConfigError> {
        let mut rules = config.rules.clone();
        rules.extend(default_rules());
        Self::new(rules, &config.exclude)
    }

    pub fn rules(&self) -> &[DetectionRule] {
        &self.rules
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excludes.is_match(path)
    }

    /// Classify a path. None when excluded, unmatched, or no usable name.
    pub fn detect(&self, path: &str) -> Option<Detection> {
        if self.is_excluded(path) {
            return None;
        }
        let mut best: Option<&DetectionRule> = None;
        // GlobSet::matches returns indices in ascending order.
        for idx in self.set.matches(path) {
            let rule = &self.rules[idx];
            if best.map_or(true, |b| rule.confidence > b.confidence) {
                best = Some(rule);
            }
        }
        let rule = best?;
        Some(Detection {
            component_type: rule.component_type,
            name: derive_name_from_path(path)?,
            confidence: rule.confidence,
        })
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules(), &[]).expect("built-in discovery rules compile")
    }
}

fn compile_glob(glob: &str) -> Result<Glob, ConfigError> {
    Glob::new(glob).map_err(|e| ConfigError::InvalidValue {
        field: "discovery".to_string(),
        value: glob.to_string(),
        reason: e.to_string(),
    })
}

fn glob_error(field: &str, e: globset::Error) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: String::new(),
        reason: e.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
