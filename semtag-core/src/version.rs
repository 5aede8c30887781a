//! Semantic versions as used in version tags and file headers

use crate::TagError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

static SEMVER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(v)?(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .expect("semver regex is valid")
});

/// A `MAJOR.MINOR.PATCH[-pre]` version.
///
/// Ordering is numeric on (major, minor, patch); for equal triples a
/// prerelease sorts before the release.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
}

impl SemVer {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// The version every component starts at.
    pub const fn initial() -> Self {
        Self::new(1, 0, 0)
    }

    /// Parse strict semver, with or without a leading `v`.
    pub fn parse(value: &str) -> Result<Self, TagError> {
        Self::parse_inner(value, false)
    }

    /// Parse the exact version-tag slot syntax: `v` prefix required.
    pub fn parse_tag(value: &str) -> Result<Self, TagError> {
        Self::parse_inner(value, true)
    }

    fn parse_inner(value: &str, require_v: bool) -> Result<Self, TagError> {
        let invalid = || TagError::InvalidVersion {
            value: value.to_string(),
        };
        let caps = SEMVER_RE.captures(value).ok_or_else(invalid)?;
        if require_v && caps.get(1).is_none() {
            return Err(invalid());
        }
        let number = |idx: usize| -> Result<u64, TagError> {
            caps.get(idx)
                .ok_or_else(invalid)?
                .as_str()
                .parse::<u64>()
                .map_err(|_| invalid())
        };
        Ok(Self {
            major: number(2)?,
            minor: number(3)?,
            patch: number(4)?,
            pre: caps.get(5).map(|m| m.as_str().to_string()),
        })
    }

    /// Best-effort parse for values written by hand (file headers, foreign
    /// tags). Missing or non-numeric parts count as zero.
    pub fn parse_lenient(value: &str) -> Self {
        let trimmed = value.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let (core, pre) = match trimmed.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some((core, _)) => (core, None),
            None => (trimmed, None),
        };
        let mut parts = core.split('.').map(leading_number);
        Self {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
            pre,
        }
    }

    /// Returns true if `value` is strict semver (optionally `v`-prefixed).
    pub fn is_version_like(value: &str) -> bool {
        SEMVER_RE.is_match(value)
    }

    /// Next patch release. Fails when the patch number is already at its
    /// maximum.
    pub fn bump_patch(&self) -> Result<Self, TagError> {
        let patch = self.patch.checked_add(1).ok_or_else(|| self.exhausted())?;
        Ok(Self::new(self.major, self.minor, patch))
    }

    pub fn bump_minor(&self) -> Result<Self, TagError> {
        let minor = self.minor.checked_add(1).ok_or_else(|| self.exhausted())?;
        Ok(Self::new(self.major, minor, 0))
    }

    pub fn bump_major(&self) -> Result<Self, TagError> {
        let major = self.major.checked_add(1).ok_or_else(|| self.exhausted())?;
        Ok(Self::new(major, 0, 0))
    }

    fn exhausted(&self) -> TagError {
        TagError::InvalidVersion {
            value: self.to_string(),
        }
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// The numeric triple used for ordering.
    pub fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// Slot form used in version tags, e.g. `v1.2.3`.
    pub fn tag_slot(&self) -> String {
        format!("v{}", self)
    }
}

/// Leading digits of `part`; zero when there are none, `u64::MAX` when
/// they do not fit.
fn leading_number(part: &str) -> u64 {
    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple()
            .cmp(&other.triple())
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl FromStr for SemVer {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SemVer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemVer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw).unwrap_or_else(|_| Self::parse_lenient(&raw)))
    }
}

/// Sort key for a tag slot: strict versions parse exactly, anything else
/// falls back to the lenient parse so malformed parts count as zero.
pub fn version_sort_key(slot: &str) -> SemVer {
    SemVer::parse(slot).unwrap_or_else(|_| SemVer::parse_lenient(slot))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix() {
        assert_eq!(SemVer::parse("1.2.3").unwrap(), SemVer::new(1, 2, 3));
        assert_eq!(SemVer::parse("v1.2.3").unwrap(), SemVer::new(1, 2, 3));
        let pre = SemVer::parse("v2.0.0-rc.1").unwrap();
        assert_eq!(pre.pre.as_deref(), Some("rc.1"));
    }

    #[test]
    fn test_parse_tag_requires_prefix() {
        assert!(SemVer::parse_tag("1.2.3").is_err());
        assert!(SemVer::parse_tag("v1.2.3").is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["1.2", "v1", "1.2.3.4", "01.2.3", "v1.2.x", "prod", "", "v1.2.3-"] {
            assert!(SemVer::parse(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        let a = SemVer::parse("v1.9.0").unwrap();
        let b = SemVer::parse("v1.10.0").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        let rc = SemVer::parse("1.0.0-rc.1").unwrap();
        let rc2 = SemVer::parse("1.0.0-rc.2").unwrap();
        let rel = SemVer::parse("1.0.0").unwrap();
        assert!(rc < rc2);
        assert!(rc2 < rel);
    }

    #[test]
    fn test_parse_lenient_fills_zeros() {
        assert_eq!(SemVer::parse_lenient("1.2"), SemVer::new(1, 2, 0));
        assert_eq!(SemVer::parse_lenient("v3"), SemVer::new(3, 0, 0));
        assert_eq!(SemVer::parse_lenient("garbage"), SemVer::new(0, 0, 0));
        assert_eq!(SemVer::parse_lenient("2.x.7"), SemVer::new(2, 0, 7));
    }

    #[test]
    fn test_bumps() {
        let v = SemVer::new(1, 2, 3);
        assert_eq!(v.bump_patch().unwrap(), SemVer::new(1, 2, 4));
        assert_eq!(v.bump_minor().unwrap(), SemVer::new(1, 3, 0));
        assert_eq!(v.bump_major().unwrap(), SemVer::new(2, 0, 0));
    }

    #[test]
    fn test_bumps_at_the_numeric_limit_fail() {
        let v = SemVer::new(1, 0, u64::MAX);
        assert!(matches!(
            v.bump_patch(),
            Err(TagError::InvalidVersion { .. })
        ));
        assert!(SemVer::new(1, u64::MAX, 3).bump_minor().is_err());
        assert!(SemVer::new(u64::MAX, 0, 0).bump_major().is_err());
    }

    #[test]
    fn test_parse_lenient_saturates_oversized_numbers() {
        assert_eq!(
            SemVer::parse_lenient("1.0.18446744073709551615"),
            SemVer::new(1, 0, u64::MAX)
        );
        assert_eq!(
            SemVer::parse_lenient("1.0.99999999999999999999999"),
            SemVer::new(1, 0, u64::MAX)
        );
    }

    #[test]
    fn test_display_and_tag_slot() {
        let v = SemVer::parse("v1.4.0-beta").unwrap();
        assert_eq!(v.to_string(), "1.4.0-beta");
        assert_eq!(v.tag_slot(), "v1.4.0-beta");
    }

    #[test]
    fn test_serde_as_string() {
        let v = SemVer::new(1, 2, 3);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let back: SemVer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        let lenient: SemVer = serde_json::from_str("\"1.2\"").unwrap();
        assert_eq!(lenient, SemVer::new(1, 2, 0));
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Ordering agrees with the numeric triple, never with string order.
        #[test]
        fn prop_order_matches_numeric_triple(
            a in (0u64..50, 0u64..50, 0u64..50),
            b in (0u64..50, 0u64..50, 0u64..50),
        ) {
            let va = SemVer::new(a.0, a.1, a.2);
            let vb = SemVer::new(b.0, b.1, b.2);
            prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
        }

        /// Every strict tag slot parses back to the same version.
        #[test]
        fn prop_tag_slot_parses(major in 0u64..1000, minor in 0u64..1000, patch in 0u64..1000) {
            let v = SemVer::new(major, minor, patch);
            prop_assert_eq!(SemVer::parse_tag(&v.tag_slot()).unwrap(), v);
        }

        /// A patch bump is always strictly greater.
        #[test]
        fn prop_bump_patch_is_greater(major in 0u64..1000, minor in 0u64..1000, patch in 0u64..1000) {
            let v = SemVer::new(major, minor, patch);
            prop_assert!(v.bump_patch().unwrap() > v);
        }
    }
}
