//! Event path — the hierarchical identity of an event definition.
//!
//! Paths look like `/lighting/evening/porch`. They are compared
//! case-insensitively: `/Lighting/Porch` and `/lighting/porch` name the
//! same event. The original spelling is preserved for display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Hierarchical identity of an event definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventPath(String);

impl TryFrom<String> for EventPath {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<EventPath> for String {
    fn from(path: EventPath) -> Self {
        path.0
    }
}

impl EventPath {
    /// Parse and validate a path.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPath`] when the path is empty or
    /// does not start with `/`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.len() < 2 || !raw.starts_with('/') {
            return Err(ValidationError::InvalidPath);
        }
        Ok(Self(raw))
    }

    /// The path as originally spelled.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form used as a registry key.
    #[must_use]
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }

    /// Whether this path starts with `prefix`, compared case-insensitively.
    #[must_use]
    pub fn starts_with_ci(&self, prefix: &EventPath) -> bool {
        let key = self.key();
        let prefix = prefix.key();
        key.starts_with(&prefix)
    }

    /// Replace a case-insensitive prefix, keeping the remainder's spelling.
    ///
    /// Returns `None` when `old_prefix` does not match.
    #[must_use]
    pub fn replace_prefix_ci(&self, old_prefix: &EventPath, new_prefix: &EventPath) -> Option<Self> {
        if !self.starts_with_ci(old_prefix) {
            return None;
        }
        let rest = &self.0[old_prefix.as_str().len()..];
        Some(Self(format!("{}{rest}", new_prefix.as_str())))
    }
}

impl PartialEq for EventPath {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for EventPath {}

impl fmt::Display for EventPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EventPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_valid_path() {
        let path = EventPath::parse("/lighting/evening").unwrap();
        assert_eq!(path.as_str(), "/lighting/evening");
    }

    #[test]
    fn should_reject_empty_path() {
        assert_eq!(EventPath::parse(""), Err(ValidationError::InvalidPath));
    }

    #[test]
    fn should_reject_path_without_leading_slash() {
        assert_eq!(
            EventPath::parse("lighting/evening"),
            Err(ValidationError::InvalidPath)
        );
    }

    #[test]
    fn should_reject_bare_slash() {
        assert_eq!(EventPath::parse("/"), Err(ValidationError::InvalidPath));
    }

    #[test]
    fn should_compare_case_insensitively() {
        let a = EventPath::parse("/Lighting/Porch").unwrap();
        let b = EventPath::parse("/lighting/porch").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn should_match_prefix_case_insensitively() {
        let path = EventPath::parse("/Lighting/Porch/East").unwrap();
        let prefix = EventPath::parse("/lighting").unwrap();
        assert!(path.starts_with_ci(&prefix));
    }

    #[test]
    fn should_replace_prefix_preserving_remainder() {
        let path = EventPath::parse("/Lighting/Porch/East").unwrap();
        let old = EventPath::parse("/lighting").unwrap();
        let new = EventPath::parse("/outdoor").unwrap();
        let renamed = path.replace_prefix_ci(&old, &new).unwrap();
        assert_eq!(renamed.as_str(), "/outdoor/Porch/East");
    }

    #[test]
    fn should_not_replace_prefix_when_no_match() {
        let path = EventPath::parse("/climate/living").unwrap();
        let old = EventPath::parse("/lighting").unwrap();
        let new = EventPath::parse("/outdoor").unwrap();
        assert!(path.replace_prefix_ci(&old, &new).is_none());
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let path = EventPath::parse("/security/door").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/security/door\"");
        let parsed: EventPath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }
}
