//! Event list kinds — the three registries managed by the engine.

use serde::{Deserialize, Serialize};

/// Which registry list an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Scheduled,
    Triggered,
    Monitor,
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheduled => f.write_str("scheduled"),
            Self::Triggered => f.write_str("triggered"),
            Self::Monitor => f.write_str("monitor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_lowercase_names() {
        assert_eq!(ListKind::Scheduled.to_string(), "scheduled");
        assert_eq!(ListKind::Triggered.to_string(), "triggered");
        assert_eq!(ListKind::Monitor.to_string(), "monitor");
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let json = serde_json::to_string(&ListKind::Monitor).unwrap();
        assert_eq!(json, "\"monitor\"");
        let parsed: ListKind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ListKind::Monitor);
    }
}
