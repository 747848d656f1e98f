//! Event classification for the notification bus.
//!
//! Channels are a tagged union rather than bare event-name strings, so a
//! property literally named `"*"` or `"del"` can never collide with the
//! wildcard or deletion channels.

use serde::{Deserialize, Serialize};

/// Notification channel a subscription listens on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum Channel {
    /// Accepted writes to one specific property.
    Key(String),
    /// Accepted writes to any property.
    Wildcard,
    /// Property deletions.
    Deletion,
}

impl Channel {
    /// Channel for a specific property key.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Returns the property key when this is a per-key channel.
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(k) => Some(k),
            Self::Wildcard | Self::Deletion => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(k) => write!(f, "key:{k}"),
            Self::Wildcard => write!(f, "wildcard"),
            Self::Deletion => write!(f, "deletion"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_channel_accessors() {
        let ch = Channel::key("score");
        assert_eq!(ch.as_key(), Some("score"));
        assert_eq!(format!("{ch}"), "key:score");
    }

    #[test]
    fn test_reserved_names_do_not_collide_with_keys() {
        // A property named "*" lives on its own channel.
        assert_ne!(Channel::key("*"), Channel::Wildcard);
        assert_ne!(Channel::key("del"), Channel::Deletion);
        assert_eq!(Channel::key("*").as_key(), Some("*"));
        assert!(Channel::Wildcard.as_key().is_none());
        assert!(Channel::Deletion.as_key().is_none());
    }

    #[test]
    fn test_channel_display() {
        assert_eq!(format!("{}", Channel::Wildcard), "wildcard");
        assert_eq!(format!("{}", Channel::Deletion), "deletion");
    }

    #[test]
    fn test_channel_serialization() {
        let ch = Channel::key("greeting");
        let json = serde_json::to_string(&ch).unwrap();
        let back: Channel = serde_json::from_str(&json).unwrap();
        assert_eq!(ch, back);
    }
}
