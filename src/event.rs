//! Image update event types.
//!
//! Registry push notifications arrive as JSON payloads of the form:
//!
//! ```rust
//! use k8s_cd_deployer::event::{EventAction, ImageUpdateEvent};
//!
//! let payload = br#"{
//!   "action": "INSERT",
//!   "digest": "gcr.io/project/app@sha256:6ec128e26cd5",
//!   "tag": "gcr.io/project/app:INT"
//! }"#;
//!
//! let event = ImageUpdateEvent::decode(payload).unwrap();
//! assert_eq!(event.action, EventAction::Insert);
//! assert_eq!(event.tag, "gcr.io/project/app:INT");
//! ```

use crate::error::DeployerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change the registry reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventAction {
    /// An image was pushed or tagged
    Insert,
    /// Anything else (`DELETE`, future actions)
    Other(String),
}

impl From<String> for EventAction {
    fn from(value: String) -> Self {
        if value == "INSERT" {
            Self::Insert
        } else {
            Self::Other(value)
        }
    }
}

impl From<EventAction> for String {
    fn from(value: EventAction) -> Self {
        match value {
            EventAction::Insert => "INSERT".to_string(),
            EventAction::Other(other) => other,
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => f.write_str("INSERT"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// Decoded image update notification.
///
/// Scoped to one processing attempt and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUpdateEvent {
    /// What happened to the image
    pub action: EventAction,

    /// Full image reference including tag; empty for digest-only pushes
    #[serde(default)]
    pub tag: String,

    /// Content digest, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ImageUpdateEvent {
    /// Decode a transport payload.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::Decode` if the payload is not UTF-8 JSON with
    /// at least an `action` field.
    pub fn decode(payload: &[u8]) -> Result<Self, DeployerError> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| DeployerError::Decode(format!("payload is not UTF-8: {}", e)))?;

        serde_json::from_str(text).map_err(|e| DeployerError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_insert() {
        let payload = br#"{"action":"INSERT","digest":"repo/app@sha256:abc","tag":"repo/app:INT"}"#;
        let event = ImageUpdateEvent::decode(payload).unwrap();

        assert_eq!(event.action, EventAction::Insert);
        assert_eq!(event.tag, "repo/app:INT");
        assert_eq!(event.digest.as_deref(), Some("repo/app@sha256:abc"));
    }

    #[test]
    fn test_decode_other_action() {
        let payload = br#"{"action":"DELETE","tag":"repo/app:INT"}"#;
        let event = ImageUpdateEvent::decode(payload).unwrap();

        assert_eq!(event.action, EventAction::Other("DELETE".to_string()));
        assert_eq!(event.action.to_string(), "DELETE");
    }

    #[test]
    fn test_action_is_case_sensitive() {
        let event = ImageUpdateEvent::decode(br#"{"action":"insert","tag":"x"}"#).unwrap();
        assert_eq!(event.action, EventAction::Other("insert".to_string()));
    }

    #[test]
    fn test_decode_digest_only_push_has_empty_tag() {
        let payload = br#"{"action":"INSERT","digest":"repo/app@sha256:abc"}"#;
        let event = ImageUpdateEvent::decode(payload).unwrap();

        assert_eq!(event.tag, "");
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let payload = br#"{"action":"INSERT","tag":"repo/app:INT","timestamp":"2024-01-01"}"#;
        assert!(ImageUpdateEvent::decode(payload).is_ok());
    }

    #[test]
    fn test_decode_missing_action_fails() {
        let err = ImageUpdateEvent::decode(br#"{"tag":"repo/app:INT"}"#).unwrap_err();
        assert!(matches!(err, DeployerError::Decode(_)));
    }

    #[test]
    fn test_decode_invalid_json_fails() {
        let err = ImageUpdateEvent::decode(b"not json").unwrap_err();
        assert!(matches!(err, DeployerError::Decode(_)));
    }

    #[test]
    fn test_decode_non_utf8_fails() {
        let err = ImageUpdateEvent::decode(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }
}
