//! Cross-context control messages
//!
//! An embedding frame starts and stops inspection with JSON messages; each
//! accepted message is answered with a status message.

use serde::{Deserialize, Serialize};

use super::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "inspector:start")]
    Start,
    #[serde(rename = "inspector:stop")]
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Acknowledged {
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "inspector:status")]
pub struct StatusMessage {
    pub acknowledged: Acknowledged,
    pub active: bool,
    pub mode: Mode,
}

/// Parse a control message; anything else yields `None`
pub fn parse_control(payload: &str) -> Option<ControlMessage> {
    match serde_json::from_str(payload) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::debug!("ignoring message: {}", e);
            None
        }
    }
}

/// Origins messages are accepted from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    allowed: Option<Vec<String>>,
}

impl OriginPolicy {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn only<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(origins.into_iter().map(Into::into).collect()),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        match &self.allowed {
            None => true,
            Some(list) => list.iter().any(|o| o == origin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_messages() {
        assert_eq!(
            parse_control(r#"{"type":"inspector:start"}"#),
            Some(ControlMessage::Start)
        );
        assert_eq!(
            parse_control(r#"{"type":"inspector:stop"}"#),
            Some(ControlMessage::Stop)
        );
    }

    #[test]
    fn test_unknown_messages_ignored() {
        assert_eq!(parse_control(r#"{"type":"inspector:pause"}"#), None);
        assert_eq!(parse_control(r#"{"kind":"inspector:start"}"#), None);
        assert_eq!(parse_control("not json"), None);
    }

    #[test]
    fn test_status_shape() {
        let status = StatusMessage {
            acknowledged: Acknowledged::Start,
            active: true,
            mode: Mode::Inspecting,
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            json!({
                "type": "inspector:status",
                "acknowledged": "start",
                "active": true,
                "mode": "inspecting"
            })
        );
    }

    #[test]
    fn test_origin_policy() {
        assert!(OriginPolicy::any().allows("https://anything.example"));
        let policy = OriginPolicy::only(["http://localhost:3000"]);
        assert!(policy.allows("http://localhost:3000"));
        assert!(!policy.allows("https://evil.example"));
    }
}
