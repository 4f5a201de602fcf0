/*!
Messages handed to the embedding page's callback.
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::signal::ServerMessage;
use crate::stats::StatsPayload;

/// `{kind, payload?}` object passed to `embedOptions.callback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedMessage {
    /// `start`, `ending`, `end`, `stats`, `disconnection`, `error` or a server `error-*` kind
    pub kind: String,
    /// Detail attached to the kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl EmbedMessage {
    fn kind(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            payload: None,
        }
    }

    /// The server started the session.
    #[must_use]
    pub fn start() -> Self {
        Self::kind("start")
    }

    /// The session is about to end.
    #[must_use]
    pub fn ending() -> Self {
        Self::kind("ending")
    }

    /// The signaling socket closed.
    #[must_use]
    pub fn disconnection() -> Self {
        Self::kind("disconnection")
    }

    /// Local failure with a human readable reason.
    #[must_use]
    pub fn error(reason: impl Into<Value>) -> Self {
        Self {
            kind: "error".to_owned(),
            payload: Some(reason.into()),
        }
    }

    /// Bitrates of the last second.
    #[must_use]
    pub fn stats(stats: &StatsPayload) -> Self {
        Self {
            kind: "stats".to_owned(),
            payload: serde_json::to_value(stats).ok(),
        }
    }

    /// Whether this message ends the session from the page's point of view.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        matches!(self.kind.as_str(), "end" | "disconnection") || self.kind.starts_with("error")
    }
}

impl From<&ServerMessage> for EmbedMessage {
    fn from(message: &ServerMessage) -> Self {
        match *message {
            ServerMessage::Start => Self::start(),
            ServerMessage::Ending => Self::ending(),
            ServerMessage::End => Self::kind("end"),
            ServerMessage::Error {
                ref kind,
                ref payload,
            } => Self {
                kind: kind.clone(),
                payload: payload.clone(),
            },
            ServerMessage::Offer(_) => Self::kind("offer"),
            ServerMessage::Candidate(_) => Self::kind("candidate"),
            ServerMessage::Unknown(ref kind) => Self::kind(kind),
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn server_errors_are_forwarded_verbatim() {
        let message = ServerMessage::Error {
            kind: "error-duplicate".to_owned(),
            payload: Some(json!({"userId": "alice"})),
        };
        let embed = EmbedMessage::from(&message);
        assert!(embed.is_stop());
        assert_eq!(
            serde_json::to_value(&embed).unwrap(),
            json!({"kind": "error-duplicate", "payload": {"userId": "alice"}})
        );
    }

    #[test]
    fn lifecycle_messages_have_no_payload() {
        assert_eq!(
            serde_json::to_value(EmbedMessage::start()).unwrap(),
            json!({"kind": "start"})
        );
        assert!(!EmbedMessage::ending().is_stop());
        assert!(EmbedMessage::disconnection().is_stop());
        assert!(EmbedMessage::from(&ServerMessage::End).is_stop());
    }

    #[test]
    fn stats_payload_is_nested() {
        let stats = StatsPayload {
            audio_up: "1.0".to_owned(),
            audio_down: "0.0".to_owned(),
            video_up: "2.5".to_owned(),
            video_down: "0.0".to_owned(),
        };
        let embed = EmbedMessage::stats(&stats);
        assert!(!embed.is_stop());
        assert_eq!(embed.payload.unwrap()["videoUp"], json!("2.5"));
    }

    #[test]
    fn local_error_carries_reason() {
        let embed = EmbedMessage::error("Invalid DuckSoup options");
        assert_eq!(embed.kind, "error");
        assert_eq!(embed.payload, Some(json!("Invalid DuckSoup options")));
    }
}
