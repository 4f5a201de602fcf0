/*!
Signaling messages exchanged between the player and the DuckSoup server.

Every frame is a JSON text `{"kind": ..., "payload": ...}`.
Outgoing payloads are themselves JSON-encoded strings, incoming ones
may be either an encoded string or an inline object.
*/

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::control::ControlPayload;
use crate::options::JoinPayload;

/// Raw frame as it travels over the `WebSocket`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message discriminant, e.g. `offer` or `error-full`
    pub kind: String,
    /// Optional payload, left untyped until `kind` is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// `SDP` offer or answer, shaped like the browser's `RTCSessionDescriptionInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// `offer`, `answer`, `pranswer` or `rollback`
    #[serde(rename = "type")]
    pub sdp_type: String,
    /// Session description text
    #[serde(default)]
    pub sdp: String,
}

impl SessionDescription {
    /// Wrap an answer `SDP`.
    #[must_use]
    pub fn answer(sdp: String) -> Self {
        Self {
            sdp_type: "answer".to_owned(),
            sdp,
        }
    }
}

/// ICE candidate, shaped like the browser's `RTCIceCandidateInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    /// Candidate attribute line
    pub candidate: String,
    /// Media stream identification tag
    #[serde(default)]
    pub sdp_mid: Option<String>,
    /// Index of the media description the candidate belongs to
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
    /// ICE username fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Messages the player sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// First message on an open socket, asks to join a room
    Join(JoinPayload),
    /// Answer to the server's offer
    Answer(SessionDescription),
    /// Local ICE candidate
    Candidate(IceCandidate),
    /// Runtime effect parameter change
    Control(ControlPayload),
}

impl ClientMessage {
    /// Name used in the `kind` field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match *self {
            Self::Join(_) => "join",
            Self::Answer(_) => "answer",
            Self::Candidate(_) => "candidate",
            Self::Control(_) => "control",
        }
    }

    /// Serialize into the text frame sent over the socket.
    ///
    /// # Errors
    /// Fails only if the payload cannot be represented as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let payload = match *self {
            Self::Join(ref join) => serde_json::to_string(join)?,
            Self::Answer(ref answer) => serde_json::to_string(answer)?,
            Self::Candidate(ref candidate) => serde_json::to_string(candidate)?,
            Self::Control(ref control) => serde_json::to_string(control)?,
        };
        serde_json::to_string(&Envelope {
            kind: self.kind().to_owned(),
            payload: Some(Value::String(payload)),
        })
    }
}

/// Messages the server sends to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Server offer, the player answers it
    Offer(SessionDescription),
    /// Remote ICE candidate
    Candidate(IceCandidate),
    /// Session started
    Start,
    /// Session is about to end
    Ending,
    /// Session ended
    End,
    /// Any `error*` kind, forwarded untouched to the embedding page
    Error {
        /// Full kind, e.g. `error-join`
        kind: String,
        /// Optional detail
        payload: Option<Value>,
    },
    /// Kind this player does not know about
    Unknown(String),
}

impl ServerMessage {
    /// Parse a text frame.
    ///
    /// # Errors
    /// Fails when the frame is not a JSON envelope or when an `offer`/`candidate`
    /// payload does not describe what its kind announces.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let Envelope { kind, payload } = serde_json::from_str(text)?;
        let message = match kind.as_str() {
            "offer" => Self::Offer(decode_payload(payload)?),
            "candidate" => Self::Candidate(decode_payload(payload)?),
            "start" => Self::Start,
            "ending" => Self::Ending,
            "end" => Self::End,
            _ if kind.starts_with("error") => Self::Error { kind, payload },
            _ => Self::Unknown(kind),
        };
        Ok(message)
    }
}

/// Payloads are usually strings holding JSON, but accept inline objects too.
fn decode_payload<T: DeserializeOwned>(payload: Option<Value>) -> serde_json::Result<T> {
    match payload {
        Some(Value::String(encoded)) => serde_json::from_str(&encoded),
        Some(value) => serde_json::from_value(value),
        None => serde_json::from_value(Value::Null),
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::control::TrackKind;

    #[test]
    fn parses_offer_with_encoded_payload() {
        let text = r#"{"kind":"offer","payload":"{\"type\":\"offer\",\"sdp\":\"v=0\\r\\n\"}"}"#;
        let message = ServerMessage::parse(text).unwrap();
        assert_eq!(
            message,
            ServerMessage::Offer(SessionDescription {
                sdp_type: "offer".to_owned(),
                sdp: "v=0\r\n".to_owned(),
            })
        );
    }

    #[test]
    fn parses_candidate_with_inline_payload() {
        let text = json!({
            "kind": "candidate",
            "payload": {"candidate": "candidate:1 1 udp 1 1.2.3.4 5 typ host", "sdpMid": "0", "sdpMLineIndex": 0}
        })
        .to_string();
        let ServerMessage::Candidate(candidate) = ServerMessage::parse(&text).unwrap() else {
            panic!("expected a candidate");
        };
        assert_eq!(candidate.sdp_mid.as_deref(), Some("0"));
        assert_eq!(candidate.sdp_m_line_index, Some(0));
        assert_eq!(candidate.username_fragment, None);
    }

    #[test]
    fn error_kinds_keep_their_name_and_payload() {
        let message = ServerMessage::parse(r#"{"kind":"error-full","payload":"room is full"}"#).unwrap();
        assert_eq!(
            message,
            ServerMessage::Error {
                kind: "error-full".to_owned(),
                payload: Some(json!("room is full")),
            }
        );
    }

    #[test]
    fn lifecycle_kinds_without_payload() {
        assert_eq!(ServerMessage::parse(r#"{"kind":"start"}"#).unwrap(), ServerMessage::Start);
        assert_eq!(ServerMessage::parse(r#"{"kind":"ending"}"#).unwrap(), ServerMessage::Ending);
        assert_eq!(ServerMessage::parse(r#"{"kind":"end"}"#).unwrap(), ServerMessage::End);
    }

    #[test]
    fn unknown_kind_is_not_an_error() {
        assert_eq!(
            ServerMessage::parse(r#"{"kind":"files","payload":{}}"#).unwrap(),
            ServerMessage::Unknown("files".to_owned())
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ServerMessage::parse("not json").is_err());
        assert!(ServerMessage::parse(r#"{"kind":"offer","payload":"{broken"}"#).is_err());
        assert!(ServerMessage::parse(r#"{"kind":"offer"}"#).is_err());
    }

    #[test]
    fn outgoing_payload_is_an_encoded_string() {
        let message = ClientMessage::Control(ControlPayload {
            kind: TrackKind::Audio,
            name: "pitch".to_owned(),
            property: "pitch".to_owned(),
            value: 1.2,
            duration: None,
        });
        let envelope: Envelope = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(envelope.kind, "control");
        let Some(Value::String(encoded)) = envelope.payload else {
            panic!("payload should be a string");
        };
        let payload: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            payload,
            json!({"kind": "audio", "name": "pitch", "property": "pitch", "value": 1.2})
        );
    }

    #[test]
    fn answer_is_sent_with_its_type() {
        let message = ClientMessage::Answer(SessionDescription::answer("v=0".to_owned()));
        let envelope: Envelope = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(envelope.kind, "answer");
        assert_eq!(
            envelope.payload,
            Some(Value::String(r#"{"type":"answer","sdp":"v=0"}"#.to_owned()))
        );
    }
}
