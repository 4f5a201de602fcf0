/*!
Options provided by the embedding page and the `join` payload derived from them.
*/

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

/// STUN server used when the page does not provide its own `rtcConfig`.
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Codecs the server accepts for the video track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    /// `VP8`
    #[serde(rename = "VP8")]
    Vp8,
    /// `H264`
    #[serde(rename = "H264")]
    H264,
}

impl VideoCodec {
    /// Only the exact names are recognized.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "VP8" => Some(Self::Vp8),
            "H264" => Some(Self::H264),
            _ => None,
        }
    }
}

/// Peer options as passed by the embedding page.
///
/// Everything is optional here, numbers are kept loose (the page may pass numeric strings);
/// see [`PeerOptions::is_valid`] and [`JoinPayload`] for what is actually required and sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerOptions {
    /// Address of the signaling `WebSocket`
    pub signaling_url: Option<String>,
    /// Room to join
    pub room_id: Option<String>,
    /// Identifier of this participant
    pub user_id: Option<String>,
    /// Session length in seconds
    pub duration: Option<Value>,
    /// Expected number of participants
    pub size: Option<Value>,
    /// Requested processed video width
    pub width: Option<Value>,
    /// Requested processed video height
    pub height: Option<Value>,
    /// Requested processed video frame rate
    pub frame_rate: Option<Value>,
    /// Audio effect pipeline description
    pub audio_fx: Option<String>,
    /// Video effect pipeline description
    pub video_fx: Option<String>,
    /// Namespace used by the server to group recordings
    pub namespace: Option<String>,
    /// `VP8` or `H264`, anything else is dropped
    pub video_codec: Option<String>,
    /// `RTCConfiguration` passed to the peer connection as-is
    pub rtc_config: Option<Value>,
    /// Overrides of the default audio constraints
    pub audio: Option<Value>,
    /// Overrides of the default video constraints
    pub video: Option<Value>,
}

impl PeerOptions {
    /// Room and user must be set, duration must be a number.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.room_id.is_some() && self.user_id.is_some() && numeric(self.duration.as_ref()).is_some()
    }

    /// The page's `rtcConfig` or one with a single public STUN server.
    #[must_use]
    pub fn rtc_config(&self) -> Value {
        self.rtc_config.clone().unwrap_or_else(default_rtc_config)
    }

    /// Default constraints overridden by the page's `audio` and `video` objects.
    #[must_use]
    pub fn constraints(&self) -> MediaConstraints {
        MediaConstraints::merge(self.audio.as_ref(), self.video.as_ref())
    }
}

/// `RTCConfiguration` used when none is given.
#[must_use]
pub fn default_rtc_config() -> Value {
    json!({
        "iceServers": [{ "urls": DEFAULT_STUN_SERVER }],
    })
}

/// Payload of the `join` message.
///
/// Built from an explicit list of fields so that nothing else the page passes leaks to the server.
/// Absent fields are omitted from the JSON. Fields mirror [`PeerOptions`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_fx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_fx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<VideoCodec>,
}

impl From<&PeerOptions> for JoinPayload {
    fn from(options: &PeerOptions) -> Self {
        let number = |value: Option<&Value>| numeric(value).and_then(to_number);
        Self {
            room_id: options.room_id.clone(),
            user_id: options.user_id.clone(),
            duration: number(options.duration.as_ref()),
            size: number(options.size.as_ref()),
            width: number(options.width.as_ref()),
            height: number(options.height.as_ref()),
            audio_fx: options.audio_fx.clone(),
            video_fx: options.video_fx.clone(),
            frame_rate: number(options.frame_rate.as_ref()),
            namespace: options.namespace.clone(),
            video_codec: options
                .video_codec
                .as_deref()
                .and_then(VideoCodec::from_name),
        }
    }
}

/// `getUserMedia` constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaConstraints {
    /// Audio track constraints
    pub audio: Value,
    /// Video track constraints
    pub video: Value,
}

impl MediaConstraints {
    fn default_audio() -> Map<String, Value> {
        let Value::Object(audio) = json!({
            "sampleSize": 16,
            "channelCount": 1,
            "autoGainControl": false,
            "latency": { "ideal": 0.003 },
            "echoCancellation": false,
            "noiseSuppression": false,
        }) else {
            return Map::new();
        };
        audio
    }

    fn default_video() -> Map<String, Value> {
        let Value::Object(video) = json!({
            "width": { "ideal": 800 },
            "height": { "ideal": 600 },
            "frameRate": { "ideal": 30 },
            "facingMode": { "ideal": "user" },
        }) else {
            return Map::new();
        };
        video
    }

    /// Shallow merge of the overrides on top of the defaults, key by key.
    /// Overrides that are not objects are ignored.
    #[must_use]
    pub fn merge(audio: Option<&Value>, video: Option<&Value>) -> Self {
        Self {
            audio: Value::Object(shallow_merge(Self::default_audio(), audio)),
            video: Value::Object(shallow_merge(Self::default_video(), video)),
        }
    }
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self::merge(None, None)
    }
}

fn shallow_merge(mut base: Map<String, Value>, overrides: Option<&Value>) -> Map<String, Value> {
    if let Some(&Value::Object(ref overrides)) = overrides {
        for (key, value) in overrides {
            base.insert(key.clone(), value.clone());
        }
    }
    base
}

/// Numbers and numeric strings, like the page would coerce them.
fn numeric(value: Option<&Value>) -> Option<f64> {
    let number = match *value? {
        Value::Number(ref number) => number.as_f64(),
        Value::String(ref text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

/// Whole numbers are sent as integers, the server parses them as such.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::as_conversions,
    clippy::float_cmp
)]
fn to_number(value: f64) -> Option<Number> {
    let integer = value as i64;
    if integer as f64 == value {
        Some(Number::from(integer))
    } else {
        Number::from_f64(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn options(value: Value) -> PeerOptions {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn validity_requires_room_user_and_numeric_duration() {
        assert!(options(json!({"roomId": "r", "userId": "u", "duration": 30})).is_valid());
        assert!(options(json!({"roomId": "r", "userId": "u", "duration": "30"})).is_valid());
        assert!(!options(json!({"roomId": "r", "userId": "u"})).is_valid());
        assert!(!options(json!({"roomId": "r", "userId": "u", "duration": "soon"})).is_valid());
        assert!(!options(json!({"userId": "u", "duration": 30})).is_valid());
        assert!(!options(json!({"roomId": "r", "duration": 30})).is_valid());
    }

    #[test]
    fn join_payload_keeps_only_known_fields() {
        let options = options(json!({
            "signalingUrl": "wss://example.org/ws",
            "roomId": "room",
            "userId": "alice",
            "duration": 30,
            "width": "640",
            "height": "tall",
            "frameRate": 25.5,
            "videoCodec": "AV1",
            "audioFx": "pitch pitch=0.8",
            "rtcConfig": {"iceServers": []},
            "audio": {"echoCancellation": true},
        }));
        let join = serde_json::to_value(JoinPayload::from(&options)).unwrap();
        assert_eq!(
            join,
            json!({
                "roomId": "room",
                "userId": "alice",
                "duration": 30,
                "width": 640,
                "frameRate": 25.5,
                "audioFx": "pitch pitch=0.8",
            })
        );
    }

    #[test]
    fn known_video_codecs_are_kept() {
        let join = JoinPayload::from(&options(json!({"videoCodec": "H264"})));
        assert_eq!(join.video_codec, Some(VideoCodec::H264));
        let join = JoinPayload::from(&options(json!({"videoCodec": "VP8"})));
        assert_eq!(serde_json::to_value(join).unwrap(), json!({"videoCodec": "VP8"}));
        let join = JoinPayload::from(&options(json!({"videoCodec": "vp8"})));
        assert_eq!(join.video_codec, None);
    }

    #[test]
    fn constraints_override_defaults_key_by_key() {
        let options = options(json!({
            "audio": {"echoCancellation": true, "deviceId": "mic-2"},
            "video": false,
        }));
        let constraints = options.constraints();
        assert_eq!(constraints.audio["echoCancellation"], json!(true));
        assert_eq!(constraints.audio["deviceId"], json!("mic-2"));
        assert_eq!(constraints.audio["channelCount"], json!(1));
        assert_eq!(constraints.video, MediaConstraints::default().video);
        assert_eq!(constraints.video["width"], json!({"ideal": 800}));
    }

    #[test]
    fn rtc_config_falls_back_to_public_stun() {
        assert_eq!(
            PeerOptions::default().rtc_config(),
            json!({"iceServers": [{"urls": "stun:stun.l.google.com:19302"}]})
        );
        let custom = options(json!({"rtcConfig": {"iceServers": []}}));
        assert_eq!(custom.rtc_config(), json!({"iceServers": []}));
    }
}
