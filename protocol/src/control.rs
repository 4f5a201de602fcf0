/*!
Runtime control of the server-side audio/video effects.
*/

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Media kind a control, a track or a stats report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Microphone track and audio effects
    Audio,
    /// Camera track and video effects
    Video,
}

impl TrackKind {
    /// Parse the browser's `MediaStreamTrack.kind` string.
    #[must_use]
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    /// Name used on the wire and as an HTML tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl Display for TrackKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effect parameter change, interpolated by the server over `duration` milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPayload {
    /// Which pipeline the effect lives in
    pub kind: TrackKind,
    /// Effect name as given in `audioFx`/`videoFx`
    pub name: String,
    /// Effect property to change
    pub property: String,
    /// Target value
    pub value: f64,
    /// Transition length in milliseconds, instant when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl ControlPayload {
    /// Build a payload from loosely typed arguments coming from the embedding page.
    ///
    /// Returns `None` unless `name` and `property` are strings, `value` is a number
    /// and `duration` is either absent or a non-negative number.
    /// A zero duration is dropped, fractional ones are rounded to whole milliseconds.
    #[must_use]
    pub fn checked(
        kind: TrackKind,
        name: &Value,
        property: &Value,
        value: &Value,
        duration: Option<&Value>,
    ) -> Option<Self> {
        let name = name.as_str()?;
        let property = property.as_str()?;
        let value = value.as_f64()?;
        let duration = match duration {
            None => None,
            Some(duration) => {
                let duration = duration.as_f64()?;
                if !(0.0..=f64::from(u32::MAX)).contains(&duration) {
                    return None;
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
                let millis = duration.round() as u32;
                (millis != 0).then_some(millis)
            }
        };

        Some(Self {
            kind,
            name: name.to_owned(),
            property: property.to_owned(),
            value,
            duration,
        })
    }
}
