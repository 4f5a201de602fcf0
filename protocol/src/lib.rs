/*!
Types and helpers shared by the [DuckSoup player](../ducksoup/index.html) that do not need a browser.

Everything that goes over the signaling `WebSocket` is declared in [`signal`],
everything handed back to the embedding page in [`embed`].
The remaining modules hold the small pieces of pure logic the player relies on:
option parsing, control validation, `SDP` munging and bitrate arithmetic.
*/

#![warn(missing_docs)]

pub mod control;
pub mod embed;
pub mod options;
pub mod sdp;
pub mod signal;
pub mod stats;

pub use control::{ControlPayload, TrackKind};
pub use embed::EmbedMessage;
pub use options::{JoinPayload, MediaConstraints, PeerOptions, VideoCodec};
pub use signal::{ClientMessage, IceCandidate, ServerMessage, SessionDescription};
pub use stats::{ByteCounters, StatsPayload, StatsTracker};
