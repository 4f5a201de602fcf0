/*!
Bitrate statistics computed from consecutive `RTCStatsReport` snapshots.
*/

use serde::{Deserialize, Serialize};

use crate::control::TrackKind;

/// Cumulative RTP byte counters, summed over every stream of a kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteCounters {
    /// Bytes sent on outbound audio streams
    pub audio_sent: u64,
    /// Bytes received on inbound audio streams
    pub audio_received: u64,
    /// Bytes sent on outbound video streams
    pub video_sent: u64,
    /// Bytes received on inbound video streams
    pub video_received: u64,
}

impl ByteCounters {
    /// Account for one entry of a stats report.
    /// Only `outbound-rtp` and `inbound-rtp` entries of a known kind count.
    pub fn record(
        &mut self,
        report_type: &str,
        kind: Option<&str>,
        bytes_sent: Option<u64>,
        bytes_received: Option<u64>,
    ) {
        let Some(kind) = kind.and_then(TrackKind::from_kind) else {
            return;
        };
        let counter = match (report_type, kind) {
            ("outbound-rtp", TrackKind::Audio) => (&mut self.audio_sent, bytes_sent),
            ("inbound-rtp", TrackKind::Audio) => (&mut self.audio_received, bytes_received),
            ("outbound-rtp", TrackKind::Video) => (&mut self.video_sent, bytes_sent),
            ("inbound-rtp", TrackKind::Video) => (&mut self.video_received, bytes_received),
            _ => return,
        };
        let (total, bytes) = counter;
        *total = total.saturating_add(bytes.unwrap_or_default());
    }
}

/// Kilobits per second, formatted with a single decimal.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::as_conversions, clippy::float_arithmetic)]
pub fn kbps(bytes: i64, seconds: f64) -> String {
    let rate = 8.0 * bytes as f64 / seconds / 1024.0;
    format!("{rate:.1}")
}

/// Bitrates reported to the embedding page every second in debug mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPayload {
    /// Outgoing audio, kbit/s
    pub audio_up: String,
    /// Incoming audio, kbit/s
    pub audio_down: String,
    /// Outgoing video, kbit/s
    pub video_up: String,
    /// Incoming video, kbit/s
    pub video_down: String,
}

/// Remembers the previous snapshot to turn cumulative counters into rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsTracker {
    at_ms: f64,
    counters: ByteCounters,
}

impl StatsTracker {
    /// Start tracking from zeroed counters at `now_ms`.
    #[must_use]
    pub fn new(now_ms: f64) -> Self {
        Self {
            at_ms: now_ms,
            counters: ByteCounters::default(),
        }
    }

    /// Rates since the previous snapshot, then store `counters` as the new one.
    #[allow(clippy::float_arithmetic, clippy::cast_possible_wrap, clippy::as_conversions)]
    pub fn update(&mut self, now_ms: f64, counters: ByteCounters) -> StatsPayload {
        let elapsed = (now_ms - self.at_ms) / 1000.0;
        let rate = |new: u64, old: u64| kbps(new as i64 - old as i64, elapsed);
        let previous = self.counters;
        let payload = StatsPayload {
            audio_up: rate(counters.audio_sent, previous.audio_sent),
            audio_down: rate(counters.audio_received, previous.audio_received),
            video_up: rate(counters.video_sent, previous.video_sent),
            video_down: rate(counters.video_received, previous.video_received),
        };
        *self = Self {
            at_ms: now_ms,
            counters,
        };
        payload
    }
}
