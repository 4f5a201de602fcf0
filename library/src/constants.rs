pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STATS_INTERVAL_MS: i32 = 1000;

/// `WebSocket` close codes, see <https://developer.mozilla.org/en-US/docs/Web/API/CloseEvent#status_codes>
pub const CLOSE_NORMAL: u16 = 1000;
/// Application range, used by the player to signal a failure.
pub const CLOSE_ERROR: u16 = 4000;

pub const INVALID_OPTIONS: &str = "Invalid DuckSoup options";
