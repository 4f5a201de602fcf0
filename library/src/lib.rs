/*!
Embeddable DuckSoup player, compiled to WebAssembly.

# Overview

A page hands the player a DOM element, the room it wants to join and a callback.
The player then captures the local camera and microphone, joins the room through the
DuckSoup signaling `WebSocket`, answers the server's `WebRTC` offer and mounts every remote
track it receives as an `<audio>` or `<video>` element inside the given element.

While the session runs the page can tweak the server-side effects with
[`DuckSoup::audio_control`] and [`DuckSoup::video_control`], and is told about
the session lifecycle (`start`, `ending`, `end`, `disconnection`, errors) through the callback.
With `debug` enabled the callback also receives bitrate statistics every second.

```js
import init, { render } from "./ducksoup.js";

await init();
const player = await render(document.getElementById("mount"), {
    signalingUrl: "wss://ducksoup.example.org/ws",
    roomId: "room-1",
    userId: "alice",
    duration: 30,
    audioFx: "pitch pitch=0.8",
}, {
    debug: true,
    callback: (message) => console.log(message.kind, message.payload),
});
player.audioControl("pitch", "pitch", 1.2, 500);
```
*/

#![allow(
    clippy::module_name_repetitions,
    clippy::future_not_send, // false positive in WASM (single threaded) context
)]
// clippy WARN level lints
#![warn(
    clippy::cargo,
    clippy::pedantic,
    clippy::dbg_macro,
    clippy::unwrap_used,
    clippy::integer_division,
    clippy::map_err_ignore,
    clippy::panic,
    clippy::todo,
    clippy::undocumented_unsafe_blocks,
    clippy::unimplemented,
    clippy::unreachable
)]
// clippy WARN level lints, that can be upgraded to DENY if preferred
#![warn(
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::if_then_some_else_none,
    clippy::indexing_slicing,
    clippy::let_underscore_must_use,
    clippy::pattern_type_mismatch,
    clippy::string_slice,
    clippy::try_err
)]
// clippy DENY level lints, they always have a quick fix that should be preferred
#![deny(
    clippy::wildcard_imports,
    clippy::multiple_inherent_impl,
    clippy::rc_buffer,
    clippy::rc_mutex,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_name_method,
    clippy::self_named_module_files,
    clippy::shadow_unrelated,
    clippy::str_to_string,
    clippy::string_add,
    clippy::string_to_string,
    clippy::unnecessary_self_imports,
    clippy::unneeded_field_pattern,
    clippy::verbose_file_reads
)]

pub(crate) mod constants;
mod error;
pub mod media;
pub mod mount;
pub mod player;
mod utils;

pub use ducksoup_protocol::{ControlPayload, EmbedMessage, PeerOptions, StatsPayload, TrackKind};
pub use error::{Error, Result};
pub use player::{render, DuckSoup, EmbedOptions};
pub use utils::{set_panic_hook, user_agent};
