/*!
The [`DuckSoup`] player handed to the embedding page.

Start-up is a single call to [`render`], which validates the options, clears the mount
element, captures local media, creates the peer connection and opens the signaling socket.
From then on everything is driven by browser callbacks.

# Example

```no_run
use ducksoup::render;
use wasm_bindgen::JsValue;

# async fn run(mount_el: web_sys::Element, peer_options: JsValue) {
let player = render(mount_el, peer_options, JsValue::UNDEFINED).await;
player.audio_control("pitch".into(), "pitch".into(), 1.2.into(), 500.into());
player.stop(Some(1000));
# }
```
*/

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::anyhow;
use ducksoup_protocol::sdp::is_safari;
use ducksoup_protocol::{
    ClientMessage, ControlPayload, EmbedMessage, JoinPayload, PeerOptions, StatsTracker, TrackKind,
};
use js_sys::{Function, Reflect};
use log::{debug, error, info};
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, MediaStream, RtcPeerConnection, WebSocket};

use crate::constants::{CLOSE_ERROR, INVALID_OPTIONS, VERSION};
use crate::media::{add_local_tracks, get_user_media, stop_tracks};
use crate::mount::clear_children;
use crate::player::callbacks::{
    set_peer_connection_on_ice_candidate, set_peer_connection_on_ice_connection_state_change,
    set_peer_connection_on_track, set_websocket_on_close, set_websocket_on_error,
    set_websocket_on_message, set_websocket_on_open,
};
use crate::player::stats::StatsPolling;
use crate::utils::{
    create_peer_connection, from_js, init_logger, send_signal, set_panic_hook, user_agent,
};

mod callbacks;
mod stats;
mod websocket_handler;

/// What the embedding page passes as third argument of [`render`].
#[derive(Debug, Clone, Default)]
pub struct EmbedOptions {
    /// Verbose logging and per-second bitrate statistics
    pub debug: bool,
    /// Receives every [`EmbedMessage`]
    pub callback: Option<Function>,
}

impl EmbedOptions {
    /// Read `{debug, callback}` from a JS object, anything missing or mistyped is left out.
    #[must_use]
    pub fn from_js(embed_options: &JsValue) -> Self {
        if !embed_options.is_object() {
            return Self::default();
        }
        let field = |name: &str| Reflect::get(embed_options, &JsValue::from_str(name)).ok();
        Self {
            debug: field("debug").map_or(false, |debug| debug.is_truthy()),
            callback: field("callback").and_then(|callback| callback.dyn_into::<Function>().ok()),
        }
    }
}

#[derive(Debug)]
pub(crate) struct DuckSoupInner {
    mount_el: Option<Element>,
    peer_options: PeerOptions,
    embed_options: EmbedOptions,
    running: bool,
    peer_connection: Option<RtcPeerConnection>,
    websocket: Option<WebSocket>,
    stream: Option<MediaStream>,
    stats_tracker: Option<StatsTracker>,
    stats_polling: Option<StatsPolling>,
}

/// Handle on a running (or failed) session.
///
/// This class is a pointer to the underlying resource and can be cloned freely.
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct DuckSoup {
    inner: Rc<RefCell<DuckSoupInner>>,
}

/// Create a player inside `mount_el` and start the session.
///
/// Never rejects: failures are reported to `embedOptions.callback` as `{kind: "error", payload}`
/// and the returned player is then inert.
#[wasm_bindgen]
pub async fn render(mount_el: Element, peer_options: JsValue, embed_options: JsValue) -> DuckSoup {
    let embed_options = EmbedOptions::from_js(&embed_options);
    set_panic_hook();
    init_logger(embed_options.debug);
    info!("[DuckSoup] v{}", VERSION);

    let peer_options = from_js::<PeerOptions>(peer_options)
        .ok()
        .filter(PeerOptions::is_valid);
    let Some(peer_options) = peer_options else {
        let player = new_player(None, PeerOptions::default(), embed_options);
        post_failure(&player, INVALID_OPTIONS);
        return player;
    };

    let player = new_player(Some(mount_el), peer_options, embed_options);
    if let Err(err) = start(&player).await {
        abort_start(&player, &err);
    }
    player
}

#[wasm_bindgen]
impl DuckSoup {
    /// Change a property of an audio effect, over `duration` milliseconds when given.
    /// Calls with mistyped arguments are ignored.
    #[wasm_bindgen(js_name = audioControl)]
    pub fn audio_control(&self, name: JsValue, property: JsValue, value: JsValue, duration: JsValue) {
        control(self, TrackKind::Audio, name, property, value, duration);
    }

    /// Change a property of a video effect, over `duration` milliseconds when given.
    /// Calls with mistyped arguments are ignored.
    #[wasm_bindgen(js_name = videoControl)]
    pub fn video_control(&self, name: JsValue, property: JsValue, value: JsValue, duration: JsValue) {
        control(self, TrackKind::Video, name, property, value, duration);
    }

    /// Release local media, close the peer connection and the signaling socket.
    /// `code` is the `WebSocket` close code.
    pub fn stop(&self, code: Option<u16>) {
        stop_rtc(self);
        let websocket = self.inner.borrow().websocket.clone();
        if let Some(websocket) = websocket {
            let closed = match code {
                Some(code) => websocket.close_with_code(code),
                None => websocket.close(),
            };
            if let Err(err) = closed {
                error!("failed to close websocket: {:?}", err);
            }
        }
    }

    /// Local camera and microphone stream, once acquired.
    #[wasm_bindgen(getter)]
    #[must_use]
    pub fn stream(&self) -> Option<MediaStream> {
        self.inner.borrow().stream.clone()
    }

    /// Whether start-up went through.
    #[wasm_bindgen(getter)]
    #[must_use]
    pub fn running(&self) -> bool {
        self.inner.borrow().running
    }
}

fn new_player(
    mount_el: Option<Element>,
    peer_options: PeerOptions,
    embed_options: EmbedOptions,
) -> DuckSoup {
    let stats_tracker = embed_options
        .debug
        .then(|| StatsTracker::new(js_sys::Date::now()));
    DuckSoup {
        inner: Rc::new(RefCell::new(DuckSoupInner {
            mount_el,
            peer_options,
            embed_options,
            running: false,
            peer_connection: None,
            websocket: None,
            stream: None,
            stats_tracker,
            stats_polling: None,
        })),
    }
}

/// Steps of the start-up, in the order the server expects them.
async fn start(player: &DuckSoup) -> crate::Result<()> {
    let (mount_el, peer_options, debug) = {
        let inner = player.inner.borrow();
        (
            inner.mount_el.clone(),
            inner.peer_options.clone(),
            inner.embed_options.debug,
        )
    };
    let mount_el = mount_el.ok_or_else(|| anyhow!("no mount element"))?;
    let signaling_url = peer_options
        .signaling_url
        .clone()
        .ok_or_else(|| anyhow!("no signalingUrl given"))?;
    debug!("user agent is Safari: {}", is_safari(&user_agent()));

    clear_children(&mount_el)?;

    let peer_connection = create_peer_connection(&peer_options.rtc_config())?;
    player.inner.borrow_mut().peer_connection = Some(peer_connection.clone());

    let stream = get_user_media(&peer_options.constraints()).await?;
    add_local_tracks(&peer_connection, &stream);
    player.inner.borrow_mut().stream = Some(stream);

    let websocket = WebSocket::new(&signaling_url).map_err(|err| {
        anyhow!(
            "failed to create connection with signaling server on {}: {:?}",
            signaling_url,
            err
        )
    })?;
    player.inner.borrow_mut().websocket = Some(websocket.clone());

    set_websocket_on_open(&websocket, JoinPayload::from(&peer_options));
    set_websocket_on_close(&websocket, player.clone());
    set_websocket_on_error(&websocket, player.clone());
    set_websocket_on_message(&websocket, player.clone());
    set_peer_connection_on_ice_candidate(&peer_connection, websocket);
    set_peer_connection_on_ice_connection_state_change(&peer_connection);
    set_peer_connection_on_track(&peer_connection, mount_el);

    if debug {
        let polling = StatsPolling::start(player.clone())?;
        player.inner.borrow_mut().stats_polling = Some(polling);
    }

    player.inner.borrow_mut().running = true;
    Ok(())
}

fn control(
    player: &DuckSoup,
    kind: TrackKind,
    name: JsValue,
    property: JsValue,
    value: JsValue,
    duration: JsValue,
) {
    let loose = |value: JsValue| from_js::<serde_json::Value>(value).unwrap_or_default();
    let duration = (!duration.is_undefined()).then(|| loose(duration));
    let Some(payload) = ControlPayload::checked(
        kind,
        &loose(name),
        &loose(property),
        &loose(value),
        duration.as_ref(),
    ) else {
        debug!("ignoring mistyped {} control", kind);
        return;
    };

    let websocket = player.inner.borrow().websocket.clone();
    let Some(websocket) = websocket else {
        debug!("ignoring {} control, signaling is not set up", kind);
        return;
    };
    if let Err(err) = send_signal(&websocket, &ClientMessage::Control(payload)) {
        error!("{:#}", err);
    }
}

/// Deliver a message to the page's callback.
/// Only while running, unless `force` is set. Stop messages also end stats polling.
pub(crate) fn post_message(player: &DuckSoup, message: &EmbedMessage, force: bool) {
    if message.is_stop() {
        stop_stats_polling(player);
    }
    let (callback, running) = {
        let inner = player.inner.borrow();
        (inner.embed_options.callback.clone(), inner.running)
    };
    let Some(callback) = callback else {
        return;
    };
    if !running && !force {
        debug!("not running, dropping {} message", message.kind);
        return;
    }
    let value = match crate::utils::to_js(message) {
        Ok(value) => value,
        Err(err) => {
            error!("{:#}", err);
            return;
        }
    };
    if let Err(err) = callback.call1(&JsValue::NULL, &value) {
        error!("embed callback threw: {:?}", err);
    }
}

/// Start-up failures are reported even though the player never ran.
fn post_failure(player: &DuckSoup, reason: &str) {
    post_message(player, &EmbedMessage::error(reason), true);
}

/// Report a failed start-up and tear down what was set up, signaling socket included.
fn abort_start(player: &DuckSoup, err: &crate::Error) {
    error!("failed to start DuckSoup: {:#}", err);
    post_failure(player, &format!("{err:#}"));
    player.stop(Some(CLOSE_ERROR));
}

fn stop_stats_polling(player: &DuckSoup) {
    let polling = player.inner.borrow_mut().stats_polling.take();
    if let Some(polling) = polling {
        polling.clear();
    }
}

/// Release local media and close the peer connection, the socket is left alone.
pub(crate) fn stop_rtc(player: &DuckSoup) {
    let (stream, peer_connection) = {
        let inner = player.inner.borrow();
        (inner.stream.clone(), inner.peer_connection.clone())
    };
    if let Some(stream) = stream {
        stop_tracks(&stream);
    }
    if let Some(peer_connection) = peer_connection {
        peer_connection.close();
    }
}

#[cfg(test)]
mod test {
    use ducksoup_protocol::{ServerMessage, StatsPayload};
    use serde_json::json;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen_test::wasm_bindgen_test;
    use web_sys::{AudioContext, MediaStreamTrack, MediaStreamTrackState};

    use super::websocket_handler::handle_websocket_message;
    use super::*;

    type Received = Rc<RefCell<Vec<EmbedMessage>>>;

    fn recording_player(debug: bool) -> (DuckSoup, Received) {
        let received = Received::default();
        let received_clone = Rc::clone(&received);
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |message: JsValue| {
            let message: EmbedMessage = serde_wasm_bindgen::from_value(message).unwrap();
            received_clone.borrow_mut().push(message);
        });
        let embed_options = EmbedOptions {
            debug,
            callback: Some(callback.as_ref().unchecked_ref::<Function>().clone()),
        };
        callback.forget();
        (
            new_player(None, PeerOptions::default(), embed_options),
            received,
        )
    }

    fn set_running(player: &DuckSoup, running: bool) {
        player.inner.borrow_mut().running = running;
    }

    fn kinds(received: &Received) -> Vec<String> {
        received
            .borrow()
            .iter()
            .map(|message| message.kind.clone())
            .collect()
    }

    /// Give the player a live local track, it ends once the player stops.
    fn local_audio_track(player: &DuckSoup) -> MediaStreamTrack {
        let stream = AudioContext::new()
            .unwrap()
            .create_media_stream_destination()
            .unwrap()
            .stream();
        let track = stream.get_tracks().get(0).unchecked_into::<MediaStreamTrack>();
        player.inner.borrow_mut().stream = Some(stream);
        track
    }

    #[wasm_bindgen_test]
    async fn start_is_delivered_before_running() {
        let (player, received) = recording_player(false);

        handle_websocket_message(ServerMessage::Start, player.clone())
            .await
            .unwrap();

        assert!(!player.running());
        assert_eq!(kinds(&received), ["start"]);
    }

    #[wasm_bindgen_test]
    async fn ending_is_only_delivered_while_running() {
        let (player, received) = recording_player(false);

        handle_websocket_message(ServerMessage::Ending, player.clone())
            .await
            .unwrap();
        assert!(received.borrow().is_empty());

        set_running(&player, true);
        handle_websocket_message(ServerMessage::Ending, player.clone())
            .await
            .unwrap();
        assert_eq!(kinds(&received), ["ending"]);
    }

    #[wasm_bindgen_test]
    fn stats_are_only_delivered_while_running() {
        let (player, received) = recording_player(true);
        let stats = EmbedMessage::stats(&StatsPayload {
            audio_up: "1.0".to_owned(),
            audio_down: "0.0".to_owned(),
            video_up: "0.0".to_owned(),
            video_down: "0.0".to_owned(),
        });

        post_message(&player, &stats, false);
        assert!(received.borrow().is_empty());

        set_running(&player, true);
        post_message(&player, &stats, false);
        assert_eq!(*received.borrow(), vec![stats]);
    }

    #[wasm_bindgen_test]
    async fn end_is_forwarded_then_player_stops() {
        let (player, received) = recording_player(false);
        set_running(&player, true);
        let track = local_audio_track(&player);

        handle_websocket_message(ServerMessage::End, player.clone())
            .await
            .unwrap();

        assert_eq!(kinds(&received), ["end"]);
        assert_eq!(track.ready_state(), MediaStreamTrackState::Ended);
    }

    #[wasm_bindgen_test]
    async fn server_error_is_forwarded_as_received() {
        let (player, received) = recording_player(false);
        set_running(&player, true);
        let track = local_audio_track(&player);

        let error = ServerMessage::Error {
            kind: "error-duplicate".to_owned(),
            payload: Some(json!({"userId": "alice"})),
        };
        handle_websocket_message(error, player.clone()).await.unwrap();

        assert_eq!(
            *received.borrow(),
            vec![EmbedMessage {
                kind: "error-duplicate".to_owned(),
                payload: Some(json!({"userId": "alice"})),
            }]
        );
        assert_eq!(track.ready_state(), MediaStreamTrackState::Ended);
    }

    #[wasm_bindgen_test]
    async fn stop_message_clears_stats_polling() {
        let (player, received) = recording_player(true);
        set_running(&player, true);
        let polling = StatsPolling::start(player.clone()).unwrap();
        player.inner.borrow_mut().stats_polling = Some(polling);

        handle_websocket_message(ServerMessage::Ending, player.clone())
            .await
            .unwrap();
        assert!(player.inner.borrow().stats_polling.is_some());

        handle_websocket_message(ServerMessage::End, player.clone())
            .await
            .unwrap();
        assert!(player.inner.borrow().stats_polling.is_none());
        assert_eq!(kinds(&received), ["ending", "end"]);
    }

    #[wasm_bindgen_test]
    fn failed_start_closes_signaling_socket() {
        let (player, received) = recording_player(false);
        let websocket = WebSocket::new("ws://127.0.0.1:9").unwrap();
        player.inner.borrow_mut().websocket = Some(websocket.clone());
        let track = local_audio_track(&player);

        abort_start(&player, &anyhow!("stats polling unavailable"));

        assert_eq!(
            *received.borrow(),
            vec![EmbedMessage::error("stats polling unavailable")]
        );
        assert!(websocket.ready_state() >= WebSocket::CLOSING);
        assert_eq!(track.ready_state(), MediaStreamTrackState::Ended);
    }
}
