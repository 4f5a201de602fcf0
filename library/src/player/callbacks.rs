use ducksoup_protocol::{ClientMessage, EmbedMessage, IceCandidate, JoinPayload, ServerMessage};
use log::{debug, error, info};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    CloseEvent, Element, MediaStream, MediaStreamTrackEvent, MessageEvent, RtcPeerConnection,
    RtcPeerConnectionIceEvent, RtcTrackEvent, WebSocket,
};

use crate::constants::CLOSE_ERROR;
use crate::mount::{mount_track, unmount_track};
use crate::player::{post_message, stop_rtc, websocket_handler, DuckSoup};
use crate::utils::send_signal;

/// once web socket is open, ask to join the room
pub fn set_websocket_on_open(websocket: &WebSocket, join_payload: JoinPayload) {
    let websocket_clone = websocket.clone();
    let on_open_callback: Box<dyn FnMut(JsValue)> = Box::new(move |_| {
        info!("signaling socket open, joining room {:?}", join_payload.room_id);
        if let Err(err) = send_signal(&websocket_clone, &ClientMessage::Join(join_payload.clone())) {
            error!("{:#}", err);
        }
    });
    let on_open_callback = Closure::wrap(on_open_callback);
    websocket.set_onopen(Some(on_open_callback.as_ref().unchecked_ref()));
    on_open_callback.forget();
}

pub fn set_websocket_on_close(websocket: &WebSocket, player: DuckSoup) {
    let on_close: Box<dyn FnMut(CloseEvent)> = Box::new(move |ev: CloseEvent| {
        info!(
            "signaling socket closed with code {} {:?}",
            ev.code(),
            ev.reason()
        );
        post_message(&player, &EmbedMessage::disconnection(), false);
        stop_rtc(&player);
    });
    let on_close = Closure::wrap(on_close);
    websocket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
    on_close.forget();
}

pub fn set_websocket_on_error(websocket: &WebSocket, player: DuckSoup) {
    let on_error: Box<dyn FnMut(JsValue)> = Box::new(move |websocket_error| {
        error!("signaling socket error: {:?}", websocket_error);
        post_message(&player, &EmbedMessage::error("signaling socket error"), false);
        player.stop(Some(CLOSE_ERROR));
    });
    let on_error = Closure::wrap(on_error);
    websocket.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    on_error.forget();
}

/// handle message sent by signaling server
pub fn set_websocket_on_message(websocket: &WebSocket, player: DuckSoup) {
    let on_message_callback: Box<dyn FnMut(MessageEvent)> = Box::new(move |ev: MessageEvent| {
        let Some(text) = ev.data().as_string() else {
            error!("signaling message is not text");
            return;
        };
        let message = match ServerMessage::parse(&text) {
            Ok(message) => message,
            Err(err) => {
                error!("failed to parse signaling message {}: {}", text, err);
                return;
            }
        };
        debug!("received signaling message: {:?}", message);
        let player_clone = player.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = websocket_handler::handle_websocket_message(message, player_clone).await
            {
                error!("error handling websocket message: {:#}", err);
            }
        });
    });
    let on_message_callback = Closure::wrap(on_message_callback);
    websocket.set_onmessage(Some(on_message_callback.as_ref().unchecked_ref()));
    on_message_callback.forget();
}

pub fn set_peer_connection_on_ice_candidate(
    peer_connection: &RtcPeerConnection,
    websocket: WebSocket,
) {
    let on_ice_candidate: Box<dyn FnMut(RtcPeerConnectionIceEvent)> =
        Box::new(move |ev: RtcPeerConnectionIceEvent| {
            let Some(candidate) = ev.candidate() else {
                return;
            };
            let signaled_candidate = IceCandidate {
                candidate: candidate.candidate(),
                sdp_mid: candidate.sdp_mid(),
                sdp_m_line_index: candidate.sdp_m_line_index(),
                username_fragment: js_sys::Reflect::get(
                    &candidate,
                    &JsValue::from_str("usernameFragment"),
                )
                .ok()
                .and_then(|value| value.as_string()),
            };
            debug!("signaled candidate: {:#?}", signaled_candidate);

            if let Err(err) = send_signal(&websocket, &ClientMessage::Candidate(signaled_candidate))
            {
                error!("failed to send one of the ICE candidates: {:#}", err);
            }
        });
    let on_ice_candidate = Closure::wrap(on_ice_candidate);
    peer_connection.set_onicecandidate(Some(on_ice_candidate.as_ref().unchecked_ref()));
    on_ice_candidate.forget();
}

pub fn set_peer_connection_on_ice_connection_state_change(peer_connection: &RtcPeerConnection) {
    let peer_connection_clone = peer_connection.clone();
    let on_ice_connection_state_change: Box<dyn FnMut()> = Box::new(move || {
        debug!(
            "connection state change: {:?}",
            peer_connection_clone.ice_connection_state()
        );
    });
    let on_ice_connection_state_change = Closure::wrap(on_ice_connection_state_change);
    peer_connection.set_oniceconnectionstatechange(Some(
        on_ice_connection_state_change.as_ref().unchecked_ref(),
    ));
    on_ice_connection_state_change.forget();
}

/// also calls:
/// * `set_stream_on_remove_track`
pub fn set_peer_connection_on_track(peer_connection: &RtcPeerConnection, mount_el: Element) {
    let on_track: Box<dyn FnMut(RtcTrackEvent)> = Box::new(move |ev: RtcTrackEvent| {
        let track = ev.track();
        let Ok(stream) = ev.streams().get(0).dyn_into::<MediaStream>() else {
            error!("received {} track {} without a stream", track.kind(), track.id());
            return;
        };
        if let Err(err) = mount_track(&mount_el, &track, &stream) {
            error!("{:#}", err);
            return;
        }
        set_stream_on_remove_track(&stream, &mount_el);
    });
    let on_track = Closure::wrap(on_track);
    peer_connection.set_ontrack(Some(on_track.as_ref().unchecked_ref()));
    on_track.forget();
}

/// remote stream lost a track, drop the element rendering it
pub fn set_stream_on_remove_track(stream: &MediaStream, mount_el: &Element) {
    let Some(document) = mount_el.owner_document() else {
        return;
    };
    let on_remove_track: Box<dyn FnMut(MediaStreamTrackEvent)> =
        Box::new(move |ev: MediaStreamTrackEvent| {
            unmount_track(&document, &ev.track().id());
        });
    let on_remove_track = Closure::wrap(on_remove_track);
    stream.set_onremovetrack(Some(on_remove_track.as_ref().unchecked_ref()));
    on_remove_track.forget();
}

#[cfg(test)]
mod test {
    use wasm_bindgen_test::wasm_bindgen_test;
    use web_sys::{AudioContext, MediaStreamTrack, MediaStreamTrackEventInit};

    use super::*;

    #[wasm_bindgen_test]
    fn removed_remote_track_is_unmounted() {
        let document = web_sys::window().unwrap().document().unwrap();
        let mount_el = document.create_element("div").unwrap();
        document.body().unwrap().append_child(&mount_el).unwrap();
        let stream = AudioContext::new()
            .unwrap()
            .create_media_stream_destination()
            .unwrap()
            .stream();
        let track = stream.get_tracks().get(0).unchecked_into::<MediaStreamTrack>();
        mount_track(&mount_el, &track, &stream).unwrap();
        set_stream_on_remove_track(&stream, &mount_el);
        assert_eq!(mount_el.child_element_count(), 1);

        let event =
            MediaStreamTrackEvent::new("removetrack", &MediaStreamTrackEventInit::new(&track))
                .unwrap();
        stream.dispatch_event(&event).unwrap();

        assert_eq!(mount_el.child_element_count(), 0);
    }
}
