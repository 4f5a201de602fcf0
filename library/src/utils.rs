use std::sync::Once;

use anyhow::anyhow;
use ducksoup_protocol::sdp::process_sdp;
use ducksoup_protocol::{ClientMessage, IceCandidate, SessionDescription};
use js_sys::Reflect;
use log::{debug, Level, LevelFilter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    RtcConfiguration, RtcIceCandidateInit, RtcPeerConnection, RtcSdpType,
    RtcSessionDescriptionInit, WebSocket, Window,
};

use crate::error::js_error;

static LOGGER: Once = Once::new();

/// When the `console_error_panic_hook` feature is enabled, panics are reported
/// in the browser console with a readable message.
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Logger is installed once per page, its level follows the latest `debug` flag.
pub(crate) fn init_logger(debug: bool) {
    LOGGER.call_once(|| wasm_logger::init(wasm_logger::Config::new(Level::Debug)));
    log::set_max_level(if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
}

pub(crate) fn window() -> crate::Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("no global `window` exists"))
}

/// Browser user agent, empty when unavailable.
#[must_use]
pub fn user_agent() -> String {
    web_sys::window()
        .and_then(|window| window.navigator().user_agent().ok())
        .unwrap_or_default()
}

/// JSON-compatible conversion, maps become plain objects.
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> crate::Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| anyhow!("failed to convert value for JS: {}", err))
}

pub(crate) fn from_js<T: DeserializeOwned>(value: JsValue) -> crate::Result<T> {
    serde_wasm_bindgen::from_value(value).map_err(|err| anyhow!("failed to read JS value: {}", err))
}

pub(crate) fn create_peer_connection(
    rtc_config: &serde_json::Value,
) -> crate::Result<RtcPeerConnection> {
    let rtc_configuration: RtcConfiguration = to_js(rtc_config)?.unchecked_into();
    RtcPeerConnection::new_with_configuration(&rtc_configuration)
        .map_err(|err| js_error("failed to create peer connection", &err))
}

/// Apply the server offer, then create, munge and apply the local answer.
pub(crate) async fn create_sdp_answer(
    peer_connection: &RtcPeerConnection,
    offer: &SessionDescription,
    user_agent: &str,
) -> crate::Result<SessionDescription> {
    let remote_session_description = RtcSessionDescriptionInit::new(RtcSdpType::Offer);
    remote_session_description.set_sdp(&offer.sdp);
    JsFuture::from(peer_connection.set_remote_description(&remote_session_description))
        .await
        .map_err(|err| js_error("failed to set remote description", &err))?;

    let answer = JsFuture::from(peer_connection.create_answer())
        .await
        .map_err(|err| js_error("failed to create an SDP answer", &err))?;
    let sdp = Reflect::get(&answer, &JsValue::from_str("sdp"))
        .ok()
        .and_then(|sdp| sdp.as_string())
        .ok_or_else(|| anyhow!("SDP answer has no `sdp` field"))?;
    let local_answer = SessionDescription::answer(process_sdp(&sdp, user_agent));

    let local_session_description = RtcSessionDescriptionInit::new(RtcSdpType::Answer);
    local_session_description.set_sdp(&local_answer.sdp);
    JsFuture::from(peer_connection.set_local_description(&local_session_description))
        .await
        .map_err(|err| js_error("failed to set local description", &err))?;

    Ok(local_answer)
}

pub(crate) async fn add_ice_candidate(
    peer_connection: &RtcPeerConnection,
    ice_candidate: &IceCandidate,
) -> crate::Result<()> {
    let rtc_candidate = RtcIceCandidateInit::new(&ice_candidate.candidate);
    rtc_candidate.set_sdp_mid(ice_candidate.sdp_mid.as_deref());
    rtc_candidate.set_sdp_m_line_index(ice_candidate.sdp_m_line_index);
    if let Some(ref username_fragment) = ice_candidate.username_fragment {
        Reflect::set(
            &rtc_candidate,
            &JsValue::from_str("usernameFragment"),
            &JsValue::from_str(username_fragment),
        )
        .map_err(|err| js_error("failed to set usernameFragment", &err))?;
    }

    JsFuture::from(
        peer_connection.add_ice_candidate_with_opt_rtc_ice_candidate_init(Some(&rtc_candidate)),
    )
    .await
    .map_err(|err| js_error("failed to add ICE candidate", &err))?;
    debug!("added ice candidate {:?}", ice_candidate);
    Ok(())
}

pub(crate) fn send_signal(websocket: &WebSocket, message: &ClientMessage) -> crate::Result<()> {
    let text = message.to_json()?;
    websocket
        .send_with_str(&text)
        .map_err(|err| js_error("failed to send message across the websocket", &err))?;
    debug!("sent {} message", message.kind());
    Ok(())
}
