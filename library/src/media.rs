/*!
Local media: camera and microphone capture, and handing the tracks to the peer connection.
*/

use anyhow::anyhow;
use ducksoup_protocol::MediaConstraints;
use js_sys::Array;
use log::{debug, info};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{MediaStream, MediaStreamConstraints, MediaStreamTrack, RtcPeerConnection};

use crate::error::js_error;
use crate::utils::{to_js, window};

/// Prompt for camera and microphone with the given constraints.
///
/// # Errors
/// Fails when the page has no access to media devices
/// or the user (or another tab holding the devices) refuses the capture.
pub async fn get_user_media(constraints: &MediaConstraints) -> crate::Result<MediaStream> {
    let media_devices = window()?
        .navigator()
        .media_devices()
        .map_err(|err| js_error("media devices are not available", &err))?;
    let constraints: MediaStreamConstraints = to_js(constraints)?.unchecked_into();
    let promise = media_devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|err| js_error("failed to request user media", &err))?;
    let stream = JsFuture::from(promise)
        .await
        .map_err(|err| js_error("failed to acquire user media", &err))?;
    let stream = stream
        .dyn_into::<MediaStream>()
        .map_err(|value| anyhow!("getUserMedia resolved to a non-stream value: {:?}", value))?;
    info!("acquired local media stream {}", stream.id());
    Ok(stream)
}

fn tracks(stream: &MediaStream) -> Vec<MediaStreamTrack> {
    stream
        .get_tracks()
        .iter()
        .map(|track| track.unchecked_into::<MediaStreamTrack>())
        .collect()
}

/// Every local track must be added before signaling starts, the server offers accordingly.
pub fn add_local_tracks(peer_connection: &RtcPeerConnection, stream: &MediaStream) {
    for track in tracks(stream) {
        debug!("adding local {} track {}", track.kind(), track.id());
        peer_connection.add_track(&track, stream, &Array::new());
    }
}

/// Release camera and microphone.
pub fn stop_tracks(stream: &MediaStream) {
    for track in tracks(stream) {
        track.stop();
    }
}
