/*!
Rendering of remote tracks inside the element given by the embedding page.
*/

use anyhow::anyhow;
use ducksoup_protocol::TrackKind;
use log::debug;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlMediaElement, MediaStream, MediaStreamTrack};

use crate::error::js_error;

/// The player owns the mount element, whatever was inside goes away.
///
/// # Errors
/// Propagates DOM exceptions.
pub fn clear_children(mount_el: &Element) -> crate::Result<()> {
    while let Some(child) = mount_el.first_child() {
        mount_el
            .remove_child(&child)
            .map_err(|err| js_error("failed to clear mount element", &err))?;
    }
    Ok(())
}

/// Append an autoplaying `<audio>` or `<video>` element for `track`, identified by the track id.
/// Video fills the mount element.
///
/// # Errors
/// Fails on tracks that are neither audio nor video and on DOM exceptions.
pub fn mount_track(
    mount_el: &Element,
    track: &MediaStreamTrack,
    stream: &MediaStream,
) -> crate::Result<HtmlMediaElement> {
    let kind = TrackKind::from_kind(&track.kind())
        .ok_or_else(|| anyhow!("unsupported track kind: {}", track.kind()))?;
    let document = mount_el
        .owner_document()
        .ok_or_else(|| anyhow!("mount element does not belong to a document"))?;

    let element = document
        .create_element(kind.as_str())
        .map_err(|err| js_error("failed to create media element", &err))?
        .dyn_into::<HtmlMediaElement>()
        .map_err(|element| anyhow!("{} is not a media element", element.tag_name()))?;
    element.set_id(&track.id());
    element.set_src_object(Some(stream));
    element.set_autoplay(true);
    if kind == TrackKind::Video {
        let style = element.style();
        style
            .set_property("width", "100%")
            .and_then(|()| style.set_property("height", "100%"))
            .map_err(|err| js_error("failed to size video element", &err))?;
    }

    mount_el
        .append_child(&element)
        .map_err(|err| js_error("failed to mount media element", &err))?;
    debug!("mounted remote {} track {}", kind, track.id());
    Ok(element)
}

/// Remove the element mounted for the track with this id, if any.
pub fn unmount_track(document: &Document, track_id: &str) {
    if let Some(element) = document.get_element_by_id(track_id) {
        element.remove();
        debug!("unmounted remote track {}", track_id);
    }
}
