/*!
`SDP` adjustments applied to the local answer before it is sent.
*/

const LINE_SEPARATOR: &str = "\r\n";
const OPUS_FMTP_PREFIX: &str = "a=fmtp:111";

/// Turn off stereo on the Opus payload type (111), Firefox negotiates it otherwise.
/// Only the first `stereo=1` of the line is rewritten, `sprop-stereo` is the sender's business.
#[must_use]
pub fn force_mono(sdp: &str) -> String {
    sdp.split(LINE_SEPARATOR)
        .map(|line| {
            if line.starts_with(OPUS_FMTP_PREFIX) {
                line.replacen("stereo=1", "stereo=0", 1)
            } else {
                line.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(LINE_SEPARATOR)
}

/// Every adjustment needed for the given browser.
#[must_use]
pub fn process_sdp(sdp: &str, user_agent: &str) -> String {
    if user_agent.contains("Mozilla") {
        force_mono(sdp)
    } else {
        sdp.to_owned()
    }
}

/// Safari advertises itself as `Safari` but so does Chrome.
#[must_use]
pub fn is_safari(user_agent: &str) -> bool {
    user_agent.contains("Safari") && !user_agent.contains("Chrome")
}
