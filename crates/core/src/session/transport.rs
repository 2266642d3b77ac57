use std::net::IpAddr;

use crate::protocol::{AddressInfo, MediaLegRequest, MediaLegResponse, PrepareRequest, PrepareResponse};

/// SSRC the camera sends with, for every session and both legs.
pub const SESSION_SSRC: u32 = 1;

/// Transport state recorded for a prepared session (SetupEndpoints).
///
/// Built by [`prepare`] and consumed by the first start request for the
/// same session.
///
/// ## Exchange
///
/// ```text
/// Viewer → Camera:
///   sessionID, targetAddress=10.0.0.5,
///   video { port=5000, srtp_key=K, srtp_salt=S }
///
/// Camera → Viewer:
///   video { port=5000, ssrc=1, srtp_key=K, srtp_salt=S },
///   address { address=192.168.1.20, type=v4 }
/// ```
///
/// The camera reuses the viewer's key and salt for its own outbound
/// stream, so they are echoed back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSession {
    /// Viewer address media is sent to.
    pub address: String,
    pub video: Option<PendingLeg>,
    pub audio: Option<PendingLeg>,
}

/// One media leg of a [`PendingSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLeg {
    /// Viewer RTP port.
    pub port: u16,
    /// SRTP master key followed by master salt.
    pub srtp_key_material: Vec<u8>,
    pub ssrc: u32,
}

/// Answer a prepare request.
///
/// Returns the response for the viewer and the pending record to store
/// under the request's session id. `local` is the camera's own address as
/// reported by an [`AddressResolver`](crate::net::AddressResolver).
pub fn prepare(request: &PrepareRequest, local: IpAddr) -> (PrepareResponse, PendingSession) {
    let (video_resp, video_leg) = request.video.as_ref().map(negotiate_leg).unzip();
    let (audio_resp, audio_leg) = request.audio.as_ref().map(negotiate_leg).unzip();

    let address = AddressInfo::new(local.to_string());

    tracing::debug!(
        session_id = %request.session_id,
        target = %request.target_address,
        local = %address.address,
        video = video_leg.is_some(),
        audio = audio_leg.is_some(),
        "transport negotiated"
    );

    let response = PrepareResponse {
        video: video_resp,
        audio: audio_resp,
        address,
    };

    let pending = PendingSession {
        address: request.target_address.clone(),
        video: video_leg,
        audio: audio_leg,
    };

    (response, pending)
}

fn negotiate_leg(leg: &MediaLegRequest) -> (MediaLegResponse, PendingLeg) {
    let response = MediaLegResponse {
        port: leg.port,
        ssrc: SESSION_SSRC,
        srtp_key: leg.srtp_key.clone(),
        srtp_salt: leg.srtp_salt.clone(),
    };

    let pending = PendingLeg {
        port: leg.port,
        srtp_key_material: [leg.srtp_key.as_slice(), leg.srtp_salt.as_slice()].concat(),
        ssrc: SESSION_SSRC,
    };

    (response, pending)
}
