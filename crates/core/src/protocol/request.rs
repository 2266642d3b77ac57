use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Transport setup for one session, sent before streaming starts.
///
/// Either media leg may be absent; a missing leg is simply left out of the
/// response and the pending session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareRequest {
    /// 16 raw bytes from the framework, or the hyphenated string form.
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    /// Address the viewer receives media on.
    #[serde(rename = "targetAddress")]
    pub target_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaLegRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<MediaLegRequest>,
}

/// Viewer-side endpoint and SRTP master key for one media leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLegRequest {
    pub port: u16,
    /// SRTP master key (16 bytes for AES_CM_128_HMAC_SHA1_80).
    pub srtp_key: Vec<u8>,
    /// SRTP master salt (14 bytes for AES_CM_128_HMAC_SHA1_80).
    pub srtp_salt: Vec<u8>,
}

/// Video parameters selected by the viewer for a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRequest {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Maximum bitrate in kbit/s.
    pub max_bit_rate: u32,
}

/// Start or stop streaming for a prepared session.
///
/// Wire form:
///
/// ```text
/// {"sessionID": "...", "type": "start", "video": {"width": 1280, ...}}
/// {"sessionID": "...", "type": "stop"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamRequest {
    Start {
        #[serde(rename = "sessionID")]
        session_id: SessionId,
        video: VideoRequest,
    },
    Stop {
        #[serde(rename = "sessionID")]
        session_id: SessionId,
    },
}

impl StreamRequest {
    pub fn session_id(&self) -> SessionId {
        match self {
            StreamRequest::Start { session_id, .. } | StreamRequest::Stop { session_id } => {
                *session_id
            }
        }
    }

    /// `"start"` or `"stop"`, as on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamRequest::Start { .. } => "start",
            StreamRequest::Stop { .. } => "stop",
        }
    }
}

/// Still image request. The dimensions are advisory; the configured
/// snapshot endpoint decides what it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRequest {
    pub width: u32,
    pub height: u32,
}
