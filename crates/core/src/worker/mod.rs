//! Transcoding workers.
//!
//! Every active session is served by one external process that reads the
//! camera source, encodes H.264 and sends it to the viewer over SRTP. This
//! crate never touches media; it only decides the parameters, starts the
//! process and kills it.
//!
//! The process is abstracted behind [`WorkerSpawner`] / [`Worker`] so the
//! session logic can be exercised with a recording mock. The production
//! implementation is [`ffmpeg::FfmpegSpawner`].
//!
//! ## Lifetime
//!
//! ```text
//! spawn(params) ──► Box<dyn Worker> ──► kill()   (SIGKILL, not awaited)
//!                        │
//!                        └─ monitor thread reaps the child and logs its exit
//! ```

pub mod ffmpeg;

use base64::prelude::{BASE64_STANDARD, Engine as _};

use crate::error::Result;

pub use ffmpeg::FfmpegSpawner;

/// RTP payload type used for the H.264 stream.
pub const VIDEO_PAYLOAD_TYPE: u8 = 99;

/// The only SRTP crypto suite the camera advertises.
pub const SRTP_SUITE: &str = "AES_CM_128_HMAC_SHA1_80";

/// RTP packet size passed to the SRTP muxer.
pub const RTP_PACKET_SIZE: u32 = 1378;

/// Everything needed to launch the worker for one session's video leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerParameters {
    /// Source locator, passed through to the worker (e.g. `-re -i rtsp://...`).
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Target bitrate in kbit/s; also used as the rate-control buffer size.
    pub bitrate: u32,
    pub ssrc: u32,
    /// SRTP master key followed by master salt.
    pub srtp_key_material: Vec<u8>,
    /// Viewer address.
    pub address: String,
    /// Viewer RTP port (RTCP is muxed on the same port).
    pub port: u16,
}

impl WorkerParameters {
    /// Key material in the base64 form expected by `-srtp_out_params`.
    pub fn srtp_params(&self) -> String {
        BASE64_STANDARD.encode(&self.srtp_key_material)
    }

    /// `srtp://addr:port?rtcpport=port&localrtcpport=port&pkt_size=1378`
    pub fn destination_url(&self) -> String {
        format!(
            "srtp://{addr}:{port}?rtcpport={port}&localrtcpport={port}&pkt_size={size}",
            addr = self.address,
            port = self.port,
            size = RTP_PACKET_SIZE,
        )
    }
}

/// A running worker bound to one session.
pub trait Worker: Send {
    /// OS process id, when there is one.
    fn id(&self) -> Option<u32>;

    /// Forcefully terminate the worker. Does not wait for it to exit and
    /// never fails; a worker that already exited is left alone.
    fn kill(&mut self);
}

/// Starts workers.
pub trait WorkerSpawner: Send + Sync {
    fn spawn(&self, params: &WorkerParameters) -> Result<Box<dyn Worker>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> WorkerParameters {
        WorkerParameters {
            source: "-i rtsp://cam/live".to_string(),
            width: 1280,
            height: 720,
            fps: 30,
            bitrate: 300,
            ssrc: 1,
            srtp_key_material: vec![0u8; 30],
            address: "10.0.0.5".to_string(),
            port: 5000,
        }
    }

    #[test]
    fn destination_url_format() {
        assert_eq!(
            params().destination_url(),
            "srtp://10.0.0.5:5000?rtcpport=5000&localrtcpport=5000&pkt_size=1378"
        );
    }

    #[test]
    fn srtp_params_base64() {
        let mut p = params();
        p.srtp_key_material = b"keysalt".to_vec();
        assert_eq!(p.srtp_params(), "a2V5c2FsdA==");
    }
}
