//! Stream slots and the streaming capabilities they advertise.
//!
//! A camera exposes `maxStreams` stream management slots. Each slot is what
//! a viewer connection binds to while it watches; the framework hands the
//! slot to a connection and tells us when connections close. All slots
//! advertise the same [`StreamingOptions`].

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::negotiate::ResolutionEntry;

/// Number of stream slots when the config does not say.
pub const DEFAULT_MAX_STREAMS: usize = 2;

/// Framework-assigned identifier of a viewer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// H.264 profiles, numbered as the accessory protocol enumerates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum H264Profile {
    Baseline = 0,
    Main = 1,
    High = 2,
}

impl From<H264Profile> for u8 {
    fn from(profile: H264Profile) -> Self {
        profile as u8
    }
}

impl TryFrom<u8> for H264Profile {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(H264Profile::Baseline),
            1 => Ok(H264Profile::Main),
            2 => Ok(H264Profile::High),
            other => Err(format!("unknown H.264 profile {other}")),
        }
    }
}

/// H.264 levels, numbered as the accessory protocol enumerates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum H264Level {
    Level3_1 = 0,
    Level3_2 = 1,
    Level4_0 = 2,
}

impl From<H264Level> for u8 {
    fn from(level: H264Level) -> Self {
        level as u8
    }
}

impl TryFrom<u8> for H264Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(H264Level::Level3_1),
            1 => Ok(H264Level::Level3_2),
            2 => Ok(H264Level::Level4_0),
            other => Err(format!("unknown H.264 level {other}")),
        }
    }
}

/// Audio codecs a viewer may select. Serialized with the framework's names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCodecType {
    /// `"OPUS"`
    #[serde(rename = "OPUS")]
    Opus,
    /// `"AAC-eld"`
    #[serde(rename = "AAC-eld")]
    AacEld,
}

/// One advertised audio codec and the sample rate offered with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCodec {
    #[serde(rename = "type")]
    pub kind: AudioCodecType,
    /// Sample rate in kHz (8, 16 or 24).
    pub samplerate: u32,
}

/// H.264 parameters the encoder accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCodecOptions {
    /// Supported profiles, in wire order.
    pub profiles: Vec<H264Profile>,
    /// Supported levels, in wire order.
    pub levels: Vec<H264Level>,
}

/// Video half of [`StreamingOptions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoOptions {
    /// The camera's resolution catalog, advertised as `[w, h, fps]`.
    pub resolutions: Vec<ResolutionEntry>,
    pub codec: VideoCodecOptions,
}

/// Audio half of [`StreamingOptions`]. Advertised only; no audio is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioOptions {
    pub codecs: Vec<AudioCodec>,
}

/// Capabilities advertised by every stream slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingOptions {
    /// RTP/RTCP mux proxy. Not supported.
    pub proxy: bool,
    /// SRTP with `AES_CM_128_HMAC_SHA1_80`.
    pub srtp: bool,
    pub video: VideoOptions,
    pub audio: AudioOptions,
}

impl StreamingOptions {
    /// Options for a camera producing the given resolutions: all H.264
    /// profiles and levels, OPUS at 24 kHz and AAC-ELD at 16 kHz.
    pub fn for_resolutions(resolutions: &[ResolutionEntry]) -> Self {
        Self {
            proxy: false,
            srtp: true,
            video: VideoOptions {
                resolutions: resolutions.to_vec(),
                codec: VideoCodecOptions {
                    profiles: vec![H264Profile::Baseline, H264Profile::Main, H264Profile::High],
                    levels: vec![H264Level::Level3_1, H264Level::Level3_2, H264Level::Level4_0],
                },
            },
            audio: AudioOptions {
                codecs: vec![
                    AudioCodec {
                        kind: AudioCodecType::Opus,
                        samplerate: 24,
                    },
                    AudioCodec {
                        kind: AudioCodecType::AacEld,
                        samplerate: 16,
                    },
                ],
            },
        }
    }
}

/// One stream management slot.
///
/// Holds at most one viewer connection. The slot is released when that
/// connection closes.
#[derive(Debug)]
pub struct StreamSlot {
    index: usize,
    options: Arc<StreamingOptions>,
    connection: Mutex<Option<ConnectionId>>,
}

impl StreamSlot {
    pub fn new(index: usize, options: Arc<StreamingOptions>) -> Self {
        Self {
            index,
            options,
            connection: Mutex::new(None),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn options(&self) -> &StreamingOptions {
        &self.options
    }

    /// Connection currently using this slot.
    pub fn connection(&self) -> Option<ConnectionId> {
        *self.connection.lock()
    }

    pub fn is_available(&self) -> bool {
        self.connection.lock().is_none()
    }

    /// Bind a connection to this slot. Fails if another connection holds it;
    /// re-binding the same connection is accepted.
    pub fn bind(&self, connection: ConnectionId) -> bool {
        let mut current = self.connection.lock();
        match *current {
            Some(existing) if existing != connection => false,
            _ => {
                *current = Some(connection);
                tracing::debug!(slot = self.index, %connection, "stream slot bound");
                true
            }
        }
    }

    /// Release the slot if `connection` is the one bound to it.
    ///
    /// Every slot receives every close notification; slots bound to other
    /// connections ignore it. Returns whether the slot was released.
    pub fn handle_close_connection(&self, connection: ConnectionId) -> bool {
        let mut current = self.connection.lock();
        if *current == Some(connection) {
            *current = None;
            tracing::debug!(slot = self.index, %connection, "stream slot released");
            true
        } else {
            false
        }
    }
}
