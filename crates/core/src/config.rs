//! Camera configuration.
//!
//! Accepts the same JSON shape camera plugins have always used:
//!
//! ```json
//! {
//!   "source": "-re -i rtsp://192.168.1.10:554/live",
//!   "videoResolutions": [[1920, 1080, 30], [1280, 720, 30], [320, 240, 15]],
//!   "snapshotURL": "http://192.168.1.10/snapshot.jpg",
//!   "maxStreams": 2
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CameraError, Result};
use crate::negotiate::ResolutionEntry;
use crate::stream::DEFAULT_MAX_STREAMS;
use crate::worker::ffmpeg::DEFAULT_FFMPEG_PATH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    /// ffmpeg input arguments for the camera feed. Required.
    #[serde(default)]
    pub source: String,
    /// Resolutions the source can produce, as `[width, height, fps]`.
    #[serde(default)]
    pub video_resolutions: Vec<ResolutionEntry>,
    #[serde(rename = "snapshotURL", default, skip_serializing_if = "Option::is_none")]
    pub snapshot_url: Option<String>,
    /// Number of stream slots; `0` means the default of 2.
    #[serde(default = "default_max_streams")]
    pub max_streams: usize,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

fn default_max_streams() -> usize {
    DEFAULT_MAX_STREAMS
}

fn default_ffmpeg_path() -> String {
    DEFAULT_FFMPEG_PATH.to_string()
}

impl CameraConfig {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            video_resolutions: Vec::new(),
            snapshot_url: None,
            max_streams: DEFAULT_MAX_STREAMS,
            ffmpeg_path: default_ffmpeg_path(),
        }
    }

    pub fn with_resolutions(mut self, resolutions: &[ResolutionEntry]) -> Self {
        self.video_resolutions = resolutions.to_vec();
        self
    }

    pub fn with_snapshot_url(mut self, url: &str) -> Self {
        self.snapshot_url = Some(url.to_string());
        self
    }

    pub fn with_max_streams(mut self, max_streams: usize) -> Self {
        self.max_streams = max_streams;
        self
    }

    pub fn with_ffmpeg_path(mut self, path: &str) -> Self {
        self.ffmpeg_path = path.to_string();
        self
    }

    /// Parse a JSON config. Does not validate; see [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Fails with [`CameraError::MissingSource`] when no source is set.
    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(CameraError::MissingSource);
        }
        Ok(())
    }

    /// Stream slot count with the `0 -> default` rule applied.
    pub fn stream_count(&self) -> usize {
        if self.max_streams == 0 {
            DEFAULT_MAX_STREAMS
        } else {
            self.max_streams
        }
    }
}
