//! Video resolution negotiation.
//!
//! A start request names the resolution and framerate the viewer would like.
//! The camera can only produce the resolutions listed in its catalog, so
//! [`negotiate`] picks the largest catalog entry that does not exceed the
//! request in either dimension and caps the framerate at what that entry
//! supports.
//!
//! ```text
//! catalog:   1920x1080@30   1280x720@30   320x240@15
//! request:   1280x720@25
//!
//! 1920x1080  too large  (within_capability = false)
//! 1280x720   match      best = 1280x720, fps = min(30, 25) = 25
//! 320x240    ignored    (neither dimension beats the current best)
//!
//! result:    1280x720@25
//! ```
//!
//! Bitrate is not negotiated; it passes through from the request.

use serde::{Deserialize, Serialize};

/// One resolution the camera source can produce, at up to `max_fps`.
///
/// Config files write entries as `[width, height, fps]` triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, u32, u32)", into = "(u32, u32, u32)")]
pub struct ResolutionEntry {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Highest framerate the source sustains at this size.
    pub max_fps: u32,
}

impl ResolutionEntry {
    pub const fn new(width: u32, height: u32, max_fps: u32) -> Self {
        Self {
            width,
            height,
            max_fps,
        }
    }
}

impl From<(u32, u32, u32)> for ResolutionEntry {
    fn from((width, height, max_fps): (u32, u32, u32)) -> Self {
        Self::new(width, height, max_fps)
    }
}

impl From<ResolutionEntry> for (u32, u32, u32) {
    fn from(entry: ResolutionEntry) -> Self {
        (entry.width, entry.height, entry.max_fps)
    }
}

/// Outcome of [`negotiate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedResolution {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// `false` when at least one catalog entry was larger than requested.
    pub within_capability: bool,
}

/// Pick the best catalog entry for a requested `width`x`height`@`fps`.
///
/// Entries larger than the request in either dimension are skipped (and
/// clear `within_capability`). Among the rest, an entry replaces the
/// current best when it is wider *or* taller, so a taller-but-narrower
/// entry can win over a wider-but-shorter one.
///
/// When nothing fits, the result is `0x0` at the requested fps. Callers get
/// that value as-is.
pub fn negotiate(
    catalog: &[ResolutionEntry],
    width: u32,
    height: u32,
    fps: u32,
) -> NegotiatedResolution {
    let mut result = NegotiatedResolution {
        width: 0,
        height: 0,
        fps,
        within_capability: true,
    };

    for entry in catalog {
        if entry.width > width || entry.height > height {
            tracing::debug!(
                width = entry.width,
                height = entry.height,
                max_fps = entry.max_fps,
                "possible resolution too large"
            );
            result.within_capability = false;
            continue;
        }

        if entry.width > result.width || entry.height > result.height {
            result.width = entry.width;
            result.height = entry.height;
            result.fps = entry.max_fps.min(fps);
            tracing::debug!(
                width = entry.width,
                height = entry.height,
                max_fps = entry.max_fps,
                "possible resolution match"
            );
        }
    }

    tracing::info!(
        width = result.width,
        height = result.height,
        fps = result.fps,
        within_capability = result.within_capability,
        "negotiated resolution"
    );

    result
}
