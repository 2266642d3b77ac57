//! Error types for the camera stream manager.

/// Errors that can occur while configuring or driving a camera source.
///
/// Only a few of these ever reach the accessory framework:
///
/// - **Construction**: [`MissingSource`](Self::MissingSource),
///   [`Config`](Self::Config), [`Io`](Self::Io). These abort startup.
/// - **Worker**: [`Spawn`](Self::Spawn) is returned from a start request
///   when the transcoder could not be launched.
/// - **Snapshot**: [`Snapshot`](Self::Snapshot),
///   [`SnapshotStatus`](Self::SnapshotStatus),
///   [`SnapshotUnavailable`](Self::SnapshotUnavailable).
///
/// Session bookkeeping never fails: a start without a pending session or a
/// stop without a running worker is a silent no-op.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// The camera config has no `source` (or it is blank).
    #[error("missing source for camera")]
    MissingSource,

    /// The camera config could not be parsed.
    #[error("invalid camera config: {0}")]
    Config(#[from] serde_json::Error),

    /// Underlying I/O error (reading config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transcoding worker process could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level failure while fetching a snapshot.
    #[error("snapshot request failed: {0}")]
    Snapshot(#[from] reqwest::Error),

    /// The snapshot endpoint answered with something other than 200 OK.
    #[error("snapshot endpoint returned HTTP {0}")]
    SnapshotStatus(u16),

    /// No snapshot URL is configured for this camera.
    #[error("no snapshot source configured")]
    SnapshotUnavailable,

    /// A session identifier string was not a hyphenated 16-byte hex id.
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),
}

/// Convenience alias for `Result<T, CameraError>`.
pub type Result<T> = std::result::Result<T, CameraError>;
