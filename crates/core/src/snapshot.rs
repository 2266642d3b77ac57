//! Still image snapshots.
//!
//! The camera does not decode its own stream for snapshots; it fetches a
//! JPEG from a configured HTTP endpoint (most IP cameras expose one) and
//! passes the bytes through.

use std::time::Duration;

use crate::error::{CameraError, Result};
use crate::protocol::SnapshotRequest;

const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Produces snapshot images.
pub trait SnapshotSource: Send + Sync {
    fn fetch(&self, request: &SnapshotRequest) -> Result<Vec<u8>>;
}

/// Fetches snapshots with an HTTP GET.
pub struct HttpSnapshot {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSnapshot {
    pub fn new(url: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(SNAPSHOT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to build snapshot HTTP client, using defaults");
                reqwest::blocking::Client::new()
            });

        Self {
            url: url.to_string(),
            client,
        }
    }
}

impl SnapshotSource for HttpSnapshot {
    fn fetch(&self, request: &SnapshotRequest) -> Result<Vec<u8>> {
        tracing::debug!(
            url = %self.url,
            width = request.width,
            height = request.height,
            "snapshot request"
        );

        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::warn!(url = %self.url, %status, "snapshot endpoint returned error");
            return Err(CameraError::SnapshotStatus(status.as_u16()));
        }

        let body = response.bytes()?.to_vec();
        tracing::info!(size = body.len(), "snapshot fetched");
        Ok(body)
    }
}
