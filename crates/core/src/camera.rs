use std::sync::Arc;

use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::negotiate::{ResolutionEntry, negotiate};
use crate::net::{AddressResolver, DefaultRouteResolver};
use crate::protocol::{PrepareRequest, PrepareResponse, SnapshotRequest, StreamRequest, VideoRequest};
use crate::session::transport::{self, PendingSession};
use crate::session::{OngoingSession, SessionId, SessionStore};
use crate::snapshot::{HttpSnapshot, SnapshotSource};
use crate::stream::{ConnectionId, StreamSlot, StreamingOptions};
use crate::worker::{FfmpegSpawner, WorkerParameters, WorkerSpawner};

/// Stream lifecycle controller for one camera accessory.
///
/// Owns the session store, the stream slots and the collaborators that
/// reach outside the process (worker spawner, address resolver, snapshot
/// source). Each session moves through:
///
/// ```text
/// prepare_stream          -> pending
/// start (pending exists)  -> ongoing, worker spawned
/// stop                    -> removed, worker killed
/// ```
///
/// None of the session operations fail for bookkeeping reasons: starting an
/// unknown session or stopping one that is not running is a no-op. The only
/// error a stream request can return is a worker that failed to launch.
pub struct CameraSource {
    config: CameraConfig,
    sessions: SessionStore,
    spawner: Box<dyn WorkerSpawner>,
    resolver: Box<dyn AddressResolver>,
    snapshot: Option<Box<dyn SnapshotSource>>,
    options: Arc<StreamingOptions>,
    slots: Vec<StreamSlot>,
}

impl CameraSource {
    /// Create a camera from its config with the default collaborators:
    /// ffmpeg workers, default-route address discovery and HTTP snapshots
    /// when `snapshotURL` is set.
    ///
    /// Fails with [`CameraError::MissingSource`] when the config has no
    /// source.
    pub fn new(config: CameraConfig) -> Result<Self> {
        config.validate()?;

        let spawner = FfmpegSpawner::new(&config.ffmpeg_path);
        let snapshot = config
            .snapshot_url
            .as_deref()
            .map(|url| Box::new(HttpSnapshot::new(url)) as Box<dyn SnapshotSource>);

        let options = Arc::new(StreamingOptions::for_resolutions(&config.video_resolutions));
        let slots = (0..config.stream_count())
            .map(|index| StreamSlot::new(index, options.clone()))
            .collect::<Vec<_>>();

        tracing::info!(
            source = %config.source,
            resolutions = config.video_resolutions.len(),
            streams = slots.len(),
            snapshot = snapshot.is_some(),
            "camera source created"
        );

        Ok(Self {
            config,
            sessions: SessionStore::new(),
            spawner: Box::new(spawner),
            resolver: Box::new(DefaultRouteResolver),
            snapshot,
            options,
            slots,
        })
    }

    /// Replace the worker spawner.
    pub fn with_spawner(mut self, spawner: Box<dyn WorkerSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Replace the local address resolver.
    pub fn with_resolver(mut self, resolver: Box<dyn AddressResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace (or set) the snapshot source.
    pub fn with_snapshot_source(mut self, snapshot: Box<dyn SnapshotSource>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Answer a prepare request and record the session as pending.
    ///
    /// A second prepare for the same session replaces the first. If the
    /// session was already streaming, its worker is killed.
    pub fn prepare_stream(&self, request: &PrepareRequest) -> PrepareResponse {
        let local = self.resolver.local_address();
        let (response, pending) = transport::prepare(request, local);

        if let Some(mut displaced) = self.sessions.put_pending(request.session_id, pending) {
            tracing::warn!(
                session_id = %request.session_id,
                "session re-prepared while streaming, killing worker"
            );
            displaced.worker.kill();
        }

        tracing::info!(
            session_id = %request.session_id,
            target = %request.target_address,
            "stream prepared"
        );
        response
    }

    /// Dispatch a start or stop request.
    pub fn handle_stream_request(&self, request: &StreamRequest) -> Result<()> {
        tracing::debug!(
            session_id = %request.session_id(),
            kind = request.kind(),
            "stream request"
        );

        match request {
            StreamRequest::Start { session_id, video } => {
                self.start_stream(session_id, video)?;
            }
            StreamRequest::Stop { session_id } => {
                self.stop_stream(session_id);
            }
        }
        Ok(())
    }

    /// Start streaming a prepared session.
    ///
    /// The pending entry is consumed whether or not a worker ends up
    /// running. Returns `Ok(false)` when there was nothing to start (no
    /// pending entry, or no video leg), and the spawn error when the worker
    /// could not be launched.
    pub fn start_stream(&self, session_id: &SessionId, video: &VideoRequest) -> Result<bool> {
        let Some(pending) = self.sessions.take_pending(session_id) else {
            tracing::debug!(session_id = %session_id, "start for unprepared session ignored");
            return Ok(false);
        };

        let Some(params) = worker_parameters(
            &self.config.source,
            &self.config.video_resolutions,
            &pending,
            video,
        ) else {
            tracing::warn!(session_id = %session_id, "start for session without video leg ignored");
            return Ok(false);
        };

        let worker = self.spawner.spawn(&params).inspect_err(|e| {
            tracing::warn!(session_id = %session_id, error = %e, "worker spawn failed");
        })?;
        tracing::info!(
            session_id = %session_id,
            pid = ?worker.id(),
            width = params.width,
            height = params.height,
            fps = params.fps,
            bitrate = params.bitrate,
            "stream started"
        );

        if let Some(mut previous) = self
            .sessions
            .put_ongoing(*session_id, OngoingSession::new(worker, params))
        {
            previous.worker.kill();
        }
        Ok(true)
    }

    /// Kill the session's worker. Returns whether a worker was running.
    pub fn stop_stream(&self, session_id: &SessionId) -> bool {
        match self.sessions.take_ongoing(session_id) {
            Some(mut session) => {
                session.worker.kill();
                tracing::info!(
                    session_id = %session_id,
                    pid = ?session.worker.id(),
                    uptime_secs = session.started_at.elapsed().as_secs(),
                    "stream stopped"
                );
                true
            }
            None => {
                tracing::debug!(session_id = %session_id, "stop for idle session ignored");
                false
            }
        }
    }

    /// Notify every stream slot that a viewer connection closed.
    pub fn handle_close_connection(&self, connection: ConnectionId) {
        let released = self
            .slots
            .iter()
            .filter(|slot| slot.handle_close_connection(connection))
            .count();
        tracing::debug!(%connection, released, "connection closed");
    }

    /// Bind a connection to the first free stream slot.
    pub fn claim_slot(&self, connection: ConnectionId) -> Option<&StreamSlot> {
        let slot = self.slots.iter().find(|slot| slot.bind(connection));
        if slot.is_none() {
            tracing::warn!(%connection, "no free stream slot");
        }
        slot
    }

    /// Fetch a still image from the snapshot source.
    pub fn handle_snapshot_request(&self, request: &SnapshotRequest) -> Result<Vec<u8>> {
        let snapshot = self.snapshot.as_ref().ok_or(CameraError::SnapshotUnavailable)?;
        snapshot.fetch(request)
    }

    /// Kill all running workers and forget pending sessions.
    pub fn shutdown(&self) {
        let ongoing = self.sessions.drain_ongoing();
        let pending = self.sessions.clear_pending();
        if ongoing.is_empty() && pending == 0 {
            return;
        }

        for (session_id, mut session) in ongoing {
            session.worker.kill();
            tracing::debug!(session_id = %session_id, "worker killed on shutdown");
        }
        tracing::info!(pending, "camera source shut down");
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn streaming_options(&self) -> &StreamingOptions {
        &self.options
    }

    pub fn stream_slots(&self) -> &[StreamSlot] {
        &self.slots
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Resolve the worker parameters for starting `pending` with the viewer's
/// selected `video` settings.
///
/// Width, height and fps come from negotiating against `catalog`; bitrate
/// is taken from the request as-is. Returns `None` when the pending session
/// has no video leg.
pub fn worker_parameters(
    source: &str,
    catalog: &[ResolutionEntry],
    pending: &PendingSession,
    video: &VideoRequest,
) -> Option<WorkerParameters> {
    let leg = pending.video.as_ref()?;
    let resolution = negotiate(catalog, video.width, video.height, video.fps);

    Some(WorkerParameters {
        source: source.to_string(),
        width: resolution.width,
        height: resolution.height,
        fps: resolution.fps,
        bitrate: video.max_bit_rate,
        ssrc: leg.ssrc,
        srtp_key_material: leg.srtp_key_material.clone(),
        address: pending.address.clone(),
        port: leg.port,
    })
}
