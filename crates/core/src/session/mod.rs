//! Stream session bookkeeping.
//!
//! A session is one logical stream to one viewer, named by a [`SessionId`]
//! the viewer picks. It moves through two maps:
//!
//! ```text
//! prepare        -> pending   (transport info, no process yet)
//! start          -> ongoing   (pending entry consumed, worker running)
//! stop           -> (removed, worker killed)
//! ```
//!
//! An identifier is in at most one of the two maps at any time. The store
//! is process-local and starts empty; nothing survives a restart.

pub mod transport;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use parking_lot::Mutex;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::CameraError;
use crate::worker::{Worker, WorkerParameters};

pub use transport::{PendingSession, SESSION_SSRC};

/// Opaque 16-byte session identifier.
///
/// Displayed and serialized in canonical hyphenated form,
/// e.g. `6f1c2a3b-4d5e-4f60-8172-93a4b5c6d7e8`. Deserializes from that
/// form or from the 16 raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId([u8; 16]);

impl SessionId {
    /// Wrap the 16 raw bytes the framework sends as `sessionID`.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// A fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    /// The raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for SessionId {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for SessionId {
    type Error = CameraError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; 16]>::try_from(bytes)
            .map(Self)
            .map_err(|_| CameraError::InvalidSessionId(format!("{} bytes", bytes.len())))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Uuid::from_bytes(self.0).hyphenated(), f)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self)
    }
}

impl FromStr for SessionId {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s)
            .map(|uuid| Self(uuid.into_bytes()))
            .map_err(|_| CameraError::InvalidSessionId(s.to_string()))
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts the hyphenated string form as well as the raw 16 bytes, either
/// as a byte string or as a sequence of integers (how JSON carries binary
/// fields).
impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SessionIdVisitor)
    }
}

struct SessionIdVisitor;

impl<'de> Visitor<'de> for SessionIdVisitor {
    type Value = SessionId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a hyphenated session id or 16 bytes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<SessionId, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<SessionId, E> {
        SessionId::try_from(v).map_err(E::custom)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<SessionId, A::Error> {
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = seq
                .next_element()?
                .ok_or_else(|| <A::Error as de::Error>::invalid_length(i, &self))?;
        }
        if seq.next_element::<u8>()?.is_some() {
            return Err(de::Error::invalid_length(17, &self));
        }
        Ok(SessionId(bytes))
    }
}

/// A session whose worker is running.
pub struct OngoingSession {
    pub worker: Box<dyn Worker>,
    /// Parameters the worker was started with.
    pub params: WorkerParameters,
    pub started_at: Instant,
}

impl OngoingSession {
    pub fn new(worker: Box<dyn Worker>, params: WorkerParameters) -> Self {
        Self {
            worker,
            params,
            started_at: Instant::now(),
        }
    }
}

impl fmt::Debug for OngoingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OngoingSession")
            .field("pid", &self.worker.id())
            .field("params", &self.params)
            .field("started_at", &self.started_at)
            .finish()
    }
}

#[derive(Default)]
struct Sessions {
    pending: HashMap<SessionId, PendingSession>,
    ongoing: HashMap<SessionId, OngoingSession>,
}

/// Pending and ongoing sessions for one camera.
///
/// Both maps sit behind a single `parking_lot::Mutex` so moving an id from
/// one map to the other is atomic with respect to other callers.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<Sessions>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store transport info for a prepared session, replacing any earlier
    /// pending entry for the same id.
    ///
    /// Returns the ongoing session the id was previously bound to, if any,
    /// so the caller can dispose of its worker.
    pub fn put_pending(&self, id: SessionId, info: PendingSession) -> Option<OngoingSession> {
        let mut sessions = self.inner.lock();
        let replaced = sessions.pending.insert(id, info).is_some();
        let displaced = sessions.ongoing.remove(&id);
        tracing::debug!(
            session_id = %id,
            replaced,
            pending = sessions.pending.len(),
            "session pending"
        );
        displaced
    }

    /// Remove and return the pending entry for `id`.
    pub fn take_pending(&self, id: &SessionId) -> Option<PendingSession> {
        self.inner.lock().pending.remove(id)
    }

    /// Record a running session. Any pending entry for the id is dropped.
    ///
    /// Returns the ongoing session it replaced, if any.
    pub fn put_ongoing(&self, id: SessionId, session: OngoingSession) -> Option<OngoingSession> {
        let mut sessions = self.inner.lock();
        sessions.pending.remove(&id);
        let previous = sessions.ongoing.insert(id, session);
        tracing::debug!(
            session_id = %id,
            ongoing = sessions.ongoing.len(),
            "session ongoing"
        );
        previous
    }

    /// Remove and return the ongoing session for `id`.
    pub fn take_ongoing(&self, id: &SessionId) -> Option<OngoingSession> {
        let removed = self.inner.lock().ongoing.remove(id);
        if removed.is_some() {
            tracing::debug!(session_id = %id, "session removed");
        }
        removed
    }

    /// Remove every ongoing session (used on teardown).
    pub fn drain_ongoing(&self) -> Vec<(SessionId, OngoingSession)> {
        self.inner.lock().ongoing.drain().collect()
    }

    /// Forget every pending session.
    pub fn clear_pending(&self) -> usize {
        let mut sessions = self.inner.lock();
        let count = sessions.pending.len();
        sessions.pending.clear();
        count
    }

    pub fn is_pending(&self, id: &SessionId) -> bool {
        self.inner.lock().pending.contains_key(id)
    }

    pub fn is_ongoing(&self, id: &SessionId) -> bool {
        self.inner.lock().ongoing.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn ongoing_count(&self) -> usize {
        self.inner.lock().ongoing.len()
    }

    /// Ids of all sessions with a running worker.
    pub fn ongoing_ids(&self) -> Vec<SessionId> {
        self.inner.lock().ongoing.keys().copied().collect()
    }
}
