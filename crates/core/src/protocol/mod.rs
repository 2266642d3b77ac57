//! Request and response shapes exchanged with the accessory framework.
//!
//! The framework owns pairing, characteristic I/O and TLV decoding. By the
//! time a request reaches this crate it has been decoded into one of these
//! structures. Field names match the framework's JSON representation, so
//! bridges that talk JSON can deserialize requests directly.
//!
//! ## Stream setup sequence
//!
//! ```text
//! viewer                       framework                    CameraSource
//!   │ SetupEndpoints(write)       │                              │
//!   │ ───────────────────────────►│ PrepareRequest               │
//!   │                             │ ────────────────────────────►│ store pending
//!   │                             │◄──────────── PrepareResponse │
//!   │◄─────────────────────────── │                              │
//!   │ SelectedRTPStreamConfig     │                              │
//!   │ ───────────────────────────►│ StreamRequest::Start         │
//!   │                             │ ────────────────────────────►│ negotiate + spawn
//!   │         SRTP media  ◄────────────────────────────────────── ffmpeg
//!   │ SelectedRTPStreamConfig     │                              │
//!   │ ───────────────────────────►│ StreamRequest::Stop          │
//!   │                             │ ────────────────────────────►│ kill worker
//! ```

pub mod request;
pub mod response;

pub use request::{MediaLegRequest, PrepareRequest, SnapshotRequest, StreamRequest, VideoRequest};
pub use response::{AddressInfo, MediaLegResponse, PrepareResponse};
