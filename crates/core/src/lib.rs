pub mod camera;
pub mod config;
pub mod error;
pub mod negotiate;
pub mod net;
pub mod protocol;
pub mod session;
pub mod snapshot;
pub mod stream;
pub mod worker;

pub use camera::CameraSource;
pub use config::CameraConfig;
pub use error::{CameraError, Result};
pub use negotiate::{NegotiatedResolution, ResolutionEntry, negotiate};
pub use session::SessionId;
pub use worker::{Worker, WorkerParameters, WorkerSpawner};
