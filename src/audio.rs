//! Audio pipeline: decoded sources, the engine thread and the playback
//! session that coordinates them.
//!
//! The session lives on the UI thread. The output device lives on its own
//! thread behind `EngineHost` and is driven through a command channel;
//! decode, export and radio fetches run on short-lived workers that report
//! back through the session's channel.

mod engine;
mod poller;
mod session;
mod source;
mod thread;
mod transport;
mod types;

pub use engine::{Engine, RodioEngine};
pub use session::Session;
pub use source::AudioSource;
pub use transport::TransportArtifact;
pub use types::{Notification, PlaybackState, Progress, TrimEnd};
