//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the library rows, the
//! cursor, prompt input and the playback state last reported by the session.

mod model;

pub use model::*;
