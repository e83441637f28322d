//! Play-history library.
//!
//! Tracks are persisted in a local SQLite database keyed by absolute path.
//! The store is safe to share between the session and the UI; every call is
//! atomic.

mod model;
mod store;

pub use model::{Track, title_for_path};
pub use store::Library;

#[cfg(test)]
mod tests;
