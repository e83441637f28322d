//! Audio-related small types and handles.
//!
//! This module defines the playback state, the notifications the session
//! emits towards the UI and the status snapshot shared with the engine thread.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::error::SessionError;

/// The mode of the playback session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing loaded.
    #[default]
    Idle,
    /// A file source is resident but not playing.
    Loaded,
    Playing,
    Paused,
    /// A radio prefix is playing; there is no file source.
    RadioPlaying,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loaded => "Loaded",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::RadioPlaying => "Radio",
        }
    }
}

/// One sample of the playback position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub position_ms: u64,
    pub duration_ms: u64,
}

impl Progress {
    /// Fraction of the track played, in `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }
}

/// Events the session reports to the display side.
#[derive(Debug)]
pub enum Notification {
    State(PlaybackState),
    Status(String),
    Progress(Progress),
    Error(SessionError),
    /// Library rows were added, removed or re-counted.
    LibraryChanged,
}

/// End bound of a trim request.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TrimEnd {
    /// Seconds from the start of the current source.
    At(f64),
    /// The end of the current source.
    End,
}

impl FromStr for TrimEnd {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("end") {
            return Ok(Self::End);
        }
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Self::At)
            .ok_or_else(|| format!("invalid trim time {s:?}: expected seconds or \"end\""))
    }
}

/// What the engine thread last observed, refreshed on every loop iteration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStatus {
    /// Generation of the artifact currently loaded, if any.
    pub generation: Option<u64>,
    /// Position inside that artifact; `None` when unknown or stopped.
    pub position_ms: Option<u64>,
}

pub type StatusHandle = Arc<Mutex<EngineStatus>>;
