//! Error types shared by the library store, audio pipeline and radio ingest.
//!
//! Each component has its own enum; `SessionError` is what the playback
//! session reports at its command boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while decoding, slicing or encoding audio.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The input file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The input could not be parsed as a supported audio format.
    #[error("could not decode audio: {0}")]
    Decode(String),

    /// A requested sub-range lies outside the source.
    #[error("invalid range {start_ms}..{end_ms} ms (duration {duration_ms} ms)")]
    Range {
        start_ms: i64,
        end_ms: i64,
        duration_ms: u64,
    },

    /// Writing an encoded file failed.
    #[error("could not encode audio: {0}")]
    Encode(String),

    /// The destination extension names a container we cannot produce.
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for SourceError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => Self::Io(io),
            other => Self::Encode(other.to_string()),
        }
    }
}

/// Errors raised by the audio output device.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Opening or driving the output device failed.
    #[error("audio device error: {0}")]
    Device(String),

    /// The transport artifact could not be read or decoded.
    #[error("unreadable audio artifact: {0}")]
    Artifact(String),

    /// The device never came up; every load fails with this.
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while fetching a radio stream prefix.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The station answered with a non-success status.
    #[error("station returned HTTP {0}")]
    Status(u16),

    /// The station answered but sent no audio bytes.
    #[error("station sent an empty stream")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the library store.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by the playback session for a rejected or failed command.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{0}")]
    Decode(String),

    /// Invalid trim or seek bounds.
    #[error("{0}")]
    Range(String),

    /// Playback could not proceed on the output device.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Radio fetch failed.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The command needs a loaded audio source.
    #[error("no audio loaded")]
    NoSource,

    /// Radio streams have no seekable timeline.
    #[error("radio streams cannot seek")]
    NotSeekable,

    /// Exporting to a destination file failed.
    #[error("save failed: {0}")]
    Save(String),

    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// Load-side conversion: anything that is neither a missing file nor a bad
/// range means the input could not be turned into audio.
impl From<SourceError> for SessionError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::NotFound(path) => Self::NotFound(path),
            SourceError::Range { .. } => Self::Range(e.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}
