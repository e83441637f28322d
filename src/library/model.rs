use std::path::{Path, PathBuf};

use lofty::file::TaggedFileExt;
use lofty::tag::Accessor;

/// A persisted library entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub play_count: u64,
}

impl Track {
    /// List label used by the UI: `Title (Listens: N)`.
    pub fn label(&self) -> String {
        format!("{} (Listens: {})", self.title, self.play_count)
    }
}

/// Title to register for `path`: the embedded title tag when present,
/// otherwise the file name.
pub fn title_for_path(path: &Path) -> String {
    let fallback = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();

    let Ok(tagged) = lofty::read_from_path(path) else {
        return fallback;
    };

    tagged
        .primary_tag()
        .or_else(|| tagged.first_tag())
        .and_then(|tag| tag.title().map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty())
        .unwrap_or(fallback)
}
