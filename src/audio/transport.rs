//! Short-lived files handed to the playback engine.

use std::io;
use std::path::Path;

use tempfile::TempPath;

/// A temporary, engine-loadable file. The file is deleted when the artifact
/// is dropped, whichever way the load that consumed it went.
#[derive(Debug)]
pub struct TransportArtifact {
    path: TempPath,
}

impl TransportArtifact {
    /// Reserve a fresh, empty temporary file ending in `suffix`.
    pub fn create(suffix: &str) -> io::Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("tapedeck-")
            .suffix(suffix)
            .tempfile()?
            .into_temp_path();
        Ok(Self { path })
    }

    /// Reserve a temporary file and fill it with `bytes`.
    pub fn with_bytes(suffix: &str, bytes: &[u8]) -> io::Result<Self> {
        let artifact = Self::create(suffix)?;
        std::fs::write(artifact.path(), bytes)?;
        Ok(artifact)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_is_deleted_on_drop() {
        let artifact = TransportArtifact::with_bytes(".mp3", b"abc").unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");

        drop(artifact);
        assert!(!path.exists());
    }
}
