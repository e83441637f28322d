//! FFmpeg detection and installation guidance.
//!
//! FFmpeg is optional: without it only the natively supported formats can be
//! opened and only WAV can be saved. Nothing here installs software; the
//! guidance is shown to the user as advice.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::error::SourceError;

static FFMPEG_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Whether an `ffmpeg` binary answers `-version`. Probed once per process.
pub fn ffmpeg_available() -> bool {
    *FFMPEG_AVAILABLE.get_or_init(|| {
        let found = Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        info!(found, "probed for ffmpeg");
        found
    })
}

/// Convert `input` to `output` with FFmpeg; the output container follows
/// the output file extension.
pub fn transcode(input: &Path, output: &Path) -> Result<(), SourceError> {
    debug!(input = %input.display(), output = %output.display(), "ffmpeg transcode");
    let out = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-i"])
        .arg(input)
        .arg(output)
        .stdin(Stdio::null())
        .output()?;

    if out.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&out.stderr);
        Err(SourceError::Encode(format!(
            "ffmpeg exited with {}: {}",
            out.status,
            stderr.trim()
        )))
    }
}

/// Advice for installing FFmpeg on the named OS (`std::env::consts::OS` values).
pub fn install_guidance(os: &str) -> String {
    match os {
        "windows" => "FFmpeg not found. Download it from https://ffmpeg.org/download.html \
                      and add its bin folder to your PATH."
            .to_string(),
        "macos" => "FFmpeg not found. Install it with `brew install ffmpeg`. Without Homebrew, \
                    install it first: /bin/bash -c \"$(curl -fsSL \
                    https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)\""
            .to_string(),
        "linux" => "FFmpeg not found. Install it with `sudo apt-get install ffmpeg -y` \
                    (or your distribution's package manager)."
            .to_string(),
        other => format!("FFmpeg not found. Unsupported OS {other:?}: please install FFmpeg manually."),
    }
}

/// Startup status line describing FFmpeg availability for this platform.
pub fn startup_message() -> String {
    if ffmpeg_available() {
        "FFmpeg is installed.".to_string()
    } else {
        install_guidance(std::env::consts::OS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guidance_is_platform_specific() {
        assert!(install_guidance("windows").contains("ffmpeg.org/download"));
        assert!(install_guidance("macos").contains("brew install ffmpeg"));
        assert!(install_guidance("linux").contains("apt-get install ffmpeg"));
        assert!(install_guidance("haiku").contains("manually"));
    }

    #[test]
    fn probe_is_stable_across_calls() {
        assert_eq!(ffmpeg_available(), ffmpeg_available());
    }
}
