use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use crate::audio::TransportArtifact;
use crate::config::RadioSettings;
use crate::error::StreamError;

pub struct RadioIngest {
    client: Client,
    prefix_bytes: u64,
}

impl RadioIngest {
    pub fn new(settings: &RadioSettings) -> Result<Self, StreamError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.read_timeout_secs))
            .user_agent(concat!("tapedeck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            prefix_bytes: settings.prefix_bytes.max(1),
        })
    }

    /// GET `url` and keep at most `prefix_bytes` of its body in a temporary
    /// artifact. The artifact is deleted when dropped.
    pub fn fetch(&self, url: &str) -> Result<TransportArtifact, StreamError> {
        info!(url, "fetching radio prefix");
        let resp = self.client.get(url).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StreamError::Status(status.as_u16()));
        }

        let suffix = suffix_for_content_type(
            resp.headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        let mut body = Vec::new();
        resp.take(self.prefix_bytes).read_to_end(&mut body)?;
        if body.is_empty() {
            return Err(StreamError::Empty);
        }

        debug!(url, bytes = body.len(), suffix, "radio prefix fetched");
        Ok(TransportArtifact::with_bytes(suffix, &body)?)
    }
}

/// Artifact suffix for a response `Content-Type`. Unknown types are assumed
/// to be MP3, the most common station format.
pub fn suffix_for_content_type(content_type: Option<&str>) -> &'static str {
    let Some(ct) = content_type else {
        return ".mp3";
    };
    let ct = ct.to_ascii_lowercase();
    if ct.contains("aac") {
        ".aac"
    } else if ct.contains("ogg") {
        ".ogg"
    } else if ct.contains("wav") {
        ".wav"
    } else {
        ".mp3"
    }
}
