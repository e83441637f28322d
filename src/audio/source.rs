//! Decoded audio held in memory.
//!
//! An `AudioSource` is a window over an interleaved `f32` buffer. Slicing
//! narrows the window without copying samples; exporting writes the window
//! out as 16-bit PCM WAV, the format handed to the playback engine.

use std::fs::File;
use std::io::{Cursor, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::environment;
use crate::error::SourceError;

use super::transport::TransportArtifact;

#[derive(Debug, Clone)]
pub struct AudioSource {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
    start_frame: usize,
    end_frame: usize,
}

impl AudioSource {
    /// Decode the file at `path`.
    ///
    /// Formats symphonia cannot read are converted with FFmpeg first, when it
    /// is installed.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SourceError::NotFound(path.to_path_buf()),
            _ => SourceError::Io(e),
        })?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        match decode(Box::new(file), &hint) {
            Err(SourceError::Decode(msg)) if environment::ffmpeg_available() => {
                debug!(path = %path.display(), reason = %msg, "falling back to ffmpeg decode");
                Self::load_via_ffmpeg(path).map_err(|e| {
                    warn!(path = %path.display(), error = %e, "ffmpeg fallback failed");
                    SourceError::Decode(msg)
                })
            }
            other => other,
        }
    }

    /// Decode an in-memory encoded buffer. `extension` helps format probing.
    pub fn from_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<Self, SourceError> {
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }
        decode(Box::new(Cursor::new(bytes)), &hint)
    }

    /// Wrap already-decoded interleaved samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;
        Self {
            samples: samples.into(),
            sample_rate: sample_rate.max(1),
            channels,
            start_frame: 0,
            end_frame: frames,
        }
    }

    fn load_via_ffmpeg(path: &Path) -> Result<Self, SourceError> {
        let wav = TransportArtifact::create(".wav")?;
        environment::transcode(path, wav.path())?;
        let file = File::open(wav.path())?;
        let mut hint = Hint::new();
        hint.with_extension("wav");
        decode(Box::new(file), &hint)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.end_frame - self.start_frame
    }

    pub fn duration_ms(&self) -> u64 {
        let rate = self.sample_rate as u64;
        (self.frames() as u64 * 1000 + rate / 2) / rate
    }

    /// Interleaved samples of the current window.
    pub fn samples(&self) -> &[f32] {
        let ch = self.channels as usize;
        &self.samples[self.start_frame * ch..self.end_frame * ch]
    }

    fn frames_for_ms(&self, ms: u64) -> usize {
        ((ms * self.sample_rate as u64 + 500) / 1000) as usize
    }

    /// The sub-range `start_ms..end_ms`, relative to this source.
    pub fn slice(&self, start_ms: i64, end_ms: i64) -> Result<Self, SourceError> {
        let duration_ms = self.duration_ms();
        let range_err = || SourceError::Range {
            start_ms,
            end_ms,
            duration_ms,
        };

        if start_ms < 0 || start_ms >= end_ms || end_ms as u64 > duration_ms {
            return Err(range_err());
        }

        let start = self.start_frame + self.frames_for_ms(start_ms as u64);
        let end = (self.start_frame + self.frames_for_ms(end_ms as u64)).min(self.end_frame);
        if start >= end {
            return Err(range_err());
        }

        Ok(Self {
            samples: Arc::clone(&self.samples),
            sample_rate: self.sample_rate,
            channels: self.channels,
            start_frame: start,
            end_frame: end,
        })
    }

    /// Write the window to a temporary WAV file for the engine.
    pub fn export_to_transport(&self) -> Result<TransportArtifact, SourceError> {
        let artifact = TransportArtifact::create(".wav")?;
        self.write_wav(artifact.path())?;
        Ok(artifact)
    }

    /// Save to `dest`, choosing the container from its extension.
    pub fn save(&self, dest: &Path) -> Result<(), SourceError> {
        let ext = dest
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "wav" | "wave" => self.write_wav(dest),
            "" => Err(SourceError::UnsupportedFormat("(no extension)".to_string())),
            _ if environment::ffmpeg_available() => {
                let wav = self.export_to_transport()?;
                environment::transcode(wav.path(), dest)
            }
            _ => Err(SourceError::UnsupportedFormat(format!(
                "{ext} (install FFmpeg to save formats other than WAV)"
            ))),
        }
    }

    fn write_wav(&self, path: &Path) -> Result<(), SourceError> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &s in self.samples() {
            writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

fn decode(source: Box<dyn MediaSource>, hint: &Hint) -> Result<AudioSource, SourceError> {
    let mss = MediaSourceStream::new(source, MediaSourceStreamOptions::default());

    let probed = symphonia::default::get_probe()
        .format(
            hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SourceError::Decode(format!("unrecognised format: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SourceError::Decode("no supported audio track".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SourceError::Decode(format!("unsupported codec: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut layout: Option<(u32, u16)> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            // End of stream.
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(SourceError::Decode(format!("read error: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packet; skip.
                debug!(error = %e, "skipping undecodable packet");
                continue;
            }
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(SourceError::Decode(format!("decode error: {e}"))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count() as u16;
        match layout {
            None => layout = Some((spec.rate, channels)),
            Some((_, c)) if c != channels => {
                debug!("channel layout changed mid-stream; dropping packet");
                continue;
            }
            Some(_) => {}
        }

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    match layout {
        Some((rate, channels)) if !samples.is_empty() && rate > 0 && channels > 0 => {
            Ok(AudioSource::from_samples(samples, rate, channels))
        }
        _ => Err(SourceError::Decode("no audio frames decoded".to_string())),
    }
}
