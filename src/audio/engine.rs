//! The playback engine: one output device playing one artifact at a time.
//!
//! `Engine` is the seam the session drives; `RodioEngine` is the real device.
//! Engines are not required to be `Send`: the engine thread builds its engine
//! in place and is the only code that ever touches it.

use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::debug;

use crate::error::EngineError;

pub trait Engine {
    /// Stop whatever is playing, load `artifact` and start it at
    /// `start_offset_ms`. With `looping` the artifact repeats forever.
    fn load_and_play(
        &mut self,
        artifact: &Path,
        looping: bool,
        start_offset_ms: u64,
    ) -> Result<(), EngineError>;

    fn pause(&mut self);

    fn resume(&mut self);

    fn stop(&mut self);

    /// `volume` is a percentage, 0-100.
    fn set_volume(&mut self, volume: u8);

    /// Position inside the loaded artifact, or `None` when nothing is
    /// playing (never loaded, stopped, or ran off the end).
    fn position_ms(&self) -> Option<u64>;
}

/// `Engine` over the default rodio output device.
pub struct RodioEngine {
    // Keep this alive for the lifetime of the engine!
    stream: OutputStream,
    sink: Option<Sink>,
    volume: f32,
    start_offset: Duration,
    length: Option<Duration>,
    looping: bool,
}

impl RodioEngine {
    /// Open the default output device at the requested format, falling back
    /// to the device default when it refuses.
    pub fn init(sample_rate: u32, channels: u16) -> Result<Self, EngineError> {
        let mut stream = OutputStreamBuilder::from_default_device()
            .map_err(|e| EngineError::Device(e.to_string()))?
            .with_sample_rate(sample_rate)
            .with_channels(channels)
            .open_stream_or_fallback()
            .map_err(|e| EngineError::Device(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped, which would
        // scribble over the TUI.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sink: None,
            volume: 0.5,
            start_offset: Duration::ZERO,
            length: None,
            looping: false,
        })
    }
}

impl Engine for RodioEngine {
    fn load_and_play(
        &mut self,
        artifact: &Path,
        looping: bool,
        start_offset_ms: u64,
    ) -> Result<(), EngineError> {
        // Read everything up front so the caller may delete the file as soon
        // as this returns.
        let bytes = fs::read(artifact)
            .map_err(|e| EngineError::Artifact(format!("{}: {e}", artifact.display())))?;
        let decoder = Decoder::new(Cursor::new(bytes))
            .map_err(|e| EngineError::Artifact(format!("{}: {e}", artifact.display())))?;
        let length = decoder.total_duration();

        self.stop();

        let offset = Duration::from_millis(start_offset_ms);
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume);
        if looping {
            // Later passes restart from zero, only the first one is offset.
            sink.append(decoder.buffered().repeat_infinite().skip_duration(offset));
        } else {
            // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
            sink.append(decoder.skip_duration(offset));
        }
        sink.play();

        debug!(artifact = %artifact.display(), looping, start_offset_ms, "engine playing");
        self.sink = Some(sink);
        self.start_offset = offset;
        self.length = length;
        self.looping = looping;
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = f32::from(volume.min(100)) / 100.0;
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn position_ms(&self) -> Option<u64> {
        let sink = self.sink.as_ref()?;
        if sink.empty() {
            return None;
        }
        let pos = absolute_position(self.start_offset, sink.get_pos(), self.length, self.looping);
        Some(pos.as_millis() as u64)
    }
}

/// Position within the artifact. Looping playback wraps at `length` when it
/// is known and non-zero.
fn absolute_position(
    start_offset: Duration,
    played: Duration,
    length: Option<Duration>,
    looping: bool,
) -> Duration {
    let pos = start_offset.saturating_add(played);
    match length {
        Some(len) if looping && !len.is_zero() => {
            Duration::from_nanos((pos.as_nanos() % len.as_nanos()) as u64)
        }
        _ => pos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn position_includes_start_offset() {
        assert_eq!(absolute_position(ms(4000), ms(250), Some(ms(10_000)), false), ms(4250));
        // Without looping nothing wraps, even past the end.
        assert_eq!(absolute_position(ms(9000), ms(2000), Some(ms(10_000)), false), ms(11_000));
    }

    #[test]
    fn looping_position_wraps_at_length() {
        assert_eq!(absolute_position(ms(0), ms(12_500), Some(ms(10_000)), true), ms(2500));
        assert_eq!(absolute_position(ms(9000), ms(1000), Some(ms(10_000)), true), ms(0));
        // Offset already past the first pass.
        assert_eq!(absolute_position(ms(25_000), ms(300), Some(ms(10_000)), true), ms(5300));
    }

    #[test]
    fn unknown_or_zero_length_does_not_wrap() {
        assert_eq!(absolute_position(ms(1000), ms(500), Some(Duration::ZERO), true), ms(1500));
        assert_eq!(absolute_position(ms(1000), ms(500), None, true), ms(1500));
    }
}
