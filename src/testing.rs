//! Shared test fixtures: generated WAV files, a recording fake engine and a
//! one-shot HTTP server.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::{Engine, Notification, Session};
use crate::error::EngineError;

/// Write a `duration_ms` long 440 Hz tone as 16-bit PCM WAV.
pub fn write_tone_wav(path: &Path, duration_ms: u64, sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    let frames = duration_ms * sample_rate as u64 / 1000;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let s = ((t * 440.0 * std::f32::consts::TAU).sin() * 0.3 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            w.write_sample(s).unwrap();
        }
    }
    w.finalize().unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Load {
        path: PathBuf,
        bytes: u64,
        looping: bool,
        start_offset_ms: u64,
    },
    Pause,
    Resume,
    Stop,
    SetVolume(u8),
}

/// Test-side view of a `FakeEngine` living on the engine thread.
#[derive(Clone, Default)]
pub struct EngineProbe {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    fail_loads: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl EngineProbe {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn loads(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, EngineCall::Load { .. }))
            .collect()
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make the current load run off its end.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub fn engine(&self) -> FakeEngine {
        FakeEngine {
            probe: self.clone(),
            playing: None,
        }
    }
}

struct Playback {
    offset_ms: u64,
    resumed_at: Option<Instant>,
    played: Duration,
}

/// `Engine` that records every call and plays silence on a wall clock.
pub struct FakeEngine {
    probe: EngineProbe,
    playing: Option<Playback>,
}

impl FakeEngine {
    fn record(&self, call: EngineCall) {
        self.probe.calls.lock().unwrap().push(call);
    }
}

impl Engine for FakeEngine {
    fn load_and_play(
        &mut self,
        artifact: &Path,
        looping: bool,
        start_offset_ms: u64,
    ) -> Result<(), EngineError> {
        let bytes = std::fs::metadata(artifact)
            .map_err(|e| EngineError::Artifact(e.to_string()))?
            .len();
        self.record(EngineCall::Load {
            path: artifact.to_path_buf(),
            bytes,
            looping,
            start_offset_ms,
        });
        self.playing = None;
        if self.probe.fail_loads.load(Ordering::SeqCst) {
            return Err(EngineError::Device("fake device unplugged".into()));
        }
        self.probe.finished.store(false, Ordering::SeqCst);
        self.playing = Some(Playback {
            offset_ms: start_offset_ms,
            resumed_at: Some(Instant::now()),
            played: Duration::ZERO,
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.record(EngineCall::Pause);
        if let Some(p) = self.playing.as_mut() {
            if let Some(at) = p.resumed_at.take() {
                p.played += at.elapsed();
            }
        }
    }

    fn resume(&mut self) {
        self.record(EngineCall::Resume);
        if let Some(p) = self.playing.as_mut() {
            if p.resumed_at.is_none() {
                p.resumed_at = Some(Instant::now());
            }
        }
    }

    fn stop(&mut self) {
        self.record(EngineCall::Stop);
        self.playing = None;
    }

    fn set_volume(&mut self, volume: u8) {
        self.record(EngineCall::SetVolume(volume));
    }

    fn position_ms(&self) -> Option<u64> {
        if self.probe.finished.load(Ordering::SeqCst) {
            return None;
        }
        let p = self.playing.as_ref()?;
        let running = p.resumed_at.map(|at| at.elapsed()).unwrap_or_default();
        Some(p.offset_ms + (p.played + running).as_millis() as u64)
    }
}

/// Pump `session.update` until `cond` holds or a few seconds pass.
pub fn wait_until(session: &mut Session, mut cond: impl FnMut(&Session) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        session.update(Instant::now());
        if cond(session) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

pub fn drain(rx: &Receiver<Notification>) -> Vec<Notification> {
    rx.try_iter().collect()
}

/// Serve a single HTTP response on a local port and return its URL.
pub fn serve_once(status: u16, content_type: &str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let content_type = content_type.to_string();

    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        // Read the request head; its contents don't matter.
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf);

        let head = format!(
            "HTTP/1.1 {status} X\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&body);
        let _ = stream.flush();
    });

    format!("http://{addr}/stream")
}
