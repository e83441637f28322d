use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{AudioSettings, StationSettings};
use crate::error::{EngineError, SessionError, SourceError};
use crate::library::{Library, title_for_path};
use crate::radio::RadioIngest;

use super::engine::Engine;
use super::poller::ProgressPoller;
use super::source::AudioSource;
use super::thread::{EngineCmd, EngineHost};
use super::types::{Notification, PlaybackState, Progress, TrimEnd};

/// Results posted by worker threads and the engine thread. Applied only by
/// `Session::update`, on the thread that owns the session.
#[derive(Debug)]
pub enum Report {
    Decoded {
        request: u64,
        path: PathBuf,
        autoplay: bool,
        result: Result<(AudioSource, String), SourceError>,
    },
    Started {
        generation: u64,
    },
    Failed {
        generation: u64,
        error: SessionError,
    },
    Finished {
        generation: u64,
    },
    Saved {
        dest: PathBuf,
        result: Result<(), SourceError>,
    },
}

/// The playback state machine.
///
/// Commands return immediately; decoding, exporting and network fetches run
/// on worker threads whose results are folded in by [`Session::update`].
/// Synchronous rejections are returned as `Err`, asynchronous failures arrive
/// as [`Notification::Error`].
pub struct Session {
    library: Arc<Library>,
    ingest: Arc<RadioIngest>,
    engine: EngineHost,
    reports_tx: Sender<Report>,
    reports_rx: Receiver<Report>,
    notify: Sender<Notification>,

    state: PlaybackState,
    source: Option<AudioSource>,
    source_path: Option<PathBuf>,
    title: Option<String>,
    looping: bool,
    volume: u8,
    position_ms: u64,

    poller: ProgressPoller,
    /// Latest open request; older decodes are dropped on arrival.
    open_seq: u64,
    /// Generation of the load this session expects the engine to be playing.
    generation: u64,
}

impl Session {
    /// Start a session, spawning the engine thread. `factory` builds the
    /// engine on that thread.
    pub fn new<E, F>(
        factory: F,
        library: Arc<Library>,
        ingest: RadioIngest,
        audio: &AudioSettings,
        notify: Sender<Notification>,
    ) -> Self
    where
        E: Engine + 'static,
        F: FnOnce() -> Result<E, EngineError> + Send + 'static,
    {
        let (reports_tx, reports_rx) = mpsc::channel();
        let engine = EngineHost::spawn(factory, reports_tx.clone());

        let volume = audio.default_volume.min(100);
        engine.send(EngineCmd::SetVolume(volume));

        Self {
            library,
            ingest: Arc::new(ingest),
            engine,
            reports_tx,
            reports_rx,
            notify,
            state: PlaybackState::Idle,
            source: None,
            source_path: None,
            title: None,
            looping: false,
            volume,
            position_ms: 0,
            poller: ProgressPoller::new(Duration::from_millis(audio.poll_interval_ms)),
            open_seq: 0,
            generation: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn source(&self) -> Option<&AudioSource> {
        self.source.as_ref()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.source.as_ref().map(AudioSource::duration_ms)
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    /// Decode `path` in the background and make it the current source.
    pub fn open(&mut self, path: &Path) -> Result<(), SessionError> {
        self.request_open(path, false)
    }

    /// `open`, then `play` as soon as the decode lands.
    pub fn select(&mut self, path: &Path) -> Result<(), SessionError> {
        self.request_open(path, true)
    }

    fn request_open(&mut self, path: &Path, autoplay: bool) -> Result<(), SessionError> {
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        if !path.exists() {
            return Err(SessionError::NotFound(path));
        }

        self.open_seq += 1;
        let request = self.open_seq;
        self.emit(Notification::Status(format!("Opening {}...", path.display())));

        let tx = self.reports_tx.clone();
        thread::spawn(move || {
            let result = AudioSource::load(&path).map(|src| (src, title_for_path(&path)));
            let _ = tx.send(Report::Decoded {
                request,
                path,
                autoplay,
                result,
            });
        });
        Ok(())
    }

    /// Start the loaded source, or resume a paused one.
    pub fn play(&mut self) -> Result<(), SessionError> {
        match self.state {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused => {
                self.resume();
                Ok(())
            }
            PlaybackState::Idle | PlaybackState::RadioPlaying => Err(SessionError::NoSource),
            PlaybackState::Loaded => {
                self.start_playback(0)?;
                if let Some(path) = self.source_path.clone() {
                    match self.library.increment_play_count(&path) {
                        Ok(()) => self.emit(Notification::LibraryChanged),
                        Err(e) => warn!(path = %path.display(), error = %e, "could not count play"),
                    }
                }
                self.set_state(PlaybackState::Playing);
                if let Some(title) = &self.title {
                    self.emit(Notification::Status(format!("Playing {title}")));
                }
                Ok(())
            }
        }
    }

    /// Export the current source and have the engine play it from
    /// `offset_ms`. Supersedes any load still in flight.
    fn start_playback(&mut self, offset_ms: u64) -> Result<(), SessionError> {
        let source = self.source.clone().ok_or(SessionError::NoSource)?;

        self.poller.cancel();
        self.generation = self.engine.supersede();
        self.position_ms = offset_ms;

        let generation = self.generation;
        let looping = self.looping;
        let engine = self.engine.sender();
        let reports = self.reports_tx.clone();
        thread::spawn(move || match source.export_to_transport() {
            Ok(artifact) => {
                let _ = engine.send(EngineCmd::Load {
                    generation,
                    artifact,
                    looping,
                    start_offset_ms: offset_ms,
                });
            }
            Err(e) => {
                let _ = reports.send(Report::Failed {
                    generation,
                    error: SessionError::Engine(EngineError::Artifact(e.to_string())),
                });
            }
        });
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.poller.cancel();
        self.engine.send(EngineCmd::Pause);
        self.set_state(PlaybackState::Paused);
    }

    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        self.engine.send(EngineCmd::Resume);
        self.poller.start(Instant::now());
        self.set_state(PlaybackState::Playing);
    }

    pub fn toggle_pause(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            _ => {}
        }
    }

    /// Stop playback. The source stays loaded so `play` can restart it.
    pub fn stop(&mut self) {
        match self.state {
            PlaybackState::Playing | PlaybackState::Paused | PlaybackState::RadioPlaying => {
                self.halt()
            }
            PlaybackState::Idle | PlaybackState::Loaded => {}
        }
    }

    fn stop_engine(&mut self) {
        self.poller.cancel();
        self.generation = self.engine.supersede();
        self.engine.send(EngineCmd::Stop);
    }

    fn halt(&mut self) {
        self.stop_engine();
        self.position_ms = 0;
        self.emit(Notification::Progress(Progress {
            position_ms: 0,
            duration_ms: self.duration_ms().unwrap_or(0),
        }));
        let next = if self.source.is_some() {
            PlaybackState::Loaded
        } else {
            PlaybackState::Idle
        };
        self.set_state(next);
    }

    /// Restart the current source at `target_ms`.
    ///
    /// There is no in-place seek: the whole source is exported again and
    /// reloaded at the offset, so this is slow and should be issued once per
    /// user gesture. Ignored unless a file is playing.
    pub fn seek(&mut self, target_ms: u64) -> Result<(), SessionError> {
        if self.state == PlaybackState::RadioPlaying {
            return Err(SessionError::NotSeekable);
        }
        let duration_ms = self.duration_ms().ok_or(SessionError::NoSource)?;
        if target_ms > duration_ms {
            return Err(SessionError::Range(format!(
                "seek target {target_ms} ms is past the end ({duration_ms} ms)"
            )));
        }
        if self.state != PlaybackState::Playing {
            debug!(state = self.state.label(), "seek ignored");
            return Ok(());
        }

        debug!(target_ms, "seeking by reload");
        self.start_playback(target_ms)?;
        self.emit(Notification::Progress(Progress {
            position_ms: target_ms,
            duration_ms,
        }));
        Ok(())
    }

    /// Seek relative to the last known position, clamped to the source.
    pub fn seek_by(&mut self, delta_ms: i64) -> Result<(), SessionError> {
        let duration_ms = match self.state {
            PlaybackState::RadioPlaying => return Err(SessionError::NotSeekable),
            _ => self.duration_ms().ok_or(SessionError::NoSource)?,
        };
        let target = (self.position_ms as i64)
            .saturating_add(delta_ms)
            .clamp(0, duration_ms as i64);
        self.seek(target as u64)
    }

    /// Narrow the current source to `start_sec..end`.
    ///
    /// Bounds are checked first; on error the source is left as it was.
    /// Playback of the old range is stopped.
    pub fn trim(&mut self, start_sec: f64, end: TrimEnd) -> Result<(), SessionError> {
        let source = self.source.as_ref().ok_or(SessionError::NoSource)?;

        let duration_ms = source.duration_ms();
        let end_sec = match end {
            TrimEnd::End => duration_ms as f64 / 1000.0,
            TrimEnd::At(s) => s,
        };
        if !start_sec.is_finite() || !end_sec.is_finite() {
            return Err(SessionError::Range(format!(
                "invalid trim range {start_sec}..{end_sec} s"
            )));
        }
        let start_ms = (start_sec * 1000.0).round() as i64;
        let end_ms = match end {
            TrimEnd::End => duration_ms as i64,
            TrimEnd::At(_) => (end_sec * 1000.0).round() as i64,
        };

        let trimmed = source.slice(start_ms, end_ms)?;

        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            self.halt();
        }

        let new_duration = trimmed.duration_ms();
        info!(start_ms, end_ms, new_duration, "trimmed source");
        self.source = Some(trimmed);
        self.position_ms = 0;
        self.emit(Notification::Progress(Progress {
            position_ms: 0,
            duration_ms: new_duration,
        }));
        self.emit(Notification::Status(format!(
            "Trimmed to {:.1}s",
            new_duration as f64 / 1000.0
        )));
        Ok(())
    }

    /// Write the current source to `dest` in the background.
    pub fn save(&mut self, dest: &Path) -> Result<(), SessionError> {
        let source = self.source.clone().ok_or(SessionError::NoSource)?;
        let dest = dest.to_path_buf();
        self.emit(Notification::Status(format!("Saving {}...", dest.display())));

        let tx = self.reports_tx.clone();
        thread::spawn(move || {
            let result = source.save(&dest);
            let _ = tx.send(Report::Saved { dest, result });
        });
        Ok(())
    }

    /// Drop any file playback and play the initial segment of `station`.
    pub fn play_radio(&mut self, station: &StationSettings) {
        // A decode still in flight must not replace the radio.
        self.open_seq += 1;
        self.stop_engine();
        self.source = None;
        self.source_path = None;
        self.title = None;
        self.position_ms = 0;
        self.set_state(PlaybackState::RadioPlaying);
        self.emit(Notification::Status(format!("Tuning in to {}...", station.name)));

        let generation = self.generation;
        let url = station.url.clone();
        let ingest = Arc::clone(&self.ingest);
        let engine = self.engine.sender();
        let reports = self.reports_tx.clone();
        thread::spawn(move || match ingest.fetch(&url) {
            Ok(artifact) => {
                let _ = engine.send(EngineCmd::Load {
                    generation,
                    artifact,
                    looping: false,
                    start_offset_ms: 0,
                });
            }
            Err(e) => {
                let _ = reports.send(Report::Failed {
                    generation,
                    error: SessionError::Stream(e),
                });
            }
        });
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.engine.send(EngineCmd::SetVolume(self.volume));
    }

    /// Takes effect on the next load.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Delete `path` from the library, stopping it first if it is playing.
    pub fn remove_track(&mut self, path: &Path) -> Result<(), SessionError> {
        if self.source_path.as_deref() == Some(path) {
            self.stop();
        }
        self.library.remove(path)?;
        self.emit(Notification::LibraryChanged);
        Ok(())
    }

    /// Apply pending worker reports, then sample the position if due.
    pub fn update(&mut self, now: Instant) {
        while let Ok(report) = self.reports_rx.try_recv() {
            self.apply(report, now);
        }

        if self.state != PlaybackState::Playing || !self.poller.due(now) {
            return;
        }
        let status = self.engine.status();
        if status.generation != Some(self.generation) {
            return;
        }
        if let Some(position_ms) = status.position_ms {
            self.position_ms = position_ms;
            self.emit(Notification::Progress(Progress {
                position_ms,
                duration_ms: self.duration_ms().unwrap_or(0),
            }));
        }
    }

    fn apply(&mut self, report: Report, now: Instant) {
        match report {
            Report::Decoded {
                request,
                path,
                autoplay,
                result,
            } => {
                if request != self.open_seq {
                    debug!(path = %path.display(), "dropping superseded decode");
                    return;
                }
                match result {
                    Ok((source, title)) => self.install_source(path, title, source, autoplay),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "open failed");
                        self.emit(Notification::Error(e.into()));
                    }
                }
            }
            Report::Started { generation } => {
                if generation != self.generation {
                    return;
                }
                match self.state {
                    PlaybackState::Playing => self.poller.start(now),
                    PlaybackState::RadioPlaying => {
                        self.emit(Notification::Status("Playing radio".to_string()))
                    }
                    _ => {}
                }
            }
            Report::Failed { generation, error } => {
                if generation != self.generation {
                    debug!(generation, error = %error, "ignoring stale failure");
                    return;
                }
                warn!(error = %error, "playback failed");
                self.emit(Notification::Error(error));
                self.halt();
            }
            Report::Finished { generation } => {
                if generation != self.generation {
                    return;
                }
                debug!(generation, "end of track");
                self.halt();
                self.emit(Notification::Status("Finished".to_string()));
            }
            Report::Saved { dest, result } => match result {
                Ok(()) => {
                    info!(dest = %dest.display(), "saved");
                    self.emit(Notification::Status(format!("Saved {}", dest.display())));
                }
                Err(e) => self.emit(Notification::Error(SessionError::Save(format!(
                    "{}: {e}",
                    dest.display()
                )))),
            },
        }
    }

    fn install_source(&mut self, path: PathBuf, title: String, source: AudioSource, autoplay: bool) {
        match self.library.add(&path, &title) {
            Ok(true) => self.emit(Notification::LibraryChanged),
            Ok(false) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not register track");
                self.emit(Notification::Error(e.into()));
            }
        }

        if self.state != PlaybackState::Idle && self.state != PlaybackState::Loaded {
            self.stop_engine();
        }

        let duration_ms = source.duration_ms();
        info!(path = %path.display(), duration_ms, "loaded");
        self.emit(Notification::Status(format!("Loaded {title}")));
        self.source = Some(source);
        self.source_path = Some(path);
        self.title = Some(title);
        self.position_ms = 0;
        self.emit(Notification::Progress(Progress {
            position_ms: 0,
            duration_ms,
        }));
        self.set_state(PlaybackState::Loaded);

        if autoplay {
            if let Err(e) = self.play() {
                self.emit(Notification::Error(e));
            }
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        debug!(from = self.state.label(), to = state.label(), "state change");
        self.state = state;
        self.emit(Notification::State(state));
    }

    fn emit(&self, n: Notification) {
        // The display side may have gone away during shutdown.
        let _ = self.notify.send(n);
    }
}
