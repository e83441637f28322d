use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{EngineError, SessionError};

use super::engine::Engine;
use super::session::Report;
use super::transport::TransportArtifact;
use super::types::{EngineStatus, StatusHandle};

/// How often the engine thread refreshes its status snapshot when idle.
const STATUS_TICK: Duration = Duration::from_millis(20);

/// Commands executed, in order, by the engine thread.
#[derive(Debug)]
pub enum EngineCmd {
    /// Play `artifact` unless a newer generation has been issued meanwhile.
    Load {
        generation: u64,
        artifact: TransportArtifact,
        looping: bool,
        start_offset_ms: u64,
    },
    Pause,
    Resume,
    Stop,
    SetVolume(u8),
    Quit,
}

#[derive(Clone, Copy)]
struct Current {
    generation: u64,
}

/// Owner of the engine thread.
///
/// The engine lives on that thread for its whole life; everything else talks
/// to it through `EngineCmd`s, so loads never overlap.
pub struct EngineHost {
    tx: Sender<EngineCmd>,
    status: StatusHandle,
    latest: Arc<AtomicU64>,
    join: Option<JoinHandle<()>>,
}

impl EngineHost {
    /// Start the engine thread. `factory` runs on that thread; if it fails,
    /// every later load is answered with `EngineError::Unavailable`.
    pub fn spawn<E, F>(factory: F, reports: Sender<Report>) -> Self
    where
        E: Engine + 'static,
        F: FnOnce() -> Result<E, EngineError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<EngineCmd>();
        let status: StatusHandle = Arc::new(Mutex::new(EngineStatus::default()));
        let latest = Arc::new(AtomicU64::new(0));

        let join = {
            let status = Arc::clone(&status);
            let latest = Arc::clone(&latest);
            thread::Builder::new()
                .name("tapedeck-engine".into())
                .spawn(move || {
                    let engine = match factory() {
                        Ok(e) => Ok(e),
                        Err(e) => {
                            error!(error = %e, "audio engine failed to start");
                            Err(e.to_string())
                        }
                    };
                    run_engine(engine, rx, &reports, &status, &latest);
                })
        };

        let join = match join {
            Ok(j) => Some(j),
            Err(e) => {
                error!(error = %e, "could not spawn the engine thread");
                None
            }
        };

        Self {
            tx,
            status,
            latest,
            join,
        }
    }

    /// Best-effort send. If the engine thread died, the command is dropped.
    pub fn send(&self, cmd: EngineCmd) {
        if self.tx.send(cmd).is_err() {
            warn!("engine thread is gone; command dropped");
        }
    }

    /// A sender workers can use to deliver their loads directly.
    pub fn sender(&self) -> Sender<EngineCmd> {
        self.tx.clone()
    }

    /// Issue a new generation: every load tagged with an older one becomes a
    /// no-op on arrival.
    pub fn supersede(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn status(&self) -> EngineStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for EngineHost {
    fn drop(&mut self) {
        let _ = self.tx.send(EngineCmd::Quit);
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

fn run_engine<E: Engine>(
    mut engine: Result<E, String>,
    rx: Receiver<EngineCmd>,
    reports: &Sender<Report>,
    status: &StatusHandle,
    latest: &AtomicU64,
) {
    let mut current: Option<Current> = None;
    // Pause requested while nothing (or something stale) was loaded; applied
    // to the next load.
    let mut paused = false;

    loop {
        match rx.recv_timeout(STATUS_TICK) {
            Ok(cmd) => match cmd {
                EngineCmd::Load {
                    generation,
                    artifact,
                    looping,
                    start_offset_ms,
                } => {
                    if generation < latest.load(Ordering::SeqCst) {
                        debug!(generation, "discarding superseded load");
                        continue;
                    }

                    let result = match engine.as_mut() {
                        Ok(e) => e.load_and_play(artifact.path(), looping, start_offset_ms),
                        Err(msg) => Err(EngineError::Unavailable(msg.clone())),
                    };
                    // The engine has consumed the artifact either way.
                    drop(artifact);

                    match result {
                        Ok(()) => {
                            if paused {
                                if let Ok(e) = engine.as_mut() {
                                    e.pause();
                                }
                            }
                            current = Some(Current { generation });
                            let _ = reports.send(Report::Started { generation });
                        }
                        Err(e) => {
                            warn!(generation, error = %e, "engine load failed");
                            current = None;
                            let _ = reports.send(Report::Failed {
                                generation,
                                error: SessionError::Engine(e),
                            });
                        }
                    }
                }
                EngineCmd::Pause => {
                    paused = true;
                    if let Ok(e) = engine.as_mut() {
                        e.pause();
                    }
                }
                EngineCmd::Resume => {
                    paused = false;
                    if let Ok(e) = engine.as_mut() {
                        e.resume();
                    }
                }
                EngineCmd::Stop => {
                    paused = false;
                    current = None;
                    if let Ok(e) = engine.as_mut() {
                        e.stop();
                    }
                }
                EngineCmd::SetVolume(v) => {
                    if let Ok(e) = engine.as_mut() {
                        e.set_volume(v);
                    }
                }
                EngineCmd::Quit => {
                    if let Ok(e) = engine.as_mut() {
                        e.stop();
                    }
                    break;
                }
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let position = match (current, engine.as_ref()) {
            (Some(_), Ok(e)) => e.position_ms(),
            _ => None,
        };

        // Ran off the end: report once and forget the load.
        if let Some(cur) = current {
            if position.is_none() && !paused {
                let _ = reports.send(Report::Finished {
                    generation: cur.generation,
                });
                current = None;
            }
        }

        let mut s = status.lock().unwrap_or_else(PoisonError::into_inner);
        *s = EngineStatus {
            generation: current.map(|c| c.generation),
            position_ms: position,
        };
    }

    *status.lock().unwrap_or_else(PoisonError::into_inner) = EngineStatus::default();
}
