use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "tapedeck=info";

/// Log to `tapedeck.log` under `dir`; the terminal belongs to the UI.
///
/// The filter comes from `TAPEDECK_LOG` (e.g. `tapedeck=debug`). Returns the
/// log path, or `None` when logging could not be set up; the player runs
/// either way.
pub fn init(dir: Option<&Path>) -> Option<PathBuf> {
    let dir = dir?;
    fs::create_dir_all(dir).ok()?;
    let path = dir.join("tapedeck.log");
    let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;

    let filter = EnvFilter::try_from_env("TAPEDECK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .ok()?;

    Some(path)
}
