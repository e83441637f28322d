use std::error::Error;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use tracing::info;

use crate::app::{App, ListMode};
use crate::audio::{Notification, RodioEngine, Session};
use crate::config;
use crate::environment;
use crate::library::Library;
use crate::radio::RadioIngest;

/// Open the library and start the playback session.
pub fn start_session(
    settings: &config::Settings,
) -> Result<(Session, Receiver<Notification>), Box<dyn Error>> {
    let db = settings
        .database_path()
        .ok_or("no data directory found; set library.database_path in the config")?;
    let library = Arc::new(Library::open(&db)?);
    info!(db = %db.display(), "library opened");

    let ingest = RadioIngest::new(&settings.radio)?;

    let (tx, rx) = mpsc::channel();
    let (sample_rate, channels) = (settings.audio.sample_rate, settings.audio.channels);
    let session = Session::new(
        move || RodioEngine::init(sample_rate, channels),
        library,
        ingest,
        &settings.audio,
        tx,
    );
    Ok((session, rx))
}

/// Initial model: library rows plus the FFmpeg availability line.
pub fn initial_app(session: &Session) -> App {
    let mut app = App::new(session.volume());
    app.looping = session.looping();
    app.status = environment::startup_message();
    refresh_tracks(&mut app, session.library());
    app
}

/// Reload the visible rows from the library per the active search and mode.
pub fn refresh_tracks(app: &mut App, library: &Library) {
    let query = app.search_query.trim();
    let rows = if !query.is_empty() {
        library.search(query)
    } else {
        match app.list_mode {
            ListMode::All => library.all(),
            ListMode::Recommended => library.recommendations(),
        }
    };
    match rows {
        Ok(tracks) => app.set_tracks(tracks),
        Err(e) => app.status = format!("Error: {e}"),
    }
}
