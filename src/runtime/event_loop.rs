use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::app::{self, App, Prompt, Screen};
use crate::audio::{Notification, PlaybackState, Session};
use crate::config;
use crate::error::SessionError;
use crate::radio;
use crate::runtime::startup::refresh_tracks;
use crate::ui;

/// Main terminal event loop: folds session notifications into the model,
/// draws, and dispatches key presses. Returns `Ok(())` when shutdown is
/// requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    session: &mut Session,
    notes: &Receiver<Notification>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        session.update(Instant::now());

        let mut refresh = false;
        for n in notes.try_iter() {
            refresh |= app.apply(n);
        }
        if refresh {
            refresh_tracks(app, session.library());
        }
        app.volume = session.volume();
        app.looping = session.looping();
        app.now_playing = session.title().map(str::to_string);

        terminal.draw(|f| {
            ui::draw(
                f,
                app,
                &settings.radio.stations,
                &settings.ui,
                &settings.controls,
            )
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, session) {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Surface a rejected command on the status line.
fn report(app: &mut App, result: Result<(), SessionError>) {
    if let Err(e) = result {
        debug!(error = %e, "command rejected");
        app.status = format!("Error: {e}");
    }
}

/// Returns true when the user asked to quit.
fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    session: &mut Session,
) -> bool {
    if let Some(prompt) = app.prompt {
        handle_prompt_key(key, prompt, app, session);
        return false;
    }

    // Keys shared by both screens.
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            match session.state() {
                PlaybackState::Loaded => {
                    let r = session.play();
                    report(app, r);
                }
                _ => session.toggle_pause(),
            }
            return false;
        }
        KeyCode::Char('s') => {
            session.stop();
            return false;
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            session.set_volume(session.volume().saturating_add(settings.controls.volume_step));
            return false;
        }
        KeyCode::Char('-') => {
            session.set_volume(session.volume().saturating_sub(settings.controls.volume_step));
            return false;
        }
        _ => {}
    }

    match app.screen {
        Screen::Library => handle_library_key(key, settings, app, session),
        Screen::Radio => handle_radio_key(key, settings, app, session),
    }
    false
}

fn handle_library_key(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    session: &mut Session,
) {
    let scrub_ms = scrub_step_ms(settings.controls.scrub_seconds);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Enter => {
            if let Some(path) = app.selected_track().map(|t| t.path.clone()) {
                let r = session.select(&path);
                report(app, r);
            }
        }
        KeyCode::Char('h') | KeyCode::Left => {
            let r = session.seek_by(-scrub_ms);
            report(app, r);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            let r = session.seek_by(scrub_ms);
            report(app, r);
        }
        KeyCode::Char('L') => session.set_looping(!session.looping()),
        KeyCode::Char('o') => app.enter_prompt(Prompt::Open),
        KeyCode::Char('t') => app.enter_prompt(Prompt::Trim),
        KeyCode::Char('w') => app.enter_prompt(Prompt::Save),
        KeyCode::Char('/') => app.enter_prompt(Prompt::Search),
        KeyCode::Char('d') => {
            if app.selected_track().is_some() {
                app.enter_prompt(Prompt::ConfirmRemove);
            }
        }
        KeyCode::Char('m') => {
            app.toggle_list_mode();
            refresh_tracks(app, session.library());
        }
        KeyCode::Char('r') => app.screen = Screen::Radio,
        KeyCode::Esc => {
            if !app.search_query.is_empty() {
                app.search_query.clear();
                refresh_tracks(app, session.library());
            }
        }
        _ => {}
    }
}

fn handle_radio_key(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    session: &mut Session,
) {
    let count = settings.radio.stations.len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.next_station(count),
        KeyCode::Char('k') | KeyCode::Up => app.prev_station(count),
        KeyCode::Enter => {
            if let Some(station) = radio::station(&settings.radio.stations, app.station_selected) {
                session.play_radio(station);
            }
        }
        KeyCode::Esc | KeyCode::Char('r') => app.screen = Screen::Library,
        _ => {}
    }
}

fn handle_prompt_key(key: KeyEvent, prompt: Prompt, app: &mut App, session: &mut Session) {
    if prompt == Prompt::ConfirmRemove {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                app.cancel_prompt();
                if let Some(path) = app.selected_track().map(|t| t.path.clone()) {
                    let r = session.remove_track(&path);
                    report(app, r);
                }
            }
            _ => app.cancel_prompt(),
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.cancel_prompt(),
        KeyCode::Backspace => app.pop_input_char(),
        KeyCode::Char(c) => {
            if !c.is_control() {
                app.push_input_char(c);
            }
        }
        KeyCode::Enter => {
            if let Some((prompt, input)) = app.submit_prompt() {
                submit(prompt, input, app, session);
            }
        }
        _ => {}
    }
}

fn submit(prompt: Prompt, input: String, app: &mut App, session: &mut Session) {
    let input = input.trim();
    match prompt {
        Prompt::Open => {
            if !input.is_empty() {
                let r = session.open(&expand_home(input));
                report(app, r);
            }
        }
        Prompt::Trim => match app::parse_trim(input) {
            Ok((start, end)) => {
                let r = session.trim(start, end);
                report(app, r);
            }
            Err(msg) => app.status = format!("Error: {msg}"),
        },
        Prompt::Save => {
            if !input.is_empty() {
                let r = session.save(&expand_home(input));
                report(app, r);
            }
        }
        Prompt::Search => {
            app.search_query = input.to_string();
            refresh_tracks(app, session.library());
        }
        Prompt::ConfirmRemove => {}
    }
}

/// Scrub step in milliseconds, saturating for oversized settings.
fn scrub_step_ms(scrub_seconds: u64) -> i64 {
    i64::try_from(scrub_seconds.saturating_mul(1000)).unwrap_or(i64::MAX)
}

/// Expand a leading `~/` to the home directory.
fn expand_home(input: &str) -> PathBuf {
    match (input.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(input),
    }
}
