//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Padding, Paragraph, Wrap},
};

use crate::app::{App, ListMode, Prompt, Screen};
use crate::audio::PlaybackState;
use crate::config::{ControlsSettings, StationSettings, UiSettings};

const LIBRARY_CONTROLS: &[(&str, &str)] = &[
    ("j/k", "up/down"),
    ("enter", "play selected"),
    ("space/p", "play/pause"),
    ("s", "stop"),
    ("o", "open"),
    ("t", "trim"),
    ("w", "save"),
    ("L", "loop"),
    ("+/-", "volume"),
    ("/", "search"),
    ("m", "all/most played"),
    ("d", "remove"),
    ("r", "radio"),
    ("q", "quit"),
];

const RADIO_CONTROLS: &[(&str, &str)] = &[
    ("j/k", "up/down"),
    ("enter", "tune in"),
    ("s", "stop"),
    ("+/-", "volume"),
    ("esc", "back to library"),
    ("q", "quit"),
];

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(screen: Screen, scrub_seconds: u64) -> String {
    let mut parts: Vec<String> = Vec::new();
    let table = match screen {
        Screen::Library => {
            parts.push(format!("[h/l] seek -/+{scrub_seconds}s"));
            LIBRARY_CONTROLS
        }
        Screen::Radio => RADIO_CONTROLS,
    };
    parts.extend(table.iter().map(|(k, v)| format!("[{k}] {v}")));
    parts.join(" | ")
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    // Keep the popup smaller and avoid covering the entire UI.
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(3);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn status_text(app: &App) -> String {
    let mut parts: Vec<String> = vec![format!(" {}", app.playback.label())];
    if let Some(title) = &app.now_playing {
        parts.push(format!("Song: {title}"));
    }
    parts.push(format!("VOL: {}%", app.volume));
    parts.push(if app.looping {
        "LOOP: On".to_string()
    } else {
        "LOOP: Off".to_string()
    });
    let q = app.search_query.trim();
    if !q.is_empty() {
        parts.push(format!("SEARCH: {q}"));
    }
    if !app.status.is_empty() {
        parts.push(app.status.clone());
    }
    parts.join(" • ")
}

fn padded(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding {
            left: 1,
            right: 0,
            top: 0,
            bottom: 0,
        })
}

/// Render only the rows around the cursor so it stays in view.
fn windowed_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: Vec<String>,
    selected: usize,
) {
    let total = rows.len();
    let height = area.height.saturating_sub(2) as usize;
    let (start, end) = if total <= height || height == 0 {
        (0, total)
    } else {
        let half = height / 2;
        let mut start = selected.saturating_sub(half);
        if start + height > total {
            start = total - height;
        }
        (start, start + height)
    };

    let items: Vec<ListItem> = rows[start..end].iter().map(|r| ListItem::new(r.as_str())).collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if total > 0 {
        state.select(Some(selected.saturating_sub(start)));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    stations: &[StationSettings],
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" tapedeck ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status = Paragraph::new(status_text(app))
        .block(padded(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, chunks[1]);

    // Progress
    let label = match app.playback {
        PlaybackState::RadioPlaying => "radio".to_string(),
        _ => app.progress_text(),
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" progress "))
        .gauge_style(Style::default().bold())
        .ratio(app.progress.ratio())
        .label(label);
    frame.render_widget(gauge, chunks[2]);

    // Main list
    match app.screen {
        Screen::Library => {
            let title = match app.list_mode {
                ListMode::All => " library ",
                ListMode::Recommended => " most played ",
            };
            let rows = app.tracks.iter().map(|t| t.label()).collect();
            windowed_list(frame, chunks[3], title, rows, app.selected);
        }
        Screen::Radio => {
            let rows = stations
                .iter()
                .map(|s| {
                    if s.description.is_empty() {
                        s.name.clone()
                    } else {
                        format!("{}: {}", s.name, s.description)
                    }
                })
                .collect();
            windowed_list(frame, chunks[3], " radio ", rows, app.station_selected);
        }
    }

    // Prompt overlay, kept inside the list area.
    if let Some(prompt) = app.prompt {
        let popup_area = centered_rect_sized(64, 3, chunks[3]);
        frame.render_widget(Clear, popup_area);
        let text = match prompt {
            Prompt::ConfirmRemove => app
                .selected_track()
                .map(|t| t.title.clone())
                .unwrap_or_default(),
            _ => format!("{}_", app.input),
        };
        let title = format!(" {} ", prompt.label());
        frame.render_widget(Paragraph::new(text).block(padded(&title)), popup_area);
    }

    let footer = Paragraph::new(controls_text(app.screen, controls_settings.scrub_seconds))
        .block(padded(" controls "))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);
}
