//! Application model types: `App`, `Screen` and `Prompt`.
//!
//! The `App` struct holds what the UI shows: the library rows, the cursor,
//! the input prompt and the last playback state reported by the session.

use std::time::Duration;

use crate::audio::{Notification, PlaybackState, Progress, TrimEnd};
use crate::library::Track;

/// Which list the main area shows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Library,
    Radio,
}

/// Ordering of the library list.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ListMode {
    /// Insertion order.
    #[default]
    All,
    /// Most played first.
    Recommended,
}

/// A line-input prompt and what its text is used for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    Open,
    /// `START END`, seconds; `END` may be `end`.
    Trim,
    Save,
    Search,
    /// y/n confirmation for removing the selected track.
    ConfirmRemove,
}

impl Prompt {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open file",
            Self::Trim => "trim (start end)",
            Self::Save => "save as",
            Self::Search => "search",
            Self::ConfirmRemove => "remove track? (y/n)",
        }
    }
}

/// The main application model.
#[derive(Debug, Default)]
pub struct App {
    pub tracks: Vec<Track>,
    pub selected: usize,
    pub screen: Screen,
    pub list_mode: ListMode,
    pub station_selected: usize,

    pub prompt: Option<Prompt>,
    pub input: String,
    pub search_query: String,

    pub playback: PlaybackState,
    pub progress: Progress,
    pub status: String,
    pub volume: u8,
    pub looping: bool,
    /// Title of the loaded file, if any.
    pub now_playing: Option<String>,
}

impl App {
    pub fn new(volume: u8) -> Self {
        Self {
            volume,
            ..Self::default()
        }
    }

    /// Replace the visible rows, keeping the cursor on the same path when
    /// it is still listed.
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        let keep = self.selected_track().map(|t| t.path.clone());
        self.tracks = tracks;
        self.selected = keep
            .and_then(|p| self.tracks.iter().position(|t| t.path == p))
            .unwrap_or_else(|| self.selected.min(self.tracks.len().saturating_sub(1)));
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.tracks.get(self.selected)
    }

    /// Move selection to the next track, wrapping around.
    pub fn next(&mut self) {
        if !self.tracks.is_empty() {
            self.selected = (self.selected + 1) % self.tracks.len();
        }
    }

    /// Move selection to the previous track, wrapping around.
    pub fn prev(&mut self) {
        if !self.tracks.is_empty() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.tracks.len() - 1);
        }
    }

    pub fn next_station(&mut self, count: usize) {
        if count > 0 {
            self.station_selected = (self.station_selected + 1) % count;
        }
    }

    pub fn prev_station(&mut self, count: usize) {
        if count > 0 {
            self.station_selected = self.station_selected.checked_sub(1).unwrap_or(count - 1);
        }
    }

    pub fn toggle_list_mode(&mut self) {
        self.list_mode = match self.list_mode {
            ListMode::All => ListMode::Recommended,
            ListMode::Recommended => ListMode::All,
        };
    }

    /// Open `prompt`. The search prompt starts from the active query.
    pub fn enter_prompt(&mut self, prompt: Prompt) {
        self.input = match prompt {
            Prompt::Search => self.search_query.clone(),
            _ => String::new(),
        };
        self.prompt = Some(prompt);
    }

    pub fn push_input_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_input_char(&mut self) {
        self.input.pop();
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
        self.input.clear();
    }

    /// Close the prompt and hand back its kind and text.
    pub fn submit_prompt(&mut self) -> Option<(Prompt, String)> {
        let prompt = self.prompt.take()?;
        Some((prompt, std::mem::take(&mut self.input)))
    }

    /// Fold a session notification into the model. Returns true when the
    /// library rows need reloading.
    pub fn apply(&mut self, n: Notification) -> bool {
        match n {
            Notification::State(s) => self.playback = s,
            Notification::Status(s) => self.status = s,
            Notification::Progress(p) => self.progress = p,
            Notification::Error(e) => self.status = format!("Error: {e}"),
            Notification::LibraryChanged => return true,
        }
        false
    }

    /// `MM:SS / MM:SS` for the progress line.
    pub fn progress_text(&self) -> String {
        format!(
            "{} / {}",
            format_mmss(Duration::from_millis(self.progress.position_ms)),
            format_mmss(Duration::from_millis(self.progress.duration_ms))
        )
    }
}

/// Format a `Duration` as `MM:SS`.
pub fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Parse trim prompt input: `START END` in seconds, `END` may be `end`.
/// A lone `START` trims to the end.
pub fn parse_trim(input: &str) -> Result<(f64, TrimEnd), String> {
    let mut parts = input.split_whitespace();
    let start = parts
        .next()
        .ok_or_else(|| "expected: START END (seconds, END may be \"end\")".to_string())?;
    let start: f64 = start
        .parse()
        .map_err(|_| format!("invalid start time {start:?}"))?;
    let end = match parts.next() {
        Some(s) => s.parse::<TrimEnd>()?,
        None => TrimEnd::End,
    };
    if parts.next().is_some() {
        return Err("too many values: expected START END".to_string());
    }
    Ok((start, end))
}
