use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/tapedeck/config.toml` or `~/.config/tapedeck/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `TAPEDECK__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub library: LibrarySettings,
    pub radio: RadioSettings,
    pub controls: ControlsSettings,
    pub ui: UiSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Output device sample rate requested at startup.
    pub sample_rate: u32,
    /// Output device channel count requested at startup.
    pub channels: u16,
    /// Initial volume, 0-100.
    pub default_volume: u8,
    /// How often the progress line samples the playback position (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            default_volume: 50,
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Location of the play-history database.
    /// Defaults to `library.db` under the data directory.
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RadioSettings {
    /// How many bytes of a station stream to fetch before playing.
    pub prefix_bytes: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub stations: Vec<StationSettings>,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            prefix_bytes: 256 * 1024,
            connect_timeout_secs: 10,
            read_timeout_secs: 20,
            stations: default_stations(),
        }
    }
}

/// One entry of the radio address book.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StationSettings {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

fn default_stations() -> Vec<StationSettings> {
    vec![
        StationSettings {
            name: "KQED (NPR)".into(),
            url: "https://streams.kqed.org".into(),
            description: "Your public media source for news and cultural content. \
                          Stay informed with national and local news."
                .into(),
        },
        StationSettings {
            name: "BBC Radio 1".into(),
            url: "http://stream.live.vc.bbcmedia.co.uk/bbc_radio_one".into(),
            description: "Playing the freshest new music and the biggest tracks \
                          from the hottest artists."
                .into(),
        },
        StationSettings {
            name: "NPR News".into(),
            url: "https://npr-ice.streamguys1.com/nprlive-mp3".into(),
            description: "Listen to breaking news and top stories from NPR on demand.".into(),
        },
    ]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to seek when pressing `h` / `l`.
    pub scrub_seconds: u64,
    /// Volume change per `+` / `-` press.
    pub volume_step: u8,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            scrub_seconds: 5,
            volume_step: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ tapedeck ~ ".to_string(),
        }
    }
}
