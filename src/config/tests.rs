use super::load::{default_config_path, default_data_dir, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_tapedeck_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("TAPEDECK_CONFIG_PATH", "/tmp/tapedeck-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/tapedeck-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("tapedeck")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("tapedeck")
            .join("config.toml")
    );
}

#[test]
fn database_path_defaults_under_data_dir() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_DATA_HOME", "/tmp/xdg-data-home");

    assert_eq!(
        default_data_dir().unwrap(),
        std::path::PathBuf::from("/tmp/xdg-data-home").join("tapedeck")
    );
    let s = Settings::default();
    assert_eq!(
        s.database_path().unwrap(),
        std::path::PathBuf::from("/tmp/xdg-data-home")
            .join("tapedeck")
            .join("library.db")
    );

    let s = Settings {
        library: LibrarySettings {
            database_path: Some("/tmp/elsewhere.db".into()),
        },
        ..Settings::default()
    };
    assert_eq!(
        s.database_path().unwrap(),
        std::path::PathBuf::from("/tmp/elsewhere.db")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
sample_rate = 48000
channels = 1
default_volume = 80
poll_interval_ms = 250

[library]
database_path = "/tmp/tapedeck-test.db"

[radio]
prefix_bytes = 4096
connect_timeout_secs = 3

[[radio.stations]]
name = "Local"
url = "http://127.0.0.1:8000/stream"

[controls]
scrub_seconds = 9
volume_step = 10

[ui]
header_text = "hello"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("TAPEDECK_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("TAPEDECK__AUDIO__DEFAULT_VOLUME");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.sample_rate, 48_000);
    assert_eq!(s.audio.channels, 1);
    assert_eq!(s.audio.default_volume, 80);
    assert_eq!(s.audio.poll_interval_ms, 250);
    assert_eq!(
        s.library.database_path,
        Some(std::path::PathBuf::from("/tmp/tapedeck-test.db"))
    );
    assert_eq!(s.radio.prefix_bytes, 4096);
    assert_eq!(s.radio.connect_timeout_secs, 3);
    // Not set in the file: falls back to the struct default.
    assert_eq!(s.radio.read_timeout_secs, 20);
    assert_eq!(s.radio.stations.len(), 1);
    assert_eq!(s.radio.stations[0].name, "Local");
    assert_eq!(s.radio.stations[0].description, "");
    assert_eq!(s.controls.scrub_seconds, 9);
    assert_eq!(s.controls.volume_step, 10);
    assert_eq!(s.ui.header_text, "hello");
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
default_volume = 20
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("TAPEDECK_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("TAPEDECK__AUDIO__DEFAULT_VOLUME", "70");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.default_volume, 70);
}

#[test]
fn defaults_ship_three_stations_and_validate() {
    let s = Settings::default();
    assert_eq!(s.radio.stations.len(), 3);
    assert_eq!(s.radio.stations[1].name, "BBC Radio 1");
    assert!(s.validate().is_ok());
}

#[test]
fn validate_rejects_out_of_range_values() {
    let mut s = Settings::default();
    s.audio.default_volume = 101;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.audio.poll_interval_ms = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.radio.stations.clear();
    assert!(s.validate().is_err());
}

#[test]
fn to_toml_round_trips_through_the_loader() {
    let _lock = env_lock();

    let mut original = Settings::default();
    original.controls.scrub_seconds = 12;
    let text = original.to_toml().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(&cfg_path, text).unwrap();

    let _g1 = EnvGuard::set("TAPEDECK_CONFIG_PATH", cfg_path.to_str().unwrap());
    let s = Settings::load().unwrap();
    assert_eq!(s.controls.scrub_seconds, 12);
    assert_eq!(s.radio.stations, original.radio.stations);
}
