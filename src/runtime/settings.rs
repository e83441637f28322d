use tracing::warn;

use crate::config;

pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                eprintln!("tapedeck: invalid config, using defaults: {msg}");
                warn!(%msg, "invalid config, using defaults");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent the app from starting.
            eprintln!("tapedeck: failed to load config, using defaults: {e}");
            warn!(error = %e, "failed to load config, using defaults");
            config::Settings::default()
        }
    }
}
