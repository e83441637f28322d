mod app;
mod audio;
mod config;
mod environment;
mod error;
mod library;
mod radio;
mod runtime;
mod ui;

#[cfg(test)]
mod testing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match std::env::args().nth(1).as_deref() {
        Some("--default-config") => {
            print!("{}", config::Settings::default().to_toml()?);
            Ok(())
        }
        Some("-h") | Some("--help") => {
            println!("usage: tapedeck [--default-config]");
            Ok(())
        }
        _ => runtime::run(),
    }
}
