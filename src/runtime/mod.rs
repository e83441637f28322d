use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::config;

mod event_loop;
mod logging;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let log_path = logging::init(config::default_data_dir().as_deref());
    let settings = settings::load_settings();
    info!(log = ?log_path, "tapedeck starting");

    let (mut session, notes) = startup::start_session(&settings)?;
    let mut app = startup::initial_app(&session);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        event_loop::run(&mut terminal, &settings, &mut app, &mut session, &notes)
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    session.stop();
    info!("tapedeck exiting");
    run_result
}
