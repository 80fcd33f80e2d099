//! userdir-manager binary entry point.
//!
//! Parses the command line, sets up file logging and the tokio runtime,
//! initializes the terminal in raw mode, runs the TUI event loop,
//! and restores the terminal state on exit.
//!
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use userdir_manager::app::keymap::Keymap;
use userdir_manager::app::{self, AppState, Theme};
use userdir_manager::config::{Cli, Settings, init_logging};
use userdir_manager::error::Result;
use userdir_manager::{HttpUserApi, UserDirectory};

/// Initialize a Crossterm-backed `ratatui` terminal in raw mode.
fn init_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Program entry point: run the TUI and report any top-level error to stderr.
fn main() -> Result<()> {
    let settings = Settings::from_cli(Cli::parse());

    // Logging is best effort; the dashboard works without it.
    if let Err(e) = init_logging(&settings.log_file, &settings.log_level) {
        eprintln!("logging disabled: {e:#}");
    }
    tracing::info!(base_url = %settings.base_url, "starting userdir-manager");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    let api = HttpUserApi::with_timeout(settings.base_url.clone(), settings.timeout)
        .context("build HTTP client")?;
    let base_url = api.base_url().to_string();
    let directory = UserDirectory::new(Arc::new(api));
    let mut state = AppState::new(directory, base_url)
        .with_theme(Theme::load_or_init(
            &settings.config_file("theme.conf"),
            settings.theme.palette(),
        ))
        .with_keymap(Keymap::load_or_init(&settings.config_file("keybinds.conf")));

    let mut terminal = init_terminal().context("init terminal")?;

    let res = app::run(&mut terminal, &mut state, runtime.handle());

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    // Outstanding requests are abandoned, not awaited.
    runtime.shutdown_background();

    if let Err(err) = res {
        tracing::error!(error = %err, "application error");
        eprintln!("application error: {err:#}");
    }
    Ok(())
}
