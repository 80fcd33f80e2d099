//! Command line, environment and on-disk configuration.
//!
//! Settings come from `clap` (flags with environment fallbacks). The config
//! directory holds `theme.conf`, `keybinds.conf` and the default log file.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::app::Theme;

pub const APP_NAME: &str = "userdir-manager";
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// TUI to list, search, create, edit and delete users held by a REST service.
#[derive(Parser, Debug, Clone)]
#[command(name = "userdir-manager", version, about)]
pub struct Cli {
    /// Base URL of the user service; `/users` is appended to its path.
    #[arg(long, env = "USERDIR_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: Url,

    /// Per-request timeout in seconds.
    #[arg(long, env = "USERDIR_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Log file (defaults to `userdir-manager.log` in the config directory).
    #[arg(long, env = "USERDIR_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level or filter directive; `RUST_LOG` takes precedence.
    #[arg(long, env = "USERDIR_LOG", default_value = "info")]
    pub log_level: String,

    /// Built-in palette; entries in theme.conf override it.
    #[arg(long, env = "USERDIR_THEME", value_enum, default_value_t = ThemeChoice::Mocha)]
    pub theme: ThemeChoice,

    /// Directory holding theme.conf and keybinds.conf.
    #[arg(long, env = "USERDIR_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,
}

/// Built-in color palettes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThemeChoice {
    /// Catppuccin Mocha, truecolor.
    Mocha,
    /// Named colors only.
    Dark,
}

impl ThemeChoice {
    pub fn palette(self) -> Theme {
        match self {
            ThemeChoice::Mocha => Theme::mocha(),
            ThemeChoice::Dark => Theme::dark(),
        }
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: Url,
    pub timeout: Duration,
    pub log_file: PathBuf,
    pub log_level: String,
    pub theme: ThemeChoice,
    pub config_dir: PathBuf,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Self {
        let config_dir = cli.config_dir.unwrap_or_else(default_config_dir);
        let log_file = cli
            .log_file
            .unwrap_or_else(|| config_dir.join(format!("{APP_NAME}.log")));
        Self {
            base_url: cli.base_url,
            timeout: Duration::from_secs(cli.timeout_secs.max(1)),
            log_file,
            log_level: cli.log_level,
            theme: cli.theme,
            config_dir,
        }
    }

    /// Path of a file inside the config directory, creating the directory if needed.
    pub fn config_file(&self, name: &str) -> PathBuf {
        config_file_in(&self.config_dir, name)
    }
}

/// `$XDG_CONFIG_HOME/userdir-manager`, then `$HOME/.config/userdir-manager`,
/// then the working directory.
pub fn default_config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join(APP_NAME);
    }
    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".config").join(APP_NAME);
    }
    PathBuf::from(".")
}

pub fn config_file_in(dir: &Path, name: &str) -> PathBuf {
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "cannot create config directory");
    }
    dir.join(name)
}

/// Send `tracing` output to `path`. The terminal belongs to the TUI, so
/// nothing is ever written to stdout or stderr.
pub fn init_logging(path: &Path, level: &str) -> crate::error::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {e}"))?;
    Ok(())
}
