//! Application state types and entry glue.
//!
//! Wraps the [`UserDirectory`] controller with everything the TUI needs on
//! top of it: selection, input mode, open modal, theme and keymap. Requests
//! produced by key handling are queued in an outbox and spawned by the event
//! loop (re-exported as `run`).
//!
pub mod keymap;
pub mod update;

use std::path::Path;

use ratatui::style::Color;

use crate::api::{UserField, UserId, UserRecord};
use crate::directory::{Completion, Request, UserDirectory};
use keymap::Keymap;

/// Current input mode for key handling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Modal,
}

/// Color palette for theming the TUI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    pub text: Color,
    pub muted: Color,
    pub title: Color,
    pub border: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub status_bg: Color,
    pub status_fg: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    pub error_fg: Color,
}

impl Theme {
    /// Plain named-color theme for terminals without truecolor.
    pub fn dark() -> Self {
        Self {
            text: Color::Gray,
            muted: Color::DarkGray,
            title: Color::Cyan,
            border: Color::Gray,
            header_bg: Color::Black,
            header_fg: Color::Cyan,
            status_bg: Color::DarkGray,
            status_fg: Color::Black,
            highlight_fg: Color::Yellow,
            highlight_bg: Color::Reset,
            error_fg: Color::LightRed,
        }
    }

    /// Catppuccin Mocha theme defaults.
    pub fn mocha() -> Self {
        // Palette reference: https://github.com/catppuccin/catppuccin
        Self {
            text: Color::Rgb(0xcd, 0xd6, 0xf4),         // text
            muted: Color::Rgb(0x7f, 0x84, 0x9c),        // overlay1
            title: Color::Rgb(0xf5, 0xc2, 0xe7),        // pink
            border: Color::Rgb(0x58, 0x5b, 0x70),       // surface2
            header_bg: Color::Rgb(0x31, 0x32, 0x44),    // surface0
            header_fg: Color::Rgb(0xf5, 0xc2, 0xe7),    // pink
            status_bg: Color::Rgb(0x45, 0x47, 0x5a),    // surface1
            status_fg: Color::Rgb(0xcd, 0xd6, 0xf4),    // text
            highlight_fg: Color::Rgb(0xf9, 0xe2, 0xaf), // yellow
            highlight_bg: Color::Rgb(0x45, 0x47, 0x5a), // surface1
            error_fg: Color::Rgb(0xf3, 0x8b, 0xa8),     // red
        }
    }

    /// Load theme from a simple key=value file. Unknown or missing keys fall back to `mocha`.
    pub fn from_file(path: &Path) -> Option<Self> {
        Self::from_file_over(path, Self::mocha())
    }

    /// Like [`Theme::from_file`], with missing keys taken from `base`.
    pub fn from_file_over(path: &Path, base: Self) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        let mut theme = base;

        for raw_line in contents.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else {
                continue;
            };
            let Some(color) = Self::parse_color(val.trim()) else {
                tracing::debug!(line, "theme: unparseable color ignored");
                continue;
            };
            match key.trim() {
                "text" => theme.text = color,
                "muted" => theme.muted = color,
                "title" => theme.title = color,
                "border" => theme.border = color,
                "header_bg" => theme.header_bg = color,
                "header_fg" => theme.header_fg = color,
                "status_bg" => theme.status_bg = color,
                "status_fg" => theme.status_fg = color,
                "highlight_fg" => theme.highlight_fg = color,
                "highlight_bg" => theme.highlight_bg = color,
                "error_fg" => theme.error_fg = color,
                _ => {}
            }
        }

        Some(theme)
    }

    /// Parse "#RRGGBB", "RRGGBB" or "reset".
    fn parse_color(s: &str) -> Option<Color> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "reset" {
            return Some(Color::Reset);
        }
        let hex = lower.strip_prefix('#').unwrap_or(lower.as_str());
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    fn color_to_str(c: Color) -> String {
        match c {
            Color::Rgb(r, g, b) => format!("#{r:02X}{g:02X}{b:02X}"),
            Color::Reset => "reset".to_string(),
            // Named colors get a best-effort hex approximation
            Color::Black => "#000000".to_string(),
            Color::Red => "#FF0000".to_string(),
            Color::Green => "#00FF00".to_string(),
            Color::Yellow => "#FFFF00".to_string(),
            Color::Blue => "#0000FF".to_string(),
            Color::Magenta => "#FF00FF".to_string(),
            Color::Cyan => "#00FFFF".to_string(),
            Color::Gray => "#B3B3B3".to_string(),
            Color::DarkGray => "#4D4D4D".to_string(),
            Color::LightRed => "#FF6666".to_string(),
            Color::LightGreen => "#66FF66".to_string(),
            Color::LightYellow => "#FFFF66".to_string(),
            Color::LightBlue => "#6666FF".to_string(),
            Color::LightMagenta => "#FF66FF".to_string(),
            Color::LightCyan => "#66FFFF".to_string(),
            Color::White => "#FFFFFF".to_string(),
            Color::Indexed(_) => "reset".to_string(),
        }
    }

    /// Persist the theme to a config file in key=value format.
    pub fn write_file(&self, path: &Path) -> std::io::Result<()> {
        use std::fmt::Write as _;
        let mut buf = String::new();
        buf.push_str("# userdir-manager theme\n");
        buf.push_str("# Colors: hex as #RRGGBB or RRGGBB, or 'reset'\n\n");
        for (k, v) in [
            ("text", self.text),
            ("muted", self.muted),
            ("title", self.title),
            ("border", self.border),
            ("header_bg", self.header_bg),
            ("header_fg", self.header_fg),
            ("status_bg", self.status_bg),
            ("status_fg", self.status_fg),
            ("highlight_fg", self.highlight_fg),
            ("highlight_bg", self.highlight_bg),
            ("error_fg", self.error_fg),
        ] {
            let _ = writeln!(&mut buf, "{k} = {}", Self::color_to_str(v));
        }
        std::fs::write(path, buf)
    }

    /// Load `path` over `base`, or write `base` there and return it.
    pub fn load_or_init(path: &Path, base: Self) -> Self {
        if path.exists() {
            return Self::from_file_over(path, base).unwrap_or(base);
        }
        let t = base;
        if let Err(e) = t.write_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not write default theme");
        }
        t
    }
}

/// Modal dialogs. Form contents live in the directory state, not here.
#[derive(Clone, Debug, PartialEq)]
pub enum ModalState {
    /// New-user form; edits the pending new-user inputs.
    AddUser { focus: UserField },
    /// Edit form over the directory's working copy.
    EditUser { focus: UserField },
    DeleteConfirm {
        id: UserId,
        name: String,
        /// 0 = Yes, 1 = No.
        selected: usize,
    },
    Help,
}

pub struct AppState {
    pub directory: UserDirectory,
    pub base_url: String,
    pub selected_index: usize,
    pub rows_per_page: usize,
    pub input_mode: InputMode,
    pub modal: Option<ModalState>,
    pub theme: Theme,
    pub keymap: Keymap,
    pub show_keybinds: bool,
    outbox: Vec<Request>,
}

impl AppState {
    pub fn new(directory: UserDirectory, base_url: impl Into<String>) -> Self {
        Self {
            directory,
            base_url: base_url.into(),
            selected_index: 0,
            rows_per_page: 10,
            input_mode: InputMode::Normal,
            modal: None,
            theme: Theme::mocha(),
            keymap: Keymap::default(),
            show_keybinds: false,
            outbox: Vec::new(),
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_keymap(mut self, keymap: Keymap) -> Self {
        self.keymap = keymap;
        self
    }

    /// The record under the cursor, in the filtered view.
    pub fn selected_user(&self) -> Option<&UserRecord> {
        self.directory
            .visible_users()
            .get(self.selected_index)
            .copied()
    }

    pub fn visible_len(&self) -> usize {
        self.directory.visible_users().len()
    }

    /// Keep the cursor inside the filtered view after it shrinks.
    pub fn clamp_selection(&mut self) {
        let len = self.visible_len();
        self.selected_index = self.selected_index.min(len.saturating_sub(1));
    }

    /// Queue a request for the event loop to spawn.
    pub fn dispatch(&mut self, request: Request) {
        self.outbox.push(request);
    }

    pub fn take_outbox(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    pub fn open_modal(&mut self, modal: ModalState) {
        self.modal = Some(modal);
        self.input_mode = InputMode::Modal;
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
        self.input_mode = InputMode::Normal;
    }

    /// Apply a finished request and close forms whose job is done.
    pub fn apply(&mut self, completion: Completion) {
        let added = matches!(completion, Completion::Created(Ok(_)));
        self.directory.apply(completion);

        let done = match &self.modal {
            Some(ModalState::AddUser { .. }) => added,
            Some(ModalState::EditUser { .. }) => self.directory.state().editing_user().is_none(),
            _ => false,
        };
        if done {
            self.close_modal();
        }
        self.clamp_selection();
    }
}

/// Re-export the application event loop entry function.
pub use update::run_app as run;
