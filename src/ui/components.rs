//! Shared UI components (status bar, keybinds panel, help modal, layout helpers).
//!
use std::collections::{BTreeMap, BTreeSet};

use crossterm::event::KeyCode;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::keymap::{KeyAction, Keymap};
use crate::app::{AppState, InputMode};

/// Bottom line: mode, counts, loading flag, in-flight requests and the last error.
pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let state = app.directory.state();
    let mode = match app.input_mode {
        InputMode::Normal => "NORMAL",
        InputMode::Search => "SEARCH",
        InputMode::Modal => "MODAL",
    };
    let mut spans = vec![Span::raw(format!(
        "mode: {mode}  users:{}/{}",
        app.visible_len(),
        state.users().len()
    ))];
    if state.is_loading() {
        spans.push(Span::raw("  Loading users..."));
    }
    if state.in_flight() > 0 {
        spans.push(Span::raw(format!("  pending:{}", state.in_flight())));
    }
    if let Some(err) = state.error() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{err} (Esc to dismiss)"),
            Style::default().fg(app.theme.error_fg).add_modifier(Modifier::BOLD),
        ));
    }
    let p = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(app.theme.status_fg).bg(app.theme.status_bg));
    f.render_widget(p, area);
}

fn action_label(action: KeyAction) -> Option<(&'static str, &'static str)> {
    let entry = match action {
        KeyAction::Quit => ("General", "Quit"),
        KeyAction::OpenHelp => ("General", "Help"),
        KeyAction::Refresh => ("General", "Reload users"),
        KeyAction::DismissError => ("General", "Dismiss error"),
        KeyAction::ToggleKeybindsPane => ("General", "Toggle this pane"),
        KeyAction::StartSearch => ("Users", "Search"),
        KeyAction::NewUser => ("Users", "New user"),
        KeyAction::EditSelection => ("Users", "Edit selected"),
        KeyAction::DeleteSelection => ("Users", "Delete selected"),
        KeyAction::MoveUp => ("Navigation", "Move up"),
        KeyAction::MoveDown => ("Navigation", "Move down"),
        KeyAction::PageUp => ("Navigation", "Page up"),
        KeyAction::PageDown => ("Navigation", "Page down"),
        KeyAction::Ignore => return None,
    };
    Some(entry)
}

/// Right-hand panel listing the active keymap, grouped by section.
pub fn render_keybinds_panel(f: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default()
        .title("Keybindings")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border));
    let inner = block.inner(area);

    let mut sections: BTreeMap<&'static str, BTreeMap<&'static str, BTreeSet<String>>> = BTreeMap::new();
    for ((mods, code), action) in app.keymap.all_bindings() {
        let Some((section, label)) = action_label(action) else {
            continue;
        };
        let key = match code {
            KeyCode::Char(c) if c.is_ascii_uppercase() => format!("Shift+{}", c.to_ascii_lowercase()),
            _ => Keymap::format_key(mods, code),
        };
        sections.entry(section).or_default().entry(label).or_default().insert(key);
    }

    let col1_w = sections
        .values()
        .flat_map(|m| m.keys())
        .map(|k| k.len())
        .max()
        .unwrap_or(0)
        .min((inner.width as usize).saturating_sub(8));

    let mut lines: Vec<Line> = Vec::new();
    for (section, entries) in &sections {
        if !lines.is_empty() {
            lines.push(Line::raw(""));
        }
        lines.push(Line::from(Span::styled(
            format!("{section}:"),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (label, keys) in entries {
            let lbl: String = label.chars().take(col1_w).collect();
            let joined = keys.iter().cloned().collect::<Vec<_>>().join(", ");
            lines.push(Line::from(vec![
                Span::raw(format!("  {lbl:>col1_w$} │ ")),
                Span::styled(joined, Style::default().add_modifier(Modifier::ITALIC)),
            ]));
        }
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(block, area);
    f.render_widget(p, inner);
}

/// Compute a rectangle centered within `area` with a maximum size.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Render the help modal with usage tips.
pub fn render_help_modal(f: &mut Frame, area: Rect, app: &AppState) {
    let width = 72u16.min(area.width.saturating_sub(4)).max(40);
    let height = 18u16.min(area.height.saturating_sub(2)).max(10);
    let rect = centered_rect(width, height, area);

    let key = |s: &'static str| Span::styled(s, Style::default().add_modifier(Modifier::ITALIC));
    let lines = vec![
        Line::from(Span::styled("Help", Style::default().add_modifier(Modifier::BOLD))),
        Line::raw(""),
        Line::from(vec![Span::raw("Navigate: "), key("Up/Down, j/k, PageUp/PageDown, h/l")]),
        Line::from(vec![
            Span::raw("Search: "),
            key("/"),
            Span::raw(" then type; matches name or email, any case. Enter keeps, Esc clears"),
        ]),
        Line::from(vec![Span::raw("New user: "), key("n"), Span::raw(" (Tab switches field, Enter adds)")]),
        Line::from(vec![
            Span::raw("Edit user: "),
            key("Enter / e"),
            Span::raw(" (Enter saves, Esc cancels; a failed save keeps the form open)"),
        ]),
        Line::from(vec![Span::raw("Delete user: "), key("Delete / d"), Span::raw(" then confirm")]),
        Line::from(vec![Span::raw("Reload from the service: "), key("r")]),
        Line::from(vec![Span::raw("Dismiss error: "), key("Esc")]),
        Line::from(vec![Span::raw("Keybindings pane: "), key("Shift+K")]),
        Line::from(vec![Span::raw("Quit: "), key("q / Ctrl+c")]),
        Line::raw(""),
        Line::styled(
            format!("Service: {}", app.base_url),
            Style::default().fg(app.theme.muted),
        ),
    ];

    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}
