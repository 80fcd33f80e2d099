use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use serde_json::Value;

use crate::api::UserField;
use crate::app::{AppState, ModalState};
use crate::ui::components::centered_rect;

pub fn render_users_table(f: &mut Frame, area: Rect, app: &mut AppState) {
    let body_height = area.height.saturating_sub(3) as usize;
    if body_height > 0 {
        app.rows_per_page = body_height;
    }
    app.clamp_selection();

    let visible = app.directory.visible_users();
    let total = app.directory.state().users().len();
    let start = (app.selected_index / app.rows_per_page) * app.rows_per_page;
    let end = (start + app.rows_per_page).min(visible.len());
    let slice = visible.get(start..end).unwrap_or(&[]);

    let rows = slice.iter().enumerate().map(|(i, u)| {
        let style = if start + i == app.selected_index {
            Style::default()
                .fg(app.theme.highlight_fg)
                .bg(app.theme.highlight_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.text)
        };
        Row::new(vec![
            Cell::from(u.id.to_string()),
            Cell::from(u.name.clone()),
            Cell::from(u.email.clone()),
        ])
        .style(style)
    });

    let widths = [Constraint::Length(6), Constraint::Percentage(45), Constraint::Percentage(55)];
    let header = Row::new(vec!["ID", "NAME", "EMAIL"])
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));

    let title = if visible.len() == total {
        format!("Users ({total})")
    } else {
        format!("Users ({}/{total})", visible.len())
    };
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .column_spacing(1);

    f.render_widget(table, area);
}

/// Every field of the selected record, including the ones the service added.
pub fn render_user_details(f: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = Vec::new();
    if let Some(u) = app.selected_user() {
        let label = Style::default().fg(app.theme.title);
        lines.push(Line::from(vec![Span::styled("ID: ", label), Span::raw(u.id.to_string())]));
        lines.push(Line::from(vec![Span::styled("Name: ", label), Span::raw(u.name.clone())]));
        lines.push(Line::from(vec![Span::styled("Email: ", label), Span::raw(u.email.clone())]));
        for (key, value) in &u.extra {
            push_value(&mut lines, key, value, 0, label);
        }
    } else if app.directory.state().is_loading() {
        lines.push(Line::raw("Loading users..."));
    } else {
        lines.push(Line::styled("No user selected", Style::default().fg(app.theme.muted)));
    }

    let p = Paragraph::new(lines)
        .style(Style::default().fg(app.theme.text))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Details")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        );
    f.render_widget(p, area);
}

fn push_value(lines: &mut Vec<Line<'static>>, key: &str, value: &Value, depth: usize, label: Style) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            lines.push(Line::from(Span::styled(format!("{indent}{key}:"), label)));
            for (k, v) in map {
                push_value(lines, k, v, depth + 1, label);
            }
        }
        Value::String(s) => lines.push(Line::from(vec![
            Span::styled(format!("{indent}{key}: "), label),
            Span::raw(s.clone()),
        ])),
        other => lines.push(Line::from(vec![
            Span::styled(format!("{indent}{key}: "), label),
            Span::raw(other.to_string()),
        ])),
    }
}

fn field_line(label: &str, value: &str, focused: bool) -> String {
    let marker = if focused { "▶" } else { " " };
    let cursor = if focused { "_" } else { "" };
    format!("{marker} {label:<6} {value}{cursor}")
}

pub fn render_user_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    let border = Style::default().fg(app.theme.border);
    let (title, body, height) = match state {
        ModalState::AddUser { focus } => {
            let draft = app.directory.state().new_user();
            let mut body = String::new();
            for field in [UserField::Name, UserField::Email] {
                body.push_str(&field_line(field.label(), draft.field(field), *focus == field));
                body.push('\n');
            }
            body.push_str("\nTab: next field   Enter: add   Esc: close");
            ("New user", body, 8u16)
        }
        ModalState::EditUser { focus } => {
            let Some(editing) = app.directory.state().editing_user() else {
                return;
            };
            let mut body = format!("Editing user {}\n", editing.id);
            for field in [UserField::Name, UserField::Email] {
                body.push_str(&field_line(field.label(), editing.field(field), *focus == field));
                body.push('\n');
            }
            body.push_str("\nTab: next field   Enter: save changes   Esc: cancel");
            ("Edit user", body, 9u16)
        }
        ModalState::DeleteConfirm { id, name, selected } => {
            let yes = if *selected == 0 { "[Yes]" } else { " Yes " };
            let no = if *selected == 1 { "[No]" } else { " No " };
            let body = format!("Delete user '{name}' (id {id})?\n\n  {yes}    {no}");
            ("Confirm delete", body, 7u16)
        }
        ModalState::Help => return,
    };

    let mut lines: Vec<Line> = body.lines().map(|l| Line::raw(l.to_string())).collect();
    let mut height = height;
    if let Some(err) = app.directory.state().error() {
        lines.push(Line::raw(""));
        lines.push(Line::styled(err.to_string(), Style::default().fg(app.theme.error_fg)));
        height += 2;
    }

    let width = 60u16.min(area.width.saturating_sub(4)).max(30);
    let rect = centered_rect(width, height, area);
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title(title).borders(Borders::ALL).border_style(border));
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}
