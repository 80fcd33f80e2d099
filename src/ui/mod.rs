pub mod components;
pub mod users;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::{AppState, InputMode, ModalState};

pub fn render(f: &mut Frame, app: &mut AppState) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(1)])
        .split(f.area());

    let body_constraints: &[Constraint] = if app.show_keybinds {
        &[Constraint::Percentage(45), Constraint::Percentage(30), Constraint::Percentage(25)]
    } else {
        &[Constraint::Percentage(60), Constraint::Percentage(40)]
    };
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(body_constraints)
        .split(root[1]);

    let prompt = match app.input_mode {
        InputMode::Search => format!("  Search: {}_", app.directory.state().search_term()),
        _ if !app.directory.state().search_term().is_empty() => {
            format!("  filter: \"{}\"", app.directory.state().search_term())
        }
        _ => String::new(),
    };
    let header = Paragraph::new(format!(
        "{}{prompt}  | /: search; n: new; Enter: edit; Del: delete; r: reload; ?: help; q: quit",
        app.base_url
    ))
    .block(
        Block::default()
            .title("User Management Dashboard")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    )
    .style(Style::default().fg(app.theme.header_fg).bg(app.theme.header_bg));
    f.render_widget(header, root[0]);

    users::render_users_table(f, body[0], app);
    users::render_user_details(f, body[1], app);
    if app.show_keybinds {
        components::render_keybinds_panel(f, body[2], app);
    }

    components::render_status_bar(f, root[2], app);

    if let Some(modal) = app.modal.clone() {
        let area = f.area();
        match modal {
            ModalState::AddUser { .. } | ModalState::EditUser { .. } | ModalState::DeleteConfirm { .. } => {
                users::render_user_modal(f, area, app, &modal);
            }
            ModalState::Help => components::render_help_modal(f, area, app),
        }
    }
}
