use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::Backend;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::app::keymap::KeyAction;
use crate::app::{AppState, InputMode, ModalState};
use crate::ui;

/// Whether the event loop should keep going after a key.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Drive the TUI until the user quits.
///
/// Requests queued by key handling are spawned on `handle`; their completions
/// come back over a channel and are applied at the top of every tick, in the
/// order they finished.
pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut AppState, handle: &Handle) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let initial = app.directory.state_mut().begin_initialize();
    app.dispatch(initial);

    loop {
        for request in app.take_outbox() {
            app.directory.spawn(handle, request, tx.clone());
        }
        while let Ok(completion) = rx.try_recv() {
            app.apply(completion);
        }

        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(app, key) == Flow::Quit {
                    break;
                }
            }
        }
    }

    tracing::info!(pending = app.directory.state().in_flight(), "quitting");
    Ok(())
}

/// Route one key press according to the current input mode.
pub fn handle_key(app: &mut AppState, key: KeyEvent) -> Flow {
    match app.input_mode {
        InputMode::Normal => handle_normal_key(app, key),
        InputMode::Search => {
            handle_search_key(app, key);
            Flow::Continue
        }
        InputMode::Modal => {
            handle_modal_key(app, key);
            Flow::Continue
        }
    }
}

fn handle_normal_key(app: &mut AppState, key: KeyEvent) -> Flow {
    let Some(action) = app.keymap.resolve(&key) else {
        return Flow::Continue;
    };
    match action {
        KeyAction::Quit => return Flow::Quit,
        KeyAction::OpenHelp => app.open_modal(ModalState::Help),
        KeyAction::StartSearch => app.input_mode = InputMode::Search,
        KeyAction::NewUser => app.open_modal(ModalState::AddUser {
            focus: crate::api::UserField::Name,
        }),
        KeyAction::EditSelection => {
            if let Some(user) = app.selected_user().cloned() {
                app.directory.begin_edit(&user);
                app.open_modal(ModalState::EditUser {
                    focus: crate::api::UserField::Name,
                });
            }
        }
        KeyAction::DeleteSelection => {
            if let Some(user) = app.selected_user().cloned() {
                app.open_modal(ModalState::DeleteConfirm {
                    id: user.id,
                    name: user.name,
                    selected: 1,
                });
            }
        }
        KeyAction::Refresh => {
            let request = app.directory.state_mut().begin_initialize();
            app.dispatch(request);
        }
        KeyAction::DismissError => app.directory.state_mut().dismiss_error(),
        KeyAction::ToggleKeybindsPane => app.show_keybinds = !app.show_keybinds,
        KeyAction::MoveUp => app.selected_index = app.selected_index.saturating_sub(1),
        KeyAction::MoveDown => {
            if app.selected_index + 1 < app.visible_len() {
                app.selected_index += 1;
            }
        }
        KeyAction::PageUp => {
            let rpp = app.rows_per_page.max(1);
            app.selected_index = app.selected_index.saturating_sub(rpp);
        }
        KeyAction::PageDown => {
            let rpp = app.rows_per_page.max(1);
            let last = app.visible_len().saturating_sub(1);
            app.selected_index = app.selected_index.saturating_add(rpp).min(last);
        }
        KeyAction::Ignore => {}
    }
    Flow::Continue
}

fn handle_search_key(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.input_mode = InputMode::Normal,
        KeyCode::Esc => {
            app.directory.set_search_term(String::new());
            app.input_mode = InputMode::Normal;
        }
        code => {
            let term = app.directory.state().search_term();
            if let Some(next) = edit_text(term, code, key.modifiers) {
                app.directory.set_search_term(next);
                app.selected_index = 0;
            }
        }
    }
    app.clamp_selection();
}

/// Apply a typing key to `current`; `None` if the key does not edit text.
fn edit_text(current: &str, code: KeyCode, mods: KeyModifiers) -> Option<String> {
    match code {
        KeyCode::Char(c) if !mods.contains(KeyModifiers::CONTROL) => {
            let mut s = current.to_string();
            s.push(c);
            Some(s)
        }
        KeyCode::Backspace => {
            let mut s = current.to_string();
            s.pop()?;
            Some(s)
        }
        _ => None,
    }
}

fn handle_modal_key(app: &mut AppState, key: KeyEvent) {
    let Some(modal) = app.modal.clone() else {
        app.input_mode = InputMode::Normal;
        return;
    };
    match modal {
        ModalState::AddUser { focus } => match key.code {
            KeyCode::Esc => app.close_modal(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                app.modal = Some(ModalState::AddUser { focus: focus.next() });
            }
            KeyCode::Enter => {
                let draft = app.directory.state().new_user().clone();
                if let Some(request) = app.directory.state_mut().begin_add(&draft.name, &draft.email) {
                    app.dispatch(request);
                }
            }
            code => {
                let current = app.directory.state().new_user().field(focus);
                if let Some(next) = edit_text(current, code, key.modifiers) {
                    app.directory.state_mut().update_new_user_field(focus, next);
                }
            }
        },
        ModalState::EditUser { focus } => match key.code {
            KeyCode::Esc => {
                app.directory.cancel_edit();
                app.close_modal();
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                app.modal = Some(ModalState::EditUser { focus: focus.next() });
            }
            KeyCode::Enter => {
                if let Some(request) = app.directory.state_mut().begin_save() {
                    app.dispatch(request);
                } else {
                    app.close_modal();
                }
            }
            code => {
                let next = app
                    .directory
                    .state()
                    .editing_user()
                    .and_then(|u| edit_text(u.field(focus), code, key.modifiers));
                if let Some(next) = next {
                    app.directory.update_editing_field(focus, next);
                }
            }
        },
        ModalState::DeleteConfirm { id, name, selected } => match key.code {
            KeyCode::Esc | KeyCode::Char('n') => app.close_modal(),
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                app.modal = Some(ModalState::DeleteConfirm {
                    id,
                    name,
                    selected: 1 - selected.min(1),
                });
            }
            KeyCode::Char('y') => confirm_delete(app, id),
            KeyCode::Enter => {
                if selected == 0 {
                    confirm_delete(app, id);
                } else {
                    app.close_modal();
                }
            }
            _ => {}
        },
        ModalState::Help => match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q') => app.close_modal(),
            _ => {}
        },
    }
}

fn confirm_delete(app: &mut AppState, id: crate::api::UserId) {
    let request = app.directory.state_mut().begin_delete(id);
    app.dispatch(request);
    app.close_modal();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_text_handles_typing_and_backspace() {
        assert_eq!(edit_text("ab", KeyCode::Char('c'), KeyModifiers::NONE).as_deref(), Some("abc"));
        assert_eq!(edit_text("ab", KeyCode::Char('C'), KeyModifiers::SHIFT).as_deref(), Some("abC"));
        assert_eq!(edit_text("ab", KeyCode::Backspace, KeyModifiers::NONE).as_deref(), Some("a"));
        assert_eq!(edit_text("", KeyCode::Backspace, KeyModifiers::NONE), None);
        assert_eq!(edit_text("ab", KeyCode::Char('u'), KeyModifiers::CONTROL), None);
        assert_eq!(edit_text("ab", KeyCode::Left, KeyModifiers::NONE), None);
    }
}
