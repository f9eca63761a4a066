use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, AppMode, DialogKind};

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match &app.mode {
        AppMode::Normal => handle_normal_key(app, key),
        AppMode::Dialog(DialogKind::CreateDirectory | DialogKind::Upload) => {
            handle_input_key(app, key)
        }
        AppMode::Dialog(DialogKind::DeleteConfirm { .. }) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.submit_dialog(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_dialog(),
            _ => {}
        },
        AppMode::Dialog(DialogKind::UploadProgress { .. } | DialogKind::Error { .. }) => {
            match key.code {
                KeyCode::Enter => app.submit_dialog(),
                KeyCode::Esc | KeyCode::Char('q') => app.cancel_dialog(),
                _ => {}
            }
        }
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.open_highlighted(),
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => app.go_up(),
        KeyCode::Char(' ') => app.toggle_highlighted(),
        KeyCode::Esc => app.clear_selection(),
        KeyCode::Char('d') => app.delete_top(),
        KeyCode::Char('D') | KeyCode::Delete => app.delete_highlighted(),
        KeyCode::Char('s') => app.download_top(),
        KeyCode::Char('S') => app.download_highlighted(),
        KeyCode::Char('u') => app.open_upload_dialog(),
        KeyCode::Char('n') => app.open_create_dir_dialog(),
        KeyCode::Char('r') => app.reload(),
        _ => {}
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_dialog(),
        KeyCode::Esc => app.cancel_dialog(),
        KeyCode::Backspace => app.dialog_delete_char(),
        KeyCode::Left => app.dialog_move_cursor_left(),
        KeyCode::Right => app.dialog_move_cursor_right(),
        KeyCode::Char(c) => app.dialog_input_char(c),
        _ => {}
    }
}

/// Handle a mouse event: the wheel moves the cursor.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    if app.mode != AppMode::Normal {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.select_next(),
        MouseEventKind::ScrollUp => app.select_previous(),
        _ => {}
    }
}
