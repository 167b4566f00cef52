use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::runtime::{Focus, InputEvent};

use super::{changes, jobs, AppController};

pub(super) fn handle_input(controller: &mut AppController, input: InputEvent) -> bool {
    match input {
        InputEvent::Resize(width, height) => {
            controller.state.terminal_size = (width, height);
            true
        }
        InputEvent::Key(key) if key.kind == KeyEventKind::Press => handle_key(controller, key),
        InputEvent::Key(_) => false,
    }
}

fn handle_key(controller: &mut AppController, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return jobs::request_quit(controller);
    }
    if controller.state.overlay.is_some() {
        return handle_overlay_key(controller, key);
    }
    let state = &mut controller.state;
    match key.code {
        KeyCode::Tab => state.focus = state.focus.next(),
        KeyCode::BackTab => state.focus = state.focus.prev(),
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(1),
        KeyCode::PageUp => {
            let page = state.page();
            state.scroll_log(page);
        }
        KeyCode::PageDown => {
            let page = state.page();
            state.scroll_log(-page);
        }
        KeyCode::Esc => state.notice = None,
        KeyCode::Char('g') => {
            let keys = state.selected_target().map(|def| def.key).into_iter().collect();
            return jobs::start_generation(controller, keys);
        }
        KeyCode::Char('G') => {
            let keys = state.targets.iter().map(|def| def.key).collect();
            return jobs::start_generation(controller, keys);
        }
        KeyCode::Char('x') => return jobs::cancel_selected(controller),
        KeyCode::Char('+') | KeyCode::Char('=') => return jobs::adjust_parallel(controller, 1),
        KeyCode::Char('-') => return jobs::adjust_parallel(controller, -1),
        KeyCode::Char('r') => changes::refresh(controller),
        KeyCode::Char('s') => return changes::toggle_side_by_side(controller),
        KeyCode::Enter if state.focus == Focus::Changes => return changes::open_diff(controller),
        KeyCode::Char('q') => return jobs::request_quit(controller),
        _ => return false,
    }
    true
}

fn handle_overlay_key(controller: &mut AppController, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('s') {
        return changes::toggle_side_by_side(controller);
    }
    let page = controller.state.page();
    let Some(overlay) = controller.state.overlay.as_mut() else {
        return false;
    };
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => controller.state.overlay = None,
        KeyCode::Up | KeyCode::Char('k') => overlay.scroll_by(-1),
        KeyCode::Down | KeyCode::Char('j') => overlay.scroll_by(1),
        KeyCode::PageUp => overlay.scroll_by(-page),
        KeyCode::PageDown | KeyCode::Char(' ') => overlay.scroll_by(page),
        KeyCode::Home => overlay.scroll = 0,
        _ => return false,
    }
    true
}
