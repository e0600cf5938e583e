use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{App, View};

/// File written by the export key.
pub const EXPORT_FILE: &str = "madboard_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    // A pending deletion takes the next key as its answer
    if app.pending_delete.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete(),
            _ => {
                app.cancel_delete();
                app.set_status_message("Delete cancelled".to_string());
            }
        }
        return;
    }

    // If filter input is active, handle text input
    if app.filter_active {
        handle_filter_input(app, key);
        return;
    }

    match key.code {
        // Quit
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // View switching
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.prev_view();
            } else {
                app.next_view();
            }
        }
        KeyCode::BackTab => app.prev_view(),
        KeyCode::Left | KeyCode::Char('h') => app.prev_view(),
        KeyCode::Right | KeyCode::Char('l') => app.next_view(),

        // Direct view access
        KeyCode::Char('1') => app.set_view(View::Processes),
        KeyCode::Char('2') => app.set_view(View::Runs),
        KeyCode::Char('3') => app.set_view(View::Run),
        KeyCode::Char('4') => app.set_view(View::Plots),

        // Navigation
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::PageUp => app.select_prev_n(10),
        KeyCode::PageDown => app.select_next_n(10),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),
        KeyCode::Enter => app.enter(),
        KeyCode::Esc | KeyCode::Backspace => {
            if app.filter_text.is_empty() {
                app.prev_view();
            } else {
                app.clear_filter();
            }
        }

        // Refresh
        KeyCode::Char('r') => app.refresh(),

        // Deletion (confirmed with 'y')
        KeyCode::Char('d') => app.request_delete_run(),
        KeyCode::Char('X') => app.request_delete_process(),

        // Plots
        KeyCode::Char('L') => app.toggle_log_scale(),
        KeyCode::Char(' ') if app.current_view == View::Plots => app.toggle_overlay_run(),
        KeyCode::Char('a') => app.select_all_overlay(),
        KeyCode::Char('A') => app.deselect_all_overlay(),
        KeyCode::Char('[') => app.prev_histogram(),
        KeyCode::Char(']') => app.next_histogram(),

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        // Filter (start typing to filter)
        KeyCode::Char('/') => app.start_filter(),

        // Clear filter
        KeyCode::Char('c') => {
            if !app.filter_text.is_empty() {
                app.clear_filter();
            }
        }

        // Export
        KeyCode::Char('e') => {
            let export_path = std::path::PathBuf::from(EXPORT_FILE);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}

/// Handle key input while filter is active
fn handle_filter_input(app: &mut App, key: KeyEvent) {
    match key.code {
        // Confirm filter
        KeyCode::Enter => {
            app.filter_active = false;
        }

        // Cancel filter (keep text but exit input mode)
        KeyCode::Esc => {
            app.cancel_filter();
        }

        // Clear and exit
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.clear_filter();
        }

        // Backspace
        KeyCode::Backspace => {
            app.filter_pop();
            if app.filter_text.is_empty() {
                app.filter_active = false;
            }
        }

        // Type characters
        KeyCode::Char(c) => {
            app.filter_push(c);
        }

        _ => {}
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, content_start_row: u16) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.select_prev(),
        MouseEventKind::ScrollDown => app.select_next(),

        MouseEventKind::Down(MouseButton::Left) => {
            // Tab bar sits on row 1, right below the header
            if mouse.row == 1 {
                let mut start = 0u16;
                for view in View::ALL {
                    let width = view.label().len() as u16 + 5;
                    if mouse.column < start + width {
                        app.set_view(view);
                        break;
                    }
                    start += width;
                }
                return;
            }

            // Rows below the content block border and table header
            if mouse.row > content_start_row {
                let item_row = (mouse.row - content_start_row - 1) as usize;
                let len = match app.current_view {
                    View::Processes => app.visible_processes().len(),
                    View::Runs => app.visible_runs().len(),
                    _ => 0,
                };
                if item_row < len {
                    app.select_first();
                    app.select_next_n(item_row);
                }
            }
        }

        MouseEventKind::Down(MouseButton::Right) => app.prev_view(),

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{run, MockBackend};
    use crate::source::RunStatus;
    use crate::ui::Theme;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    fn press(app: &mut App, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    async fn settle(app: &mut App) {
        tokio::time::sleep(Duration::from_millis(1)).await;
        app.update();
    }

    async fn loaded_app(backend: &MockBackend) -> App {
        backend.add_process("ttbar", &["run_01", "run_02"]);
        backend.set_runs(
            "ttbar",
            vec![
                run("run_01", RunStatus::Done, 1.0),
                run("run_02", RunStatus::Running, 2.0),
            ],
        );
        let mut app = App::with_backend(
            Arc::new(backend.clone()),
            Handle::current(),
            Duration::from_secs(10),
            Theme::dark(),
        );
        app.catalog.load();
        settle(&mut app).await;
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;
        app
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_keys() {
        let backend = MockBackend::new();
        let mut app = loaded_app(&backend).await;
        assert_eq!(app.current_view, View::Runs);

        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_run_index, 1);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.selected_run_index, 1);
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.selected_run_index, 0);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_view, View::Run);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.current_view, View::Runs);
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.current_view, View::Plots);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_key_requires_y() {
        let backend = MockBackend::new();
        let mut app = loaded_app(&backend).await;

        press(&mut app, KeyCode::Char('d'));
        assert!(app.pending_delete.is_some());
        press(&mut app, KeyCode::Char('n'));
        assert!(app.pending_delete.is_none());
        settle(&mut app).await;
        assert_eq!(backend.count("delete:ttbar/run_01"), 0);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        settle(&mut app).await;
        assert_eq!(backend.count("delete:ttbar/run_01"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_captures_keys() {
        let backend = MockBackend::new();
        let mut app = loaded_app(&backend).await;

        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Char('q'));
        assert!(app.running);
        assert_eq!(app.filter_text, "q");

        press(&mut app, KeyCode::Esc);
        assert!(!app.filter_active);
        press(&mut app, KeyCode::Char('c'));
        assert!(app.filter_text.is_empty());

        press(&mut app, KeyCode::Char('q'));
        assert!(!app.running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_help_swallows_next_key() {
        let backend = MockBackend::new();
        let mut app = loaded_app(&backend).await;

        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.show_help);
        assert!(app.running);
    }
}
