use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use groundwater_core::Language;
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        // Wrap width changed
        AppEvent::Resize => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Completed(completion) => app.complete(completion),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Language toggles
    let language = match key.code {
        KeyCode::F(1) => Some(Language::En),
        KeyCode::F(2) => Some(Language::Ta),
        KeyCode::F(3) => Some(Language::Te),
        _ => None,
    };
    if let Some(language) = language {
        app.select_language(language);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Back to the input box
        KeyCode::Char('i') | KeyCode::Char('/') | KeyCode::Esc => focus_input(app),

        // Tab cycles: Chat -> Reports -> Input -> Chat
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Chat if app.report_count() > 0 => FocusPane::Reports,
                FocusPane::Chat | FocusPane::Reports => FocusPane::Input,
                FocusPane::Input => FocusPane::Chat,
            };
            if app.focus == FocusPane::Input {
                focus_input(app);
            }
        }

        KeyCode::Char('1') => app.select_language(Language::En),
        KeyCode::Char('2') => app.select_language(Language::Ta),
        KeyCode::Char('3') => app.select_language(Language::Te),
        KeyCode::Char('l') => app.cycle_language(),

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Reports => app.reports_nav_down(),
            _ => app.chat_scroll = app.chat_scroll.saturating_add(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Reports => app.reports_nav_up(),
            _ => app.chat_scroll = app.chat_scroll.saturating_sub(1),
        },
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.chat_scroll = app.chat_scroll.saturating_add(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.chat_scroll = app.chat_scroll.saturating_sub(app.chat_height / 2);
        }
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        // Report actions
        KeyCode::Enter | KeyCode::Char('o') => {
            if app.focus == FocusPane::Reports || key.code == KeyCode::Char('o') {
                app.open_selected_report();
            } else {
                focus_input(app);
            }
        }
        KeyCode::Char('s') => app.save_selected_report(),

        _ => {}
    }
}

fn focus_input(app: &mut App) {
    app.focus = FocusPane::Input;
    app.input_mode = InputMode::Editing;
    // Cursor at end of existing text
    app.cursor = app.input.chars().count();
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Chat;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = if app.report_count() > 0 {
                FocusPane::Reports
            } else {
                FocusPane::Chat
            };
        }
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_reports = app.reports_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let clicked = app
                .language_areas
                .iter()
                .find(|(_, rect)| point_in_rect(x, y, *rect))
                .map(|(lang, _)| *lang);
            if let Some(language) = clicked {
                app.select_language(language);
            }
        }
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_add(3);
            } else if in_reports {
                app.reports_nav_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_sub(3);
            } else if in_reports {
                app.reports_nav_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use groundwater_core::{
        Backend, BackendReply, ChatSession, ClientError, ClientResult, Completion, Sender, Services,
        Url,
    };
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct EchoBackend;

    #[async_trait]
    impl Backend for EchoBackend {
        async fn query(&self, message: &str, _language: Language) -> ClientResult<BackendReply> {
            Ok(BackendReply {
                reply_text: format!("echo: {}", message),
                location: Some("Salem".to_string()),
            })
        }

        async fn query_by_location(
            &self,
            _latitude: f64,
            _longitude: f64,
            _language: Language,
        ) -> ClientResult<BackendReply> {
            Err(ClientError::Timeout)
        }

        fn report_url(&self, location: &str) -> ClientResult<Url> {
            Url::parse(&format!("http://backend/report/{}", location))
                .map_err(|e| ClientError::InvalidUrl(e.to_string()))
        }

        async fn download_report(&self, location: &str, dir: &Path) -> ClientResult<PathBuf> {
            Ok(dir.join(location))
        }
    }

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let services = Services::new(Arc::new(EchoBackend), None);
        let session = ChatSession::new(Language::En, false);
        (App::new(session, services, PathBuf::from("/tmp"), tx), rx)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("abc", 1), 1);
        assert_eq!(char_to_byte_index("நீர்", 1), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_editing_inserts_at_cursor() {
        let (mut app, _rx) = test_app();
        type_text(&mut app, "Salm");
        handle_event(&mut app, key(KeyCode::Left));
        type_text(&mut app, "e");
        assert_eq!(app.input, "Salem");

        handle_event(&mut app, key(KeyCode::Home));
        handle_event(&mut app, key(KeyCode::Delete));
        assert_eq!(app.input, "alem");
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn test_function_keys_toggle_language() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, key(KeyCode::F(2)));
        assert_eq!(app.session.language(), Language::Ta);
        assert!(app.input.is_empty());

        handle_event(&mut app, key(KeyCode::F(3)));
        handle_event(&mut app, key(KeyCode::F(1)));
        assert_eq!(app.session.language(), Language::En);
    }

    #[test]
    fn test_resize_scrolls_to_newest() {
        let (mut app, _rx) = test_app();
        app.chat_height = 3;
        for text in ["one", "two", "three"] {
            app.session.notify(text);
        }
        assert_eq!(app.chat_scroll, 0);

        handle_event(&mut app, AppEvent::Resize);
        assert_eq!(app.chat_scroll, 6);
    }

    #[test]
    fn test_enter_on_blank_input_does_nothing() {
        let (mut app, _rx) = test_app();
        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter));

        assert!(app.session.conversation().is_empty());
        assert_eq!(app.session.pending_replies(), 0);
    }

    #[tokio::test]
    async fn test_submit_round_trip_through_event_channel() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app, "level in Salem");
        handle_event(&mut app, key(KeyCode::Enter));

        assert!(app.input.is_empty());
        assert!(app.busy());

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::Completed(Completion::Reply(Ok(_)))));
        handle_event(&mut app, event);

        let last = app.session.conversation().messages().last().unwrap();
        assert_eq!(last.sender, Sender::Bot);
        assert_eq!(last.text, "echo: level in Salem");
        assert_eq!(app.report_count(), 1);
        assert_eq!(app.selected_report().unwrap().location, "Salem");
        assert!(!app.busy());
    }

    #[tokio::test]
    async fn test_save_report_dispatches_download() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app, "Salem");
        handle_event(&mut app, key(KeyCode::Enter));
        let event = rx.recv().await.unwrap();
        handle_event(&mut app, event);

        handle_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.focus, FocusPane::Reports);
        handle_event(&mut app, key(KeyCode::Char('s')));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::Completed(Completion::ReportSaved { .. })));
        handle_event(&mut app, event);

        let last = app.session.conversation().messages().last().unwrap();
        assert_eq!(last.text, "Report for Salem saved to /tmp/Salem");
    }
}
