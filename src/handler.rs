use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane};
use crate::tui::AppEvent;

const MOUSE_SCROLL_LINES: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    if app.drug_popup.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            app.close_popup();
        }
        return;
    }

    match key.code {
        KeyCode::Char('r') if ctrl => {
            app.reset();
            return;
        }
        KeyCode::Char('s') if ctrl => {
            app.save_transcript();
            return;
        }
        KeyCode::PageUp => {
            app.scroll_chat_up(half_page(app));
            return;
        }
        KeyCode::PageDown => {
            app.scroll_chat_down(half_page(app));
            return;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            app.toggle_focus();
            return;
        }
        _ => {}
    }

    match app.focus {
        FocusPane::Input => handle_input_key(app, key),
        FocusPane::Catalog => handle_catalog_key(app, key),
    }
}

fn half_page(app: &App) -> u16 {
    (app.chat_height / 2).max(1)
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let newline_mod = key
        .modifiers
        .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT);

    match key.code {
        // Quitting is left to Ctrl+C so a stray Esc never drops the chat
        KeyCode::Esc => app.status = None,
        KeyCode::Enter if newline_mod => app.view.input.newline(),
        KeyCode::Char('j') if ctrl => app.view.input.newline(),
        KeyCode::Enter => app.send_message(),
        KeyCode::Backspace => app.view.input.backspace(),
        KeyCode::Delete => app.view.input.delete(),
        KeyCode::Left => app.view.input.left(),
        KeyCode::Right => app.view.input.right(),
        KeyCode::Home => app.view.input.home(),
        KeyCode::End => app.view.input.end(),
        KeyCode::Char(c) if !ctrl => app.view.input.insert(c),
        _ => {}
    }
}

fn handle_catalog_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.focus = FocusPane::Input,
        KeyCode::Char('j') | KeyCode::Down => app.catalog_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.catalog_nav_up(),
        KeyCode::Enter => app.ask_selected_drug(),
        KeyCode::Char('i') => app.show_selected_drug_info(),
        KeyCode::Char('q') => app.should_quit = true,
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

    // Position-based scrolling
    let in_chat = app.chat_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_catalog = app.catalog_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.scroll_chat_down(MOUSE_SCROLL_LINES);
            } else if in_catalog {
                app.catalog_nav_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.scroll_chat_up(MOUSE_SCROLL_LINES);
            } else if in_catalog {
                app.catalog_nav_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatClient;
    use crate::highlight::Highlighter;
    use crate::state::CatalogEntry;

    fn app() -> App {
        App::new(
            ChatClient::new("http://127.0.0.1:9").unwrap(),
            Highlighter::builtin().unwrap(),
            std::env::temp_dir(),
        )
    }

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
        }
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_enter_on_blank_input_does_nothing() {
        let mut app = app();
        type_str(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        assert!(app.view.messages().is_empty());
        assert!(!app.view.is_pending());
    }

    #[test]
    fn test_alt_enter_inserts_newline() {
        let mut app = app();
        type_str(&mut app, "a");
        handle_key(&mut app, KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        type_str(&mut app, "b");
        assert_eq!(app.view.input.text(), "a\nb");
        assert!(app.view.messages().is_empty());
    }

    #[tokio::test]
    async fn test_enter_sends_and_ctrl_r_resets() {
        let mut app = app();
        type_str(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view.messages().len(), 1);
        assert!(app.view.is_typing());

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert!(app.view.messages().is_empty());
        assert!(app.view.welcome_visible());
        assert!(!app.view.is_typing());
    }

    #[test]
    fn test_tab_needs_a_catalog() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, FocusPane::Input);

        app.set_catalog(vec![entry("Levodopa"), entry("Amantadine")]);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, FocusPane::Catalog);

        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.catalog_state.selected(), Some(1));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.focus, FocusPane::Input);
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_enter_in_catalog_asks_about_drug() {
        let mut app = app();
        app.set_catalog(vec![entry("Selegiline")]);
        app.focus = FocusPane::Catalog;

        press(&mut app, KeyCode::Enter);

        assert_eq!(app.focus, FocusPane::Input);
        assert_eq!(
            app.view.messages()[0].to_markup(),
            "<p>Tell me about Selegiline for Parkinson&#39;s disease</p>"
        );
    }

    #[tokio::test]
    async fn test_esc_in_input_keeps_the_conversation() {
        let mut app = app();
        type_str(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        app.status = Some("Saved somewhere".to_string());

        press(&mut app, KeyCode::Esc);

        assert!(!app.should_quit);
        assert_eq!(app.status, None);
        assert_eq!(app.view.messages().len(), 1);
    }

    #[test]
    fn test_ctrl_c_quits_even_with_popup() {
        let mut app = app();
        app.drug_popup = Some(crate::app::DrugPopup::Loading("Levodopa".to_string()));
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
