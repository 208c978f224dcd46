//! Input handling

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

/// Processed input action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Regular character input
    Char(char),
    /// Enter/submit
    Submit,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    /// Move to start of line
    Home,
    /// Move to end of line
    End,
    PageUp,
    PageDown,
    /// Switch focus between the input and the sidebar
    Tab,
    Escape,
    /// Ctrl+C
    Interrupt,
    /// Ctrl+U (clear line)
    ClearLine,
    /// Ctrl+W (delete word)
    DeleteWord,
    /// Paste (bracketed paste)
    Paste(String),
    /// Ctrl+N
    NewConversation,
    /// Ctrl+T
    ToggleTheme,
    /// Ctrl+G: next category
    CycleCategory,
    /// Ctrl+L: next language
    CycleLanguage,
    /// Ctrl+B: show or hide the conversation list
    ToggleSidebar,
    /// Ctrl+F: focus the sidebar search box
    Search,
    /// Ctrl+Q
    Quit,
    /// Unknown/unhandled
    Unknown,
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Interrupt,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            KeyCode::Char('n') => Action::NewConversation,
            KeyCode::Char('t') => Action::ToggleTheme,
            KeyCode::Char('g') => Action::CycleCategory,
            KeyCode::Char('l') => Action::CycleLanguage,
            KeyCode::Char('b') => Action::ToggleSidebar,
            KeyCode::Char('f') => Action::Search,
            KeyCode::Char('q') => Action::Quit,
            _ => Action::Unknown,
        };
    }

    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Up => Action::Up,
        KeyCode::Down => Action::Down,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Tab | KeyCode::BackTab => Action::Tab,
        KeyCode::Esc => Action::Escape,
        _ => Action::Unknown,
    }
}

/// Convert a crossterm event to an action
pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key_event) => Some(key_to_action(key_event)),
        Event::Paste(text) => Some(Action::Paste(text)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_control_bindings() {
        assert_eq!(key_to_action(ctrl('n')), Action::NewConversation);
        assert_eq!(key_to_action(ctrl('t')), Action::ToggleTheme);
        assert_eq!(key_to_action(ctrl('c')), Action::Interrupt);
        assert_eq!(key_to_action(ctrl('z')), Action::Unknown);
    }

    #[test]
    fn test_plain_keys() {
        let key = KeyEvent::new(KeyCode::Char('é'), KeyModifiers::NONE);
        assert_eq!(key_to_action(key), Action::Char('é'));
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(key_to_action(enter), Action::Submit);
    }

    #[test]
    fn test_paste_event() {
        assert_eq!(
            event_to_action(Event::Paste("bonjour".into())),
            Some(Action::Paste("bonjour".into()))
        );
        assert_eq!(event_to_action(Event::FocusGained), None);
    }
}
